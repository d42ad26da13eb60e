pub mod backup;
pub mod csv;
pub mod export;

pub use backup::{export_backup, import_backup, BackupError};
pub use csv::{parse_invoice_csv, ImportError};
pub use export::{export_table, ExportError};
