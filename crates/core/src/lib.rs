pub mod matcher;
pub mod money;
pub mod state;
pub mod summary;
pub mod transaction;

pub use money::Money;
pub use state::{AppState, StateError};
pub use transaction::{Owner, Source, Transaction, TransactionId, TransactionPatch};
