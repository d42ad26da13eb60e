//! Spreadsheet-friendly export of every transaction in the state, one
//! row per entry, `;`-delimited for pt-BR locales.

use thiserror::Error;

use rateio_core::summary::include_in_total;
use rateio_core::transaction::{CATEGORY_NONE, RECURRING_LABEL};
use rateio_core::{AppState, Money, Transaction};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Erro ao gerar planilha: {0}")]
    Csv(#[from] csv::Error),
    #[error("Erro ao gerar planilha: {0}")]
    Io(#[from] std::io::Error),
}

const HEADER: [&str; 8] = [
    "Data",
    "Mês",
    "Descrição",
    "Categoria",
    "Valor",
    "Responsável",
    "Arquivo",
    "Ignorada",
];

/// Renders the whole state as a `;`-delimited table: months in display
/// order, then the recurring entries, then a grand-total row covering
/// everything that counts toward totals.
pub fn export_table(state: &AppState) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;

    let mut grand_total = Money::zero();
    for month in &state.month_order {
        if let Some(transactions) = state.months_data.get(month) {
            for tx in transactions {
                write_row(&mut writer, tx, month, &tx.source_file)?;
                if include_in_total(tx) {
                    grand_total += tx.amount;
                }
            }
        }
    }
    for tx in &state.recur_exp {
        write_row(&mut writer, tx, RECURRING_LABEL, RECURRING_LABEL)?;
        if include_in_total(tx) {
            grand_total += tx.amount;
        }
    }

    writer.write_record(["", "", "Total", "", &grand_total.format_comma(), "", "", ""])?;

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_row<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    tx: &Transaction,
    month: &str,
    file: &str,
) -> Result<(), ExportError> {
    let category = if tx.is_uncategorized() {
        CATEGORY_NONE.to_string()
    } else {
        tx.effective_category().to_string()
    };
    writer.write_record([
        tx.date.as_str(),
        month,
        tx.description.as_str(),
        category.as_str(),
        tx.amount.format_comma().as_str(),
        tx.owner.label(),
        file,
        if tx.excluded { "Sim" } else { "Não" },
    ])?;
    Ok(())
}
