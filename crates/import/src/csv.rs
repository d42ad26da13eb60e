use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use rateio_core::transaction::CATEGORY_TO_CLASSIFY;
use rateio_core::{Money, Transaction};

/// Card label assigned to rows in the simple date/title/amount ledger
/// format (the Nubank export).
const SIMPLE_LEDGER_CARD: &str = "Nubank";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Erro ao processar arquivo {file}: {source}")]
    Malformed {
        file: String,
        #[source]
        source: csv::Error,
    },
}

/// One CSV row classified against the known vendor shapes, tried in
/// priority order. Rows matching neither shape are dropped silently.
#[derive(Debug)]
enum RowShape {
    /// Detailed invoice export: purchase date + BRL amount, with card
    /// metadata, issuer category, installment and an optional USD value.
    DetailedInvoice {
        date: String,
        card_name: String,
        card_last_four: String,
        category: String,
        description: String,
        installment: String,
        amount: Money,
        amount_us: Option<Money>,
    },
    /// Plain date/title/amount ledger export, dot-decimal amounts, no
    /// category of its own.
    SimpleLedger {
        date: String,
        description: String,
        amount: Money,
    },
}

impl RowShape {
    fn classify(row: &Row<'_>) -> Option<RowShape> {
        if let (Some(date), Some(raw_amount)) = (row.get("Data de Compra"), row.get("Valor (em R$)"))
        {
            return Some(RowShape::DetailedInvoice {
                date: date.to_string(),
                card_name: row.get("Nome no Cartão").unwrap_or_default().to_string(),
                card_last_four: row.get("Final do Cartão").unwrap_or_default().to_string(),
                category: row.get("Categoria").unwrap_or_default().to_string(),
                description: row.get("Descrição").unwrap_or_default().to_string(),
                installment: row.get("Parcela").unwrap_or_default().to_string(),
                amount: parse_brl_amount(raw_amount),
                amount_us: row.get("Valor (em US$)").and_then(parse_us_amount),
            });
        }

        if let (Some(date), Some(raw_amount)) = (row.get("date"), row.get("amount")) {
            return Some(RowShape::SimpleLedger {
                date: date.to_string(),
                description: row.get("title").unwrap_or_default().to_string(),
                amount: parse_plain_amount(raw_amount),
            });
        }

        None
    }

    fn into_transaction(self, source_file: &str) -> Transaction {
        match self {
            RowShape::DetailedInvoice {
                date,
                card_name,
                card_last_four,
                category,
                description,
                installment,
                amount,
                amount_us,
            } => Transaction::imported(
                date,
                card_name,
                card_last_four,
                category,
                description,
                installment,
                amount,
                amount_us,
                source_file,
            ),
            RowShape::SimpleLedger {
                date,
                description,
                amount,
            } => Transaction::imported(
                date,
                SIMPLE_LEDGER_CARD.to_string(),
                String::new(),
                CATEGORY_TO_CLASSIFY.to_string(),
                description,
                String::new(),
                amount,
                None,
                source_file,
            ),
        }
    }
}

/// A record paired with the file's header row, for lookups by column
/// name. A field "present" for sniffing purposes must be non-empty.
struct Row<'a> {
    headers: &'a csv::StringRecord,
    record: &'a csv::StringRecord,
}

impl Row<'_> {
    fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.record.get(idx).filter(|v| !v.trim().is_empty())
    }
}

/// Parses the raw content of a card-issuer CSV export into normalized
/// transactions, each tagged with `source_file` and a fresh id.
///
/// Rows are sniffed independently; unrecognized rows are skipped, and
/// rows with unparseable amounts come through with a zero amount so
/// the operator can fix them by hand. Only a structurally malformed
/// file fails the import as a whole.
pub fn parse_invoice_csv(data: &[u8], source_file: &str) -> Result<Vec<Transaction>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| ImportError::Malformed {
            file: source_file.to_string(),
            source: e,
        })?
        .clone();

    let mut transactions = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ImportError::Malformed {
            file: source_file.to_string(),
            source: e,
        })?;
        let row = Row {
            headers: &headers,
            record: &record,
        };
        if let Some(shape) = RowShape::classify(&row) {
            transactions.push(shape.into_transaction(source_file));
        }
    }

    Ok(transactions)
}

/// Brazilian-format BRL amount: optional `R$` prefix, `.` thousands
/// separator when a `,` decimal is present, otherwise `,` or `.` as
/// the decimal separator. Unparseable input coerces to zero rather
/// than dropping the row.
fn parse_brl_amount(raw: &str) -> Money {
    let cleaned = raw.replace("R$", "");
    let cleaned = cleaned.trim();
    let normalized = if cleaned.contains(',') && cleaned.contains('.') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else {
        cleaned.to_string()
    };
    Decimal::from_str(&normalized)
        .map(Money::from_decimal)
        .unwrap_or_else(|_| Money::zero())
}

/// Optional USD side-channel value, comma-decimal.
fn parse_us_amount(raw: &str) -> Option<Money> {
    Decimal::from_str(&raw.trim().replace(',', "."))
        .map(Money::from_decimal)
        .ok()
}

/// Standard dot-decimal amount; zero on failure (same lenience as BRL).
fn parse_plain_amount(raw: &str) -> Money {
    Decimal::from_str(raw.trim())
        .map(Money::from_decimal)
        .unwrap_or_else(|_| Money::zero())
}
