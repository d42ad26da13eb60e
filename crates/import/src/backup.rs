//! Human-downloadable backup documents: the same JSON shape the
//! persistence layer stores, exported pretty-printed and re-imported
//! with validation.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use rateio_core::{AppState, Money, Owner, Transaction};

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Documento de backup inválido: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// The accepted backup shape. `monthsData` and `monthOrder` are
/// mandatory; everything else defaults (incomes to zeros) so older
/// exports keep importing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackupDocument {
    months_data: BTreeMap<String, Vec<Transaction>>,
    month_order: Vec<String>,
    #[serde(default)]
    recur_exp: Vec<Transaction>,
    #[serde(default)]
    selected_month: Option<String>,
    #[serde(default)]
    incomes: BTreeMap<Owner, Money>,
}

/// Serializes the whole application state as a pretty-printed backup
/// document.
pub fn export_backup(state: &AppState) -> Result<String, BackupError> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Parses and validates a backup document. Rejection happens before
/// any mutation; on success the returned state fully replaces the
/// current one and the caller re-enters the normal persistence path.
pub fn import_backup(document: &str) -> Result<AppState, BackupError> {
    let doc: BackupDocument = serde_json::from_str(document)?;
    Ok(AppState {
        months_data: doc.months_data,
        recur_exp: doc.recur_exp,
        month_order: doc.month_order,
        selected_month: doc.selected_month,
        incomes: doc.incomes,
    })
}
