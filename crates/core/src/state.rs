use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::money::Money;
use super::transaction::{Owner, Transaction, TransactionId, TransactionPatch};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("Já existe um mês com esse nome: {0}")]
    DuplicateMonth(String),
    #[error("Mês não encontrado: {0}")]
    UnknownMonth(String),
    #[error("A nova ordem de meses não corresponde aos meses existentes")]
    InvalidMonthOrder,
}

/// The whole application state: month-keyed buckets of transactions, a
/// single global recurring set, the display order of months, the
/// current selection and the configured incomes.
///
/// Serializes to the camelCase blob the persistence layer stores
/// opaquely (`monthsData`, `recurExp`, `monthOrder`, ...).
///
/// Structural invariants every operation preserves: `month_order` is a
/// permutation of the keys of `months_data`; transaction ids are unique
/// across the union of all buckets; a transaction lives in exactly one
/// month bucket or in the recurring set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub months_data: BTreeMap<String, Vec<Transaction>>,
    #[serde(default)]
    pub recur_exp: Vec<Transaction>,
    pub month_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_month: Option<String>,
    #[serde(default)]
    pub incomes: BTreeMap<Owner, Money>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Month operations ──────────────────────────────────────────────────

    /// Creates an empty month bucket and selects it. No-op if the name
    /// already exists.
    pub fn create_month(&mut self, name: &str) {
        if self.months_data.contains_key(name) {
            return;
        }
        self.months_data.insert(name.to_string(), Vec::new());
        self.month_order.push(name.to_string());
        self.selected_month = Some(name.to_string());
    }

    /// Removes a month bucket and its transactions. Clears the
    /// selection if the deleted month was selected. The recurring set
    /// is untouched.
    pub fn delete_month(&mut self, name: &str) {
        self.months_data.remove(name);
        self.month_order.retain(|m| m != name);
        if self.selected_month.as_deref() == Some(name) {
            self.selected_month = None;
        }
    }

    /// Moves all transactions of `old` under `new`, keeping the month's
    /// position in the display order and following the selection.
    /// Fails without touching anything if `new` is already taken.
    pub fn rename_month(&mut self, old: &str, new: &str) -> Result<(), StateError> {
        if old == new {
            return Ok(());
        }
        if self.months_data.contains_key(new) {
            return Err(StateError::DuplicateMonth(new.to_string()));
        }
        let transactions = self
            .months_data
            .remove(old)
            .ok_or_else(|| StateError::UnknownMonth(old.to_string()))?;
        self.months_data.insert(new.to_string(), transactions);
        for name in &mut self.month_order {
            if name == old {
                *name = new.to_string();
            }
        }
        if self.selected_month.as_deref() == Some(old) {
            self.selected_month = Some(new.to_string());
        }
        Ok(())
    }

    /// Replaces the display order. The new order must be a permutation
    /// of the existing month names; anything else would orphan buckets
    /// from the display order and is rejected.
    pub fn reorder_months(&mut self, new_order: Vec<String>) -> Result<(), StateError> {
        let current: BTreeSet<&str> = self.months_data.keys().map(String::as_str).collect();
        let proposed: BTreeSet<&str> = new_order.iter().map(String::as_str).collect();
        if new_order.len() != self.month_order.len() || current != proposed {
            return Err(StateError::InvalidMonthOrder);
        }
        self.month_order = new_order;
        Ok(())
    }

    /// Selects a month for the single-month view; ignores names that do
    /// not correspond to an existing bucket.
    pub fn select_month(&mut self, name: Option<&str>) {
        self.selected_month = match name {
            Some(n) if self.months_data.contains_key(n) => Some(n.to_string()),
            _ => None,
        };
    }

    // ── Transaction operations ────────────────────────────────────────────

    /// Appends a batch to the end of a month bucket, creating the
    /// bucket (and registering it in the display order) if needed.
    pub fn append_transactions(&mut self, month: &str, transactions: Vec<Transaction>) {
        if !self.months_data.contains_key(month) {
            self.month_order.push(month.to_string());
        }
        self.months_data
            .entry(month.to_string())
            .or_default()
            .extend(transactions);
    }

    /// Ingestion flow: lands an imported batch in `month` (appending if
    /// the month already exists) and selects it.
    pub fn import_month(&mut self, month: &str, transactions: Vec<Transaction>) {
        self.append_transactions(month, transactions);
        self.selected_month = Some(month.to_string());
    }

    pub fn add_transaction(&mut self, month: &str, transaction: Transaction) {
        self.append_transactions(month, vec![transaction]);
    }

    pub fn add_recurring(&mut self, transaction: Transaction) {
        self.recur_exp.push(transaction);
    }

    /// Applies a partial update to the transaction with `id`, wherever
    /// it lives. Unknown ids are a no-op; returns whether a transaction
    /// was touched so higher layers can decide if that is an error.
    pub fn update_transaction(&mut self, id: &TransactionId, patch: &TransactionPatch) -> bool {
        if let Some(tx) = self.find_mut(id) {
            patch.apply(tx);
            return true;
        }
        false
    }

    /// Removes the transaction with `id` from whichever collection
    /// contains it. Returns whether anything was removed.
    pub fn remove_transaction(&mut self, id: &TransactionId) -> bool {
        let before = self.recur_exp.len();
        self.recur_exp.retain(|t| &t.id != id);
        if self.recur_exp.len() != before {
            return true;
        }
        for bucket in self.months_data.values_mut() {
            let before = bucket.len();
            bucket.retain(|t| &t.id != id);
            if bucket.len() != before {
                return true;
            }
        }
        false
    }

    /// Bulk delete of one import batch ("undo an import"). Returns the
    /// number of transactions removed.
    pub fn remove_by_source_file(&mut self, month: &str, file_name: &str) -> usize {
        match self.months_data.get_mut(month) {
            Some(bucket) => {
                let before = bucket.len();
                bucket.retain(|t| t.source_file != file_name);
                before - bucket.len()
            }
            None => 0,
        }
    }

    pub fn is_recurring(&self, id: &TransactionId) -> bool {
        self.recur_exp.iter().any(|t| &t.id == id)
    }

    pub fn find(&self, id: &TransactionId) -> Option<&Transaction> {
        self.all_transactions().find(|t| &t.id == id)
    }

    fn find_mut(&mut self, id: &TransactionId) -> Option<&mut Transaction> {
        if let Some(tx) = self.recur_exp.iter_mut().find(|t| &t.id == id) {
            return Some(tx);
        }
        self.months_data
            .values_mut()
            .flat_map(|bucket| bucket.iter_mut())
            .find(|t| &t.id == id)
    }

    /// Every stored transaction: all month buckets, then the recurring
    /// set. The recurring set is stored once, not per month.
    pub fn all_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.months_data
            .values()
            .flatten()
            .chain(self.recur_exp.iter())
    }

    /// Unique source files present in a month, in first-seen order.
    /// Drives the per-file "undo import" affordance.
    pub fn source_files(&self, month: &str) -> Vec<String> {
        let mut seen = Vec::new();
        if let Some(bucket) = self.months_data.get(month) {
            for tx in bucket {
                if !tx.source_file.is_empty() && !seen.contains(&tx.source_file) {
                    seen.push(tx.source_file.clone());
                }
            }
        }
        seen
    }

    pub fn set_income(&mut self, owner: Owner, income: Money) {
        self.incomes.insert(owner, income);
    }

    pub fn income(&self, owner: Owner) -> Money {
        self.incomes.get(&owner).copied().unwrap_or_else(Money::zero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(description: &str, cents: i64) -> Transaction {
        Transaction::manual(
            description,
            Money::from_cents(cents),
            "Outros",
            Owner::Shared,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            false,
        )
    }

    #[test]
    fn create_month_is_idempotent_and_selects() {
        let mut state = AppState::new();
        state.create_month("Jan");
        state.add_transaction("Jan", tx("a", 100));
        state.create_month("Jan");
        assert_eq!(state.months_data["Jan"].len(), 1);
        assert_eq!(state.month_order, vec!["Jan"]);
        assert_eq!(state.selected_month.as_deref(), Some("Jan"));
    }

    #[test]
    fn delete_month_clears_selection_and_keeps_recurring() {
        let mut state = AppState::new();
        state.create_month("Jan");
        state.add_recurring(tx("internet", 10000));
        state.delete_month("Jan");
        assert!(state.months_data.is_empty());
        assert!(state.month_order.is_empty());
        assert_eq!(state.selected_month, None);
        assert_eq!(state.recur_exp.len(), 1);
    }

    #[test]
    fn rename_month_preserves_position_and_selection() {
        let mut state = AppState::new();
        state.create_month("Jan");
        state.create_month("Fev");
        state.create_month("Mar");
        state.add_transaction("Fev", tx("mercado", 5000));
        state.select_month(Some("Fev"));

        state.rename_month("Fev", "Fevereiro").unwrap();
        assert_eq!(state.month_order, vec!["Jan", "Fevereiro", "Mar"]);
        assert_eq!(state.selected_month.as_deref(), Some("Fevereiro"));
        assert_eq!(state.months_data["Fevereiro"].len(), 1);
        assert!(!state.months_data.contains_key("Fev"));
    }

    #[test]
    fn rename_onto_existing_month_fails_without_mutation() {
        let mut state = AppState::new();
        state.create_month("Jan");
        state.create_month("Fevereiro");
        state.add_transaction("Jan", tx("cinema", 4000));

        let err = state.rename_month("Jan", "Fevereiro").unwrap_err();
        assert_eq!(err, StateError::DuplicateMonth("Fevereiro".to_string()));
        assert_eq!(state.months_data["Jan"].len(), 1);
        assert_eq!(state.month_order, vec!["Jan", "Fevereiro"]);
    }

    #[test]
    fn rename_unknown_month_fails() {
        let mut state = AppState::new();
        assert_eq!(
            state.rename_month("Jan", "Fev"),
            Err(StateError::UnknownMonth("Jan".to_string()))
        );
    }

    #[test]
    fn reorder_accepts_permutation_and_rejects_anything_else() {
        let mut state = AppState::new();
        state.create_month("Jan");
        state.create_month("Fev");

        state
            .reorder_months(vec!["Fev".to_string(), "Jan".to_string()])
            .unwrap();
        assert_eq!(state.month_order, vec!["Fev", "Jan"]);

        assert_eq!(
            state.reorder_months(vec!["Fev".to_string()]),
            Err(StateError::InvalidMonthOrder)
        );
        assert_eq!(
            state.reorder_months(vec!["Fev".to_string(), "Mar".to_string()]),
            Err(StateError::InvalidMonthOrder)
        );
        assert_eq!(state.month_order, vec!["Fev", "Jan"]);
    }

    #[test]
    fn append_creates_bucket_and_registers_order() {
        let mut state = AppState::new();
        state.append_transactions("Jan", vec![tx("a", 1), tx("b", 2)]);
        assert_eq!(state.month_order, vec!["Jan"]);
        assert_eq!(state.months_data["Jan"].len(), 2);
    }

    #[test]
    fn update_finds_transaction_in_any_bucket() {
        let mut state = AppState::new();
        state.create_month("Jan");
        let monthly = tx("mercado", 5000);
        let monthly_id = monthly.id.clone();
        state.add_transaction("Jan", monthly);
        let recurring = tx("internet", 10000);
        let recurring_id = recurring.id.clone();
        state.add_recurring(recurring);

        let patch = TransactionPatch {
            excluded: Some(true),
            ..Default::default()
        };
        assert!(state.update_transaction(&monthly_id, &patch));
        assert!(state.update_transaction(&recurring_id, &patch));
        assert!(!state.update_transaction(&TransactionId::new(), &patch));
        assert!(state.months_data["Jan"][0].excluded);
        assert!(state.recur_exp[0].excluded);
    }

    #[test]
    fn remove_transaction_from_whichever_collection() {
        let mut state = AppState::new();
        state.create_month("Jan");
        let monthly = tx("a", 1);
        let monthly_id = monthly.id.clone();
        state.add_transaction("Jan", monthly);
        let recurring = tx("b", 2);
        let recurring_id = recurring.id.clone();
        state.add_recurring(recurring);

        assert!(state.remove_transaction(&recurring_id));
        assert!(state.remove_transaction(&monthly_id));
        assert!(!state.remove_transaction(&monthly_id));
        assert!(state.recur_exp.is_empty());
        assert!(state.months_data["Jan"].is_empty());
    }

    #[test]
    fn remove_by_source_file_is_scoped_to_month_and_file() {
        let mut state = AppState::new();
        state.create_month("Jan");
        let mut a = tx("a", 1);
        a.source_file = "fatura-jan.csv".to_string();
        let mut b = tx("b", 2);
        b.source_file = "fatura-jan.csv".to_string();
        let c = tx("c", 3);
        state.append_transactions("Jan", vec![a, b, c]);

        assert_eq!(state.remove_by_source_file("Jan", "fatura-jan.csv"), 2);
        assert_eq!(state.months_data["Jan"].len(), 1);
        assert_eq!(state.remove_by_source_file("Fev", "fatura-jan.csv"), 0);
    }

    #[test]
    fn source_files_in_first_seen_order() {
        let mut state = AppState::new();
        let mut a = tx("a", 1);
        a.source_file = "nubank.csv".to_string();
        let mut b = tx("b", 2);
        b.source_file = "itau.csv".to_string();
        let mut c = tx("c", 3);
        c.source_file = "nubank.csv".to_string();
        state.append_transactions("Jan", vec![a, b, c]);
        assert_eq!(state.source_files("Jan"), vec!["nubank.csv", "itau.csv"]);
    }

    #[test]
    fn state_blob_uses_camel_case_keys() {
        let mut state = AppState::new();
        state.create_month("Jan");
        state.set_income(Owner::Me, Money::from_cents(500000));
        let blob = serde_json::to_string(&state).unwrap();
        assert!(blob.contains("\"monthsData\""));
        assert!(blob.contains("\"monthOrder\""));
        assert!(blob.contains("\"recurExp\""));
        assert!(blob.contains("\"selectedMonth\""));
        assert!(blob.contains("\"incomes\""));
    }
}
