//! Mutation surface over the in-memory state. Every successful
//! mutation schedules a debounced save; reads never do.

use chrono::NaiveDate;
use thiserror::Error;

use rateio_core::matcher::{self, BulkCandidate};
use rateio_core::summary::{self, ConsolidatedSummary, OwnerSplit};
use rateio_core::{AppState, Money, Owner, StateError, Transaction, TransactionId};
use rateio_import::{BackupError, ImportError};

use crate::sync::Synchronizer;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Backup(#[from] BackupError),
    #[error(transparent)]
    Export(#[from] rateio_import::ExportError),
    #[error("Transação não encontrada")]
    TransactionNotFound,
}

pub struct Controller {
    state: AppState,
    sync: Synchronizer,
}

impl Controller {
    pub fn new(state: AppState, sync: Synchronizer) -> Controller {
        Controller { state, sync }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub async fn shutdown(self) {
        self.sync.shutdown().await;
    }

    fn touched(&self) {
        self.sync.schedule(&self.state);
    }

    // ── months ────────────────────────────────────────────────────────────

    pub fn create_month(&mut self, name: &str) {
        self.state.create_month(name);
        self.touched();
    }

    pub fn delete_month(&mut self, name: &str) {
        self.state.delete_month(name);
        self.touched();
    }

    pub fn rename_month(&mut self, old: &str, new: &str) -> Result<(), AppError> {
        self.state.rename_month(old, new)?;
        self.touched();
        Ok(())
    }

    pub fn reorder_months(&mut self, new_order: Vec<String>) -> Result<(), AppError> {
        self.state.reorder_months(new_order)?;
        self.touched();
        Ok(())
    }

    pub fn select_month(&mut self, name: Option<&str>) {
        self.state.select_month(name);
        self.touched();
    }

    // ── transactions ──────────────────────────────────────────────────────

    /// Parses an uploaded CSV invoice and lands its rows in `month`,
    /// creating and selecting the month as needed. Returns how many
    /// rows were imported.
    pub fn import_csv(
        &mut self,
        month: &str,
        data: &[u8],
        source_file: &str,
    ) -> Result<usize, AppError> {
        let transactions = rateio_import::parse_invoice_csv(data, source_file)?;
        let count = transactions.len();
        self.state.import_month(month, transactions);
        self.touched();
        Ok(count)
    }

    pub fn add_manual(
        &mut self,
        month: &str,
        description: &str,
        amount: Money,
        category: &str,
        owner: Owner,
        date: NaiveDate,
    ) {
        let tx = Transaction::manual(description, amount, category, owner, date, false);
        self.state.add_transaction(month, tx);
        self.touched();
    }

    pub fn add_recurring(
        &mut self,
        description: &str,
        amount: Money,
        category: &str,
        owner: Owner,
        date: NaiveDate,
    ) {
        let tx = Transaction::manual(description, amount, category, owner, date, true);
        self.state.add_recurring(tx);
        self.touched();
    }

    pub fn set_owner(&mut self, id: &TransactionId, owner: Owner) -> Result<(), AppError> {
        let patch = rateio_core::TransactionPatch {
            owner: Some(owner),
            ..Default::default()
        };
        if !self.state.update_transaction(id, &patch) {
            return Err(AppError::TransactionNotFound);
        }
        self.touched();
        Ok(())
    }

    pub fn set_excluded(&mut self, id: &TransactionId, excluded: bool) -> Result<(), AppError> {
        let patch = rateio_core::TransactionPatch {
            excluded: Some(excluded),
            ..Default::default()
        };
        if !self.state.update_transaction(id, &patch) {
            return Err(AppError::TransactionNotFound);
        }
        self.touched();
        Ok(())
    }

    pub fn remove_transaction(&mut self, id: &TransactionId) -> Result<(), AppError> {
        if !self.state.remove_transaction(id) {
            return Err(AppError::TransactionNotFound);
        }
        self.touched();
        Ok(())
    }

    pub fn remove_source_file(&mut self, month: &str, file_name: &str) -> usize {
        let removed = self.state.remove_by_source_file(month, file_name);
        if removed > 0 {
            self.touched();
        }
        removed
    }

    pub fn set_income(&mut self, owner: Owner, income: Money) {
        self.state.set_income(owner, income);
        self.touched();
    }

    // ── two-phase category edit ───────────────────────────────────────────

    /// Applies the category to one transaction and reports the
    /// lookalikes the caller should offer to update too. The edited
    /// transaction is committed either way; the candidates wait for
    /// [`Controller::confirm_bulk_category`].
    pub fn set_category(
        &mut self,
        id: &TransactionId,
        category: &str,
    ) -> Result<Vec<BulkCandidate>, AppError> {
        let candidates = matcher::find_bulk_candidates(&self.state, id, category);
        if !matcher::apply_category(&mut self.state, id, category) {
            return Err(AppError::TransactionNotFound);
        }
        self.touched();
        Ok(candidates)
    }

    /// Second phase, after the user confirms: sweeps the candidates
    /// from [`Controller::set_category`] into the same category.
    pub fn confirm_bulk_category(&mut self, candidates: &[BulkCandidate], category: &str) {
        for candidate in candidates {
            matcher::apply_category(&mut self.state, &candidate.id, category);
        }
        if !candidates.is_empty() {
            self.touched();
        }
    }

    // ── views ─────────────────────────────────────────────────────────────

    pub fn month_view(&self, month: &str) -> Vec<&Transaction> {
        summary::view_transactions(&self.state, month)
    }

    /// Per-owner totals for the month view. Filters on the `excluded`
    /// flag alone; the inclusion-in-total policy does not apply to
    /// owner splits.
    pub fn month_split(&self, month: &str) -> OwnerSplit {
        summary::owner_split(self.month_view(month))
    }

    pub fn consolidated(&self) -> ConsolidatedSummary {
        summary::consolidate(&self.state)
    }

    pub fn proportional_split(&self, shared_total: Money) -> (Money, Money) {
        summary::proportional_split(&self.state, shared_total)
    }

    // ── backup ────────────────────────────────────────────────────────────

    pub fn export_backup(&self) -> Result<String, AppError> {
        Ok(rateio_import::export_backup(&self.state)?)
    }

    /// Replaces the whole state with a validated backup document.
    /// Rejection leaves the current state untouched.
    pub fn import_backup(&mut self, document: &str) -> Result<(), AppError> {
        self.state = rateio_import::import_backup(document)?;
        self.touched();
        Ok(())
    }

    pub fn export_table(&self) -> Result<String, AppError> {
        Ok(rateio_import::export_table(&self.state)?)
    }
}
