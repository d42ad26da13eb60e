use crate::state::AppState;
use crate::transaction::{TransactionId, TransactionPatch};

/// Normalizes a free-text description so that two charges from the same
/// merchant compare equal across months. Issuers commonly append a
/// per-transaction id after a `*` ("NETFLIX *AB12XZ"); everything from
/// the first `*` on is discarded.
///
/// Idempotent: normalizing an already-normalized string is a no-op.
pub fn normalize_description(description: &str) -> String {
    let lowered = description.to_lowercase();
    let merchant = match lowered.find('*') {
        Some(pos) => &lowered[..pos],
        None => &lowered[..],
    };
    merchant.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A transaction that would be swept up by a bulk re-categorization,
/// with its description so the caller can show a sample when asking
/// for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkCandidate {
    pub id: TransactionId,
    pub description: String,
}

/// Phase one of the confirmation-gated bulk re-categorization: find
/// every other transaction, across all month buckets and the recurring
/// set, that looks like the same merchant as `edited` and whose
/// effective category differs from `new_category`.
///
/// Pure query; nothing is mutated. A transaction with a blank
/// normalized description never matches anything, so category edits
/// cannot propagate across unrelated description-less rows.
pub fn find_bulk_candidates(
    state: &AppState,
    edited: &TransactionId,
    new_category: &str,
) -> Vec<BulkCandidate> {
    let Some(edited_tx) = state.find(edited) else {
        return Vec::new();
    };
    let key = normalize_description(&edited_tx.description);
    if key.is_empty() {
        return Vec::new();
    }

    state
        .all_transactions()
        .filter(|t| &t.id != edited)
        .filter(|t| normalize_description(&t.description) == key)
        .filter(|t| t.effective_category() != new_category)
        .map(|t| BulkCandidate {
            id: t.id.clone(),
            description: t.description.clone(),
        })
        .collect()
}

/// Applies the category override to the single edited transaction.
/// Used both when there are no matches and when the caller declines
/// the bulk confirmation.
pub fn apply_category(state: &mut AppState, id: &TransactionId, new_category: &str) -> bool {
    state.update_transaction(id, &TransactionPatch::custom_category(new_category))
}

/// Phase two, on affirmative confirmation: applies the category
/// override to the edited transaction and every confirmed candidate.
pub fn apply_category_bulk(
    state: &mut AppState,
    edited: &TransactionId,
    candidates: &[BulkCandidate],
    new_category: &str,
) {
    let patch = TransactionPatch::custom_category(new_category);
    state.update_transaction(edited, &patch);
    for candidate in candidates {
        state.update_transaction(&candidate.id, &patch);
    }
}
