//! Pure aggregation over transaction sets: the inclusion-in-total
//! policy, owner-split totals, category breakdowns and the single-month
//! and consolidated views. Nothing here mutates state.

use std::collections::BTreeMap;

use crate::money::Money;
use crate::state::AppState;
use crate::transaction::{Owner, Transaction, CATEGORY_NONE};

/// Whether a transaction counts toward a displayed grand total. This
/// is distinct from the `excluded` flag used by owner-split views.
///
/// Charges (`amount >= 0`) always count, even when flagged excluded.
/// Credits respect the flag, and unlabeled "inclusão" adjustments
/// (credit-inclusion noise from the issuer, no category) are dropped.
pub fn include_in_total(tx: &Transaction) -> bool {
    if !tx.amount.is_negative() {
        return true;
    }
    if tx.excluded {
        return false;
    }
    if tx.description.to_lowercase().contains("inclusão") && tx.is_uncategorized() {
        return false;
    }
    true
}

/// Per-owner totals for a transaction list. Each individual's
/// effective share is their direct spending plus half of the Shared
/// bucket. Only the `excluded` flag filters here; the
/// inclusion-in-total policy does not apply to owner splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerSplit {
    pub me: Money,
    pub partner: Money,
    pub shared: Money,
}

impl OwnerSplit {
    pub fn total(&self) -> Money {
        self.me + self.partner + self.shared
    }

    pub fn me_total(&self) -> Money {
        self.me + self.shared.half()
    }

    pub fn partner_total(&self) -> Money {
        self.partner + self.shared.half()
    }
}

pub fn owner_split<'a, I>(transactions: I) -> OwnerSplit
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut split = OwnerSplit {
        me: Money::zero(),
        partner: Money::zero(),
        shared: Money::zero(),
    };
    for tx in transactions {
        if tx.excluded {
            continue;
        }
        match tx.owner {
            Owner::Me => split.me += tx.amount,
            Owner::Partner => split.partner += tx.amount,
            Owner::Shared => split.shared += tx.amount,
        }
    }
    split
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Money,
    pub percent: f64,
}

/// Spending grouped by effective category, largest first. Credits and
/// zero amounts never appear in breakdowns; blank or `-` categories
/// land under "Sem Categoria". Percentages are of the breakdown's own
/// grand total.
pub fn category_breakdown<'a, I>(transactions: I) -> Vec<CategoryTotal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut by_category: BTreeMap<String, Money> = BTreeMap::new();
    for tx in transactions {
        if tx.amount.is_negative() || tx.amount.is_zero() {
            continue;
        }
        let category = if tx.is_uncategorized() {
            CATEGORY_NONE.to_string()
        } else {
            tx.effective_category().to_string()
        };
        *by_category.entry(category).or_insert_with(Money::zero) += tx.amount;
    }

    let grand_total: Money = by_category.values().copied().sum();
    let mut totals: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category,
            total,
            percent: total.percent_of(grand_total),
        })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total));
    totals
}

/// The tab totals: each month's own sum plus the recurring set's sum,
/// both respecting only the `excluded` flag. Recurring expenses are
/// virtually present in every month without per-month storage.
pub fn month_totals(state: &AppState) -> BTreeMap<String, Money> {
    let recurring: Money = state
        .recur_exp
        .iter()
        .filter(|t| !t.excluded)
        .map(|t| t.amount)
        .sum();

    state
        .months_data
        .iter()
        .map(|(month, bucket)| {
            let own: Money = bucket
                .iter()
                .filter(|t| !t.excluded)
                .map(|t| t.amount)
                .sum();
            (month.clone(), own + recurring)
        })
        .collect()
}

/// The single-month view: recurring expenses first, then the month's
/// own transactions. Empty when the month does not exist.
pub fn view_transactions<'a>(state: &'a AppState, month: &str) -> Vec<&'a Transaction> {
    let Some(bucket) = state.months_data.get(month) else {
        return Vec::new();
    };
    state.recur_exp.iter().chain(bucket.iter()).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedSummary {
    pub month_count: usize,
    pub total_spent: Money,
    pub monthly_average: Money,
    pub categories: Vec<CategoryTotal>,
}

/// The multi-month view. Each month contributes its transactions that
/// pass the inclusion-in-total policy; the recurring set (same filter)
/// is replicated once per existing month so a recurring charge weighs
/// in proportion to how long it has been active, not just once.
pub fn consolidate(state: &AppState) -> ConsolidatedSummary {
    let month_count = state.months_data.len();

    let mut pool: Vec<&Transaction> = state
        .months_data
        .values()
        .flatten()
        .filter(|t| include_in_total(t))
        .collect();
    let recurring: Vec<&Transaction> = state
        .recur_exp
        .iter()
        .filter(|t| include_in_total(t))
        .collect();
    for _ in 0..month_count {
        pool.extend(recurring.iter().copied());
    }

    let total_spent: Money = pool.iter().map(|t| t.amount).sum();
    ConsolidatedSummary {
        month_count,
        total_spent,
        monthly_average: total_spent.divided_by(month_count),
        categories: category_breakdown(pool),
    }
}

/// Divides a shared amount between the two individuals in proportion to
/// their configured incomes. Falls back to 50/50 when no incomes are
/// set. The two shares always add back up to the input.
pub fn proportional_split(state: &AppState, shared_total: Money) -> (Money, Money) {
    let me_income = state.income(Owner::Me).to_cents().max(0);
    let partner_income = state.income(Owner::Partner).to_cents().max(0);
    let combined = me_income + partner_income;
    if combined == 0 {
        let half = shared_total.half();
        return (half, shared_total - half);
    }
    let me_cents = (shared_total.to_cents() as i128 * me_income as i128 / combined as i128) as i64;
    let me_share = Money::from_cents(me_cents);
    (me_share, shared_total - me_share)
}
