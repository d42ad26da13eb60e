use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::money::Money;

/// Fixed category enumeration offered for manual entries and
/// re-categorization. The raw `category` field is free text from the
/// card issuer and may contain anything.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Supermercado",
    "Combustível",
    "Lazer",
    "Aluguel",
    "Saúde",
    "Restaurante",
    "Assinaturas",
    "Outros",
];

/// Raw category assigned to simple-ledger imports that carry none.
pub const CATEGORY_TO_CLASSIFY: &str = "A Classificar";

/// Display bucket for transactions with no usable category.
pub const CATEGORY_NONE: &str = "Sem Categoria";

/// `source_file` sentinel for manually entered transactions.
pub const SOURCE_FILE_MANUAL: &str = "Manual";

/// Month label used for the recurring set in flattened exports.
pub const RECURRING_LABEL: &str = "Recorrente";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn new() -> Self {
        TransactionId(Uuid::new_v4().to_string())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Party financially responsible for a transaction. Shared amounts are
/// split 50/50 between the two individuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Owner {
    Me,
    Partner,
    Shared,
}

impl Owner {
    /// Portuguese label used in exports.
    pub fn label(self) -> &'static str {
        match self {
            Owner::Me => "Eu",
            Owner::Partner => "Parceiro",
            Owner::Shared => "Compartilhado",
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    Imported,
    Manual,
}

/// A single financial movement, either imported from a card-issuer CSV
/// or entered by hand. Dates are kept as opaque display strings; the
/// engine never parses them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub date: String,
    pub card_name: String,
    pub card_last_four: String,
    /// Raw category as ingested. Immutable once set.
    pub category: String,
    /// User override; takes precedence over `category` everywhere
    /// except original-value display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_category: Option<String>,
    pub description: String,
    pub installment: String,
    pub amount: Money,
    /// Side-channel USD value carried through from detailed invoices.
    /// Never aggregated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_amount_us: Option<Money>,
    pub owner: Owner,
    pub source_file: String,
    pub source: Source,
    /// Omit from owner-split calculations. The inclusion-in-total
    /// policy in `summary` treats this flag differently for credits.
    #[serde(default)]
    pub excluded: bool,
}

impl Transaction {
    /// A transaction normalized from an imported CSV row.
    #[allow(clippy::too_many_arguments)]
    pub fn imported(
        date: String,
        card_name: String,
        card_last_four: String,
        category: String,
        description: String,
        installment: String,
        amount: Money,
        original_amount_us: Option<Money>,
        source_file: &str,
    ) -> Self {
        Transaction {
            id: TransactionId::new(),
            date,
            card_name,
            card_last_four,
            category,
            custom_category: None,
            description,
            installment,
            amount,
            original_amount_us,
            owner: Owner::Shared,
            source_file: source_file.to_string(),
            source: Source::Imported,
            excluded: false,
        }
    }

    /// A manually entered expense. `recurring` only affects the card
    /// label; callers decide which bucket the transaction goes to.
    pub fn manual(
        description: &str,
        amount: Money,
        category: &str,
        owner: Owner,
        date: NaiveDate,
        recurring: bool,
    ) -> Self {
        Transaction {
            id: TransactionId::new(),
            date: date.format("%d/%m/%Y").to_string(),
            card_name: if recurring { RECURRING_LABEL } else { "Manual Entry" }.to_string(),
            card_last_four: "N/A".to_string(),
            category: category.to_string(),
            custom_category: None,
            description: description.to_string(),
            installment: String::new(),
            amount,
            original_amount_us: None,
            owner,
            source_file: SOURCE_FILE_MANUAL.to_string(),
            source: Source::Manual,
            excluded: false,
        }
    }

    /// User override if present, else the raw ingested category.
    pub fn effective_category(&self) -> &str {
        self.custom_category.as_deref().unwrap_or(&self.category)
    }

    /// Whether the effective category is empty, whitespace or the `-`
    /// placeholder some issuers emit.
    pub fn is_uncategorized(&self) -> bool {
        let cat = self.effective_category().trim();
        cat.is_empty() || cat == "-"
    }
}

/// Partial update applied by `AppState::update_transaction`. The raw
/// `category` is deliberately absent: it is immutable after ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    pub date: Option<String>,
    pub description: Option<String>,
    pub custom_category: Option<String>,
    pub amount: Option<Money>,
    pub owner: Option<Owner>,
    pub excluded: Option<bool>,
}

impl TransactionPatch {
    pub fn custom_category(category: &str) -> Self {
        TransactionPatch {
            custom_category: Some(category.to_string()),
            ..Default::default()
        }
    }

    pub fn apply(&self, tx: &mut Transaction) {
        if let Some(date) = &self.date {
            tx.date = date.clone();
        }
        if let Some(description) = &self.description {
            tx.description = description.clone();
        }
        if let Some(category) = &self.custom_category {
            tx.custom_category = Some(category.clone());
        }
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(owner) = self.owner {
            tx.owner = owner;
        }
        if let Some(excluded) = self.excluded {
            tx.excluded = excluded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn manual_entry_normalizes_date_to_display_format() {
        let tx = Transaction::manual(
            "Aluguel",
            Money::from_cents(150000),
            "Aluguel",
            Owner::Shared,
            date(2024, 3, 1),
            false,
        );
        assert_eq!(tx.date, "01/03/2024");
        assert_eq!(tx.source, Source::Manual);
        assert_eq!(tx.source_file, SOURCE_FILE_MANUAL);
        assert_eq!(tx.card_name, "Manual Entry");
    }

    #[test]
    fn recurring_manual_entry_uses_recurring_card_label() {
        let tx = Transaction::manual(
            "Netflix",
            Money::from_cents(3990),
            "Assinaturas",
            Owner::Shared,
            date(2024, 3, 1),
            true,
        );
        assert_eq!(tx.card_name, RECURRING_LABEL);
    }

    #[test]
    fn effective_category_prefers_override() {
        let mut tx = Transaction::manual(
            "Cinema",
            Money::from_cents(4000),
            "Lazer",
            Owner::Me,
            date(2024, 1, 15),
            false,
        );
        assert_eq!(tx.effective_category(), "Lazer");
        tx.custom_category = Some("Assinaturas".to_string());
        assert_eq!(tx.effective_category(), "Assinaturas");
        // Original value remains visible.
        assert_eq!(tx.category, "Lazer");
    }

    #[test]
    fn uncategorized_detects_blank_and_dash() {
        let mut tx = Transaction::manual(
            "x",
            Money::zero(),
            "",
            Owner::Shared,
            date(2024, 1, 1),
            false,
        );
        assert!(tx.is_uncategorized());
        tx.category = " - ".to_string();
        assert!(tx.is_uncategorized());
        tx.category = "Lazer".to_string();
        assert!(!tx.is_uncategorized());
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let mut tx = Transaction::manual(
            "Luz",
            Money::from_cents(12000),
            "Outros",
            Owner::Shared,
            date(2024, 2, 10),
            false,
        );
        let patch = TransactionPatch {
            owner: Some(Owner::Partner),
            excluded: Some(true),
            ..Default::default()
        };
        patch.apply(&mut tx);
        assert_eq!(tx.owner, Owner::Partner);
        assert!(tx.excluded);
        assert_eq!(tx.description, "Luz");
        assert_eq!(tx.amount, Money::from_cents(12000));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(TransactionId::new(), TransactionId::new());
    }
}
