use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyTotal {
    pub currency: String,
    pub total_amount: Decimal,
    pub count: usize,
}

/// Unreimbursed home-currency total for one category. `category_id` is `None` for uncategorized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOutstanding {
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub total_outstanding: Decimal,
}

/// Age ranges in days since the transaction date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "0-30")]
    UpTo30,
    #[serde(rename = "31-60")]
    UpTo60,
    #[serde(rename = "61-90")]
    UpTo90,
    #[serde(rename = "90+")]
    Over90,
}

impl AgeBucket {
    pub fn for_age_days(days: i64) -> Self {
        match days {
            i64::MIN..=30 => AgeBucket::UpTo30,
            31..=60 => AgeBucket::UpTo60,
            61..=90 => AgeBucket::UpTo90,
            _ => AgeBucket::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::UpTo30 => "0-30",
            AgeBucket::UpTo60 => "31-60",
            AgeBucket::UpTo90 => "61-90",
            AgeBucket::Over90 => "90+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeingRow {
    pub bucket: AgeBucket,
    pub total: Decimal,
}
