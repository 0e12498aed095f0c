//! Conversion of raw provider payloads into upsert inputs.
//!
//! The provider is inconsistent about field names and value shapes; every
//! fallback lives here so the repositories only see typed values.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use super::{ExpenseUpsert, ReportUpsert};
use crate::errors::{Error, Result};

/// Provider identifier under `primary`, falling back to `id`.
///
/// Numbers are accepted; empty strings, zero, null and missing values yield `None`.
fn provider_id(raw: &Value, primary: &str) -> Option<String> {
    [primary, "id"]
        .iter()
        .filter_map(|key| raw.get(*key))
        .find_map(scalar_to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

pub fn report_provider_id(raw: &Value) -> Option<String> {
    provider_id(raw, "report_id")
}

pub fn expense_provider_id(raw: &Value) -> Option<String> {
    provider_id(raw, "expense_id")
}

fn text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(scalar_to_string)
}

fn first_text(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(raw, key))
}

/// Currency code from either `"USD"` or `{"code": "USD"}`.
pub fn currency_code(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(map) => map.get("code").and_then(scalar_to_string),
        other => scalar_to_string(other),
    }
}

/// Amount from a JSON number or a numeric string. Blank and null values are `None`.
pub fn decimal_value(raw: &Value, key: &str) -> Result<Option<Decimal>> {
    let text = match raw.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().replace(',', ""),
        Some(other) => {
            return Err(Error::invalid_data(format!(
                "Field '{}' is not numeric: {}",
                key, other
            )))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|_| Error::invalid_data(format!("Field '{}' is not numeric: {}", key, text)))
}

fn first_decimal(raw: &Value, keys: &[&str]) -> Result<Option<Decimal>> {
    for key in keys {
        if let Some(value) = decimal_value(raw, key)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Calendar date from `YYYY-MM-DD`, tolerating a trailing time component.
pub fn date_value(raw: &Value, key: &str) -> Result<Option<NaiveDate>> {
    let Some(text) = text(raw, key) else {
        return Ok(None);
    };
    let day = text.get(..10).unwrap_or(&text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| Error::invalid_data(format!("Field '{}' is not a date: {}", key, text)))
}

fn first_date(raw: &Value, keys: &[&str]) -> Result<Option<NaiveDate>> {
    for key in keys {
        if let Some(value) = date_value(raw, key)? {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Timestamp from RFC 3339 text or a bare date (midnight UTC).
fn timestamp_value(raw: &Value, keys: &[&str]) -> Result<Option<DateTime<Utc>>> {
    for key in keys {
        let Some(text) = text(raw, key) else {
            continue;
        };
        if let Ok(ts) = DateTime::parse_from_rfc3339(&text) {
            return Ok(Some(ts.with_timezone(&Utc)));
        }
        if let Some(day) = date_value(raw, key)? {
            return Ok(day.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc()));
        }
    }
    Ok(None)
}

/// Vendor name from `merchant`, then `vendor` (string or `{name}` object).
pub fn vendor_name(raw: &Value) -> Option<String> {
    text(raw, "merchant").or_else(|| match raw.get("vendor") {
        Some(Value::Object(map)) => map.get("name").and_then(scalar_to_string),
        Some(other) => scalar_to_string(other),
        None => None,
    })
}

/// Category name from `category_name`, then `category.name`, then a bare `category` string.
pub fn category_name(raw: &Value) -> Option<String> {
    text(raw, "category_name").or_else(|| match raw.get("category") {
        Some(Value::Object(map)) => map.get("name").and_then(scalar_to_string),
        Some(other) => scalar_to_string(other),
        None => None,
    })
}

/// Normalizes a raw report. `None` when the payload carries no provider id.
pub fn report_from_raw(raw: &Value) -> Result<Option<ReportUpsert>> {
    let Some(provider_report_id) = report_provider_id(raw) else {
        return Ok(None);
    };

    Ok(Some(ReportUpsert {
        provider_report_id,
        title: first_text(raw, &["title", "report_name"]),
        report_number: text(raw, "report_number"),
        start_date: date_value(raw, "start_date")?,
        end_date: date_value(raw, "end_date")?,
        status: text(raw, "status"),
        total_amount: first_decimal(raw, &["total", "total_amount"])?,
        currency: currency_code(raw.get("currency")),
        submitted_at: timestamp_value(raw, &["submitted_at", "submitted_date"])?,
        approved_at: timestamp_value(raw, &["approved_at", "approved_date"])?,
    }))
}

/// Expense payload with references still unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpense {
    pub provider_expense_id: String,
    pub report_ref: Option<String>,
    pub vendor_name: Option<String>,
    pub category_name: Option<String>,
    pub txn_date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Option<Decimal>,
    pub amount_home: Option<Decimal>,
    pub payment_mode: Option<String>,
}

impl RawExpense {
    pub fn into_upsert(
        self,
        report_id: Option<i64>,
        vendor_id: Option<i64>,
        category_id: Option<i64>,
    ) -> ExpenseUpsert {
        ExpenseUpsert {
            provider_expense_id: self.provider_expense_id,
            report_id,
            txn_date: self.txn_date,
            merchant: self.vendor_name,
            vendor_id,
            category_id,
            description: self.description,
            amount: self.amount,
            currency: self.currency,
            exchange_rate: self.exchange_rate,
            amount_home: self.amount_home,
            payment_mode: self.payment_mode,
        }
    }
}

/// Normalizes a raw expense. `None` when the payload carries no provider id.
///
/// Date, amount and currency are mandatory.
pub fn expense_from_raw(raw: &Value) -> Result<Option<RawExpense>> {
    let Some(provider_expense_id) = expense_provider_id(raw) else {
        return Ok(None);
    };

    let txn_date = first_date(raw, &["date", "txn_date"])?.ok_or_else(|| {
        Error::invalid_data(format!("Expense {} has no date", provider_expense_id))
    })?;
    let amount = decimal_value(raw, "amount")?.ok_or_else(|| {
        Error::invalid_data(format!("Expense {} has no amount", provider_expense_id))
    })?;
    let currency = currency_code(raw.get("currency")).ok_or_else(|| {
        Error::invalid_data(format!("Expense {} has no currency", provider_expense_id))
    })?;

    Ok(Some(RawExpense {
        report_ref: raw.get("report_id").and_then(scalar_to_string),
        vendor_name: vendor_name(raw),
        category_name: category_name(raw),
        txn_date,
        description: text(raw, "description"),
        amount,
        currency,
        exchange_rate: decimal_value(raw, "exchange_rate")?,
        amount_home: first_decimal(raw, &["amount_home", "converted_amount"])?,
        payment_mode: text(raw, "payment_mode"),
        provider_expense_id,
    }))
}
