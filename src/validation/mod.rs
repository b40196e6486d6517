//! Request validation
//!
//! Turns untyped request bodies into typed values, or a single
//! [`ValidationError`] naming the first field that broke a rule.

use crate::error::ValidationError;
use crate::models::{CreateUserRequest, NewTransaction, TransactionType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Validate a transaction body.
///
/// Rules run in a fixed order and stop at the first violation:
/// type, optional, value, description, inCash, months (installments only),
/// date, userId.
pub fn validate_transaction(body: &Value) -> ValidationResult<NewTransaction> {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or(&empty);

    let kind = fields
        .get("type")
        .and_then(Value::as_str)
        .and_then(TransactionType::parse)
        .ok_or_else(|| ValidationError::new("type", "Invalid transaction type"))?;

    let optional = require_bool(fields, "optional")?;

    let value = fields
        .get("value")
        .and_then(as_integral)
        .ok_or_else(|| ValidationError::invalid_field("value"))?;

    let description = match fields.get("description") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.trim().is_empty() => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => return Err(ValidationError::invalid_field("description")),
    };

    let in_cash = require_bool(fields, "inCash")?;

    let months = if in_cash {
        None
    } else {
        let months = fields
            .get("months")
            .and_then(as_integral)
            .filter(|m| *m >= 1)
            .and_then(|m| i32::try_from(m).ok())
            .ok_or_else(|| ValidationError::invalid_field("months"))?;
        Some(months)
    };

    let date = fields
        .get("date")
        .and_then(Value::as_str)
        .and_then(parse_transaction_date)
        .ok_or_else(|| ValidationError::invalid_field("date"))?;

    let user_id = fields
        .get("userId")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::invalid_field("userId"))?
        .to_string();

    Ok(NewTransaction {
        kind,
        optional,
        value,
        description,
        in_cash,
        months,
        date,
        user_id,
    })
}

/// Checks a user body beyond what its typed shape already guarantees.
pub fn validate_user_request(request: &CreateUserRequest) -> ValidationResult<()> {
    if !is_valid_email(&request.email) {
        return Err(ValidationError::invalid_field("email"));
    }
    if request.income < 0 {
        return Err(ValidationError::invalid_field("income"));
    }
    if request.money_saved < 0 {
        return Err(ValidationError::invalid_field("money_saved"));
    }
    if let Some(index) = request
        .goals
        .iter()
        .position(|g| g.value.map_or(false, |v| v < 0))
    {
        return Err(ValidationError::new(
            "goals",
            format!("Invalid field 'value' in goal {}", index),
        ));
    }
    Ok(())
}

/// Shape check only: something before `@`, and a dotted domain after it.
pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let mut labels = domain.split('.');
    let count = labels.clone().count();
    count >= 2 && labels.all(|label| !label.is_empty())
}

/// Accepts `YYYY-MM-DD` (midnight UTC), RFC 3339, or a naive timestamp
/// taken as UTC.
pub fn parse_transaction_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

fn require_bool(fields: &Map<String, Value>, field: &str) -> ValidationResult<bool> {
    fields
        .get(field)
        .and_then(Value::as_bool)
        .ok_or_else(|| ValidationError::invalid_field(field))
}

/// Whole numbers only; `2999.0` is fine, `29.99` is not.
fn as_integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let n = value.as_f64()?;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}
