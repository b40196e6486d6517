use crate::models::Transaction;
use crate::store::{DateRange, FinanceStore};
use crate::validation::validate_transaction;
use crate::Result;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, info};

/// Turn a `YYYY-MM` filter into the UTC range covering that month.
///
/// Anything else, including an out-of-range month, yields `None` and the
/// listing is left unfiltered.
pub fn parse_month_filter(raw: &str) -> Option<DateRange> {
    let bytes = raw.as_bytes();
    let shape_ok = bytes.len() == 7
        && bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit);
    if !shape_ok {
        return None;
    }

    let year: i32 = raw[..4].parse().ok()?;
    let month: u32 = raw[5..].parse().ok()?;

    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };

    Some(DateRange {
        start: Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?),
        end: Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0)?),
    })
}

pub async fn list_transactions(store: &dyn FinanceStore, month: Option<&str>) -> Result<Vec<Transaction>> {
    let range = month.and_then(parse_month_filter);
    if month.is_some() && range.is_none() {
        debug!(month = ?month, "Ignoring malformed month filter");
    }
    store.list_transactions(range).await
}

/// Validate an untyped body and persist it.
pub async fn create_transaction(store: &dyn FinanceStore, body: &Value) -> Result<Transaction> {
    let new_tx = validate_transaction(body)?;
    let created = store.create_transaction(new_tx).await?;

    info!(
        transaction_id = %created.id,
        user_id = %created.user_id,
        kind = %created.kind,
        "Transaction created"
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::User;
    use crate::store::InMemoryFinanceStore;
    use serde_json::json;

    async fn store_with_user(id: &str) -> InMemoryFinanceStore {
        let store = InMemoryFinanceStore::new();
        store
            .seed_user(User {
                id: id.to_string(),
                name: "Ana".to_string(),
                age: "30".to_string(),
                email: "ana@example.com".to_string(),
                password_hash: String::new(),
                income: 500000,
                money_saved: 0,
                created_at: Utc::now(),
            })
            .await;
        store
    }

    fn body(date: &str) -> Value {
        json!({
            "type": "EXPENSE",
            "optional": true,
            "value": 2999,
            "inCash": true,
            "date": date,
            "userId": "u1"
        })
    }

    #[test]
    fn test_month_filter_bounds() {
        let range = parse_month_filter("2025-11").unwrap();
        assert_eq!(range.start.to_rfc3339(), "2025-11-01T00:00:00+00:00");
        assert_eq!(range.end.to_rfc3339(), "2025-12-01T00:00:00+00:00");

        let december = parse_month_filter("2025-12").unwrap();
        assert_eq!(december.end.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_month_filter_rejects_bad_shapes() {
        assert!(parse_month_filter("2025-13").is_none());
        assert!(parse_month_filter("2025-00").is_none());
        assert!(parse_month_filter("2025-1").is_none());
        assert!(parse_month_filter("25-11").is_none());
        assert!(parse_month_filter("2025/11").is_none());
        assert!(parse_month_filter("").is_none());
    }

    #[tokio::test]
    async fn test_create_then_list_by_month() {
        let store = store_with_user("u1").await;
        create_transaction(&store, &body("2025-11-25")).await.unwrap();
        create_transaction(&store, &body("2025-12-02")).await.unwrap();

        assert_eq!(list_transactions(&store, None).await.unwrap().len(), 2);
        assert_eq!(list_transactions(&store, Some("2025-11")).await.unwrap().len(), 1);
        assert_eq!(list_transactions(&store, Some("garbage")).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_runs_before_persistence() {
        let store = store_with_user("u1").await;
        let mut invalid = body("2025-11-25");
        invalid["inCash"] = json!(false);

        let err = create_transaction(&store, &invalid).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref v) if v.field == "months"));
        assert!(list_transactions(&store, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = InMemoryFinanceStore::new();
        let err = create_transaction(&store, &body("2025-11-25")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
