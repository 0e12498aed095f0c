use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;

use super::test_support::{sample_expense, InMemoryLedger};
use super::*;
use crate::errors::Error;

fn upsert_service(store: &Arc<InMemoryLedger>) -> LedgerUpsertService {
    LedgerUpsertService::new(store.clone())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn blank_vendor_and_category_names_are_not_stored() {
    let store = Arc::new(InMemoryLedger::default());
    let service = upsert_service(&store);

    assert_eq!(service.upsert_vendor(None).await.unwrap(), None);
    assert_eq!(service.upsert_vendor(Some("  ")).await.unwrap(), None);
    assert_eq!(service.upsert_category(Some("")).await.unwrap(), None);
    assert!(store.vendors().is_empty());
}

#[tokio::test]
async fn same_vendor_on_two_expenses_is_stored_once() {
    let store = Arc::new(InMemoryLedger::default());
    let service = upsert_service(&store);
    let no_reports = ReportIdMap::new();

    for id in ["E1", "E2"] {
        let raw = json!({
            "expense_id": id,
            "date": "2024-02-01",
            "amount": 10,
            "currency": "USD",
            "merchant": "Acme"
        });
        service.upsert_expense(&raw, &no_reports).await.unwrap();
    }

    let vendors = store.vendors();
    assert_eq!(vendors.len(), 1);
    let expenses = store.expenses();
    assert_eq!(expenses.len(), 2);
    assert!(expenses.iter().all(|e| e.vendor_id == Some(vendors[0].id)));
}

#[tokio::test]
async fn report_links_resolve_only_through_the_run_map() {
    let store = Arc::new(InMemoryLedger::default());
    let service = upsert_service(&store);

    let local_r1 = service
        .upsert_report(&json!({ "report_id": "R1", "title": "Trip" }))
        .await
        .unwrap()
        .unwrap();
    let mut report_ids = ReportIdMap::new();
    report_ids.insert("R1".to_string(), local_r1);

    let base = json!({ "date": "2024-02-01", "amount": 5, "currency": "USD" });
    let mut linked = base.clone();
    linked["expense_id"] = json!("E1");
    linked["report_id"] = json!("R1");
    let mut dangling = base.clone();
    dangling["expense_id"] = json!("E2");
    dangling["report_id"] = json!("R2");

    service.upsert_expense(&linked, &report_ids).await.unwrap();
    service.upsert_expense(&dangling, &report_ids).await.unwrap();

    let e1 = store.get_expense_by_provider_id("E1").unwrap().unwrap();
    let e2 = store.get_expense_by_provider_id("E2").unwrap().unwrap();
    assert_eq!(e1.report_id, Some(local_r1));
    assert_eq!(e2.report_id, None);
}

#[tokio::test]
async fn resync_overwrites_provider_fields_and_keeps_local_ones() {
    let store = Arc::new(InMemoryLedger::default());
    let service = upsert_service(&store);
    let mut report_ids = ReportIdMap::new();
    report_ids.insert("R1".to_string(), 99);

    let raw = json!({
        "expense_id": "E1",
        "report_id": "R1",
        "date": "2024-02-01",
        "amount": "40.00",
        "currency": "USD",
        "merchant": "Cafe"
    });
    let id = service.upsert_expense(&raw, &report_ids).await.unwrap().unwrap();
    store.update_expense(id, |e| {
        e.reimbursement_status = REIMBURSEMENT_STATUS_REIMBURSED.to_string();
        e.external_ref = Some("CO-1".to_string());
        e.te_report = Some("TE-2024-02".to_string());
    });

    let mut changed = raw.clone();
    changed["amount"] = json!("42.50");
    // Report not seen in this run.
    let again = service
        .upsert_expense(&changed, &ReportIdMap::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(again, id);
    let stored = store.get_expense(id).unwrap().unwrap();
    assert_eq!(stored.amount, dec!(42.50));
    assert_eq!(stored.report_id, Some(99));
    assert_eq!(stored.reimbursement_status, REIMBURSEMENT_STATUS_REIMBURSED);
    assert_eq!(stored.external_ref.as_deref(), Some("CO-1"));
    assert_eq!(stored.te_report.as_deref(), Some("TE-2024-02"));
}

#[tokio::test]
async fn payloads_without_identifiers_are_noops() {
    let store = Arc::new(InMemoryLedger::default());
    let service = upsert_service(&store);

    assert_eq!(service.upsert_report(&json!({ "title": "x" })).await.unwrap(), None);
    assert_eq!(
        service
            .upsert_expense(&json!({ "amount": 1 }), &ReportIdMap::new())
            .await
            .unwrap(),
        None
    );
    assert!(store.reports().is_empty());
    assert!(store.expenses().is_empty());
}

#[tokio::test]
async fn invalid_expense_is_rejected_before_any_write() {
    let store = Arc::new(InMemoryLedger::default());
    let service = upsert_service(&store);

    let raw = json!({ "expense_id": "E1", "merchant": "Acme", "currency": "USD" });
    let err = service
        .upsert_expense(&raw, &ReportIdMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
    assert!(store.vendors().is_empty());
}

#[tokio::test]
async fn listing_filters_by_status_newest_first() {
    let store = Arc::new(InMemoryLedger::default());
    let older = store.push_expense(sample_expense("E1", date(2024, 1, 1), dec!(1)));
    let newer = store.push_expense(sample_expense("E2", date(2024, 3, 1), dec!(2)));
    let paid = store.push_expense(sample_expense("E3", date(2024, 2, 1), dec!(3)));
    store.update_expense(paid, |e| {
        e.reimbursement_status = REIMBURSEMENT_STATUS_REIMBURSED.to_string()
    });

    let service = ExpenseService::new(store.clone());
    let all = service.list_expenses(ExpenseListFilter::default()).unwrap();
    assert_eq!(all.iter().map(|e| e.id).collect::<Vec<_>>(), vec![newer, paid, older]);

    let open = service
        .list_expenses(ExpenseListFilter {
            reimbursement_status: Some(REIMBURSEMENT_STATUS_NOT_REIMBURSED.to_string()),
            limit: Some(1),
        })
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, newer);
}

#[tokio::test]
async fn blank_status_filter_lists_everything_within_the_limit() {
    let store = Arc::new(InMemoryLedger::default());
    store.push_expense(sample_expense("E1", date(2024, 1, 1), dec!(1)));
    let newest = store.push_expense(sample_expense("E2", date(2024, 3, 1), dec!(2)));
    let service = ExpenseService::new(store.clone());

    let rows = service
        .list_expenses(ExpenseListFilter {
            reimbursement_status: Some("  ".to_string()),
            limit: Some(0),
        })
        .unwrap();
    assert_eq!(rows.iter().map(|e| e.id).collect::<Vec<_>>(), vec![newest]);

    let rows = service
        .list_expenses(ExpenseListFilter {
            reimbursement_status: Some(String::new()),
            limit: Some(10_000),
        })
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn mark_reimbursed_records_amount_and_date() {
    let store = Arc::new(InMemoryLedger::default());
    let a = store.push_expense(sample_expense("E1", date(2024, 1, 1), dec!(12.00)));
    let b = store.push_expense(sample_expense("E2", date(2024, 1, 2), dec!(30.00)));
    let service = ExpenseService::new(store.clone());

    assert_eq!(service.mark_reimbursed(vec![a], None).await.unwrap(), 1);
    assert_eq!(
        service.mark_reimbursed(vec![b, 404], Some(dec!(25))).await.unwrap(),
        1
    );

    let a = store.get_expense(a).unwrap().unwrap();
    let b = store.get_expense(b).unwrap().unwrap();
    assert!(a.is_reimbursed());
    assert_eq!(a.reimbursed_amount, dec!(12.00));
    assert!(a.reimbursed_date.is_some());
    assert_eq!(b.reimbursed_amount, dec!(25));

    let err = service
        .mark_reimbursed(vec![b.id], Some(dec!(-1)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidData(_)));
}

#[tokio::test]
async fn te_reports_group_assigned_expenses() {
    let store = Arc::new(InMemoryLedger::default());
    let a = store.push_expense(sample_expense("E1", date(2024, 1, 1), dec!(10)));
    let mut converted = sample_expense("E2", date(2024, 1, 2), dec!(20));
    converted.amount_home = Some(dec!(22));
    let b = store.push_expense(converted);
    store.push_expense(sample_expense("E3", date(2024, 1, 3), dec!(99)));

    let service = ExpenseService::new(store.clone());
    let updated = service
        .assign_te_report(vec![a, b], Some(" TE-2024-01 ".to_string()))
        .await
        .unwrap();
    assert_eq!(updated, 2);

    let reports = service.list_te_reports().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].label, "TE-2024-01");
    assert_eq!(reports[0].expense_count, 2);
    assert_eq!(reports[0].total_home_amount, dec!(32));
}
