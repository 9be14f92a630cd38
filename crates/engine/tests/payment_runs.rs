mod common;

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use common::*;
use engine::{
    BatchFilter, BatchStatus, EngineError, GrowerOutcome, PaymentType, RunErrorKind, RunMode,
    RunOptions,
};

#[tokio::test]
async fn test_run_prices_receipts_without_writing() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let grower_id = grower(&db, "G001", false).await;
    receipt(&db, "R-1", grower_id, "2025-06-01").await;

    let result = engine.test_run(&run_cmd(1)).await.unwrap();

    assert!(result.success);
    assert_eq!(result.mode, RunMode::Test);
    assert!(result.created_batch.is_none());
    assert_eq!(result.receipt_count, 1);
    let line = &result.growers[0].lines[0];
    assert_eq!(line.amounts.price_per_unit, Decimal::new(100, 2));
    assert_eq!(line.amounts.advance, cents(100_00));
    assert_eq!(line.amounts.premium, cents(10_00));
    assert_eq!(line.amounts.marketing_deduction, cents(2_00));
    assert_eq!(result.total_amount, cents(108_00));

    assert!(engine.batches(&BatchFilter::default()).await.unwrap().is_empty());
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM receipt_payment_allocations").await,
        0
    );
}

#[tokio::test]
async fn actual_run_pays_into_a_draft_batch() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let first = grower(&db, "G001", false).await;
    let second = grower(&db, "G002", false).await;
    let receipt_id = receipt(&db, "R-1", first, "2025-06-01").await;
    receipt(&db, "R-2", second, "2025-06-02").await;
    receipt(&db, "R-3", second, "2025-06-03").await;

    let result = engine.actual_run(&run_cmd(1)).await.unwrap();

    assert!(result.success, "{:?}", result.errors);
    let batch = result.created_batch.clone().unwrap();
    assert_eq!(batch.batch_number, "ADV1-2025-001");
    assert_eq!(batch.payment_type, PaymentType::Advance1);
    assert_eq!(batch.status, BatchStatus::Draft);
    assert_eq!(batch.run_id, Some(result.run_id));
    assert_eq!(batch.grower_count, 2);
    assert_eq!(batch.receipt_count, 3);
    assert_eq!(batch.total_amount, cents(3 * 108_00));

    let allocations = engine.batch_allocations(batch.id).await.unwrap();
    assert_eq!(allocations.len(), 3);
    assert!(allocations.iter().all(|a| a.payment_type == PaymentType::Advance1));

    assert_eq!(
        count(
            &db,
            &format!(
                "SELECT COUNT(*) FROM receipts WHERE id = {receipt_id} AND advance1_batch_id = {} AND advance1_price = '1.00'",
                batch.id
            )
        )
        .await,
        1
    );
    assert_eq!(count(&db, "SELECT COUNT(*) FROM payment_lines").await, 9);
}

#[tokio::test]
async fn paid_round_is_not_paid_twice() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let grower_id = grower(&db, "G001", false).await;
    receipt(&db, "R-1", grower_id, "2025-06-01").await;

    engine.actual_run(&run_cmd(1)).await.unwrap();
    let again = engine.actual_run(&run_cmd(1)).await.unwrap();

    assert!(again.success);
    assert!(again.created_batch.is_none());
    assert_eq!(again.receipt_count, 0);
}

#[tokio::test]
async fn later_round_requires_the_earlier_ones() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let grower_id = grower(&db, "G001", false).await;
    let paid = receipt(&db, "R-1", grower_id, "2025-06-01").await;

    engine.actual_run(&run_cmd(1)).await.unwrap();
    let unpaid = receipt(&db, "R-2", grower_id, "2025-06-05").await;

    let second = engine.actual_run(&run_cmd(2)).await.unwrap();
    assert!(second.success, "{:?}", second.errors);
    let lines = &second.growers[0].lines;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].receipt_id, paid);
    assert_ne!(lines[0].receipt_id, unpaid);
    // 1.50 cumulative minus the 1.00 already paid, no premium after round 1.
    assert_eq!(lines[0].amounts.price_per_unit, Decimal::new(50, 2));
    assert_eq!(lines[0].amounts.advance, cents(50_00));
    assert!(lines[0].amounts.premium.is_zero());
    assert_eq!(
        second.created_batch.unwrap().batch_number,
        "ADV2-2025-001"
    );

    // Round 3 table price (1.40) is below the running maximum.
    let third = engine.test_run(&run_cmd(3)).await.unwrap();
    assert_eq!(third.growers[0].lines[0].amounts.advance, cents(0));
}

#[tokio::test]
async fn unpriceable_receipts_do_not_stop_other_growers() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let unpriced = grower(&db, "G001", false).await;
    let priced = grower(&db, "G002", false).await;
    let bad_receipt = receipt_for(&db, "R-1", unpriced, 99, "2025-06-01", "100").await;
    receipt(&db, "R-2", priced, "2025-06-01").await;

    let result = engine.actual_run(&run_cmd(1)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.kind, RunErrorKind::Calculation);
    assert_eq!(error.grower_id, Some(unpriced));
    assert_eq!(error.receipt_id, Some(bad_receipt));

    let outcomes: Vec<_> = result
        .growers
        .iter()
        .map(|g| (g.grower_id, g.outcome.clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (unpriced, GrowerOutcome::Failed),
            (priced, GrowerOutcome::Paid)
        ]
    );
    let batch = result.created_batch.unwrap();
    assert_eq!(batch.grower_count, 1);
    assert_eq!(batch.total_amount, cents(108_00));
}

#[tokio::test]
async fn deleted_grower_is_a_calculation_error() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let grower_id = grower(&db, "G001", false).await;
    receipt(&db, "R-1", grower_id, "2025-06-01").await;
    execute(
        &db,
        "UPDATE growers SET deleted_at = '2025-07-01T00:00:00Z' WHERE id = ?",
        vec![grower_id.into()],
    )
    .await;

    let result = engine.test_run(&run_cmd(1)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.errors[0].kind, RunErrorKind::Calculation);
    assert_eq!(result.errors[0].grower_id, Some(grower_id));
    assert_eq!(result.growers.len(), 0);
}

#[tokio::test]
async fn on_hold_growers_are_skipped_unless_included() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let held = grower(&db, "G001", true).await;
    receipt(&db, "R-1", held, "2025-06-01").await;

    let skipped = engine.test_run(&run_cmd(1)).await.unwrap();
    assert!(skipped.success);
    assert_eq!(skipped.growers[0].outcome, GrowerOutcome::OnHold);
    assert_eq!(skipped.receipt_count, 0);

    let included = engine
        .test_run(&run_cmd(1).include_on_hold(true))
        .await
        .unwrap();
    assert_eq!(included.growers[0].outcome, GrowerOutcome::Paid);
    assert_eq!(included.total_amount, cents(108_00));
}

#[tokio::test]
async fn exclusion_filters_and_cutoff_narrow_the_run() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let kept = grower(&db, "G001", false).await;
    let excluded = grower(&db, "G002", false).await;
    receipt(&db, "R-1", kept, "2025-06-01").await;
    receipt(&db, "R-2", kept, "2025-09-15").await;
    receipt(&db, "R-3", kept, "2024-06-01").await;
    receipt(&db, "R-4", excluded, "2025-06-01").await;

    let result = engine
        .test_run(&run_cmd(1).exclude_grower(excluded))
        .await
        .unwrap();

    assert_eq!(result.growers.len(), 1);
    assert_eq!(result.growers[0].grower_id, kept);
    let numbers: Vec<_> = result.growers[0]
        .lines
        .iter()
        .map(|l| l.receipt_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["R-1"]);
}

#[tokio::test]
async fn invalid_round_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine.test_run(&run_cmd(4)).await.unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn cancelled_run_records_a_critical_error() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let grower_id = grower(&db, "G001", false).await;
    receipt(&db, "R-1", grower_id, "2025-06-01").await;

    let token = CancellationToken::new();
    token.cancel();
    let result = engine
        .actual_run_with(&run_cmd(1), RunOptions::default().cancellation(token))
        .await
        .unwrap();

    assert!(!result.success);
    assert!(result.has_critical_error());
    let batch = result.created_batch.unwrap();
    assert_eq!(batch.receipt_count, 0);
}

#[tokio::test]
async fn progress_is_reported_per_grower() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    for number in ["G001", "G002", "G003"] {
        let grower_id = grower(&db, number, false).await;
        receipt(&db, &format!("R-{number}"), grower_id, "2025-06-01").await;
    }

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let result = engine
        .test_run_with(
            &run_cmd(1),
            RunOptions::default().on_progress(move |progress| {
                assert_eq!(progress.total, 3);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn unreadable_receipt_fails_only_its_grower() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let good = grower(&db, "G001", false).await;
    let bad = grower(&db, "G002", false).await;
    receipt(&db, "R-1", good, "2025-06-01").await;
    let unreadable = receipt_for(&db, "R-2", bad, PRODUCT, "2025-06-01", "abc").await;

    let result = engine.actual_run(&run_cmd(1)).await.unwrap();

    assert!(!result.success);
    assert!(!result.has_critical_error());
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.kind, RunErrorKind::Calculation);
    assert_eq!(error.grower_id, Some(bad));
    assert_eq!(error.receipt_id, Some(unreadable));
    assert!(error.message.contains("net weight"), "{}", error.message);

    let outcomes: Vec<_> = result
        .growers
        .iter()
        .map(|g| (g.grower_id, g.outcome.clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![(good, GrowerOutcome::Paid), (bad, GrowerOutcome::Failed)]
    );
    let batch = result.created_batch.unwrap();
    assert_eq!(batch.grower_count, 1);
    assert_eq!(batch.total_amount, cents(108_00));
}

#[tokio::test]
async fn unreadable_grower_is_skipped_and_reported() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let good = grower(&db, "G001", false).await;
    let bad = grower(&db, "G002", false).await;
    receipt(&db, "R-1", good, "2025-06-01").await;
    receipt(&db, "R-2", bad, "2025-06-01").await;
    execute(
        &db,
        "UPDATE growers SET currency = 'EUR' WHERE id = ?",
        vec![bad.into()],
    )
    .await;

    let result = engine.test_run(&run_cmd(1)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, RunErrorKind::Calculation);
    assert_eq!(result.errors[0].grower_id, Some(bad));
    assert_eq!(result.errors[0].receipt_id, None);
    assert!(result.errors[0].message.contains("EUR"));
    assert_eq!(result.growers.len(), 1);
    assert_eq!(result.growers[0].grower_id, good);
    assert_eq!(result.total_amount, cents(108_00));
}

#[tokio::test]
async fn unreadable_price_table_fails_only_the_receipts_it_prices() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let broken = price_table(&db, 2, PROCESS, "2025-01-01", "n/a", None, "0.02").await;
    price_entry(&db, broken, 1, "1.00").await;
    let first = grower(&db, "G001", false).await;
    let second = grower(&db, "G002", false).await;
    let unpriced = receipt_for(&db, "R-1", first, 2, "2025-06-01", "100").await;
    receipt(&db, "R-2", second, "2025-06-01").await;

    let result = engine.test_run(&run_cmd(1)).await.unwrap();

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, RunErrorKind::Calculation);
    assert_eq!(result.errors[0].receipt_id, Some(unpriced));
    assert!(result.errors[0].message.contains("time premium"));
    assert_eq!(result.paid_growers().count(), 1);
    assert_eq!(result.total_amount, cents(108_00));
}

#[tokio::test]
async fn failed_grower_is_rolled_back_while_others_are_paid() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let first = grower(&db, "G001", false).await;
    let failing = grower(&db, "G002", false).await;
    let third = grower(&db, "G003", false).await;
    receipt(&db, "R-1", first, "2025-06-01").await;
    let rolled_back = receipt(&db, "R-2", failing, "2025-06-01").await;
    receipt(&db, "R-3", third, "2025-06-01").await;
    execute(
        &db,
        &format!(
            "CREATE TRIGGER reject_lines BEFORE INSERT ON payment_lines WHEN NEW.grower_id = {failing} BEGIN SELECT RAISE(ABORT, 'rejected'); END"
        ),
        vec![],
    )
    .await;

    let result = engine.actual_run(&run_cmd(1)).await.unwrap();

    assert!(!result.success);
    assert!(!result.has_critical_error());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, RunErrorKind::Persistence);
    assert_eq!(result.errors[0].grower_id, Some(failing));

    let outcomes: Vec<_> = result
        .growers
        .iter()
        .map(|g| (g.grower_id, g.outcome.clone()))
        .collect();
    assert_eq!(
        outcomes,
        vec![
            (first, GrowerOutcome::Paid),
            (failing, GrowerOutcome::Failed),
            (third, GrowerOutcome::Paid)
        ]
    );

    assert_eq!(
        count(
            &db,
            &format!("SELECT COUNT(*) FROM receipt_payment_allocations WHERE receipt_id = {rolled_back}")
        )
        .await,
        0
    );
    assert_eq!(
        count(
            &db,
            &format!("SELECT COUNT(*) FROM receipts WHERE id = {rolled_back} AND advance1_batch_id IS NOT NULL")
        )
        .await,
        0
    );
    let batch = result.created_batch.unwrap();
    assert_eq!(batch.grower_count, 2);
    assert_eq!(batch.receipt_count, 2);
    assert_eq!(batch.total_amount, cents(2 * 108_00));
}
