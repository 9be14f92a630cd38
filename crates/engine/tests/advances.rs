mod common;

use common::*;
use engine::{
    AccountTransactionType, AdvanceChequeStatus, CreateBatchCmd, DeductionStatus, EngineError,
    NewAdvanceCmd, PaymentType,
};

async fn issue(engine: &engine::Engine, grower_id: i64, amount: i64, day: u32) -> i64 {
    engine
        .issue_advance(NewAdvanceCmd::new(
            grower_id,
            cents(amount),
            date(2025, 6, day),
            actor(),
        ))
        .await
        .unwrap()
        .id
}

async fn draft_batch(engine: &engine::Engine) -> i64 {
    engine
        .create_batch(CreateBatchCmd::new(
            PaymentType::Advance1,
            2025,
            date(2025, 9, 1),
            actor(),
        ))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn issued_advance_is_active_and_outstanding() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;

    let advance = engine
        .issue_advance(
            NewAdvanceCmd::new(grower_id, cents(250_00), date(2025, 5, 1), actor())
                .notes("spring inputs"),
        )
        .await
        .unwrap();

    assert_eq!(advance.status, AdvanceChequeStatus::Active);
    assert_eq!(advance.original_amount, cents(250_00));
    assert_eq!(advance.current_amount, cents(250_00));
    assert!(advance.total_deducted.is_zero());
    assert_eq!(advance.notes.as_deref(), Some("spring inputs"));
    assert_eq!(engine.outstanding_advances(grower_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn issue_rejects_bad_amounts_and_unknown_growers() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;

    let err = engine
        .issue_advance(NewAdvanceCmd::new(grower_id, cents(0), date(2025, 5, 1), actor()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .issue_advance(NewAdvanceCmd::new(999, cents(10_00), date(2025, 5, 1), actor()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn waterfall_clears_the_oldest_advance_first() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;
    let newer = issue(&engine, grower_id, 50_00, 10).await;
    let older = issue(&engine, grower_id, 100_00, 1).await;
    let batch_id = draft_batch(&engine).await;

    let result = engine
        .apply_advance_deductions(grower_id, batch_id, cents(120_00), &actor())
        .await
        .unwrap();

    assert_eq!(result.total_deducted, cents(120_00));
    assert_eq!(result.deduction_count, 2);
    assert!(result.remaining_payment.is_zero());
    assert_eq!(result.deductions[0].advance_cheque_id, older);
    assert_eq!(result.deductions[0].amount, cents(100_00));
    assert_eq!(result.deductions[1].advance_cheque_id, newer);
    assert_eq!(result.deductions[1].amount, cents(20_00));

    let older = engine.advance(older).await.unwrap();
    assert_eq!(older.status, AdvanceChequeStatus::FullyDeducted);
    assert!(older.current_amount.is_zero());
    assert_eq!(older.total_deducted, cents(100_00));

    let newer = engine.advance(newer).await.unwrap();
    assert_eq!(newer.status, AdvanceChequeStatus::PartiallyDeducted);
    assert_eq!(newer.current_amount, cents(30_00));
    assert_eq!(newer.total_deducted, cents(20_00));

    let outstanding = engine.outstanding_advances(grower_id).await.unwrap();
    assert_eq!(outstanding.len(), 1);
    assert_eq!(outstanding[0].id, newer.id);
}

#[tokio::test]
async fn payment_beyond_outstanding_advances_is_left_with_the_grower() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;
    issue(&engine, grower_id, 30_00, 1).await;
    let batch_id = draft_batch(&engine).await;

    let result = engine
        .apply_advance_deductions(grower_id, batch_id, cents(100_00), &actor())
        .await
        .unwrap();

    assert_eq!(result.total_deducted, cents(30_00));
    assert_eq!(result.remaining_payment, cents(70_00));
    assert!(result.has_undeducted_remainder());
}

#[tokio::test]
async fn deductions_inside_a_dropped_transaction_are_discarded() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;
    let advance_id = issue(&engine, grower_id, 40_00, 1).await;
    let batch_id = draft_batch(&engine).await;

    {
        let db_tx = engine.begin().await.unwrap();
        let result = engine
            .apply_advance_deductions_in(&db_tx, grower_id, batch_id, cents(40_00), &actor())
            .await
            .unwrap();
        assert_eq!(result.total_deducted, cents(40_00));
    }

    let advance = engine.advance(advance_id).await.unwrap();
    assert_eq!(advance.current_amount, cents(40_00));
    assert!(engine.advance_deductions(advance_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn reversal_restores_balance_and_status() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;
    let advance_id = issue(&engine, grower_id, 100_00, 1).await;
    let batch_id = draft_batch(&engine).await;

    let result = engine
        .apply_advance_deductions(grower_id, batch_id, cents(100_00), &actor())
        .await
        .unwrap();
    let deduction = &result.deductions[0];
    assert_eq!(deduction.status_before, AdvanceChequeStatus::Active);
    assert_eq!(
        engine.advance(advance_id).await.unwrap().status,
        AdvanceChequeStatus::FullyDeducted
    );

    let restored = engine
        .reverse_advance_deduction(deduction.id, &actor())
        .await
        .unwrap();
    assert_eq!(restored.status, AdvanceChequeStatus::Active);
    assert_eq!(restored.current_amount, cents(100_00));
    assert!(restored.total_deducted.is_zero());

    let deductions = engine.advance_deductions(advance_id).await.unwrap();
    assert_eq!(deductions[0].status, DeductionStatus::Reversed);
    assert_eq!(deductions[0].reversed_by.as_deref(), Some("clerk"));

    let err = engine
        .reverse_advance_deduction(deduction.id, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn reversing_partial_deductions_steps_the_status_back() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;
    let advance_id = issue(&engine, grower_id, 100_00, 1).await;
    let batch_id = draft_batch(&engine).await;

    let first = engine
        .apply_advance_deductions(grower_id, batch_id, cents(10_00), &actor())
        .await
        .unwrap()
        .deductions[0]
        .clone();
    assert_eq!(
        engine.advance(advance_id).await.unwrap().status,
        AdvanceChequeStatus::PartiallyDeducted
    );
    let second = engine
        .apply_advance_deductions(grower_id, batch_id, cents(90_00), &actor())
        .await
        .unwrap()
        .deductions[0]
        .clone();
    assert_eq!(second.status_before, AdvanceChequeStatus::PartiallyDeducted);
    assert_eq!(
        engine.advance(advance_id).await.unwrap().status,
        AdvanceChequeStatus::FullyDeducted
    );

    let advance = engine
        .reverse_advance_deduction(second.id, &actor())
        .await
        .unwrap();
    assert_eq!(advance.status, AdvanceChequeStatus::PartiallyDeducted);
    assert_eq!(advance.current_amount, cents(90_00));
    assert_eq!(advance.total_deducted, cents(10_00));

    let advance = engine
        .reverse_advance_deduction(first.id, &actor())
        .await
        .unwrap();
    assert_eq!(advance.status, AdvanceChequeStatus::Active);
    assert_eq!(advance.current_amount, cents(100_00));
    assert!(advance.total_deducted.is_zero());
}

#[tokio::test]
async fn void_advance_is_refused_while_deductions_are_active() {
    let (engine, db) = engine_with_db().await;
    let grower_id = grower(&db, "G001", false).await;
    let advance_id = issue(&engine, grower_id, 100_00, 1).await;
    let batch_id = draft_batch(&engine).await;
    let result = engine
        .apply_advance_deductions(grower_id, batch_id, cents(10_00), &actor())
        .await
        .unwrap();

    let err = engine
        .void_advance(advance_id, "issued twice", &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    engine
        .reverse_advance_deduction(result.deductions[0].id, &actor())
        .await
        .unwrap();
    let voided = engine
        .void_advance(advance_id, "issued twice", &actor())
        .await
        .unwrap();
    assert_eq!(voided.status, AdvanceChequeStatus::Voided);
    assert!(voided.voided_at.is_some());
    assert!(voided.notes.unwrap().contains("issued twice"));
    assert!(engine.outstanding_advances(grower_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn posting_recovers_advances_and_voiding_gives_them_back() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let grower_id = grower(&db, "G001", false).await;
    receipt(&db, "R-1", grower_id, "2025-06-01").await;
    let advance_id = issue(&engine, grower_id, 50_00, 1).await;

    let batch = engine.actual_run(&run_cmd(1)).await.unwrap().created_batch.unwrap();
    engine.approve_batch(batch.id, &actor()).await.unwrap();
    engine.post_batch(batch.id, &actor()).await.unwrap();

    let cheque = &engine.batch_cheques(batch.id).await.unwrap()[0];
    assert_eq!(cheque.gross_amount, cents(108_00));
    assert_eq!(cheque.deducted_amount, cents(50_00));
    assert_eq!(cheque.net_amount, cents(58_00));

    let ledger = engine.batch_ledger(batch.id).await.unwrap();
    let repayment = ledger
        .iter()
        .find(|e| e.transaction_type == AccountTransactionType::AdvanceRepayment)
        .unwrap();
    assert_eq!(repayment.debit, cents(50_00));
    assert_eq!(
        engine.advance(advance_id).await.unwrap().status,
        AdvanceChequeStatus::FullyDeducted
    );

    engine.void_batch(batch.id, "posted too early", &actor()).await.unwrap();

    let advance = engine.advance(advance_id).await.unwrap();
    assert_eq!(advance.status, AdvanceChequeStatus::Active);
    assert_eq!(advance.current_amount, cents(50_00));
    assert!(
        engine
            .advance_deductions(advance_id)
            .await
            .unwrap()
            .iter()
            .all(|d| d.status == DeductionStatus::Reversed)
    );
}

#[tokio::test]
async fn advances_larger_than_the_payment_leave_no_cheque() {
    let (engine, db) = engine_with_db().await;
    standard_prices(&db).await;
    let grower_id = grower(&db, "G001", false).await;
    receipt(&db, "R-1", grower_id, "2025-06-01").await;
    let advance_id = issue(&engine, grower_id, 500_00, 1).await;

    let batch = engine.actual_run(&run_cmd(1)).await.unwrap().created_batch.unwrap();
    engine.approve_batch(batch.id, &actor()).await.unwrap();
    engine.post_batch(batch.id, &actor()).await.unwrap();

    assert!(engine.batch_cheques(batch.id).await.unwrap().is_empty());
    let advance = engine.advance(advance_id).await.unwrap();
    assert_eq!(advance.current_amount, cents(392_00));
    assert_eq!(advance.status, AdvanceChequeStatus::PartiallyDeducted);
}
