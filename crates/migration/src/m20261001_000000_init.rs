//! Initial schema migration.
//!
//! Creates the complete schema for the advance-payment engine:
//!
//! - `growers`: payees with currency, price level and hold flag
//! - `price_tables` / `price_table_entries`: advance price schedules
//! - `receipts`: weigh-in records with per-round advance tracking
//! - `payment_batches`: dated payment groups with lifecycle status
//! - `receipt_payment_allocations`: receipt ↔ batch payments
//! - `payment_lines`: per-receipt payment components written by a run
//! - `cheques`: batch cheques generated when a batch is posted
//! - `advance_cheques` / `advance_deductions`: cash advances and their recovery
//! - `grower_accounts`: grower ledger entries written at post time
//! - `price_schedule_locks`: price tables locked by posted batches

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Growers {
    Table,
    Id,
    Number,
    Name,
    Currency,
    PriceLevel,
    OnHold,
    DeletedAt,
}

#[derive(Iden)]
enum PriceTables {
    Table,
    Id,
    ProductId,
    ProcessId,
    EffectiveFrom,
    TimePremium,
    PremiumCutoffTime,
    MarketingDeductionRate,
}

#[derive(Iden)]
enum PriceTableEntries {
    Table,
    Id,
    PriceTableId,
    Round,
    Currency,
    PriceLevel,
    Grade,
    Price,
}

#[derive(Iden)]
enum Receipts {
    Table,
    Id,
    ReceiptNumber,
    GrowerId,
    ProductId,
    ProcessId,
    ReceiptDate,
    ReceiptTime,
    NetWeight,
    Grade,
    PriceTableId,
    IsVoided,
    DeletedAt,
    Advance1BatchId,
    Advance1Price,
    Advance1PaidOn,
    Advance2BatchId,
    Advance2Price,
    Advance2PaidOn,
    Advance3BatchId,
    Advance3Price,
    Advance3PaidOn,
}

#[derive(Iden)]
enum PaymentBatches {
    Table,
    Id,
    BatchNumber,
    PaymentType,
    CropYear,
    BatchDate,
    CutoffDate,
    Status,
    TotalAmount,
    GrowerCount,
    ReceiptCount,
    RunId,
    Notes,
    CreatedBy,
    CreatedAt,
    ApprovedBy,
    ApprovedAt,
    PostedBy,
    PostedAt,
    FinalizedBy,
    FinalizedAt,
    VoidedBy,
    VoidedAt,
    DeletedAt,
}

#[derive(Iden)]
enum ReceiptPaymentAllocations {
    Table,
    Id,
    ReceiptId,
    PaymentBatchId,
    PaymentType,
    PriceTableId,
    PricePerUnit,
    Quantity,
    Amount,
    Status,
    CreatedBy,
    CreatedAt,
    VoidedBy,
    VoidedAt,
}

#[derive(Iden)]
enum PaymentLines {
    Table,
    Id,
    PaymentBatchId,
    AllocationId,
    ReceiptId,
    GrowerId,
    Kind,
    Amount,
    VoidedAt,
}

#[derive(Iden)]
enum Cheques {
    Table,
    Id,
    ChequeNumber,
    PaymentBatchId,
    GrowerId,
    GrossAmount,
    DeductedAmount,
    NetAmount,
    Status,
    CreatedBy,
    CreatedAt,
    IssuedAt,
    VoidedBy,
    VoidedAt,
}

#[derive(Iden)]
enum AdvanceCheques {
    Table,
    Id,
    GrowerId,
    AdvanceDate,
    OriginalAmount,
    CurrentAmount,
    TotalDeducted,
    Status,
    Notes,
    CreatedBy,
    CreatedAt,
    VoidedBy,
    VoidedAt,
}

#[derive(Iden)]
enum AdvanceDeductions {
    Table,
    Id,
    AdvanceChequeId,
    GrowerId,
    PaymentBatchId,
    Amount,
    StatusBefore,
    Status,
    DeductionDate,
    CreatedBy,
    CreatedAt,
    ReversedBy,
    ReversedAt,
}

#[derive(Iden)]
enum GrowerAccounts {
    Table,
    Id,
    GrowerId,
    PaymentBatchId,
    ReceiptId,
    AllocationId,
    TransactionType,
    Description,
    Debit,
    Credit,
    EntryDate,
    CreatedBy,
    CreatedAt,
    DeletedBy,
    DeletedAt,
}

#[derive(Iden)]
enum PriceScheduleLocks {
    Table,
    Id,
    PriceTableId,
    PaymentBatchId,
    PaymentType,
    LockedBy,
    LockedAt,
    DeletedBy,
    DeletedAt,
}

fn id_col<T: IntoIden + 'static>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Growers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Growers::Table)
                    .if_not_exists()
                    .col(&mut id_col(Growers::Id))
                    .col(ColumnDef::new(Growers::Number).string().not_null())
                    .col(ColumnDef::new(Growers::Name).string().not_null())
                    .col(
                        ColumnDef::new(Growers::Currency)
                            .string()
                            .not_null()
                            .default("CAD"),
                    )
                    .col(
                        ColumnDef::new(Growers::PriceLevel)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Growers::OnHold)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Growers::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-growers-number-unique")
                    .table(Growers::Table)
                    .col(Growers::Number)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Price tables
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PriceTables::Table)
                    .if_not_exists()
                    .col(&mut id_col(PriceTables::Id))
                    .col(ColumnDef::new(PriceTables::ProductId).integer().not_null())
                    .col(ColumnDef::new(PriceTables::ProcessId).integer().not_null())
                    .col(ColumnDef::new(PriceTables::EffectiveFrom).date().not_null())
                    .col(
                        ColumnDef::new(PriceTables::TimePremium)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .col(ColumnDef::new(PriceTables::PremiumCutoffTime).time())
                    .col(
                        ColumnDef::new(PriceTables::MarketingDeductionRate)
                            .string()
                            .not_null()
                            .default("0"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-price_tables-product-process-effective")
                    .table(PriceTables::Table)
                    .col(PriceTables::ProductId)
                    .col(PriceTables::ProcessId)
                    .col(PriceTables::EffectiveFrom)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PriceTableEntries::Table)
                    .if_not_exists()
                    .col(&mut id_col(PriceTableEntries::Id))
                    .col(
                        ColumnDef::new(PriceTableEntries::PriceTableId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PriceTableEntries::Round).integer().not_null())
                    .col(ColumnDef::new(PriceTableEntries::Currency).string().not_null())
                    .col(
                        ColumnDef::new(PriceTableEntries::PriceLevel)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PriceTableEntries::Grade).integer().not_null())
                    .col(ColumnDef::new(PriceTableEntries::Price).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-price_table_entries-price_table_id")
                            .from(PriceTableEntries::Table, PriceTableEntries::PriceTableId)
                            .to(PriceTables::Table, PriceTables::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-price_table_entries-lookup-unique")
                    .table(PriceTableEntries::Table)
                    .col(PriceTableEntries::PriceTableId)
                    .col(PriceTableEntries::Round)
                    .col(PriceTableEntries::Currency)
                    .col(PriceTableEntries::PriceLevel)
                    .col(PriceTableEntries::Grade)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Receipts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Receipts::Table)
                    .if_not_exists()
                    .col(&mut id_col(Receipts::Id))
                    .col(ColumnDef::new(Receipts::ReceiptNumber).string().not_null())
                    .col(ColumnDef::new(Receipts::GrowerId).integer().not_null())
                    .col(ColumnDef::new(Receipts::ProductId).integer().not_null())
                    .col(ColumnDef::new(Receipts::ProcessId).integer().not_null())
                    .col(ColumnDef::new(Receipts::ReceiptDate).date().not_null())
                    .col(ColumnDef::new(Receipts::ReceiptTime).time())
                    .col(ColumnDef::new(Receipts::NetWeight).string().not_null())
                    .col(ColumnDef::new(Receipts::Grade).integer().not_null().default(1))
                    .col(ColumnDef::new(Receipts::PriceTableId).integer())
                    .col(
                        ColumnDef::new(Receipts::IsVoided)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Receipts::DeletedAt).timestamp())
                    .col(ColumnDef::new(Receipts::Advance1BatchId).integer())
                    .col(ColumnDef::new(Receipts::Advance1Price).string())
                    .col(ColumnDef::new(Receipts::Advance1PaidOn).date())
                    .col(ColumnDef::new(Receipts::Advance2BatchId).integer())
                    .col(ColumnDef::new(Receipts::Advance2Price).string())
                    .col(ColumnDef::new(Receipts::Advance2PaidOn).date())
                    .col(ColumnDef::new(Receipts::Advance3BatchId).integer())
                    .col(ColumnDef::new(Receipts::Advance3Price).string())
                    .col(ColumnDef::new(Receipts::Advance3PaidOn).date())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-receipts-grower_id")
                            .from(Receipts::Table, Receipts::GrowerId)
                            .to(Growers::Table, Growers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-receipts-grower_id-receipt_date")
                    .table(Receipts::Table)
                    .col(Receipts::GrowerId)
                    .col(Receipts::ReceiptDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Payment batches
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PaymentBatches::Table)
                    .if_not_exists()
                    .col(&mut id_col(PaymentBatches::Id))
                    .col(ColumnDef::new(PaymentBatches::BatchNumber).string().not_null())
                    .col(ColumnDef::new(PaymentBatches::PaymentType).string().not_null())
                    .col(ColumnDef::new(PaymentBatches::CropYear).integer().not_null())
                    .col(ColumnDef::new(PaymentBatches::BatchDate).date().not_null())
                    .col(ColumnDef::new(PaymentBatches::CutoffDate).date())
                    .col(ColumnDef::new(PaymentBatches::Status).string().not_null())
                    .col(
                        ColumnDef::new(PaymentBatches::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PaymentBatches::GrowerCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PaymentBatches::ReceiptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PaymentBatches::RunId).string())
                    .col(ColumnDef::new(PaymentBatches::Notes).text())
                    .col(ColumnDef::new(PaymentBatches::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(PaymentBatches::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentBatches::ApprovedBy).string())
                    .col(ColumnDef::new(PaymentBatches::ApprovedAt).timestamp())
                    .col(ColumnDef::new(PaymentBatches::PostedBy).string())
                    .col(ColumnDef::new(PaymentBatches::PostedAt).timestamp())
                    .col(ColumnDef::new(PaymentBatches::FinalizedBy).string())
                    .col(ColumnDef::new(PaymentBatches::FinalizedAt).timestamp())
                    .col(ColumnDef::new(PaymentBatches::VoidedBy).string())
                    .col(ColumnDef::new(PaymentBatches::VoidedAt).timestamp())
                    .col(ColumnDef::new(PaymentBatches::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payment_batches-batch_number-unique")
                    .table(PaymentBatches::Table)
                    .col(PaymentBatches::BatchNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Allocations and payment lines
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ReceiptPaymentAllocations::Table)
                    .if_not_exists()
                    .col(&mut id_col(ReceiptPaymentAllocations::Id))
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::ReceiptId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::PaymentBatchId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::PaymentType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReceiptPaymentAllocations::PriceTableId).integer())
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::PricePerUnit)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::Quantity)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::Status)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReceiptPaymentAllocations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ReceiptPaymentAllocations::VoidedBy).string())
                    .col(ColumnDef::new(ReceiptPaymentAllocations::VoidedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-allocations-receipt_id")
                            .from(
                                ReceiptPaymentAllocations::Table,
                                ReceiptPaymentAllocations::ReceiptId,
                            )
                            .to(Receipts::Table, Receipts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-allocations-payment_batch_id")
                            .from(
                                ReceiptPaymentAllocations::Table,
                                ReceiptPaymentAllocations::PaymentBatchId,
                            )
                            .to(PaymentBatches::Table, PaymentBatches::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-allocations-receipt_id-status")
                    .table(ReceiptPaymentAllocations::Table)
                    .col(ReceiptPaymentAllocations::ReceiptId)
                    .col(ReceiptPaymentAllocations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-allocations-payment_batch_id")
                    .table(ReceiptPaymentAllocations::Table)
                    .col(ReceiptPaymentAllocations::PaymentBatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentLines::Table)
                    .if_not_exists()
                    .col(&mut id_col(PaymentLines::Id))
                    .col(
                        ColumnDef::new(PaymentLines::PaymentBatchId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentLines::AllocationId).integer().not_null())
                    .col(ColumnDef::new(PaymentLines::ReceiptId).integer().not_null())
                    .col(ColumnDef::new(PaymentLines::GrowerId).integer().not_null())
                    .col(ColumnDef::new(PaymentLines::Kind).string().not_null())
                    .col(ColumnDef::new(PaymentLines::Amount).big_integer().not_null())
                    .col(ColumnDef::new(PaymentLines::VoidedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_lines-allocation_id")
                            .from(PaymentLines::Table, PaymentLines::AllocationId)
                            .to(
                                ReceiptPaymentAllocations::Table,
                                ReceiptPaymentAllocations::Id,
                            ),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Batch cheques
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Cheques::Table)
                    .if_not_exists()
                    .col(&mut id_col(Cheques::Id))
                    .col(ColumnDef::new(Cheques::ChequeNumber).string().not_null())
                    .col(ColumnDef::new(Cheques::PaymentBatchId).integer().not_null())
                    .col(ColumnDef::new(Cheques::GrowerId).integer().not_null())
                    .col(ColumnDef::new(Cheques::GrossAmount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Cheques::DeductedAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Cheques::NetAmount).big_integer().not_null())
                    .col(ColumnDef::new(Cheques::Status).string().not_null())
                    .col(ColumnDef::new(Cheques::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Cheques::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Cheques::IssuedAt).timestamp())
                    .col(ColumnDef::new(Cheques::VoidedBy).string())
                    .col(ColumnDef::new(Cheques::VoidedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-cheques-payment_batch_id")
                            .from(Cheques::Table, Cheques::PaymentBatchId)
                            .to(PaymentBatches::Table, PaymentBatches::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cheques-cheque_number-unique")
                    .table(Cheques::Table)
                    .col(Cheques::ChequeNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Advance cheques and deductions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AdvanceCheques::Table)
                    .if_not_exists()
                    .col(&mut id_col(AdvanceCheques::Id))
                    .col(ColumnDef::new(AdvanceCheques::GrowerId).integer().not_null())
                    .col(ColumnDef::new(AdvanceCheques::AdvanceDate).date().not_null())
                    .col(
                        ColumnDef::new(AdvanceCheques::OriginalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdvanceCheques::CurrentAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdvanceCheques::TotalDeducted)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AdvanceCheques::Status).string().not_null())
                    .col(ColumnDef::new(AdvanceCheques::Notes).text())
                    .col(ColumnDef::new(AdvanceCheques::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(AdvanceCheques::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvanceCheques::VoidedBy).string())
                    .col(ColumnDef::new(AdvanceCheques::VoidedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-advance_cheques-grower_id")
                            .from(AdvanceCheques::Table, AdvanceCheques::GrowerId)
                            .to(Growers::Table, Growers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AdvanceDeductions::Table)
                    .if_not_exists()
                    .col(&mut id_col(AdvanceDeductions::Id))
                    .col(
                        ColumnDef::new(AdvanceDeductions::AdvanceChequeId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvanceDeductions::GrowerId).integer().not_null())
                    .col(
                        ColumnDef::new(AdvanceDeductions::PaymentBatchId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdvanceDeductions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdvanceDeductions::StatusBefore)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvanceDeductions::Status).string().not_null())
                    .col(
                        ColumnDef::new(AdvanceDeductions::DeductionDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdvanceDeductions::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AdvanceDeductions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AdvanceDeductions::ReversedBy).string())
                    .col(ColumnDef::new(AdvanceDeductions::ReversedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-advance_deductions-advance_cheque_id")
                            .from(AdvanceDeductions::Table, AdvanceDeductions::AdvanceChequeId)
                            .to(AdvanceCheques::Table, AdvanceCheques::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Grower ledger and price locks
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(GrowerAccounts::Table)
                    .if_not_exists()
                    .col(&mut id_col(GrowerAccounts::Id))
                    .col(ColumnDef::new(GrowerAccounts::GrowerId).integer().not_null())
                    .col(
                        ColumnDef::new(GrowerAccounts::PaymentBatchId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GrowerAccounts::ReceiptId).integer())
                    .col(ColumnDef::new(GrowerAccounts::AllocationId).integer())
                    .col(
                        ColumnDef::new(GrowerAccounts::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GrowerAccounts::Description).string().not_null())
                    .col(
                        ColumnDef::new(GrowerAccounts::Debit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GrowerAccounts::Credit)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GrowerAccounts::EntryDate).date().not_null())
                    .col(ColumnDef::new(GrowerAccounts::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(GrowerAccounts::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GrowerAccounts::DeletedBy).string())
                    .col(ColumnDef::new(GrowerAccounts::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-grower_accounts-payment_batch_id")
                    .table(GrowerAccounts::Table)
                    .col(GrowerAccounts::PaymentBatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PriceScheduleLocks::Table)
                    .if_not_exists()
                    .col(&mut id_col(PriceScheduleLocks::Id))
                    .col(
                        ColumnDef::new(PriceScheduleLocks::PriceTableId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceScheduleLocks::PaymentBatchId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceScheduleLocks::PaymentType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PriceScheduleLocks::LockedBy).string().not_null())
                    .col(
                        ColumnDef::new(PriceScheduleLocks::LockedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PriceScheduleLocks::DeletedBy).string())
                    .col(ColumnDef::new(PriceScheduleLocks::DeletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(PriceScheduleLocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GrowerAccounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvanceDeductions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdvanceCheques::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Cheques::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentLines::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ReceiptPaymentAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentBatches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Receipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PriceTableEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PriceTables::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Growers::Table).to_owned())
            .await?;
        Ok(())
    }
}
