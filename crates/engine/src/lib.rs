//! Advance-payment engine for grower receipts.
//!
//! The engine prices receipts across the three advance rounds, pays them into
//! payment batches, drives the batch lifecycle and recovers outstanding cash
//! advances from batch payments. Everything is persisted through sea-orm; the
//! schema lives in the `migration` crate.

pub use advance_cheques::{AdvanceCheque, AdvanceChequeStatus};
pub use advance_deductions::{AdvanceDeduction, DeductionStatus};
pub use allocations::{AllocationStatus, ReceiptPaymentAllocation};
pub use batch_state::{
    AnyBatch, Approved, Batch, BatchState, Draft, Finalized, Posted, Transition,
};
pub use cheques::{Cheque, ChequeStatus, format_cheque_number};
pub use commands::{Actor, CreateBatchCmd, ExclusionFilters, NewAdvanceCmd, PaymentRunCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use grower_accounts::{AccountTransactionType, GrowerAccountEntry};
pub use growers::Grower;
pub use money::{MoneyCents, round_money};
pub use ops::{BatchFilter, Engine, EngineBuilder};
pub use payment_batches::{
    BatchStatus, PaymentBatch, batch_number_prefix, format_batch_number, parse_batch_sequence,
};
pub use payment_types::{AdvanceRound, PaymentType};
pub use price_locks::PriceScheduleLock;
pub use price_tables::PriceTable;
pub use pricing::{
    AdvancePriceSource, ReceiptAmounts, RoundOneTerms, RoundPrices, round_advance_price,
    running_advance_price,
};
pub use receipts::{AdvancePaid, Receipt};
pub use runs::{
    GrowerOutcome, GrowerRun, ReceiptLine, RunError, RunErrorKind, RunMode, RunOptions,
    RunProgress, RunResult,
};
pub use sequence::{DependentAllocation, RemediationStep, VoidConflict, VoidValidation};
pub use waterfall::{
    DeductionPlan, DeductionResult, OutstandingAdvance, PlannedDeduction, plan_deductions,
};

mod advance_cheques;
mod advance_deductions;
mod allocations;
mod batch_state;
mod cheques;
mod commands;
mod currency;
mod error;
mod grower_accounts;
mod growers;
mod money;
mod number_sequences;
mod ops;
mod payment_batches;
mod payment_lines;
mod payment_types;
mod price_locks;
mod price_table_entries;
mod price_tables;
mod pricing;
mod receipts;
mod runs;
mod sequence;
mod util;
mod waterfall;

type ResultEngine<T> = Result<T, EngineError>;
