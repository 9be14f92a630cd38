//! Payment run results.
//!
//! A run collects its failures instead of stopping at the first one. A
//! receipt that cannot be priced is reported and skipped; a grower whose
//! payments cannot be stored is reported and the run moves on. Only a
//! critical failure stops the run, and even then every grower committed
//! before it stays committed. The `run_id` stored on the batch ties a
//! partially paid batch back to the run (and its log span) that wrote it.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{AdvanceRound, MoneyCents, PaymentBatch, ReceiptAmounts};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Calculate only; nothing is written.
    Test,
    /// Calculate and pay into a new Draft batch.
    Actual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunErrorKind {
    Calculation,
    Persistence,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunError {
    pub kind: RunErrorKind,
    pub grower_id: Option<i64>,
    pub receipt_id: Option<i64>,
    pub message: String,
}

impl RunError {
    pub(crate) fn calculation(
        grower_id: i64,
        receipt_id: Option<i64>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: RunErrorKind::Calculation,
            grower_id: Some(grower_id),
            receipt_id,
            message: message.into(),
        }
    }

    pub(crate) fn persistence(grower_id: i64, message: impl Into<String>) -> Self {
        Self {
            kind: RunErrorKind::Persistence,
            grower_id: Some(grower_id),
            receipt_id: None,
            message: message.into(),
        }
    }

    pub(crate) fn critical(message: impl Into<String>) -> Self {
        Self {
            kind: RunErrorKind::Critical,
            grower_id: None,
            receipt_id: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(grower_id) = self.grower_id {
            write!(f, " grower {grower_id}")?;
        }
        if let Some(receipt_id) = self.receipt_id {
            write!(f, " receipt {receipt_id}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// One priced receipt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub receipt_id: i64,
    pub receipt_number: String,
    pub receipt_date: NaiveDate,
    pub price_table_id: i64,
    pub net_weight: Decimal,
    pub amounts: ReceiptAmounts,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GrowerOutcome {
    /// Priced (test run) or paid (actual run).
    Paid,
    /// On hold and not included in the run.
    OnHold,
    /// Nothing stored for the grower; see the run errors.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GrowerRun {
    pub grower_id: i64,
    pub grower_number: String,
    pub grower_name: String,
    pub outcome: GrowerOutcome,
    pub lines: Vec<ReceiptLine>,
    pub total: MoneyCents,
}

impl GrowerRun {
    pub(crate) fn total_of(lines: &[ReceiptLine]) -> MoneyCents {
        lines.iter().map(|line| line.amounts.net()).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub round: AdvanceRound,
    /// `true` iff no error was recorded. A run with nothing to pay succeeds.
    pub success: bool,
    pub errors: Vec<RunError>,
    pub growers: Vec<GrowerRun>,
    pub created_batch: Option<PaymentBatch>,
    pub total_amount: MoneyCents,
    pub receipt_count: usize,
}

impl RunResult {
    pub(crate) fn new(run_id: Uuid, mode: RunMode, round: AdvanceRound) -> Self {
        Self {
            run_id,
            mode,
            round,
            success: true,
            errors: Vec::new(),
            growers: Vec::new(),
            created_batch: None,
            total_amount: MoneyCents::ZERO,
            receipt_count: 0,
        }
    }

    pub(crate) fn record(&mut self, error: RunError) {
        tracing::warn!(run_id = %self.run_id, %error, "payment run error");
        self.success = false;
        self.errors.push(error);
    }

    /// Growers whose receipts were paid (or would be, for a test run).
    pub fn paid_growers(&self) -> impl Iterator<Item = &GrowerRun> {
        self.growers
            .iter()
            .filter(|grower| grower.outcome == GrowerOutcome::Paid)
    }

    #[must_use]
    pub fn has_critical_error(&self) -> bool {
        self.errors
            .iter()
            .any(|error| error.kind == RunErrorKind::Critical)
    }
}

/// Progress report sent after each grower.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunProgress {
    pub processed: usize,
    pub total: usize,
    pub grower_id: i64,
    pub message: String,
}

type ProgressFn = Box<dyn Fn(&RunProgress) + Send + Sync>;

/// Cancellation and progress hooks for a run.
#[derive(Default)]
pub struct RunOptions {
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) progress: Option<ProgressFn>,
}

impl RunOptions {
    /// Checked before each grower. Growers already processed stay committed.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn on_progress(mut self, callback: impl Fn(&RunProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn report(&self, progress: RunProgress) {
        if let Some(callback) = &self.progress {
            callback(&progress);
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("cancel", &self.cancel)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
