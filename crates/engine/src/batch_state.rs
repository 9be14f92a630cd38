//! Compile-time checked batch lifecycle.
//!
//! ```text
//! Draft ──► Approved ──► Posted ──► Finalized
//!   └──────────┴───────────┴───────────┴──► Voided
//! ```
//!
//! A [`Batch<S>`] only exposes the transitions legal from `S`, so approving a
//! posted batch does not compile. Batches loaded from storage come back as
//! [`AnyBatch`] and are matched on to reach the typed form.

use std::marker::PhantomData;

use serde::Serialize;

use crate::{Actor, BatchStatus, PaymentBatch};

mod sealed {
    pub trait Sealed {}
}

/// Marker for a non-voided batch state.
pub trait BatchState: sealed::Sealed {
    const STATUS: BatchStatus;
}

#[derive(Clone, Copy, Debug)]
pub struct Draft;
#[derive(Clone, Copy, Debug)]
pub struct Approved;
#[derive(Clone, Copy, Debug)]
pub struct Posted;
#[derive(Clone, Copy, Debug)]
pub struct Finalized;

macro_rules! batch_state {
    ($marker:ident, $status:expr) => {
        impl sealed::Sealed for $marker {}
        impl BatchState for $marker {
            const STATUS: BatchStatus = $status;
        }
    };
}

batch_state!(Draft, BatchStatus::Draft);
batch_state!(Approved, BatchStatus::Approved);
batch_state!(Posted, BatchStatus::Posted);
batch_state!(Finalized, BatchStatus::Finalized);

#[derive(Clone, Debug)]
pub struct Batch<S: BatchState> {
    record: PaymentBatch,
    _state: PhantomData<S>,
}

impl<S: BatchState> Batch<S> {
    fn wrap(record: PaymentBatch) -> Self {
        Self {
            record,
            _state: PhantomData,
        }
    }

    fn advance<T: BatchState>(mut self) -> Batch<T> {
        self.record.status = T::STATUS;
        Batch::wrap(self.record)
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.record.id
    }

    #[must_use]
    pub fn record(&self) -> &PaymentBatch {
        &self.record
    }

    #[must_use]
    pub fn into_record(self) -> PaymentBatch {
        self.record
    }

    /// Voids the batch from any live state. The batch is soft-deleted and
    /// the reason is appended to its audit notes.
    #[must_use]
    pub fn void(self, actor: &Actor, reason: &str) -> PaymentBatch {
        let mut record = self.record;
        record.status = BatchStatus::Voided;
        record.voided_by = Some(actor.name.clone());
        record.voided_at = Some(actor.at);
        record.deleted_at = Some(actor.at);
        record.append_note(actor.at, &format!("Voided by {}: {reason}", actor.name));
        record
    }
}

impl Batch<Draft> {
    pub(crate) fn new(record: PaymentBatch) -> Self {
        Self::wrap(record)
    }

    #[must_use]
    pub fn approve(self, actor: &Actor) -> Batch<Approved> {
        let mut batch = self.advance::<Approved>();
        batch.record.approved_by = Some(actor.name.clone());
        batch.record.approved_at = Some(actor.at);
        batch
    }
}

impl Batch<Approved> {
    #[must_use]
    pub fn post(self, actor: &Actor) -> Batch<Posted> {
        let mut batch = self.advance::<Posted>();
        batch.record.posted_by = Some(actor.name.clone());
        batch.record.posted_at = Some(actor.at);
        batch
    }
}

impl Batch<Posted> {
    #[must_use]
    pub fn finalize(self, actor: &Actor) -> Batch<Finalized> {
        let mut batch = self.advance::<Finalized>();
        batch.record.finalized_by = Some(actor.name.clone());
        batch.record.finalized_at = Some(actor.at);
        batch
    }
}

/// A batch whose state is only known at runtime.
#[derive(Clone, Debug)]
pub enum AnyBatch {
    Draft(Batch<Draft>),
    Approved(Batch<Approved>),
    Posted(Batch<Posted>),
    Finalized(Batch<Finalized>),
    Voided(PaymentBatch),
}

impl AnyBatch {
    #[must_use]
    pub fn status(&self) -> BatchStatus {
        self.record().status
    }

    #[must_use]
    pub fn record(&self) -> &PaymentBatch {
        match self {
            Self::Draft(batch) => batch.record(),
            Self::Approved(batch) => batch.record(),
            Self::Posted(batch) => batch.record(),
            Self::Finalized(batch) => batch.record(),
            Self::Voided(record) => record,
        }
    }

    #[must_use]
    pub fn into_record(self) -> PaymentBatch {
        match self {
            Self::Draft(batch) => batch.into_record(),
            Self::Approved(batch) => batch.into_record(),
            Self::Posted(batch) => batch.into_record(),
            Self::Finalized(batch) => batch.into_record(),
            Self::Voided(record) => record,
        }
    }
}

impl From<PaymentBatch> for AnyBatch {
    fn from(record: PaymentBatch) -> Self {
        match record.status {
            BatchStatus::Draft => Self::Draft(Batch::wrap(record)),
            BatchStatus::Approved => Self::Approved(Batch::wrap(record)),
            BatchStatus::Posted => Self::Posted(Batch::wrap(record)),
            BatchStatus::Finalized => Self::Finalized(Batch::wrap(record)),
            BatchStatus::Voided => Self::Voided(record),
        }
    }
}

/// Outcome of a lifecycle transition requested on a stored batch.
///
/// Asking for a transition the batch's current state does not allow is not an
/// error: the request is refused and nothing is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    Applied(PaymentBatch),
    Refused {
        batch_id: i64,
        status: BatchStatus,
        reason: String,
    },
}

impl Transition {
    pub(crate) fn refused(record: &PaymentBatch, expected: BatchStatus, action: &str) -> Self {
        Self::Refused {
            batch_id: record.id,
            status: record.status,
            reason: format!(
                "cannot {action} batch {}: status is {}, expected {expected}",
                record.batch_number, record.status
            ),
        }
    }

    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    /// The updated batch, if the transition was applied.
    #[must_use]
    pub fn batch(&self) -> Option<&PaymentBatch> {
        match self {
            Self::Applied(batch) => Some(batch),
            Self::Refused { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::{MoneyCents, PaymentType};

    fn draft_record() -> PaymentBatch {
        let at = Utc.with_ymd_and_hms(2025, 8, 1, 9, 0, 0).unwrap();
        PaymentBatch {
            id: 4,
            batch_number: "ADV1-2025-001".to_string(),
            payment_type: PaymentType::Advance1,
            crop_year: 2025,
            batch_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            cutoff_date: None,
            status: BatchStatus::Draft,
            total_amount: MoneyCents::ZERO,
            grower_count: 0,
            receipt_count: 0,
            run_id: None,
            notes: None,
            created_by: "clerk".to_string(),
            created_at: at,
            approved_by: None,
            approved_at: None,
            posted_by: None,
            posted_at: None,
            finalized_by: None,
            finalized_at: None,
            voided_by: None,
            voided_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn transitions_fill_audit_columns() {
        let actor = Actor::at("manager", Utc.with_ymd_and_hms(2025, 8, 2, 10, 0, 0).unwrap());
        let finalized = Batch::new(draft_record())
            .approve(&actor)
            .post(&actor)
            .finalize(&actor)
            .into_record();

        assert_eq!(finalized.status, BatchStatus::Finalized);
        assert_eq!(finalized.approved_by.as_deref(), Some("manager"));
        assert_eq!(finalized.posted_at, Some(actor.at));
        assert_eq!(finalized.finalized_at, Some(actor.at));
    }

    #[test]
    fn void_soft_deletes_and_notes_reason() {
        let actor = Actor::at("manager", Utc.with_ymd_and_hms(2025, 8, 2, 10, 0, 0).unwrap());
        let voided = Batch::new(draft_record()).void(&actor, "wrong cutoff");

        assert_eq!(voided.status, BatchStatus::Voided);
        assert_eq!(voided.deleted_at, Some(actor.at));
        assert_eq!(
            voided.notes.as_deref(),
            Some("[2025-08-02 10:00:00] Voided by manager: wrong cutoff")
        );
    }

    #[test]
    fn stored_status_selects_the_typed_state() {
        let mut record = draft_record();
        record.status = BatchStatus::Posted;
        assert!(matches!(AnyBatch::from(record.clone()), AnyBatch::Posted(_)));

        let refused = Transition::refused(&record, BatchStatus::Draft, "approve");
        assert!(!refused.is_applied());
        let Transition::Refused { reason, .. } = refused else {
            panic!("expected refusal");
        };
        assert_eq!(
            reason,
            "cannot approve batch ADV1-2025-001: status is Posted, expected Draft"
        );
    }
}
