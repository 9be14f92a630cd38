//! Command structs for engine operations.
//!
//! These types group parameters for write operations (batch creation, payment
//! runs, advances), keeping call sites readable and avoiding long argument
//! lists. Every mutating command carries the [`Actor`] performing it.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{MoneyCents, PaymentType};

/// Who performs an operation, and when.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub at: DateTime<Utc>,
}

impl Actor {
    /// Actor acting now.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::at(name, Utc::now())
    }

    #[must_use]
    pub fn at(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            at,
        }
    }
}

/// Create an empty Draft batch.
#[derive(Clone, Debug)]
pub struct CreateBatchCmd {
    pub payment_type: PaymentType,
    pub crop_year: i32,
    pub batch_date: NaiveDate,
    pub cutoff_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub actor: Actor,
}

impl CreateBatchCmd {
    #[must_use]
    pub fn new(
        payment_type: PaymentType,
        crop_year: i32,
        batch_date: NaiveDate,
        actor: Actor,
    ) -> Self {
        Self {
            payment_type,
            crop_year,
            batch_date,
            cutoff_date: None,
            notes: None,
            actor,
        }
    }

    #[must_use]
    pub fn cutoff_date(mut self, cutoff_date: NaiveDate) -> Self {
        self.cutoff_date = Some(cutoff_date);
        self
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Receipts left out of a payment run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionFilters {
    pub grower_ids: Vec<i64>,
    pub product_ids: Vec<i64>,
    pub process_ids: Vec<i64>,
    /// Pay growers that are on hold instead of skipping them.
    pub include_on_hold: bool,
}

impl ExclusionFilters {
    #[must_use]
    pub fn excludes(&self, grower_id: i64, product_id: i64, process_id: i64) -> bool {
        self.grower_ids.contains(&grower_id)
            || self.product_ids.contains(&product_id)
            || self.process_ids.contains(&process_id)
    }
}

/// Calculate (and, for an actual run, pay) one advance round.
#[derive(Clone, Debug)]
pub struct PaymentRunCmd {
    /// Advance round number; anything outside 1..=3 is rejected.
    pub round: u8,
    pub crop_year: i32,
    pub payment_date: NaiveDate,
    pub cutoff_date: NaiveDate,
    pub filters: ExclusionFilters,
    pub actor: Actor,
}

impl PaymentRunCmd {
    #[must_use]
    pub fn new(
        round: u8,
        crop_year: i32,
        payment_date: NaiveDate,
        cutoff_date: NaiveDate,
        actor: Actor,
    ) -> Self {
        Self {
            round,
            crop_year,
            payment_date,
            cutoff_date,
            filters: ExclusionFilters::default(),
            actor,
        }
    }

    #[must_use]
    pub fn filters(mut self, filters: ExclusionFilters) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn exclude_grower(mut self, grower_id: i64) -> Self {
        self.filters.grower_ids.push(grower_id);
        self
    }

    #[must_use]
    pub fn exclude_product(mut self, product_id: i64) -> Self {
        self.filters.product_ids.push(product_id);
        self
    }

    #[must_use]
    pub fn exclude_process(mut self, process_id: i64) -> Self {
        self.filters.process_ids.push(process_id);
        self
    }

    #[must_use]
    pub fn include_on_hold(mut self, include: bool) -> Self {
        self.filters.include_on_hold = include;
        self
    }
}

/// Issue a cash advance to a grower.
#[derive(Clone, Debug)]
pub struct NewAdvanceCmd {
    pub grower_id: i64,
    pub amount: MoneyCents,
    pub advance_date: NaiveDate,
    pub notes: Option<String>,
    pub actor: Actor,
}

impl NewAdvanceCmd {
    #[must_use]
    pub fn new(grower_id: i64, amount: MoneyCents, advance_date: NaiveDate, actor: Actor) -> Self {
        Self {
            grower_id,
            amount,
            advance_date,
            notes: None,
            actor,
        }
    }

    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}
