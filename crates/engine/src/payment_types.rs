//! Payment types and advance rounds.
//!
//! A payment batch always pays exactly one [`PaymentType`]. Advance types
//! carry a sequence number used by the void integrity check: a batch of
//! sequence `S` cannot be voided while a receipt in it is paid by a batch of
//! sequence `> S`.

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    #[serde(rename = "ADV1")]
    Advance1,
    #[serde(rename = "ADV2")]
    Advance2,
    #[serde(rename = "ADV3")]
    Advance3,
    #[serde(rename = "FINAL")]
    Final,
}

impl PaymentType {
    /// Code used in storage and in batch numbers (`ADV1-2025-001`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Advance1 => "ADV1",
            Self::Advance2 => "ADV2",
            Self::Advance3 => "ADV3",
            Self::Final => "FINAL",
        }
    }

    /// Payment order within a crop year.
    #[must_use]
    pub const fn sequence(self) -> u8 {
        match self {
            Self::Advance1 => 1,
            Self::Advance2 => 2,
            Self::Advance3 => 3,
            Self::Final => 4,
        }
    }

    /// The advance round paid by this type, `None` for the final payment.
    #[must_use]
    pub const fn advance_round(self) -> Option<AdvanceRound> {
        match self {
            Self::Advance1 => Some(AdvanceRound::First),
            Self::Advance2 => Some(AdvanceRound::Second),
            Self::Advance3 => Some(AdvanceRound::Third),
            Self::Final => None,
        }
    }
}

impl core::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for PaymentType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADV1" => Ok(Self::Advance1),
            "ADV2" => Ok(Self::Advance2),
            "ADV3" => Ok(Self::Advance3),
            "FINAL" => Ok(Self::Final),
            other => Err(EngineError::Validation(format!(
                "unknown payment type: {other}"
            ))),
        }
    }
}

/// Advance round (1..=3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdvanceRound {
    First,
    Second,
    Third,
}

impl AdvanceRound {
    pub const ALL: [AdvanceRound; 3] = [Self::First, Self::Second, Self::Third];

    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    #[must_use]
    pub const fn payment_type(self) -> PaymentType {
        match self {
            Self::First => PaymentType::Advance1,
            Self::Second => PaymentType::Advance2,
            Self::Third => PaymentType::Advance3,
        }
    }

    /// Rounds that must already be paid before this one.
    pub fn previous(self) -> impl Iterator<Item = AdvanceRound> {
        Self::ALL.into_iter().filter(move |r| *r < self)
    }

    /// Rounds `1..=self`.
    pub fn up_to(self) -> impl Iterator<Item = AdvanceRound> {
        Self::ALL.into_iter().filter(move |r| *r <= self)
    }
}

impl TryFrom<u8> for AdvanceRound {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            other => Err(EngineError::Validation(format!(
                "advance round must be 1, 2 or 3, got {other}"
            ))),
        }
    }
}

impl core::fmt::Display for AdvanceRound {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_rounds_are_strictly_lower() {
        assert_eq!(AdvanceRound::First.previous().count(), 0);
        assert_eq!(
            AdvanceRound::Third.previous().collect::<Vec<_>>(),
            vec![AdvanceRound::First, AdvanceRound::Second]
        );
    }

    #[test]
    fn codes_round_trip() {
        for ty in [
            PaymentType::Advance1,
            PaymentType::Advance2,
            PaymentType::Advance3,
            PaymentType::Final,
        ] {
            assert_eq!(PaymentType::try_from(ty.code()).unwrap(), ty);
        }
        assert!(PaymentType::try_from("ADV9").is_err());
    }
}
