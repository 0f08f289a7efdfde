//! Core computations for obstetric encounter notes: dating, Robson groups and
//! the shared encounter types.

pub mod dating;
pub mod encounter;
pub mod robson;
pub mod temporal;

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::temporal::normalize_to_calendar_date;

pub use dating::{DatingInputs, DatingSummary, GestationalEstimate};
pub use encounter::{
    Comorbidities, ConceptusRecord, EncounterSnapshot, Identification, LaborOnset, Medication,
    Membranes, ObstetricHistory, PelvicExam, PhysicalExam, Presentation, RapidTest, Serology,
    Signature, SpeculumExam, SubstanceUse, UltrasoundExam,
};
pub use robson::{RobsonGroup, RobsonInputs};
pub use temporal::GestationalAge;

/// Standard pregnancy length counted from the LMP (Naegele's rule).
pub const PREGNANCY_LENGTH_DAYS: i64 = 280;

/// 37 weeks, the term threshold used by the Robson groups.
pub const TERM_THRESHOLD_DAYS: u32 = 37 * 7;

/// Tunable parameters for note generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoteConfig {
    /// Clinic UTC offset in minutes; instants are reduced to calendar dates in this offset.
    pub clinic_utc_offset_minutes: i32,
    /// Largest LMP/USG disagreement (days) for which the LMP estimate is kept.
    pub dating_tolerance_days: u32,
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self {
            clinic_utc_offset_minutes: -180,
            dating_tolerance_days: 7,
        }
    }
}

impl NoteConfig {
    /// Fixed offset of the clinic clock.
    pub fn clinic_offset(&self) -> Result<FixedOffset, NoteError> {
        self.clinic_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                NoteError::InvalidConfig(format!(
                    "clinic_utc_offset_minutes out of range: {}",
                    self.clinic_utc_offset_minutes
                ))
            })
    }
}

/// The instant a computation runs at, expressed on the clinic clock.
///
/// Every function that needs "now" or "today" takes this explicitly so the
/// same snapshot always produces the same output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteContext {
    pub now: DateTime<FixedOffset>,
}

impl NoteContext {
    pub fn new(now: DateTime<Utc>, config: &NoteConfig) -> Result<Self, NoteError> {
        let offset = config.clinic_offset()?;
        Ok(Self {
            now: now.with_timezone(&offset),
        })
    }

    /// Context for the current wall clock.
    pub fn current(config: &NoteConfig) -> Result<Self, NoteError> {
        Self::new(Utc::now(), config)
    }

    /// Calendar date of `now` on the clinic clock.
    pub fn today(&self) -> NaiveDate {
        normalize_to_calendar_date(self.now.with_timezone(&Utc), *self.now.offset())
    }
}

/// Obstetric history counts behind the G/P/A notation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Parity {
    pub gestations: u32,
    pub vaginal: u32,
    pub cesarean: u32,
    pub abortions: u32,
}

impl Parity {
    pub fn new(gestations: u32, vaginal: u32, cesarean: u32, abortions: u32) -> Self {
        Self {
            gestations,
            vaginal,
            cesarean,
            abortions,
        }
    }

    /// No previous pregnancy beyond the current one.
    ///
    /// A single gestation with a recorded abortion is *not* nulliparous.
    pub fn is_nulliparous(&self) -> bool {
        self.gestations == 0
            || (self.gestations == 1
                && self.vaginal == 0
                && self.cesarean == 0
                && self.abortions == 0)
    }

    pub fn is_multiparous(&self) -> bool {
        !self.is_nulliparous()
    }

    pub fn has_prior_cesarean(&self) -> bool {
        self.cesarean > 0
    }

    pub fn deliveries(&self) -> u32 {
        self.vaginal.saturating_add(self.cesarean)
    }
}

/// Renders the parity code, e.g. `G3P1v1cA1`.
impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.gestations)?;
        match (self.vaginal, self.cesarean) {
            (0, 0) => f.write_str("P0")?,
            (0, c) => write!(f, "P{c}c")?,
            (v, 0) => write!(f, "P{v}v")?,
            (v, c) => write!(f, "P{v}v{c}c")?,
        }
        write!(f, "A{}", self.abortions)
    }
}

/// Errors raised while reading inputs. None of them abort note generation;
/// dependent outputs are left empty instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NoteError {
    #[error("unparsable input: {0}")]
    UnparsableInput(String),
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot read form payload: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parity_code_variants() {
        assert_eq!(Parity::new(3, 1, 1, 1).to_string(), "G3P1v1cA1");
        assert_eq!(Parity::new(2, 0, 1, 0).to_string(), "G2P1cA0");
        assert_eq!(Parity::new(2, 1, 0, 0).to_string(), "G2P1vA0");
        assert_eq!(Parity::new(1, 0, 0, 0).to_string(), "G1P0A0");
        assert_eq!(Parity::default().to_string(), "G0P0A0");
    }

    #[test]
    fn nulliparity_edge_cases() {
        assert!(Parity::new(0, 0, 0, 0).is_nulliparous());
        assert!(Parity::new(1, 0, 0, 0).is_nulliparous());
        assert!(!Parity::new(1, 0, 0, 1).is_nulliparous());
        assert!(Parity::new(2, 1, 0, 0).is_multiparous());
    }

    #[test]
    fn context_uses_clinic_calendar_date() {
        // 01:30 UTC is still the previous evening in Brasília.
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 1, 30, 0).unwrap();
        let ctx = NoteContext::new(now, &NoteConfig::default()).unwrap();
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2024, 5, 9).unwrap());
    }

    #[test]
    fn rejects_out_of_range_offset() {
        let config = NoteConfig {
            clinic_utc_offset_minutes: 24 * 60,
            ..NoteConfig::default()
        };
        assert!(matches!(
            config.clinic_offset(),
            Err(NoteError::InvalidConfig(_))
        ));
    }
}
