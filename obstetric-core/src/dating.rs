//! Reconciles LMP and ultrasound dating into one considered gestational age.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::temporal::{add_days, days_between, GestationalAge};
use crate::{NoteConfig, NoteError, PREGNANCY_LENGTH_DAYS};

/// A gestational age known at some reference date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GestationalEstimate {
    pub source_date: NaiveDate,
    pub age_at_source_days: u32,
}

impl GestationalEstimate {
    /// Estimate implied by a last menstrual period (age zero at the LMP).
    pub fn from_lmp(lmp: NaiveDate) -> Self {
        Self {
            source_date: lmp,
            age_at_source_days: 0,
        }
    }

    /// Estimate from an ultrasound date and the age it reported.
    pub fn from_usg(
        usg_date: Option<NaiveDate>,
        usg_age_text: Option<&str>,
    ) -> Result<Self, NoteError> {
        let text = usg_age_text
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| NoteError::InsufficientData("ultrasound gestational age".to_string()))?;
        let source_date = usg_date
            .ok_or_else(|| NoteError::InsufficientData("ultrasound date".to_string()))?;
        let age_at_source_days = text.parse::<GestationalAge>()?.total_days();
        Ok(Self {
            source_date,
            age_at_source_days,
        })
    }

    /// Age carried forward to `today`; never moves backwards.
    pub fn corrected_age(&self, today: NaiveDate) -> u32 {
        let elapsed = days_between(today, self.source_date).max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.age_at_source_days.saturating_add(elapsed)
    }

    /// Date the estimate reaches 40 weeks.
    pub fn due_date(&self) -> Option<NaiveDate> {
        add_days(
            self.source_date,
            PREGNANCY_LENGTH_DAYS - i64::from(self.age_at_source_days),
        )
    }
}

/// Dating fields as entered on the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatingInputs {
    pub lmp: Option<NaiveDate>,
    pub lmp_uncertain: bool,
    pub usg_date: Option<NaiveDate>,
    pub usg_age_text: Option<String>,
}

/// Every derived dating value; `None` means "no data", never zero weeks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatingSummary {
    pub lmp_age_days: Option<u32>,
    pub lmp_due_date: Option<NaiveDate>,
    pub usg_age_at_exam_days: Option<u32>,
    pub usg_corrected_age_days: Option<u32>,
    pub usg_due_date: Option<NaiveDate>,
    pub considered_age_days: Option<u32>,
    /// Headline due date (DPP).
    pub due_date: Option<NaiveDate>,
}

impl DatingSummary {
    /// Age used for Robson classification: USG-corrected, else LMP. The
    /// considered age is not consulted.
    pub fn gestational_age_days(&self) -> Option<u32> {
        self.usg_corrected_age_days.or(self.lmp_age_days)
    }
}

/// Current gestational age by LMP, in days.
pub fn current_age_from_lmp(lmp: Option<NaiveDate>, today: NaiveDate) -> Result<u32, NoteError> {
    let lmp = lmp.ok_or_else(|| NoteError::InsufficientData("LMP date".to_string()))?;
    let days = days_between(today, lmp);
    u32::try_from(days)
        .map_err(|_| NoteError::UnparsableInput(format!("LMP {lmp} is after {today}")))
}

pub fn due_date_from_lmp(lmp: NaiveDate) -> Option<NaiveDate> {
    GestationalEstimate::from_lmp(lmp).due_date()
}

pub fn due_date_from_usg(
    usg_date: Option<NaiveDate>,
    usg_age_text: Option<&str>,
) -> Result<NaiveDate, NoteError> {
    GestationalEstimate::from_usg(usg_date, usg_age_text)?
        .due_date()
        .ok_or_else(|| NoteError::UnparsableInput("ultrasound due date out of range".to_string()))
}

pub fn corrected_age_from_usg(
    usg_date: Option<NaiveDate>,
    usg_age_text: Option<&str>,
    today: NaiveDate,
) -> Result<u32, NoteError> {
    Ok(GestationalEstimate::from_usg(usg_date, usg_age_text)?.corrected_age(today))
}

/// Chooses between the LMP age and the ultrasound-corrected age.
///
/// An uncertain LMP always defers to ultrasound. Otherwise the LMP age stands
/// while the two agree within `tolerance_days`.
pub fn considered_age(
    lmp_age: Option<u32>,
    corrected_usg_age: Option<u32>,
    lmp_uncertain: bool,
    tolerance_days: u32,
) -> Option<u32> {
    if lmp_uncertain {
        return corrected_usg_age;
    }
    let (lmp, usg) = (lmp_age?, corrected_usg_age?);
    if lmp.abs_diff(usg) <= tolerance_days {
        Some(lmp)
    } else {
        Some(usg)
    }
}

/// Computes every dating output for `inputs` as of `today`.
pub fn reconcile(inputs: &DatingInputs, today: NaiveDate, config: &NoteConfig) -> DatingSummary {
    let (lmp_age_days, lmp_due_date) = if inputs.lmp_uncertain {
        (None, None)
    } else {
        let age = current_age_from_lmp(inputs.lmp, today)
            .inspect_err(|err| tracing::debug!(%err, "LMP age unavailable"))
            .ok();
        (age, inputs.lmp.and_then(due_date_from_lmp))
    };

    let usg = GestationalEstimate::from_usg(inputs.usg_date, inputs.usg_age_text.as_deref())
        .inspect_err(|err| tracing::debug!(%err, "ultrasound estimate unavailable"))
        .ok();
    let usg_corrected_age_days = usg.map(|estimate| estimate.corrected_age(today));
    let usg_due_date = usg.and_then(|estimate| estimate.due_date());

    let considered_age_days = considered_age(
        lmp_age_days,
        usg_corrected_age_days,
        inputs.lmp_uncertain,
        config.dating_tolerance_days,
    );

    let due_date = if inputs.lmp_uncertain {
        usg_due_date
    } else {
        lmp_due_date.or(usg_due_date)
    };

    DatingSummary {
        lmp_age_days,
        lmp_due_date,
        usg_age_at_exam_days: usg.map(|estimate| estimate.age_at_source_days),
        usg_corrected_age_days,
        usg_due_date,
        considered_age_days,
        due_date,
    }
}
