//! Robson ten-group classification.
//!
//! The groups are checked in a fixed priority order; the first rule whose
//! predicate holds decides the group. [`rules`] exposes that table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dating::DatingSummary;
use crate::encounter::{EncounterSnapshot, LaborOnset, Presentation};
use crate::{NoteError, Parity, TERM_THRESHOLD_DAYS};

/// Robson group, or the explicit "no rule matched" outcome.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "Option<u8>", try_from = "Option<u8>")]
pub enum RobsonGroup {
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
    G8,
    G9,
    G10,
    Unclassified,
}

impl RobsonGroup {
    pub fn number(self) -> Option<u8> {
        Some(match self {
            RobsonGroup::G1 => 1,
            RobsonGroup::G2 => 2,
            RobsonGroup::G3 => 3,
            RobsonGroup::G4 => 4,
            RobsonGroup::G5 => 5,
            RobsonGroup::G6 => 6,
            RobsonGroup::G7 => 7,
            RobsonGroup::G8 => 8,
            RobsonGroup::G9 => 9,
            RobsonGroup::G10 => 10,
            RobsonGroup::Unclassified => return None,
        })
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Some(match number {
            1 => RobsonGroup::G1,
            2 => RobsonGroup::G2,
            3 => RobsonGroup::G3,
            4 => RobsonGroup::G4,
            5 => RobsonGroup::G5,
            6 => RobsonGroup::G6,
            7 => RobsonGroup::G7,
            8 => RobsonGroup::G8,
            9 => RobsonGroup::G9,
            10 => RobsonGroup::G10,
            _ => return None,
        })
    }
}

impl fmt::Display for RobsonGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number() {
            Some(number) => write!(f, "{number}"),
            None => f.write_str("unclassified"),
        }
    }
}

impl From<RobsonGroup> for Option<u8> {
    fn from(group: RobsonGroup) -> Self {
        group.number()
    }
}

impl TryFrom<Option<u8>> for RobsonGroup {
    type Error = NoteError;

    fn try_from(value: Option<u8>) -> Result<Self, Self::Error> {
        match value {
            None => Ok(RobsonGroup::Unclassified),
            Some(number) => RobsonGroup::from_number(number)
                .ok_or_else(|| NoteError::UnparsableInput(format!("Robson group {number}"))),
        }
    }
}

/// Attributes the classification depends on.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RobsonInputs {
    pub parity: Parity,
    pub multiple_gestation: bool,
    pub presentation: Option<Presentation>,
    pub labor_onset: Option<LaborOnset>,
    pub gestational_age_days: Option<u32>,
}

impl RobsonInputs {
    pub fn from_encounter(snapshot: &EncounterSnapshot, dating: &DatingSummary) -> Self {
        let obstetric = &snapshot.obstetric;
        Self {
            parity: obstetric.parity,
            multiple_gestation: obstetric.multiple_gestation,
            presentation: obstetric.presentation,
            labor_onset: obstetric.labor_onset,
            gestational_age_days: dating.gestational_age_days(),
        }
    }

    fn is_preterm(&self) -> bool {
        self.gestational_age_days
            .is_some_and(|days| days < TERM_THRESHOLD_DAYS)
    }

    fn is_term(&self) -> bool {
        self.gestational_age_days
            .is_some_and(|days| days >= TERM_THRESHOLD_DAYS)
    }

    fn is_cephalic_at_term(&self) -> bool {
        self.presentation == Some(Presentation::Cephalic) && self.is_term()
    }

    fn is_spontaneous(&self) -> bool {
        self.labor_onset == Some(LaborOnset::Spontaneous)
    }

    fn is_induced_or_prelabor_cesarean(&self) -> bool {
        matches!(
            self.labor_onset,
            Some(LaborOnset::Induced | LaborOnset::PrelaborCesarean)
        )
    }
}

/// One entry of the priority table.
#[derive(Clone, Copy)]
pub struct RobsonRule {
    pub group: RobsonGroup,
    pub description: &'static str,
    pub applies: fn(&RobsonInputs) -> bool,
}

impl fmt::Debug for RobsonRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobsonRule")
            .field("group", &self.group)
            .field("description", &self.description)
            .finish()
    }
}

static RULES: [RobsonRule; 10] = [
    RobsonRule {
        group: RobsonGroup::G8,
        description: "multiple pregnancy",
        applies: |i| i.multiple_gestation,
    },
    RobsonRule {
        group: RobsonGroup::G10,
        description: "preterm (< 37 weeks)",
        applies: |i| i.is_preterm(),
    },
    RobsonRule {
        group: RobsonGroup::G9,
        description: "transverse or oblique lie",
        applies: |i| i.presentation == Some(Presentation::Other),
    },
    RobsonRule {
        group: RobsonGroup::G7,
        description: "multiparous, breech",
        applies: |i| i.presentation == Some(Presentation::Breech) && i.parity.is_multiparous(),
    },
    RobsonRule {
        group: RobsonGroup::G6,
        description: "nulliparous, breech",
        applies: |i| i.presentation == Some(Presentation::Breech) && i.parity.is_nulliparous(),
    },
    RobsonRule {
        group: RobsonGroup::G1,
        description: "nulliparous, cephalic at term, spontaneous labour",
        applies: |i| i.is_cephalic_at_term() && i.parity.is_nulliparous() && i.is_spontaneous(),
    },
    RobsonRule {
        group: RobsonGroup::G2,
        description: "nulliparous, cephalic at term, induced or pre-labour cesarean",
        applies: |i| {
            i.is_cephalic_at_term()
                && i.parity.is_nulliparous()
                && i.is_induced_or_prelabor_cesarean()
        },
    },
    RobsonRule {
        group: RobsonGroup::G3,
        description: "multiparous without previous cesarean, cephalic at term, spontaneous labour",
        applies: |i| {
            i.is_cephalic_at_term()
                && i.parity.is_multiparous()
                && !i.parity.has_prior_cesarean()
                && i.is_spontaneous()
        },
    },
    RobsonRule {
        group: RobsonGroup::G4,
        description: "multiparous without previous cesarean, cephalic at term, induced or pre-labour cesarean",
        applies: |i| {
            i.is_cephalic_at_term()
                && i.parity.is_multiparous()
                && !i.parity.has_prior_cesarean()
                && i.is_induced_or_prelabor_cesarean()
        },
    },
    RobsonRule {
        group: RobsonGroup::G5,
        description: "multiparous with previous cesarean, cephalic at term",
        applies: |i| {
            i.is_cephalic_at_term() && i.parity.is_multiparous() && i.parity.has_prior_cesarean()
        },
    },
];

/// The classification rules in priority order.
pub fn rules() -> &'static [RobsonRule] {
    &RULES
}

/// Classifies `inputs`; returns [`RobsonGroup::Unclassified`] when no rule applies.
pub fn classify(inputs: &RobsonInputs) -> RobsonGroup {
    let group = rules()
        .iter()
        .find(|rule| (rule.applies)(inputs))
        .map(|rule| rule.group)
        .unwrap_or(RobsonGroup::Unclassified);
    tracing::debug!(%group, ?inputs, "robson classification");
    group
}

pub fn classify_encounter(snapshot: &EncounterSnapshot, dating: &DatingSummary) -> RobsonGroup {
    classify(&RobsonInputs::from_encounter(snapshot, dating))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dating::reconcile;
    use crate::temporal::add_days;
    use crate::NoteConfig;
    use chrono::NaiveDate;

    const TERM: u32 = 39 * 7;
    const PRETERM: u32 = 34 * 7;
    const LAST_PRETERM_DAY: u32 = TERM_THRESHOLD_DAYS - 1;

    fn inputs(parity: Parity, presentation: Presentation, onset: LaborOnset) -> RobsonInputs {
        RobsonInputs {
            parity,
            multiple_gestation: false,
            presentation: Some(presentation),
            labor_onset: Some(onset),
            gestational_age_days: Some(TERM),
        }
    }

    fn nullipara() -> Parity {
        Parity::new(1, 0, 0, 0)
    }

    fn multipara() -> Parity {
        Parity::new(3, 2, 0, 0)
    }

    fn previous_cesarean() -> Parity {
        Parity::new(2, 0, 1, 0)
    }

    #[test]
    fn multiple_pregnancy_outranks_everything() {
        let mut case = inputs(nullipara(), Presentation::Breech, LaborOnset::Spontaneous);
        case.multiple_gestation = true;
        case.gestational_age_days = Some(PRETERM);
        assert_eq!(classify(&case), RobsonGroup::G8);
    }

    #[test]
    fn preterm_outranks_presentation() {
        let mut case = inputs(multipara(), Presentation::Other, LaborOnset::Induced);
        case.gestational_age_days = Some(LAST_PRETERM_DAY);
        assert_eq!(classify(&case), RobsonGroup::G10);
    }

    #[test]
    fn transverse_lie_is_group_nine() {
        let case = inputs(nullipara(), Presentation::Other, LaborOnset::Spontaneous);
        assert_eq!(classify(&case), RobsonGroup::G9);
    }

    #[test]
    fn breech_splits_on_parity() {
        let nulli = inputs(nullipara(), Presentation::Breech, LaborOnset::PrelaborCesarean);
        let multi = inputs(multipara(), Presentation::Breech, LaborOnset::PrelaborCesarean);
        assert_eq!(classify(&nulli), RobsonGroup::G6);
        assert_eq!(classify(&multi), RobsonGroup::G7);
    }

    #[test]
    fn cephalic_term_groups() {
        let cases = [
            (nullipara(), LaborOnset::Spontaneous, RobsonGroup::G1),
            (nullipara(), LaborOnset::Induced, RobsonGroup::G2),
            (nullipara(), LaborOnset::PrelaborCesarean, RobsonGroup::G2),
            (multipara(), LaborOnset::Spontaneous, RobsonGroup::G3),
            (multipara(), LaborOnset::Induced, RobsonGroup::G4),
            (multipara(), LaborOnset::PrelaborCesarean, RobsonGroup::G4),
            (previous_cesarean(), LaborOnset::Spontaneous, RobsonGroup::G5),
            (previous_cesarean(), LaborOnset::PrelaborCesarean, RobsonGroup::G5),
        ];
        for (parity, onset, expected) in cases {
            let case = inputs(parity, Presentation::Cephalic, onset);
            assert_eq!(classify(&case), expected, "{parity} {onset:?}");
        }
    }

    #[test]
    fn single_abortion_counts_as_multiparous() {
        let case = inputs(Parity::new(1, 0, 0, 1), Presentation::Cephalic, LaborOnset::Spontaneous);
        assert_eq!(classify(&case), RobsonGroup::G3);
    }

    #[test]
    fn exactly_37_weeks_is_term() {
        let mut case = inputs(nullipara(), Presentation::Cephalic, LaborOnset::Spontaneous);
        case.gestational_age_days = Some(TERM_THRESHOLD_DAYS);
        assert_eq!(classify(&case), RobsonGroup::G1);
    }

    #[test]
    fn near_threshold_uses_ultrasound_corrected_age() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let mut snapshot = EncounterSnapshot::default();
        snapshot.obstetric.parity = nullipara();
        snapshot.obstetric.lmp = add_days(today, -258);
        snapshot.obstetric.usg_date = Some(today);
        snapshot.obstetric.usg_age_text = Some("37+3".into());
        snapshot.obstetric.presentation = Some(Presentation::Cephalic);
        snapshot.obstetric.labor_onset = Some(LaborOnset::Spontaneous);

        let dating = reconcile(&snapshot.dating_inputs(), today, &NoteConfig::default());
        assert_eq!(dating.considered_age_days, Some(258));
        assert_eq!(classify_encounter(&snapshot, &dating), RobsonGroup::G1);
    }

    #[test]
    fn missing_data_is_unclassified() {
        assert_eq!(classify(&RobsonInputs::default()), RobsonGroup::Unclassified);

        let mut unknown_age = inputs(nullipara(), Presentation::Cephalic, LaborOnset::Spontaneous);
        unknown_age.gestational_age_days = None;
        assert_eq!(classify(&unknown_age), RobsonGroup::Unclassified);

        let mut unknown_onset =
            inputs(nullipara(), Presentation::Cephalic, LaborOnset::Spontaneous);
        unknown_onset.labor_onset = None;
        assert_eq!(classify(&unknown_onset), RobsonGroup::Unclassified);
    }

    #[test]
    fn rule_table_order_is_fixed() {
        let order: Vec<u8> = rules().iter().filter_map(|r| r.group.number()).collect();
        assert_eq!(order, vec![8, 10, 9, 7, 6, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn serializes_as_number_or_null() {
        assert_eq!(serde_json::to_string(&RobsonGroup::G5).unwrap(), "5");
        assert_eq!(
            serde_json::to_string(&RobsonGroup::Unclassified).unwrap(),
            "null"
        );
        let parsed: RobsonGroup = serde_json::from_str("10").unwrap();
        assert_eq!(parsed, RobsonGroup::G10);
        assert!(serde_json::from_str::<RobsonGroup>("11").is_err());
    }
}
