//! Encounter snapshot captured from the admission form.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::dating::DatingInputs;
use crate::Parity;

/// Read-only copy of everything the clinician filled in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncounterSnapshot {
    pub identification: Identification,
    pub obstetric: ObstetricHistory,
    pub serology: Serology,
    pub allergies: Vec<String>,
    pub comorbidities: Comorbidities,
    pub substance_use: SubstanceUse,
    pub medications: Vec<Medication>,
    pub present_illness: Option<String>,
    pub physical_exam: PhysicalExam,
    pub lab_results: Option<String>,
    pub imaging_notes: Option<String>,
    pub ultrasounds: Vec<UltrasoundExam>,
    pub diagnostic_hypotheses: Vec<String>,
    pub plan: Vec<String>,
    pub signatures: Vec<Signature>,
}

impl EncounterSnapshot {
    /// Inputs for the dating reconciler.
    pub fn dating_inputs(&self) -> DatingInputs {
        DatingInputs {
            lmp: self.obstetric.lmp,
            lmp_uncertain: self.obstetric.lmp_uncertain,
            usg_date: self.obstetric.usg_date,
            usg_age_text: self.obstetric.usg_age_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Identification {
    pub name: Option<String>,
    pub age: Option<String>,
    pub origin: Option<String>,
    pub record_number: Option<String>,
    pub visit_count: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObstetricHistory {
    /// "Nuligesta" toggle; replaces the whole history line when set.
    pub nulligravida: bool,
    pub parity: Parity,
    pub lmp: Option<NaiveDate>,
    pub lmp_uncertain: bool,
    pub usg_date: Option<NaiveDate>,
    /// Gestational age reported by the reference ultrasound, as typed.
    pub usg_age_text: Option<String>,
    pub last_delivery: Option<NaiveDate>,
    pub multiple_gestation: bool,
    pub presentation: Option<Presentation>,
    pub labor_onset: Option<LaborOnset>,
}

/// Fetal presentation for Robson purposes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    Cephalic,
    Breech,
    /// Transverse or oblique lie.
    Other,
}

/// How the admission for delivery started.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LaborOnset {
    Spontaneous,
    Induced,
    PrelaborCesarean,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Serology {
    pub blood_type: Option<String>,
    pub syphilis: RapidTest,
    pub hiv: RapidTest,
    pub hepatitis_b: RapidTest,
    pub hepatitis_c: RapidTest,
}

impl Serology {
    /// Tests in display order with their short labels.
    pub fn rapid_tests(&self) -> [(&'static str, RapidTest); 4] {
        [
            ("Sífilis", self.syphilis),
            ("Anti-HIV", self.hiv),
            ("HepB", self.hepatitis_b),
            ("HepC", self.hepatitis_c),
        ]
    }
}

/// Rapid test result.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RapidTest {
    #[default]
    NotPerformed,
    NonReactive,
    Reactive,
}

impl RapidTest {
    pub fn label(self) -> &'static str {
        match self {
            RapidTest::NotPerformed => "Não Realizado",
            RapidTest::NonReactive => "Não Reagente",
            RapidTest::Reactive => "Reagente",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Comorbidities {
    pub gdm_diet: bool,
    pub gdm_insulin: bool,
    pub gestational_hypertension: bool,
    pub chronic_hypertension: bool,
    pub others: Vec<String>,
}

impl Comorbidities {
    /// Toggled conditions first, then free tags.
    pub fn labels(&self) -> Vec<String> {
        let toggles = [
            (self.gdm_diet, "DMG (Dieta)"),
            (self.gdm_insulin, "DMG (Insulina)"),
            (self.gestational_hypertension, "HAG"),
            (self.chronic_hypertension, "HAS"),
        ];
        toggles
            .into_iter()
            .filter(|(on, _)| *on)
            .map(|(_, label)| label.to_string())
            .chain(self.others.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SubstanceUse {
    pub alcohol: bool,
    pub tobacco: bool,
    pub tobacco_detail: Option<String>,
    pub drugs: bool,
    pub drug_tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Medication {
    pub name: String,
    pub dose: Option<String>,
    /// Typed in full by the clinician; only `dose` carries the text.
    pub free_text: bool,
}

impl Medication {
    /// Display text, or `None` when nothing usable was entered.
    pub fn display(&self) -> Option<String> {
        let dose = self.dose.as_deref().map(str::trim).filter(|d| !d.is_empty());
        let name = self.name.trim();
        if self.free_text {
            return dose.map(str::to_string);
        }
        match (name.is_empty(), dose) {
            (true, _) => None,
            (false, Some(dose)) => Some(format!("{name} {dose}")),
            (false, None) => Some(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicalExam {
    pub blood_pressure: Option<String>,
    /// Pressure repeated after resting in left lateral decubitus.
    pub blood_pressure_lateral: Option<String>,
    pub heart_rate: Option<String>,
    pub spo2: Option<String>,
    pub temperature: Option<String>,
    pub proteinuria: Option<String>,
    pub abdomen: Option<String>,
    pub fetal_dorsum: Option<String>,
    pub fundal_height: Option<String>,
    pub fetal_heart_rate: Option<String>,
    pub fetal_movements: Option<String>,
    pub uterine_tone: Option<String>,
    pub uterine_dynamics: Option<String>,
    pub uterine_dynamics_absent: bool,
    pub pelvic: PelvicExam,
    pub speculum: SpeculumExam,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PelvicExam {
    pub avoided: bool,
    pub cervical_thickness: Option<String>,
    pub cervical_position: Option<String>,
    pub dilation_cm: Option<String>,
    pub membranes: Option<Membranes>,
    pub rupture_at: Option<NaiveDateTime>,
    pub fluid_color: Option<String>,
    /// Blood on the examining glove.
    pub bleeding: Option<bool>,
}

/// Amniotic membrane status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Membranes {
    Intact,
    Ruptured,
}

impl fmt::Display for Membranes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Membranes::Intact => "Íntegra",
            Membranes::Ruptured => "Rota",
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeculumExam {
    pub avoided: bool,
    pub description: Option<String>,
}

/// One ultrasound report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UltrasoundExam {
    pub date: Option<NaiveDate>,
    pub kind: Option<String>,
    pub conceptuses: Vec<ConceptusRecord>,
}

/// Fetus and placenta findings for one conceptus.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConceptusRecord {
    pub situation: Option<String>,
    pub presentation: Option<String>,
    pub dorsum: Option<String>,
    pub heart_rate: Option<String>,
    pub estimated_weight_g: Option<String>,
    pub weight_percentile: Option<String>,
    pub placenta_location: Option<String>,
    pub placenta_grade: Option<String>,
    pub amniotic_fluid_index: Option<String>,
    pub deepest_pocket: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Signature {
    /// Title such as `Dr.`, `Ddo.`, `Acd.` or `MR`.
    pub role: String,
    pub name: String,
}
