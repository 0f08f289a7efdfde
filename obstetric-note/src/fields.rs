//! Values for the printed admission form's fillable fields.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use obstetric_core::dating::DatingSummary;
use obstetric_core::temporal::{format_date_br, format_date_br_short, format_time_date_br};
use obstetric_core::{
    EncounterSnapshot, GestationalAge, LaborOnset, Membranes, NoteContext, RapidTest, RobsonGroup,
};
use serde::{Deserialize, Serialize};

use crate::narrative::{labeled, non_empty};

/// Which printed form the encounter goes on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormTemplate {
    Cesarean,
    Labor,
    Clinical,
}

impl FormTemplate {
    pub fn for_onset(onset: Option<LaborOnset>) -> Self {
        match onset {
            Some(LaborOnset::PrelaborCesarean) => FormTemplate::Cesarean,
            Some(LaborOnset::Spontaneous | LaborOnset::Induced) => FormTemplate::Labor,
            None => FormTemplate::Clinical,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            FormTemplate::Cesarean => "ficha_cesarea.pdf",
            FormTemplate::Labor => "ficha_normal.pdf",
            FormTemplate::Clinical => "ficha_clinico.pdf",
        }
    }
}

/// Field name → text, plus the choices the PDF filler needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldMapping {
    pub template: FormTemplate,
    pub values: BTreeMap<String, String>,
    /// When true the filler also ticks the default pelvimetry answers.
    pub pelvic_exam_performed: bool,
}

/// Computes every PDF field value for the encounter.
pub fn map_fields(
    snapshot: &EncounterSnapshot,
    dating: &DatingSummary,
    robson: RobsonGroup,
    ctx: &NoteContext,
) -> FieldMapping {
    let mut values = BTreeMap::new();
    let mut put = |key: &str, value: String| {
        values.insert(key.to_string(), value);
    };

    let id = &snapshot.identification;
    put("Data", format_date_br_short(ctx.today()));
    put("Prontuario", text(&id.record_number));
    put("Consultas", text(&id.visit_count));
    put("Nome", text(&id.name));
    put("Idade", text(&id.age));

    let hypotheses = snapshot.diagnostic_hypotheses.join(", ");
    put("Motivo", hypotheses.clone());
    put("Ddx", hypotheses);
    let medications: Vec<String> = snapshot
        .medications
        .iter()
        .filter_map(|m| m.display())
        .collect();
    put("Medicacoes", medications.join(", "));
    put("CD", snapshot.plan.join(", "));

    let obstetric = &snapshot.obstetric;
    let parity = obstetric.parity;
    put("G", parity.gestations.to_string());
    put("A", parity.abortions.to_string());
    put("P", parity.deliveries().to_string());
    put("V", parity.vaginal.to_string());
    put("C", parity.cesarean.to_string());
    put("DUP", date_text(obstetric.last_delivery));
    put(
        "DUM",
        match obstetric.lmp {
            Some(lmp) if !obstetric.lmp_uncertain => format_date_br(lmp),
            _ => "Incerta".to_string(),
        },
    );
    put("DPP", date_text(dating.due_date));
    put("IGDUM", weeks_days(dating.lmp_age_days));
    put("DataUSG", date_text(obstetric.usg_date));
    put("IGUSG", weeks_days(dating.usg_corrected_age_days));
    put("DPPUSG", date_text(dating.usg_due_date));

    let exam = &snapshot.physical_exam;
    put("PA", text(&exam.blood_pressure));
    put("DLE", text(&exam.blood_pressure_lateral));
    put("Prot", text(&exam.proteinuria));
    put("Temp", text(&exam.temperature));
    put("FC", text(&exam.heart_rate));
    put("Abd", text(&exam.abdomen));
    put("Dorso", text(&exam.fetal_dorsum));
    put("BCF", text(&exam.fetal_heart_rate));
    let fundal_height = labeled(&exam.fundal_height, |v| format!("{v}cm"));
    put("AU", fundal_height.unwrap_or_default());
    let dynamics = if exam.uterine_dynamics_absent {
        Some("Ausente".to_string())
    } else {
        labeled(&exam.uterine_dynamics, |v| format!("DU {v}"))
    };
    put("DU", dynamics.unwrap_or_default());
    put("Tonus", text(&exam.uterine_tone));

    let pelvic = &exam.pelvic;
    put("Dilatacao", text(&pelvic.dilation_cm));
    put("Posicao", text(&pelvic.cervical_position));
    put("Espessura", text(&pelvic.cervical_thickness));
    let membranes = pelvic.membranes.map(|m| m.to_string());
    put("Bolsa_MJR5", membranes.unwrap_or_default());
    let rupture = match (pelvic.membranes, pelvic.rupture_at) {
        (Some(Membranes::Ruptured), Some(at)) => Some(at),
        _ => None,
    };
    put("DataBolsa", rupture.map(format_time_date_br).unwrap_or_default());
    put(
        "Liquido",
        if rupture.is_some() {
            text(&pelvic.fluid_color)
        } else {
            String::new()
        },
    );
    put(
        "Especular",
        if exam.speculum.avoided {
            "Evitado".to_string()
        } else {
            text(&exam.speculum.description)
        },
    );

    let serology = &snapshot.serology;
    put("trSifilis", rapid_test_label("Sífilis", serology.syphilis));
    put("trHIV", rapid_test_label("Anti-HIV", serology.hiv));
    put("trHepB", rapid_test_label("HBsAg", serology.hepatitis_b));
    put("trHepC", rapid_test_label("Anti-HCV", serology.hepatitis_c));

    let group = robson.number().map(|n| n.to_string());
    put("Robson", group.unwrap_or_default());

    for (field, names) in signatures_by_role(snapshot) {
        put(field, names.join(", "));
    }

    FieldMapping {
        template: FormTemplate::for_onset(obstetric.labor_onset),
        values,
        pelvic_exam_performed: !pelvic.avoided,
    }
}

/// Signature names grouped into the form's four role boxes.
fn signatures_by_role(snapshot: &EncounterSnapshot) -> [(&'static str, Vec<&str>); 4] {
    let mut docente = Vec::new();
    let mut resident = Vec::new();
    let mut student = Vec::new();
    let mut medical_resident = Vec::new();

    for signature in &snapshot.signatures {
        let name = signature.name.trim();
        if name.is_empty() {
            continue;
        }
        let role = signature.role.trim();
        if role.starts_with("Dr") {
            docente.push(name);
        } else if role.starts_with("Ddo") {
            resident.push(name);
        } else if role.starts_with("Acd") {
            student.push(name);
        } else if role.starts_with("MR") {
            medical_resident.push(name);
        }
    }

    [
        ("Docente", docente),
        ("Ddo", resident),
        ("Acd", student),
        ("MR", medical_resident),
    ]
}

fn rapid_test_label(name: &str, result: RapidTest) -> String {
    format!("{name} {}", result.label())
}

fn text(value: &Option<String>) -> String {
    let value = non_empty(value.as_deref()).unwrap_or_default();
    value.to_string()
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(format_date_br).unwrap_or_default()
}

fn weeks_days(days: Option<u32>) -> String {
    days.map(|d| GestationalAge::from_days(d).to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use obstetric_core::dating::reconcile;
    use obstetric_core::{NoteConfig, Parity, PelvicExam, Signature};

    fn context() -> NoteContext {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 15, 0, 0).unwrap();
        NoteContext::new(now, &NoteConfig::default()).unwrap()
    }

    fn signature(role: &str, name: &str) -> Signature {
        Signature {
            role: role.into(),
            name: name.into(),
        }
    }

    #[test]
    fn template_follows_labour_onset() {
        assert_eq!(
            FormTemplate::for_onset(Some(LaborOnset::PrelaborCesarean)).file_name(),
            "ficha_cesarea.pdf"
        );
        assert_eq!(
            FormTemplate::for_onset(Some(LaborOnset::Spontaneous)),
            FormTemplate::Labor
        );
        assert_eq!(FormTemplate::for_onset(None), FormTemplate::Clinical);
    }

    #[test]
    fn maps_dating_and_parity_fields() {
        let ctx = context();
        let mut snapshot = EncounterSnapshot::default();
        snapshot.obstetric.parity = Parity::new(3, 1, 1, 1);
        snapshot.obstetric.lmp_uncertain = true;
        snapshot.obstetric.usg_date = NaiveDate::from_ymd_opt(2024, 5, 3);
        snapshot.obstetric.usg_age_text = Some("36+0".into());
        let config = NoteConfig::default();
        let dating = reconcile(&snapshot.dating_inputs(), ctx.today(), &config);

        let mapping = map_fields(&snapshot, &dating, RobsonGroup::G5, &ctx);
        let v = &mapping.values;
        assert_eq!(v["Data"], "10/05/24");
        assert_eq!(v["G"], "3");
        assert_eq!(v["P"], "2");
        assert_eq!(v["A"], "1");
        assert_eq!(v["DUM"], "Incerta");
        assert_eq!(v["IGDUM"], "");
        assert_eq!(v["DataUSG"], "03/05/2024");
        assert_eq!(v["IGUSG"], "37s0d");
        assert_eq!(v["DPPUSG"], "31/05/2024");
        assert_eq!(v["DPP"], "31/05/2024");
        assert_eq!(v["Robson"], "5");
        assert_eq!(v["trSifilis"], "Sífilis Não Realizado");
        assert!(mapping.pelvic_exam_performed);
    }

    #[test]
    fn unclassified_robson_is_blank() {
        let ctx = context();
        let snapshot = EncounterSnapshot::default();
        let mapping = map_fields(
            &snapshot,
            &DatingSummary::default(),
            RobsonGroup::Unclassified,
            &ctx,
        );
        assert_eq!(mapping.values["Robson"], "");
        assert_eq!(mapping.values["DUM"], "Incerta");
    }

    #[test]
    fn membranes_and_rupture_time() {
        let ctx = context();
        let mut snapshot = EncounterSnapshot::default();
        snapshot.physical_exam.pelvic = PelvicExam {
            avoided: true,
            membranes: Some(Membranes::Ruptured),
            rupture_at: NaiveDate::from_ymd_opt(2024, 5, 10)
                .and_then(|d| d.and_hms_opt(6, 45, 0)),
            fluid_color: Some("Meconial".into()),
            ..PelvicExam::default()
        };
        let mapping = map_fields(
            &snapshot,
            &DatingSummary::default(),
            RobsonGroup::Unclassified,
            &ctx,
        );
        assert_eq!(mapping.values["Bolsa_MJR5"], "Rota");
        assert_eq!(mapping.values["DataBolsa"], "06:45 de 10/05");
        assert_eq!(mapping.values["Liquido"], "Meconial");
        assert!(!mapping.pelvic_exam_performed);
    }

    #[test]
    fn blank_exam_values_map_to_empty_fields() {
        let ctx = context();
        let mut snapshot = EncounterSnapshot::default();
        snapshot.physical_exam.blood_pressure = Some("  ".into());
        snapshot.physical_exam.fundal_height = Some(String::new());
        snapshot.physical_exam.uterine_dynamics = Some(" ".into());
        snapshot.physical_exam.heart_rate = Some(" 92 ".into());
        let mapping = map_fields(
            &snapshot,
            &DatingSummary::default(),
            RobsonGroup::Unclassified,
            &ctx,
        );
        assert_eq!(mapping.values["PA"], "");
        assert_eq!(mapping.values["AU"], "");
        assert_eq!(mapping.values["DU"], "");
        assert_eq!(mapping.values["FC"], "92");
    }

    #[test]
    fn groups_signatures_by_role() {
        let ctx = context();
        let snapshot = EncounterSnapshot {
            signatures: vec![
                signature("Dr.", "Ana"),
                signature("Dra.", "Carla"),
                signature("Acd.", "Bruno"),
                signature("Enf.", "Diego"),
            ],
            ..EncounterSnapshot::default()
        };
        let mapping = map_fields(
            &snapshot,
            &DatingSummary::default(),
            RobsonGroup::Unclassified,
            &ctx,
        );
        assert_eq!(mapping.values["Docente"], "Ana, Carla");
        assert_eq!(mapping.values["Acd"], "Bruno");
        assert_eq!(mapping.values["Ddo"], "");
        assert_eq!(mapping.values["MR"], "");
    }
}
