//! Flat admission-form JSON to [`EncounterSnapshot`].
//!
//! The web form posts every input under its HTML name: checkboxes as `"on"`
//! (or `false` when unchecked), counts as strings, dates as `YYYY-MM-DD`.
//! Timestamped dates are read on the clinic clock from [`NoteConfig`].

use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use obstetric_core::temporal::{parse_form_date, parse_form_datetime};
use obstetric_core::{
    Comorbidities, ConceptusRecord, EncounterSnapshot, Identification, LaborOnset, Medication,
    Membranes, NoteConfig, NoteError, ObstetricHistory, Parity, PelvicExam, PhysicalExam,
    Presentation, RapidTest, Serology, Signature, SpeculumExam, SubstanceUse, UltrasoundExam,
};
use serde_json::{Map, Value};

/// Reads a snapshot from the form's JSON text.
pub fn snapshot_from_form_str(
    form_json: &str,
    config: &NoteConfig,
) -> Result<EncounterSnapshot, NoteError> {
    let value: Value =
        serde_json::from_str(form_json).map_err(|err| NoteError::Parse(err.to_string()))?;
    snapshot_from_form_value(&value, config)
}

/// Reads a snapshot from an already-parsed form payload.
pub fn snapshot_from_form_value(
    form: &Value,
    config: &NoteConfig,
) -> Result<EncounterSnapshot, NoteError> {
    let form = form
        .as_object()
        .ok_or_else(|| NoteError::Parse("form payload must be a JSON object".to_string()))?;
    let offset = config.clinic_offset()?;

    Ok(EncounterSnapshot {
        identification: Identification {
            name: text(form, "nome"),
            age: text(form, "idade"),
            origin: text(form, "procedencia"),
            record_number: text(form, "prontuario"),
            visit_count: text(form, "consultas"),
        },
        obstetric: obstetric_history(form, offset),
        serology: Serology {
            blood_type: text(form, "tipo_sanguineo"),
            syphilis: rapid_test(form, "tr_sifilis"),
            hiv: rapid_test(form, "tr_hiv"),
            hepatitis_b: rapid_test(form, "tr_hepb"),
            hepatitis_c: rapid_test(form, "tr_hepc"),
        },
        allergies: tags(form, "alergias_tags"),
        comorbidities: Comorbidities {
            gdm_diet: flag(form, "comorbidade_dmg_dieta"),
            gdm_insulin: flag(form, "comorbidade_dmg_insulina"),
            gestational_hypertension: flag(form, "comorbidade_hag"),
            chronic_hypertension: flag(form, "comorbidade_has"),
            others: tags(form, "comorbidades_tags"),
        },
        substance_use: SubstanceUse {
            alcohol: flag(form, "etilismo"),
            tobacco: flag(form, "tabagismo"),
            tobacco_detail: text(form, "tabagismo_detalhe"),
            drugs: flag(form, "drogas"),
            drug_tags: tags(form, "drogas_tags"),
        },
        medications: medications(form),
        present_illness: text(form, "hda"),
        physical_exam: physical_exam(form),
        lab_results: text(form, "exames_laboratoriais"),
        imaging_notes: text(form, "exames_imagem"),
        ultrasounds: ultrasounds(form, offset),
        diagnostic_hypotheses: tags(form, "hipotese_tags"),
        plan: tags(form, "conduta")
            .into_iter()
            .chain(tags(form, "condutas_tags"))
            .collect(),
        signatures: signatures(form),
    })
}

fn obstetric_history(form: &Map<String, Value>, offset: FixedOffset) -> ObstetricHistory {
    ObstetricHistory {
        nulligravida: flag(form, "nuligesta"),
        parity: Parity {
            gestations: count(form, "gestacoes"),
            vaginal: count(form, "partos-normais"),
            cesarean: count(form, "partos-cesarea"),
            abortions: count(form, "abortos"),
        },
        lmp: date(form, "dum", offset),
        lmp_uncertain: flag(form, "dum_incerta"),
        usg_date: date(form, "data-usg", offset),
        usg_age_text: text(form, "ig-usg"),
        last_delivery: date(form, "dup", offset),
        multiple_gestation: flag(form, "gemelaridade"),
        presentation: text(form, "apresentacao").and_then(|v| presentation(&v)),
        labor_onset: text(form, "carater_internacao").and_then(|v| labor_onset(&v)),
    }
}

fn physical_exam(form: &Map<String, Value>) -> PhysicalExam {
    PhysicalExam {
        blood_pressure: text(form, "pa"),
        blood_pressure_lateral: text(form, "pa_dle"),
        heart_rate: text(form, "fc"),
        spo2: text(form, "spo2"),
        temperature: text(form, "tax"),
        proteinuria: text(form, "proteinuria").filter(|v| v != "N.R"),
        abdomen: text(form, "abd"),
        fetal_dorsum: text(form, "dorso"),
        fundal_height: text(form, "altura_uterina"),
        fetal_heart_rate: text(form, "bcf"),
        fetal_movements: text(form, "mov_fetal"),
        uterine_tone: text(form, "tonus_uterino"),
        uterine_dynamics: text(form, "dinamica_uterina"),
        uterine_dynamics_absent: flag(form, "dinamica_ausente"),
        pelvic: PelvicExam {
            avoided: flag(form, "toque_evitado"),
            cervical_thickness: text(form, "espessura"),
            cervical_position: text(form, "posicao"),
            dilation_cm: text(form, "dilatacao"),
            membranes: text(form, "bolsa").and_then(|v| membranes(&v)),
            rupture_at: datetime(form, "hora_rompimento"),
            fluid_color: text(form, "cor_liquido"),
            bleeding: text(form, "sangramento").and_then(|v| presence(&v)),
        },
        speculum: SpeculumExam {
            avoided: flag(form, "especular_evitado"),
            description: text(form, "desc_especular"),
        },
    }
}

fn medications(form: &Map<String, Value>) -> Vec<Medication> {
    let Some(entries) = form.get("custom_meds").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            // Already-formatted text from the medication checklist.
            Value::String(line) => Some(Medication {
                name: String::new(),
                dose: Some(line.trim().to_string()).filter(|d| !d.is_empty()),
                free_text: true,
            }),
            Value::Object(obj) => Some(Medication {
                name: text(obj, "name").unwrap_or_default(),
                dose: text(obj, "dose"),
                free_text: flag(obj, "custom"),
            }),
            _ => None,
        })
        .collect()
}

fn ultrasounds(form: &Map<String, Value>, offset: FixedOffset) -> Vec<UltrasoundExam> {
    let Some(exams) = form.get("ultrassonografias").and_then(Value::as_array) else {
        return Vec::new();
    };

    exams
        .iter()
        .filter_map(Value::as_object)
        .map(|exam| UltrasoundExam {
            date: date(exam, "usg_data", offset),
            kind: text(exam, "usg_tipo"),
            conceptuses: exam
                .get("conceptos")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_object)
                        .map(conceptus)
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect()
}

fn conceptus(record: &Map<String, Value>) -> ConceptusRecord {
    ConceptusRecord {
        situation: text(record, "feto_situacao"),
        presentation: text(record, "feto_apresentacao"),
        dorsum: text(record, "feto_dorso"),
        heart_rate: text(record, "feto_bcf"),
        estimated_weight_g: text(record, "feto_peso"),
        weight_percentile: text(record, "feto_percentil"),
        placenta_location: text(record, "placenta_localizacao"),
        placenta_grade: text(record, "placenta_grau"),
        amniotic_fluid_index: text(record, "feto_ila"),
        deepest_pocket: text(record, "feto_mbv"),
        notes: text(record, "feto_observacoes"),
    }
}

fn signatures(form: &Map<String, Value>) -> Vec<Signature> {
    form.get("signatures")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|entry| {
                    let role = text(entry, "title")?;
                    let name = text(entry, "name")?;
                    Some(Signature { role, name })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn presentation(value: &str) -> Option<Presentation> {
    match value.trim().to_lowercase().as_str() {
        "cefálica" | "cefalica" | "cephalic" => Some(Presentation::Cephalic),
        "pélvica" | "pelvica" | "breech" => Some(Presentation::Breech),
        "outra" | "córmica" | "cormica" | "transversa" | "oblíqua" | "obliqua" | "other" => {
            Some(Presentation::Other)
        }
        other => {
            tracing::debug!(value = other, "unknown fetal presentation");
            None
        }
    }
}

/// The form offers "Indução ou Normal" for admissions in labour; it is read as
/// spontaneous onset. An explicit "Indução" is induced.
fn labor_onset(value: &str) -> Option<LaborOnset> {
    match value.trim().to_lowercase().as_str() {
        "indução ou normal" | "normal" | "espontâneo" | "espontaneo" | "spontaneous" => {
            Some(LaborOnset::Spontaneous)
        }
        "indução" | "inducao" | "induced" => Some(LaborOnset::Induced),
        "cesárea" | "cesarea" | "prelabor_cesarean" => Some(LaborOnset::PrelaborCesarean),
        other => {
            tracing::debug!(value = other, "admission type without labour onset");
            None
        }
    }
}

fn membranes(value: &str) -> Option<Membranes> {
    match value.trim().to_lowercase().as_str() {
        "rota" | "ruptured" => Some(Membranes::Ruptured),
        "íntegra" | "integra" | "intact" => Some(Membranes::Intact),
        _ => None,
    }
}

fn presence(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "presente" => Some(true),
        "ausente" => Some(false),
        _ => None,
    }
}

fn rapid_test(form: &Map<String, Value>, key: &str) -> RapidTest {
    match text(form, key).as_deref() {
        Some("reagente") => RapidTest::Reactive,
        Some("nao_reagente") => RapidTest::NonReactive,
        _ => RapidTest::NotPerformed,
    }
}

fn text(form: &Map<String, Value>, key: &str) -> Option<String> {
    match form.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(form: &Map<String, Value>, key: &str) -> bool {
    match form.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.as_str(), "on" | "true"),
        _ => false,
    }
}

/// Non-negative count; blank or malformed entries count as zero.
fn count(form: &Map<String, Value>, key: &str) -> u32 {
    match form.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Tag lists arrive as arrays; single checked values arrive as plain strings.
fn tags(form: &Map<String, Value>, key: &str) -> Vec<String> {
    match form.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn date(form: &Map<String, Value>, key: &str, offset: FixedOffset) -> Option<NaiveDate> {
    let raw = text(form, key)?;
    parse_form_date(&raw, offset)
        .inspect_err(|err| tracing::debug!(field = key, %err, "ignoring form date"))
        .ok()
}

fn datetime(form: &Map<String, Value>, key: &str) -> Option<NaiveDateTime> {
    let raw = text(form, key)?;
    parse_form_datetime(&raw)
        .inspect_err(|err| tracing::debug!(field = key, %err, "ignoring form datetime"))
        .ok()
}
