//! Clinical note text, assembled section by section.

use obstetric_core::dating::DatingSummary;
use obstetric_core::temporal::{format_date_br, format_time_date_br};
use obstetric_core::{
    ConceptusRecord, EncounterSnapshot, GestationalAge, Identification, Membranes, NoteContext,
    ObstetricHistory, PelvicExam, PhysicalExam, RapidTest, Serology, SpeculumExam, SubstanceUse,
};
use serde::{Deserialize, Serialize};

const SECTION_SEPARATOR: &str = "\n\n";
const EMPTY_PLACEHOLDER: &str = "—";
const NEGATIVE_HISTORY: &str = "Nega";
const NOT_DESCRIBED: &str = "não descrito";

/// One block of the note. Absent sections are skipped when rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NarrativeSection {
    pub title: String,
    pub body: String,
    pub present: bool,
}

impl NarrativeSection {
    fn untitled(body: String) -> Self {
        Self::titled("", body)
    }

    fn titled(title: &str, body: String) -> Self {
        Self {
            title: title.to_string(),
            present: !body.is_empty(),
            body,
        }
    }

    /// Bulleted list; absent when `items` is empty.
    fn list(title: &str, items: &[String]) -> Self {
        Self::titled(title, bullets(items))
    }

    /// Bulleted list that always renders, with `fallback` standing in for no items.
    fn list_or(title: &str, items: &[String], fallback: &str) -> Self {
        if items.is_empty() {
            Self::titled(title, bullets(&[fallback.to_string()]))
        } else {
            Self::list(title, items)
        }
    }

    /// Rendered text, or `None` for an absent section.
    pub fn render(&self) -> Option<String> {
        if !self.present {
            return None;
        }
        if self.title.is_empty() {
            Some(self.body.clone())
        } else {
            Some(format!("# {}\n{}", self.title, self.body))
        }
    }
}

/// Builds every section in note order.
pub fn build_sections(
    snapshot: &EncounterSnapshot,
    dating: &DatingSummary,
    ctx: &NoteContext,
) -> Vec<NarrativeSection> {
    let medications: Vec<String> = snapshot
        .medications
        .iter()
        .filter_map(|m| m.display())
        .collect();

    vec![
        NarrativeSection::untitled(format!("# SR às {} #", ctx.now.format("%H:%M"))),
        NarrativeSection::untitled(identification(&snapshot.identification)),
        NarrativeSection::untitled(obstetric_history(&snapshot.obstetric, dating)),
        NarrativeSection::untitled(serology(&snapshot.serology)),
        NarrativeSection::list_or("Alergias", &snapshot.allergies, NEGATIVE_HISTORY),
        NarrativeSection::titled(
            "Vícios",
            bullets(&[substance_use(&snapshot.substance_use)]),
        ),
        NarrativeSection::list("Comorbidades", &snapshot.comorbidities.labels()),
        NarrativeSection::list("Em uso de", &medications),
        NarrativeSection::titled(
            "HDA",
            non_empty(snapshot.present_illness.as_deref())
                .unwrap_or(EMPTY_PLACEHOLDER)
                .to_string(),
        ),
        NarrativeSection::titled("Exame Físico", physical_exam(&snapshot.physical_exam)),
        NarrativeSection::titled(
            "Exames Laboratoriais",
            non_empty(snapshot.lab_results.as_deref())
                .unwrap_or_default()
                .to_string(),
        ),
        NarrativeSection::titled("Exames de Imagem", imaging(snapshot)),
        NarrativeSection::list("Hipótese Diagnóstica", &snapshot.diagnostic_hypotheses),
        NarrativeSection::list_or("Conduta", &snapshot.plan, EMPTY_PLACEHOLDER),
        NarrativeSection::untitled(signatures(snapshot)),
    ]
}

/// Joins the present sections with a blank line.
pub fn render_sections(sections: &[NarrativeSection]) -> String {
    sections
        .iter()
        .filter_map(NarrativeSection::render)
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

pub fn render_note(
    snapshot: &EncounterSnapshot,
    dating: &DatingSummary,
    ctx: &NoteContext,
) -> String {
    render_sections(&build_sections(snapshot, dating, ctx))
}

fn identification(id: &Identification) -> String {
    let mut parts = Vec::new();
    if let Some(name) = non_empty(id.name.as_deref()) {
        parts.push(name.to_string());
    }
    if let Some(age) = non_empty(id.age.as_deref()) {
        parts.push(format!("{age} anos"));
    }
    if let Some(origin) = non_empty(id.origin.as_deref()) {
        parts.push(format!("procedente de {origin}."));
    }
    parts.join(", ")
}

fn obstetric_history(obstetric: &ObstetricHistory, dating: &DatingSummary) -> String {
    if obstetric.nulligravida {
        return "Nuligesta.".to_string();
    }

    let mut first_line = vec![obstetric.parity.to_string()];
    if obstetric.lmp_uncertain {
        first_line.push("DUM incerta".to_string());
    } else if let Some(lmp) = obstetric.lmp {
        first_line.push(format!("DUM {}", format_date_br(lmp)));
        if let Some(age) = dating.lmp_age_days {
            first_line.push(format!("IG DUM {}", GestationalAge::from_days(age)));
        }
    }

    let mut usg = Vec::new();
    if let Some(age) = dating.usg_corrected_age_days {
        usg.push(format!("IG USG {}", GestationalAge::from_days(age)));
    }
    if let (Some(text), Some(date)) = (
        non_empty(obstetric.usg_age_text.as_deref()),
        obstetric.usg_date,
    ) {
        usg.push(format!("({text} em {})", format_date_br(date)));
    }

    let mut second_line = Vec::new();
    if !usg.is_empty() {
        second_line.push(usg.join(" "));
    }
    if let Some(due) = dating.due_date {
        second_line.push(format!("DPP {}", format_date_br(due)));
    }

    let first_line = first_line.join(" | ");
    if second_line.is_empty() {
        first_line
    } else {
        format!("{first_line}\n{}", second_line.join(" | "))
    }
}

fn serology(serology: &Serology) -> String {
    let mut parts = Vec::new();
    if let Some(blood_type) = non_empty(serology.blood_type.as_deref()) {
        if blood_type != "?" && blood_type != "N.R" {
            parts.push(format!("TS: {blood_type}"));
        }
    }

    for (result, singular) in [
        (RapidTest::Reactive, "Reagente"),
        (RapidTest::NonReactive, "Não Reagente"),
    ] {
        let names: Vec<&str> = serology
            .rapid_tests()
            .into_iter()
            .filter(|(_, r)| *r == result)
            .map(|(name, _)| name)
            .collect();
        if !names.is_empty() {
            let plural = if names.len() > 1 { "s" } else { "" };
            parts.push(format!("TR {} {singular}{plural}", names.join(", ")));
        }
    }

    parts.join(" | ")
}

/// `Nega A, B e C.` followed by whatever was affirmed.
fn substance_use(usage: &SubstanceUse) -> String {
    let mut denied = Vec::new();
    let mut affirmed = Vec::new();

    if usage.alcohol {
        affirmed.push("Etilista".to_string());
    } else {
        denied.push("Etilismo");
    }

    if usage.tobacco {
        affirmed.push(match non_empty(usage.tobacco_detail.as_deref()) {
            Some(detail) => format!("Tabagista ({detail})"),
            None => "Tabagista".to_string(),
        });
    } else {
        denied.push("Tabagismo");
    }

    if usage.drugs {
        let drugs = if usage.drug_tags.is_empty() {
            "não especificado".to_string()
        } else {
            usage.drug_tags.join(", ")
        };
        affirmed.push(format!("Usuária de drogas ({drugs})"));
    } else {
        denied.push("Drogadição");
    }

    let mut clauses = Vec::new();
    if !denied.is_empty() {
        clauses.push(format!("{NEGATIVE_HISTORY} {}.", join_with_and(&denied)));
    }
    if !affirmed.is_empty() {
        clauses.push(affirmed.join(", "));
    }
    clauses.join(" ")
}

fn physical_exam(exam: &PhysicalExam) -> String {
    let vitals = [
        labeled(&exam.blood_pressure, |v| format!("PA {v} mmHg")),
        labeled(&exam.blood_pressure_lateral, |v| format!("PA pós DLE {v} mmHg")),
        labeled(&exam.heart_rate, |v| format!("FC {v} bpm")),
        labeled(&exam.spo2, |v| format!("SpO2 {v}%")),
        labeled(&exam.temperature, |v| format!("TAx {v}°C")),
        labeled(&exam.proteinuria, |v| format!("Proteinúria: {v}")),
    ];

    let dynamics = if exam.uterine_dynamics_absent {
        Some("DU Ausente".to_string())
    } else {
        labeled(&exam.uterine_dynamics, |v| format!("DU {v}"))
    };
    let obstetric = [
        labeled(&exam.fundal_height, |v| format!("AU {v} cm")),
        labeled(&exam.fetal_heart_rate, |v| format!("BCF {v} bpm")),
        labeled(&exam.fetal_movements, |v| format!("MF {v}")),
        labeled(&exam.uterine_tone, |v| format!("TU {v}")),
        dynamics,
    ];

    let lines = [
        pipe_join(vitals),
        pipe_join(obstetric),
        pelvic_exam(&exam.pelvic),
        speculum_exam(&exam.speculum),
    ];
    let lines: Vec<String> = lines.into_iter().filter(|l| !l.is_empty()).collect();
    bullets(&lines)
}

fn pelvic_exam(pelvic: &PelvicExam) -> String {
    if pelvic.avoided {
        return "TV: evitado.".to_string();
    }

    let mut details = Vec::new();
    if let Some(thickness) = non_empty(pelvic.cervical_thickness.as_deref()) {
        details.push(format!("espessura {}", thickness.to_lowercase()));
    }
    if let Some(position) = non_empty(pelvic.cervical_position.as_deref()) {
        details.push(format!("posição {}", position.to_lowercase()));
    }
    if let Some(dilation) = non_empty(pelvic.dilation_cm.as_deref()) {
        details.push(format!("pérvio para {dilation} cm"));
    }
    match pelvic.membranes {
        Some(Membranes::Ruptured) => {
            details.push(match pelvic.rupture_at {
                Some(at) => format!("bolsa rota às {}", format_time_date_br(at)),
                None => "bolsa rota".to_string(),
            });
            if let Some(color) = non_empty(pelvic.fluid_color.as_deref()) {
                details.push(format!("líquido {}", color.to_lowercase()));
            }
        }
        Some(intact) => details.push(format!("bolsa {}", intact.to_string().to_lowercase())),
        None => {}
    }
    match pelvic.bleeding {
        Some(true) => details.push("com sangramento em dedo de luva".to_string()),
        Some(false) => details.push("sem sangramento em dedo de luva".to_string()),
        None => {}
    }

    if details.is_empty() {
        "TV: não realizado.".to_string()
    } else {
        format!("TV: {}.", details.join(", "))
    }
}

fn speculum_exam(speculum: &SpeculumExam) -> String {
    if speculum.avoided {
        return "EE: evitado.".to_string();
    }
    let description = non_empty(speculum.description.as_deref()).unwrap_or(NOT_DESCRIBED);
    format!("EE: {description}.")
}

/// Dated ultrasound exams with their conceptus findings, then free-text imaging.
fn imaging(snapshot: &EncounterSnapshot) -> String {
    let mut lines = Vec::new();

    for exam in &snapshot.ultrasounds {
        let Some(date) = exam.date else {
            continue;
        };
        let header = match non_empty(exam.kind.as_deref()) {
            Some(kind) => format!("- ({}) USG {kind}:", format_date_br(date)),
            None => format!("- ({}) USG:", format_date_br(date)),
        };
        lines.push(header);
        lines.extend(
            exam.conceptuses
                .iter()
                .map(conceptus_findings)
                .filter(|f| !f.is_empty())
                .map(|f| format!("  - {f}")),
        );
    }

    if let Some(notes) = non_empty(snapshot.imaging_notes.as_deref()) {
        lines.push(notes.to_string());
    }

    lines.join("\n")
}

fn conceptus_findings(record: &ConceptusRecord) -> String {
    let field = |value: &Option<String>| non_empty(value.as_deref()).map(str::to_string);
    let mut details = Vec::new();

    if let Some(v) = field(&record.situation) {
        details.push(format!("situação {}", v.to_lowercase()));
    }
    if let Some(v) = field(&record.presentation) {
        details.push(format!("apresentação {}", v.to_lowercase()));
    }
    if let Some(v) = field(&record.dorsum) {
        details.push(format!("dorso à {}", v.to_lowercase()));
    }
    if let Some(v) = field(&record.heart_rate) {
        details.push(format!("BCF {v}bpm"));
    }
    if let Some(weight) = field(&record.estimated_weight_g) {
        match field(&record.weight_percentile) {
            Some(p) => details.push(format!("PFE {weight}g (p{p})")),
            None => details.push(format!("PFE {weight}g")),
        }
    }
    if let Some(location) = field(&record.placenta_location) {
        match field(&record.placenta_grade) {
            Some(grade) => {
                details.push(format!("Placenta {}, grau {grade}", location.to_lowercase()))
            }
            None => details.push(format!("Placenta {}", location.to_lowercase())),
        }
    }
    if let Some(v) = field(&record.amniotic_fluid_index) {
        details.push(format!("ILA {v}cm"));
    }
    if let Some(v) = field(&record.deepest_pocket) {
        details.push(format!("MBV {v}cm"));
    }

    let mut findings = details.join(", ");
    if let Some(notes) = field(&record.notes) {
        if !findings.is_empty() {
            findings.push(' ');
        }
        findings.push_str(&format!("({notes})"));
    }
    findings
}

fn signatures(snapshot: &EncounterSnapshot) -> String {
    snapshot
        .signatures
        .iter()
        .filter(|s| !s.role.trim().is_empty() && !s.name.trim().is_empty())
        .map(|s| format!("{} {}", s.role.trim(), s.name.trim()))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pipe_join<const N: usize>(parts: [Option<String>; N]) -> String {
    parts.into_iter().flatten().collect::<Vec<_>>().join(" | ")
}

/// `a`, `a e b`, `a, b e c`.
fn join_with_and(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [head @ .., last] => format!("{} e {last}", head.join(", ")),
    }
}

/// `render` applied to a trimmed, non-blank value.
pub(crate) fn labeled(value: &Option<String>, render: impl Fn(&str) -> String) -> Option<String> {
    non_empty(value.as_deref()).map(render)
}

pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
