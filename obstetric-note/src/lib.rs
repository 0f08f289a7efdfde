//! Admission form to clinical note: dating, Robson group, narrative text and
//! the printed form's field values.

pub mod fields;
pub mod form;
pub mod narrative;

use chrono::{DateTime, FixedOffset};
use obstetric_core::dating::{reconcile, DatingSummary};
use obstetric_core::robson::classify_encounter;
use obstetric_core::{EncounterSnapshot, NoteConfig, NoteContext, NoteError, RobsonGroup};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use fields::{map_fields, FieldMapping, FormTemplate};
pub use form::{snapshot_from_form_str, snapshot_from_form_value};
pub use narrative::{build_sections, render_note, render_sections, NarrativeSection};

/// Everything derived from one encounter at one instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncounterReport {
    pub generated_at: DateTime<FixedOffset>,
    pub dating: DatingSummary,
    pub robson: RobsonGroup,
    pub sections: Vec<NarrativeSection>,
    pub note: String,
}

/// Builds the report for an already-captured snapshot.
pub fn analyze_encounter(
    snapshot: &EncounterSnapshot,
    ctx: &NoteContext,
    config: &NoteConfig,
) -> EncounterReport {
    let dating = reconcile(&snapshot.dating_inputs(), ctx.today(), config);
    let robson = classify_encounter(snapshot, &dating);
    let sections = build_sections(snapshot, &dating, ctx);
    let note = render_sections(&sections);

    tracing::debug!(
        robson = %robson,
        gestational_age_days = ?dating.gestational_age_days(),
        sections = sections.iter().filter(|s| s.present).count(),
        "encounter analyzed"
    );

    EncounterReport {
        generated_at: ctx.now,
        dating,
        robson,
        sections,
        note,
    }
}

/// Report from the form's JSON text.
pub fn build_report_str(
    form_json: &str,
    ctx: &NoteContext,
    config: &NoteConfig,
) -> Result<EncounterReport, NoteError> {
    let snapshot = snapshot_from_form_str(form_json, config)?;
    Ok(analyze_encounter(&snapshot, ctx, config))
}

/// Report from an already-parsed form payload.
pub fn build_report_value(
    form: &Value,
    ctx: &NoteContext,
    config: &NoteConfig,
) -> Result<EncounterReport, NoteError> {
    let snapshot = snapshot_from_form_value(form, config)?;
    Ok(analyze_encounter(&snapshot, ctx, config))
}

/// Note text only.
pub fn render_note_value(
    form: &Value,
    ctx: &NoteContext,
    config: &NoteConfig,
) -> Result<String, NoteError> {
    let snapshot = snapshot_from_form_value(form, config)?;
    let dating = reconcile(&snapshot.dating_inputs(), ctx.today(), config);
    Ok(render_note(&snapshot, &dating, ctx))
}

pub fn render_note_str(
    form_json: &str,
    ctx: &NoteContext,
    config: &NoteConfig,
) -> Result<String, NoteError> {
    let value: Value =
        serde_json::from_str(form_json).map_err(|err| NoteError::Parse(err.to_string()))?;
    render_note_value(&value, ctx, config)
}

/// PDF field values for the form payload.
pub fn map_pdf_fields_value(
    form: &Value,
    ctx: &NoteContext,
    config: &NoteConfig,
) -> Result<FieldMapping, NoteError> {
    let snapshot = snapshot_from_form_value(form, config)?;
    let dating = reconcile(&snapshot.dating_inputs(), ctx.today(), config);
    let robson = classify_encounter(&snapshot, &dating);
    Ok(map_fields(&snapshot, &dating, robson, ctx))
}
