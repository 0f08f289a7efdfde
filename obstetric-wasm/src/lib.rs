//! JavaScript bridge for the admission form page.

use obstetric_core::{NoteConfig, NoteContext, NoteError};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsNoteConfig {
    #[serde(default)]
    clinic_utc_offset_minutes: Option<i32>,
    #[serde(default)]
    dating_tolerance_days: Option<u32>,
}

impl From<JsNoteConfig> for NoteConfig {
    fn from(cfg: JsNoteConfig) -> Self {
        let mut base = NoteConfig::default();
        if let Some(minutes) = cfg.clinic_utc_offset_minutes {
            base.clinic_utc_offset_minutes = minutes;
        }
        if let Some(days) = cfg.dating_tolerance_days {
            base.dating_tolerance_days = days;
        }
        base
    }
}

/// Note, dating and Robson group for the form payload.
#[wasm_bindgen]
pub fn build_report(form: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let (form, config, ctx) = prepare(form, config)?;
    let report = obstetric_note::build_report_value(&form, &ctx, &config).map_err(js_error)?;
    to_value(&report).map_err(|err| JsValue::from_str(&format!("cannot serialize report: {err}")))
}

/// Note text only.
#[wasm_bindgen]
pub fn render_note(form: JsValue, config: Option<JsValue>) -> Result<String, JsValue> {
    let (form, config, ctx) = prepare(form, config)?;
    obstetric_note::render_note_value(&form, &ctx, &config).map_err(js_error)
}

/// Template choice and field values for filling the printed form.
#[wasm_bindgen]
pub fn map_pdf_fields(form: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let (form, config, ctx) = prepare(form, config)?;
    let mapping = obstetric_note::map_pdf_fields_value(&form, &ctx, &config).map_err(js_error)?;
    to_value(&mapping)
        .map_err(|err| JsValue::from_str(&format!("cannot serialize field mapping: {err}")))
}

fn prepare(
    form: JsValue,
    config: Option<JsValue>,
) -> Result<(serde_json::Value, NoteConfig, NoteContext), JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let form = from_value::<serde_json::Value>(form)
        .map_err(|err| JsValue::from_str(&format!("cannot read form JSON: {err}")))?;

    let config = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsNoteConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("cannot read config: {err}")))?;
            NoteConfig::from(cfg)
        }
        _ => NoteConfig::default(),
    };

    let ctx = NoteContext::current(&config).map_err(js_error)?;
    Ok((form, config, ctx))
}

fn js_error(err: NoteError) -> JsValue {
    JsValue::from_str(&format!("note error: {err}"))
}
