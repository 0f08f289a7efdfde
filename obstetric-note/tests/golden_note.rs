use std::fs;

use chrono::{TimeZone, Utc};
use obstetric_core::{NoteConfig, NoteContext, RobsonGroup};
use obstetric_note::{build_report_str, map_pdf_fields_value, render_note_str};
use serde_json::Value;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/data/{name}", env!("CARGO_MANIFEST_DIR"))
}

fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).unwrap_or_else(|err| panic!("cannot read {name}: {err}"))
}

fn context() -> NoteContext {
    let now = Utc.with_ymd_and_hms(2024, 5, 10, 17, 5, 0).unwrap();
    NoteContext::new(now, &NoteConfig::default()).expect("default offset is valid")
}

#[test]
fn admission_note_matches_golden() {
    let form = fixture("admission_form.json");
    let note = render_note_str(&form, &context(), &NoteConfig::default())
        .expect("form should render");

    let expected = fixture("admission_note.txt");
    assert_eq!(note, expected.trim_end());
}

#[test]
fn admission_report_classifies_and_dates() {
    let form = fixture("admission_form.json");
    let report = build_report_str(&form, &context(), &NoteConfig::default())
        .expect("form should produce a report");

    assert_eq!(report.robson, RobsonGroup::G5);
    assert_eq!(report.dating.considered_age_days, Some(273));
    assert_eq!(report.dating.usg_corrected_age_days, Some(273));
    assert_eq!(report.note, fixture("admission_note.txt").trim_end());
    assert_eq!(report.generated_at.to_rfc3339(), "2024-05-10T14:05:00-03:00");
}

#[test]
fn admission_fields_match_golden() {
    let form: Value =
        serde_json::from_str(&fixture("admission_form.json")).expect("fixture is JSON");
    let mapping = map_pdf_fields_value(&form, &context(), &NoteConfig::default())
        .expect("form should map");

    let actual = serde_json::to_value(mapping).expect("mapping serializes");
    let expected: Value =
        serde_json::from_str(&fixture("admission_fields.json")).expect("golden is JSON");
    assert_eq!(actual, expected);
}
