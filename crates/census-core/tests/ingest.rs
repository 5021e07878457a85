// File: crates/census-core/tests/ingest.rs
// Purpose: Row mapping for the grade-level survey export: drop rules, response parsing, normalization.

use std::collections::HashMap;

use census_core::{Columns, CsResponse, GradeBand, RecordStore, School, SchoolRowMapper};
use pretty_assertions::assert_eq;

fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn survey_row(
    district: &str,
    students: &str,
    stages: [&str; 3],
    cs: &str,
) -> HashMap<String, String> {
    row(&[
        ("School District Name", district),
        ("School Name", "Lincoln"),
        ("Students", students),
        ("Stage El", stages[0]),
        ("Stage Mi", stages[1]),
        ("Stage Hi", stages[2]),
        ("Teaches CS?", cs),
    ])
}

#[test]
fn maps_a_complete_row() {
    let mapper = SchoolRowMapper::new();
    let school = mapper.map(&survey_row("Adams 12", "420", ["1", "1", "0"], "Yes")).unwrap();
    assert_eq!(
        school,
        School {
            district: "Adams 12".into(),
            school: "Lincoln".into(),
            population: 420,
            grade_bands: [GradeBand::Elementary, GradeBand::Middle].into(),
            cs_response: CsResponse::Yes,
        }
    );
}

#[test]
fn drops_rows_without_bands_or_students() {
    let mapper = SchoolRowMapper::new();
    assert!(mapper.map(&survey_row("A", "300", ["0", "0", ""], "No")).is_none());
    assert!(mapper.map(&survey_row("A", "0", ["1", "0", "0"], "No")).is_none());
    assert!(mapper.map(&survey_row("A", "", ["1", "0", "0"], "No")).is_none());
    assert!(mapper.map(&survey_row("A", "1,200", ["1", "0", "0"], "No")).is_none());
    assert!(mapper.map(&survey_row("A", "-4", ["1", "0", "0"], "No")).is_none());

    let mut missing = survey_row("A", "10", ["1", "0", "0"], "No");
    missing.remove("Students");
    assert!(mapper.map(&missing).is_none());

    // a stage flag only counts when it is exactly "1"
    assert!(mapper.map(&survey_row("A", "10", ["yes", "2", "true"], "No")).is_none());
}

#[test]
fn accepts_integral_decimal_populations() {
    let mapper = SchoolRowMapper::new();
    let school = mapper.map(&survey_row("A", " 75.0 ", ["0", "0", "1"], "No")).unwrap();
    assert_eq!(school.population, 75);
    assert!(mapper.map(&survey_row("A", "12.5", ["0", "0", "1"], "No")).is_none());
}

#[test]
fn blank_or_unrecognised_response_is_unknown() {
    let mapper = SchoolRowMapper::new();
    let cases = [
        ("", CsResponse::Unknown),
        ("Maybe", CsResponse::Unknown),
        ("Inconsistent", CsResponse::Inconsistent),
        (" No ", CsResponse::No),
    ];
    for (raw, want) in cases {
        let school = mapper.map(&survey_row("A", "10", ["1", "0", "0"], raw)).unwrap();
        assert_eq!(school.cs_response, want, "raw {raw:?}");
    }

    let mut absent = survey_row("A", "10", ["1", "0", "0"], "");
    absent.remove("Teaches CS?");
    assert_eq!(mapper.map(&absent).unwrap().cs_response, CsResponse::Unknown);
}

#[test]
fn normalizer_and_custom_columns_apply() {
    let columns = Columns { students: "Enrollment".into(), ..Columns::default() };
    let mapper = SchoolRowMapper::new()
        .with_columns(columns)
        .with_district_normalizer(|name| name.trim().to_uppercase());

    let mut raw = survey_row("  adams 12 ", "ignored", ["1", "0", "0"], "Yes");
    raw.insert("Enrollment".into(), "88".into());
    let school = mapper.map(&raw).unwrap();
    assert_eq!(school.district, "ADAMS 12");
    assert_eq!(school.population, 88);
}

#[test]
fn ingest_counts_dropped_rows() {
    let rows = vec![
        survey_row("A", "100", ["1", "0", "0"], "Yes"),
        survey_row("A", "0", ["1", "0", "0"], "Yes"),
        survey_row("B", "50", ["0", "0", "0"], "No"),
        survey_row("B", "60", ["0", "1", "1"], ""),
    ];
    let store = SchoolRowMapper::new().ingest(rows);
    assert_eq!(store.len(), 2);
    assert_eq!(store.dropped(), 2);
    assert_eq!(store[1].district, "B");
    assert_eq!(store.get(2), None);

    let generic: RecordStore<u32> = RecordStore::ingest(["1", "x", "3"], |s| s.parse().ok());
    assert_eq!(generic.records(), &[1, 3]);
    assert_eq!(generic.dropped(), 1);
}

#[test]
fn school_constructor_enforces_validity() {
    assert!(School::new("A", "X", 0, [GradeBand::High], CsResponse::No).is_none());
    assert!(School::new("A", "X", 5, Vec::<GradeBand>::new(), CsResponse::No).is_none());
    let s = School::new("A", "X", 5, [GradeBand::High, GradeBand::High], CsResponse::No).unwrap();
    assert_eq!(s.grade_bands.len(), 1);
}
