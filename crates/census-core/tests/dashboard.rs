// File: crates/census-core/tests/dashboard.rs
// Purpose: School dashboard views: the two-school walkthrough, readiness barrier, district table,
// map shading, and render triggers.

use std::cell::Cell;
use std::rc::Rc;

use census_core::{
    CensusError, CsResponse, Dashboard, DashboardBuilder, DistrictRow, GradeBand, RecordStore,
    RollupEntry, School,
};
use pretty_assertions::assert_eq;

fn school(
    district: &str,
    name: &str,
    population: u32,
    bands: &[GradeBand],
    cs: CsResponse,
) -> School {
    School::new(district, name, population, bands.iter().copied(), cs).expect("valid school")
}

fn two_schools() -> Dashboard {
    let records = RecordStore::from_records(vec![
        school("A", "X", 100, &[GradeBand::Elementary], CsResponse::Yes),
        school("A", "Y", 50, &[GradeBand::Elementary, GradeBand::Middle], CsResponse::Unknown),
    ]);
    DashboardBuilder::new().records(records).districts(["A"]).build().unwrap()
}

fn county() -> Dashboard {
    let records = RecordStore::from_records(vec![
        school("Adams", "North", 400, &[GradeBand::High], CsResponse::Yes),
        school("Adams", "South", 350, &[GradeBand::Middle, GradeBand::High], CsResponse::No),
        school("Adams", "Mill", 120, &[GradeBand::Elementary], CsResponse::Unknown),
        school("Boulder", "Pine", 90, &[GradeBand::Elementary], CsResponse::Unknown),
        school("Boulder", "Ridge", 610, &[GradeBand::High], CsResponse::Inconsistent),
        school(
            "Custer",
            "Lone",
            40,
            &[GradeBand::Elementary, GradeBand::Middle, GradeBand::High],
            CsResponse::Yes,
        ),
    ]);
    DashboardBuilder::new()
        .records(records)
        .districts(["Adams", "Boulder", "Delta"])
        .build()
        .unwrap()
}

#[test]
fn two_school_walkthrough_round_trips() {
    let mut dash = two_schools();

    let baseline = (
        dash.grade_band_counts().unwrap(),
        dash.cs_response_counts().unwrap(),
        dash.rollups().unwrap(),
        dash.population_by_district().unwrap(),
    );
    assert_eq!(baseline.0, vec![(GradeBand::Middle, 1), (GradeBand::Elementary, 2)]);
    assert_eq!(baseline.1, vec![(CsResponse::Yes, 1), (CsResponse::Unknown, 1)]);
    assert_eq!(
        baseline.2,
        vec![("A".to_string(), RollupEntry { count: 2, responded: 1, cs_yes: 1 })]
    );
    assert_eq!(baseline.3, vec![("A".to_string(), 150)]);

    dash.filter_cs_responses(&[CsResponse::Yes]).unwrap();
    assert_eq!(
        dash.grade_band_counts().unwrap(),
        vec![(GradeBand::Middle, 0), (GradeBand::Elementary, 1)]
    );
    assert_eq!(
        dash.rollups().unwrap(),
        vec![("A".to_string(), RollupEntry { count: 1, responded: 1, cs_yes: 1 })]
    );
    assert_eq!(dash.population_by_district().unwrap(), vec![("A".to_string(), 100)]);

    dash.filter_cs_responses(&[]).unwrap();
    let after = (
        dash.grade_band_counts().unwrap(),
        dash.cs_response_counts().unwrap(),
        dash.rollups().unwrap(),
        dash.population_by_district().unwrap(),
    );
    assert_eq!(after, baseline);
}

#[test]
fn barrier_waits_for_both_inputs() {
    let records =
        RecordStore::from_records(vec![school("A", "X", 1, &[GradeBand::High], CsResponse::No)]);

    let only_records = DashboardBuilder::new().records(records.clone());
    assert!(!only_records.is_ready());
    assert_eq!(only_records.build().err(), Some(CensusError::MissingInput("district keys")));

    let only_keys = DashboardBuilder::new().districts(["A"]);
    assert_eq!(only_keys.build().err(), Some(CensusError::MissingInput("school records")));

    let both = DashboardBuilder::new().districts(["A"]).records(records);
    assert!(both.is_ready());
    assert!(both.build().is_ok());
}

#[test]
fn district_table_matches_rollups() {
    let dash = county();
    let table = dash.district_table().unwrap();
    assert_eq!(
        table,
        vec![
            DistrictRow {
                district: "Adams".into(),
                population: 870,
                schools: 3,
                responded: 2,
                cs_yes: 1,
                teaching_share: Some(1.0 / 3.0),
            },
            DistrictRow {
                district: "Boulder".into(),
                population: 700,
                schools: 2,
                responded: 1,
                cs_yes: 0,
                teaching_share: Some(0.0),
            },
            DistrictRow {
                district: "Custer".into(),
                population: 40,
                schools: 1,
                responded: 1,
                cs_yes: 1,
                teaching_share: Some(1.0),
            },
        ]
    );

    for ((name, entry), row) in dash.rollups().unwrap().into_iter().zip(&table) {
        assert_eq!(name, row.district);
        assert_eq!(entry.count as usize, row.schools);
        assert_eq!(entry.responded as usize, row.responded);
        assert_eq!(entry.cs_yes as usize, row.cs_yes);
    }
}

#[test]
fn emptied_districts_leave_the_school_views() {
    let mut dash = county();
    dash.filter_grade_bands(&[GradeBand::High]).unwrap();

    let names: Vec<&str> = dash.district_schools().unwrap().iter().map(|d| d.district).collect();
    assert_eq!(names, vec!["Adams", "Boulder", "Custer"]);

    dash.filter_cs_responses(&[CsResponse::Yes, CsResponse::No]).unwrap();
    let rows = dash.district_schools().unwrap();
    let names: Vec<&str> = rows.iter().map(|d| d.district).collect();
    assert_eq!(names, vec!["Adams", "Custer"]);
    let adams: Vec<&str> = rows[0].schools.iter().map(|s| s.school.as_str()).collect();
    assert_eq!(adams, vec!["North", "South"]);

    let top: Vec<&str> = dash.top_districts(1).unwrap().iter().map(|d| d.district).collect();
    assert_eq!(top, vec!["Adams"]);
    assert_eq!(dash.top_districts(usize::MAX).unwrap().len(), 2);

    // the empty Boulder group still exists in the raw rollup, at zero
    let boulder = dash.rollups().unwrap().into_iter().find(|(d, _)| d == "Boulder").unwrap();
    assert_eq!(boulder.1, RollupEntry::default());
}

#[test]
fn shading_covers_every_known_district() {
    let mut dash = county();
    assert_eq!(dash.unmatched_districts().unwrap(), vec!["Custer"]);

    dash.filter_districts(&["Adams"]).unwrap();
    let shades = dash.district_shading().unwrap();
    let names: Vec<&str> = shades.iter().map(|s| s.district.as_str()).collect();
    assert_eq!(names, vec!["Adams", "Boulder", "Delta"]);

    assert_eq!(shades[0].population, 870);
    assert_eq!(shades[0].rollup, RollupEntry { count: 3, responded: 2, cs_yes: 1 });
    assert_eq!(shades[0].teaching_share, Some(1.0 / 3.0));
    // filtered out, and missing from the records entirely
    assert_eq!((shades[1].population, shades[1].teaching_share), (0, None));
    assert_eq!((shades[2].population, shades[2].teaching_share), (0, None));
}

#[test]
fn shading_and_table_agree_on_population() {
    let mut dash = county();
    dash.filter_grade_bands(&[GradeBand::High, GradeBand::Middle]).unwrap();
    let table = dash.district_table().unwrap();
    let shades = dash.district_shading().unwrap();
    let populations = dash.population_by_district().unwrap();
    for row in &table {
        let shade = shades.iter().find(|s| s.district == row.district);
        if let Some(shade) = shade {
            assert_eq!(shade.population, row.population, "{}", row.district);
        }
        let (_, total) = populations.iter().find(|(d, _)| *d == row.district).unwrap();
        assert_eq!(*total, row.population, "{}", row.district);
    }
    // Adams keeps North and South, Boulder keeps Ridge
    assert_eq!(shades[0].population, 750);
    assert_eq!(shades[1].population, 610);
}

#[test]
fn rollup_invariant_holds_through_filter_changes() {
    let mut dash = county();
    let check = |dash: &Dashboard| {
        for (name, e) in dash.rollups().unwrap() {
            assert!(e.cs_yes <= e.responded && e.responded <= e.count, "{name}: {e:?}");
        }
    };
    check(&dash);
    dash.filter_grade_bands(&[GradeBand::Elementary]).unwrap();
    check(&dash);
    dash.filter_school(Some("Pine")).unwrap();
    check(&dash);
    assert_eq!(dash.engine().active_count(), 1);
    dash.filter_grade_bands(&[]).unwrap();
    dash.filter_school(None).unwrap();
    check(&dash);
    assert_eq!(dash.engine().active_count(), 6);
}

#[test]
fn render_hook_fires_once_per_change() {
    let mut dash = county();
    let renders = Rc::new(Cell::new(0));
    let last_rows = Rc::new(Cell::new(0));
    let (r, l) = (Rc::clone(&renders), Rc::clone(&last_rows));
    dash.on_render(move |d, _change| {
        r.set(r.get() + 1);
        l.set(d.district_table().unwrap().len());
    });

    let dims = dash.dimensions();
    dash.apply(vec![
        (dims.grade_bands, census_core::Filter::exact("Elementary")),
        (dims.cs_responses, census_core::Filter::exact("Unknown")),
    ])
    .unwrap();
    assert_eq!(renders.get(), 1);
    assert_eq!(last_rows.get(), 2);

    dash.clear_filters().unwrap();
    assert_eq!(renders.get(), 2);
    assert_eq!(last_rows.get(), 3);
}
