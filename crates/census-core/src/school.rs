// File: crates/census-core/src/school.rs
// Summary: School record schema and the row mapper for the grade-level survey table.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::reduce::Answer;
use crate::store::RecordStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GradeBand {
    Elementary,
    Middle,
    High,
}

impl GradeBand {
    pub const ALL: [GradeBand; 3] = [GradeBand::Elementary, GradeBand::Middle, GradeBand::High];

    pub fn as_str(self) -> &'static str {
        match self {
            GradeBand::Elementary => "Elementary",
            GradeBand::Middle => "Middle",
            GradeBand::High => "High",
        }
    }

    /// Display position in the grade band chart: High first, Elementary last.
    pub fn display_rank(self) -> u8 {
        match self {
            GradeBand::High => 0,
            GradeBand::Middle => 1,
            GradeBand::Elementary => 2,
        }
    }
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for GradeBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GradeBand::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown grade band '{s}'"))
    }
}

/// Answer to "Teaches CS?".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CsResponse {
    Yes,
    No,
    Inconsistent,
    Unknown,
}

impl CsResponse {
    pub const ALL: [CsResponse; 4] =
        [CsResponse::Yes, CsResponse::No, CsResponse::Inconsistent, CsResponse::Unknown];

    pub fn as_str(self) -> &'static str {
        match self {
            CsResponse::Yes => "Yes",
            CsResponse::No => "No",
            CsResponse::Inconsistent => "Inconsistent",
            CsResponse::Unknown => "Unknown",
        }
    }

    pub fn answer(self) -> Answer {
        match self {
            CsResponse::Unknown => Answer::Unanswered,
            CsResponse::Yes => Answer::Affirmative,
            CsResponse::No | CsResponse::Inconsistent => Answer::Negative,
        }
    }
}

impl fmt::Display for CsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for CsResponse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CsResponse::ALL
            .into_iter()
            .find(|r| r.as_str() == s.trim())
            .ok_or_else(|| format!("unknown CS response '{s}'"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct School {
    pub district: String,
    pub school: String,
    pub population: u32,
    pub grade_bands: BTreeSet<GradeBand>,
    pub cs_response: CsResponse,
}

impl School {
    /// Returns `None` when the school has no grade band or no students.
    pub fn new(
        district: impl Into<String>,
        school: impl Into<String>,
        population: u32,
        grade_bands: impl IntoIterator<Item = GradeBand>,
        cs_response: CsResponse,
    ) -> Option<Self> {
        let grade_bands: BTreeSet<GradeBand> = grade_bands.into_iter().collect();
        if grade_bands.is_empty() || population == 0 {
            return None;
        }
        Some(Self {
            district: district.into(),
            school: school.into(),
            population,
            grade_bands,
            cs_response,
        })
    }

    pub fn population_measure(school: &School) -> i64 { i64::from(school.population) }

    pub fn answer_of(school: &School) -> Answer { school.cs_response.answer() }

    pub fn has_students(school: &School) -> bool { school.population > 0 }
}

/// A raw source row addressed by column name.
pub trait RawRow {
    fn get(&self, column: &str) -> Option<&str>;
}

impl RawRow for HashMap<String, String> {
    fn get(&self, column: &str) -> Option<&str> { HashMap::get(self, column).map(String::as_str) }
}

impl RawRow for BTreeMap<String, String> {
    fn get(&self, column: &str) -> Option<&str> { BTreeMap::get(self, column).map(String::as_str) }
}

/// Source column names. Defaults match the grade-level survey export.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Columns {
    pub district: String,
    pub school: String,
    pub students: String,
    pub elementary: String,
    pub middle: String,
    pub high: String,
    pub teaches_cs: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            district: "School District Name".into(),
            school: "School Name".into(),
            students: "Students".into(),
            elementary: "Stage El".into(),
            middle: "Stage Mi".into(),
            high: "Stage Hi".into(),
            teaches_cs: "Teaches CS?".into(),
        }
    }
}

type Normalizer = Box<dyn Fn(&str) -> String>;

/// Maps raw rows to `School`s, dropping rows without grade bands or students.
pub struct SchoolRowMapper {
    columns: Columns,
    normalize_district: Normalizer,
}

impl Default for SchoolRowMapper {
    fn default() -> Self { Self::new() }
}

impl SchoolRowMapper {
    pub fn new() -> Self {
        Self { columns: Columns::default(), normalize_district: Box::new(|s: &str| s.to_string()) }
    }

    pub fn with_columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Install the district-name normalization applied to every row.
    pub fn with_district_normalizer<N>(mut self, normalize: N) -> Self
    where
        N: Fn(&str) -> String + 'static,
    {
        self.normalize_district = Box::new(normalize);
        self
    }

    pub fn columns(&self) -> &Columns { &self.columns }

    pub fn map<T: RawRow + ?Sized>(&self, row: &T) -> Option<School> {
        let c = &self.columns;
        let flag = |col: &str| row.get(col) == Some("1");

        let mut bands = Vec::with_capacity(3);
        if flag(&c.elementary) {
            bands.push(GradeBand::Elementary);
        }
        if flag(&c.middle) {
            bands.push(GradeBand::Middle);
        }
        if flag(&c.high) {
            bands.push(GradeBand::High);
        }

        let population = row.get(&c.students).and_then(parse_population)?;

        let cs_response = match row.get(&c.teaches_cs).map(str::trim) {
            None | Some("") => CsResponse::Unknown,
            Some(text) => text.parse().unwrap_or_else(|_| {
                log::debug!("unrecognised CS response '{}', treating as Unknown", text);
                CsResponse::Unknown
            }),
        };

        School::new(
            (self.normalize_district)(row.get(&c.district).unwrap_or_default()),
            row.get(&c.school).unwrap_or_default(),
            population,
            bands,
            cs_response,
        )
    }

    pub fn ingest<I, T>(&self, rows: I) -> RecordStore<School>
    where
        I: IntoIterator<Item = T>,
        T: RawRow,
    {
        RecordStore::ingest(rows, |row| self.map(&row))
    }
}

// Whole, positive student counts only; "1,234" or "12.5" drop the row.
fn parse_population(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return (n > 0).then_some(n);
    }
    let v = raw.parse::<f64>().ok()?;
    (v.is_finite() && v >= 1.0 && v.fract() == 0.0 && v <= f64::from(u32::MAX)).then_some(v as u32)
}
