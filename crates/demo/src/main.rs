// File: crates/demo/src/main.rs
// Summary: Demo loads a school survey CSV, prints dashboard views, applies CLI filters, clears them.

use anyhow::{Context, Result};
use census_core::{
    CsResponse, Dashboard, DashboardBuilder, GradeBand, RecordStore, School, SchoolRowMapper,
};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

const USAGE: &str = "usage: census-demo <schools.csv> [--districts <keys.txt>] \
[--band <Elementary|Middle|High>]... [--cs <Yes|No|Inconsistent|Unknown>]... \
[--district <name>]... [--top <n>]";

#[derive(Debug)]
struct DemoOptions {
    input: PathBuf,
    districts: Option<PathBuf>,
    bands: Vec<GradeBand>,
    responses: Vec<CsResponse>,
    filter_districts: Vec<String>,
    top: usize,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("schools.csv"),
            districts: None,
            bands: Vec::new(),
            responses: Vec::new(),
            filter_districts: Vec::new(),
            top: 5,
        }
    }
}

impl DemoOptions {
    fn has_filters(&self) -> bool {
        !(self.bands.is_empty() && self.responses.is_empty() && self.filter_districts.is_empty())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let opts = parse_args(std::env::args().skip(1))?;
    println!("Using input file: {}", opts.input.display());

    let store = load_schools(&opts.input)
        .with_context(|| format!("failed to load CSV '{}'", opts.input.display()))?;
    println!("Loaded {} schools ({} rows dropped)", store.len(), store.dropped());
    if store.is_empty() {
        anyhow::bail!("no schools loaded; check the survey headers.");
    }

    let districts = match &opts.districts {
        Some(path) => load_district_keys(path)
            .with_context(|| format!("failed to load district keys '{}'", path.display()))?,
        None => {
            log::warn!("no district key file given; using the districts found in the records");
            record_districts(&store)
        }
    };

    let mut dash = DashboardBuilder::new().records(store).districts(districts).build()?;
    dash.on_render(|_, change| {
        log::info!("render: {} entered, {} left", change.entered, change.left);
    });

    println!("\n== all schools ==");
    print_views(&dash, opts.top)?;
    let baseline = snapshot(&dash)?;

    if opts.has_filters() {
        if !opts.bands.is_empty() {
            dash.filter_grade_bands(&opts.bands)?;
        }
        if !opts.responses.is_empty() {
            dash.filter_cs_responses(&opts.responses)?;
        }
        if !opts.filter_districts.is_empty() {
            dash.filter_districts(&opts.filter_districts)?;
        }
        println!("\n== filtered ==");
        print_views(&dash, opts.top)?;

        dash.clear_filters()?;
        if snapshot(&dash)? != baseline {
            anyhow::bail!("views did not return to the unfiltered baseline after clearing filters");
        }
        println!("\nFilters cleared; views match the unfiltered baseline.");
    }

    let unmatched = dash.unmatched_districts()?;
    if !unmatched.is_empty() {
        println!("\n{} districts have no boundary key: {}", unmatched.len(), unmatched.join(", "));
    }
    Ok(())
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<DemoOptions> {
    let mut opts = DemoOptions::default();
    let mut input = None;
    while let Some(arg) = args.next() {
        let mut value =
            |flag: &str| args.next().with_context(|| format!("{flag} needs a value\n{USAGE}"));
        match arg.as_str() {
            "--districts" => opts.districts = Some(PathBuf::from(value("--districts")?)),
            "--band" => {
                let raw = value("--band")?;
                opts.bands.push(raw.parse::<GradeBand>().map_err(anyhow::Error::msg)?);
            }
            "--cs" => {
                let raw = value("--cs")?;
                opts.responses.push(raw.parse::<CsResponse>().map_err(anyhow::Error::msg)?);
            }
            "--district" => opts.filter_districts.push(value("--district")?),
            "--top" => {
                let raw = value("--top")?;
                opts.top =
                    raw.parse().with_context(|| format!("--top expects a count, got '{raw}'"))?;
            }
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => anyhow::bail!("unknown option {flag}\n{USAGE}"),
            _ if input.is_none() => input = Some(PathBuf::from(arg.clone())),
            _ => anyhow::bail!("unexpected argument '{arg}'\n{USAGE}"),
        }
    }
    if let Some(input) = input {
        opts.input = input;
    }
    Ok(opts)
}

/// Load the survey export into header-keyed rows and map them to schools.
fn load_schools(path: &Path) -> Result<RecordStore<School>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect::<Vec<_>>();
    log::debug!("headers: {:?}", headers);

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        let row: HashMap<String, String> =
            headers.iter().cloned().zip(rec.iter().map(str::to_string)).collect();
        rows.push(row);
    }
    Ok(SchoolRowMapper::new().ingest(rows))
}

/// Distinct districts named by the records, ascending; stands in for a boundary key file.
fn record_districts(store: &RecordStore<School>) -> Vec<String> {
    let names: BTreeSet<&str> = store.iter().map(|(_, s)| s.district.as_str()).collect();
    names.into_iter().map(str::to_string).collect()
}

/// One district key per line; blank lines are skipped.
fn load_district_keys(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}

type Snapshot = (Vec<(GradeBand, u64)>, Vec<(CsResponse, u64)>, Vec<census_core::DistrictRow>);

fn snapshot(dash: &Dashboard) -> Result<Snapshot> {
    Ok((dash.grade_band_counts()?, dash.cs_response_counts()?, dash.district_table()?))
}

fn print_views(dash: &Dashboard, top: usize) -> Result<()> {
    println!("{} of {} schools active", dash.engine().active_count(), dash.engine().size());

    println!("Grade bands:");
    for (band, n) in dash.grade_band_counts()? {
        println!("  {:<12} {:>6}", band, n);
    }

    println!("Teaches CS?:");
    for (response, n) in dash.cs_response_counts()? {
        println!("  {:<12} {:>6}", response, n);
    }

    println!("Top {} districts by student population:", top);
    for d in dash.top_districts(top)? {
        println!(
            "  {:<32} {:>8} students in {} schools",
            d.district,
            d.population(),
            d.schools.len()
        );
    }

    let table = dash.district_table()?;
    let shaded = dash.district_shading()?.iter().filter(|s| s.teaching_share.is_some()).count();
    println!("District table: {} rows; {} boundary districts shaded", table.len(), shaded);
    for row in table.iter().take(top) {
        let share = row
            .teaching_share
            .map(|s| format!("{:.0}%", s * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<32} pop {:>8}  schools {:>4}  responded {:>4}  cs yes {:>4}  share {:>5}",
            row.district, row.population, row.schools, row.responded, row.cs_yes, share
        );
    }
    Ok(())
}
