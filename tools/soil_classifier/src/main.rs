/// Soil classification tool: reads borehole and stratum tables plus an .xyz
/// file of query points, classifies every point and writes the result table.
///
/// Input tables are JSON arrays:
///   boreholes: [{"id": "ZK1", "x": 0.0, "y": 0.0, "z": 12.3}, ...]
///   strata:    [{"borehole_id": "ZK1", "depth_base": 1.5, "legend_code": "1", "geology_code": "fill"}, ...]
/// Query points are whitespace-separated x y z, one per line; extra columns,
/// blank lines and `#` comments are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use strata_core::{
    classify_batch, Borehole, QueryPoint, RowOrdering, Site, SiteConfig, StratumRow, VerticalDatum,
    WeightedClassifier,
};
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "soil_classifier", about = "Classify soil type at query points from logged boreholes")]
struct Args {
    /// Borehole table (JSON array of {id, x, y, z})
    #[arg(long)]
    boreholes: PathBuf,

    /// Stratum table (JSON array of {borehole_id, depth_base, legend_code, geology_code})
    #[arg(long)]
    strata: PathBuf,

    /// Query points, whitespace-separated x y z per line
    #[arg(short, long)]
    queries: PathBuf,

    /// Run configuration JSON (defaults apply to missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output table
    #[arg(short, long, default_value = "classified.csv")]
    output: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Override the vertical window half-width (metres)
    #[arg(long)]
    theta: Option<f64>,

    /// Override how query z is compared with borehole depths
    #[arg(long, value_enum)]
    datum: Option<Datum>,

    /// Take stratum rows in delivered order instead of regrouping them
    #[arg(long)]
    trusted_order: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Datum {
    Negated,
    Collar,
    Depth,
}

impl From<Datum> for VerticalDatum {
    fn from(d: Datum) -> Self {
        match d {
            Datum::Negated => VerticalDatum::NegatedElevation,
            Datum::Collar => VerticalDatum::CollarRelative,
            Datum::Depth => VerticalDatum::DepthBelowCollar,
        }
    }
}

// ── Output rows ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OutputRow<'a> {
    x: f64,
    y: f64,
    z: f64,
    soil_id: String,
    soil: &'a str,
}

fn output_rows<'a>(site: &'a Site, points: &[QueryPoint]) -> Vec<OutputRow<'a>> {
    points
        .iter()
        .map(|p| {
            let code = p.result.unwrap_or(strata_core::SoilCode::Unclassified);
            OutputRow { x: p.x, y: p.y, z: p.z, soil_id: code.to_string(), soil: site.describe(code) }
        })
        .collect()
}

fn to_csv(rows: &[OutputRow]) -> String {
    let mut csv = String::from("x,y,z,soil_id,soil\n");
    for r in rows {
        csv.push_str(&format!("{},{},{},{},{}\n", r.x, r.y, r.z, r.soil_id, csv_field(r.soil)));
    }
    csv
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

// ── Input ────────────────────────────────────────────────────────────────────

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn parse_xyz(text: &str) -> Result<Vec<QueryPoint>> {
    let mut points = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(|c: char| c.is_whitespace() || c == ',').filter(|f| !f.is_empty()).collect();
        if fields.len() < 3 {
            bail!("line {}: expected x y z, got {:?}", lineno + 1, line);
        }
        let mut xyz = [0.0f64; 3];
        for (v, f) in xyz.iter_mut().zip(&fields) {
            *v = f.parse().with_context(|| format!("line {}: {:?} is not a number", lineno + 1, f))?;
        }
        points.push(QueryPoint::new(xyz[0], xyz[1], xyz[2]));
    }
    Ok(points)
}

fn load_config(args: &Args) -> Result<SiteConfig> {
    let mut cfg = match &args.config {
        Some(path) => SiteConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => SiteConfig::default(),
    };
    if let Some(theta) = args.theta {
        cfg.classifier.window_half_width = theta;
    }
    if let Some(datum) = args.datum {
        cfg.classifier.vertical_datum = datum.into();
    }
    if args.trusted_order {
        cfg.normalize.ordering = RowOrdering::Trusted;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = load_config(&args)?;

    let boreholes: Vec<Borehole> = read_json(&args.boreholes)?;
    let rows: Vec<StratumRow> = read_json(&args.strata)?;
    let query_text =
        fs::read_to_string(&args.queries).with_context(|| format!("reading {}", args.queries.display()))?;
    let mut points = parse_xyz(&query_text)?;

    let site = Site::build(boreholes, &rows, &cfg.normalize).context("building site model")?;
    let classifier = WeightedClassifier::new(cfg.classifier)?;
    let summary = classify_batch(&classifier, &site, &mut points);

    let rows = output_rows(&site, &points);
    let body = match args.format {
        Format::Csv => to_csv(&rows),
        Format::Json => serde_json::to_string_pretty(&rows)?,
    };
    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(&args.output, body).with_context(|| format!("writing {}", args.output.display()))?;

    eprintln!(
        "{} points: {} classified, {} by fallback, {} null -> {}",
        summary.points,
        summary.most_likely,
        summary.runner_up,
        summary.unresolvable,
        args.output.display()
    );
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xyz_skips_comments_and_extra_columns() {
        let text = "# design surface\n100.0 200.0 -27.0 extra\n\n101.5,200.0,-27.5\n";
        let points = parse_xyz(text).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!((points[1].x, points[1].y, points[1].z), (101.5, 200.0, -27.5));
        assert!(points.iter().all(|p| p.result.is_none()));
    }

    #[test]
    fn xyz_reports_bad_lines() {
        assert!(parse_xyz("1.0 2.0\n").is_err());
        let err = parse_xyz("1 2 3\n1 x 3\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn csv_quotes_descriptions_with_commas() {
        assert_eq!(csv_field("clay"), "clay");
        assert_eq!(csv_field("sand, fine"), "\"sand, fine\"");
        assert_eq!(csv_field("a \"b\""), "\"a \"\"b\"\"\"");
    }

    #[test]
    fn output_rows_carry_code_and_description() {
        let boreholes = vec![
            Borehole::new("ZK1", 0.0, 0.0, 0.0),
            Borehole::new("ZK2", 10.0, 0.0, 0.0),
            Borehole::new("ZK3", 0.0, 10.0, 0.0),
        ];
        let rows: Vec<StratumRow> =
            ["ZK1", "ZK2", "ZK3"].iter().map(|id| StratumRow::new(*id, 5.0, "1", "silt, clayey")).collect();
        let cfg = SiteConfig::default();
        let site = Site::build(boreholes, &rows, &cfg.normalize).unwrap();
        let classifier = WeightedClassifier::new(cfg.classifier).unwrap();
        let mut points = vec![QueryPoint::new(3.0, 3.0, -2.0), QueryPoint::new(3.0, 3.0, -50.0)];
        classify_batch(&classifier, &site, &mut points);

        let csv = to_csv(&output_rows(&site, &points));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "x,y,z,soil_id,soil");
        assert_eq!(lines[1], "3,3,-2,A,\"silt, clayey\"");
        assert_eq!(lines[2], "3,3,-50,null,null");
    }
}
