//! Strip Quality CLI
//!
//! Evaluates water test strips and shades regions by their majority color.
//!
//! Usage:
//!   strip-quality evaluate --parameters data/parameters.json \
//!                          --samples data/strips.json \
//!                          --output data/strip_quality.json
//!
//!   strip-quality regions --samples data/strips.json \
//!                         --regions data/thailand-provinces.json \
//!                         --parameters data/parameters.json \
//!                         --month 2026-10 --geojson
//!
//!   strip-quality locate --latitude "18°47'46.1\"N" --longitude "98°59'13.3\"E" \
//!                        --regions data/thailand-provinces.json

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use strip_quality::loader::{self, SampleRecord};
use strip_quality::{
    aggregate_region_colors, evaluate_sample, parse_point, report, ClassificationGap,
    LocatedSample, ParameterRange, QualityColor, RegionLocator, SampleQualityResult,
    DEFAULT_REGION_NAME_PROPERTY,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "strip-quality",
    about = "Classify water test strips and shade regions by quality color"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify every strip against the parameter ranges
    Evaluate {
        /// Path to parameter ranges JSON file
        #[arg(short, long, default_value = "data/parameters.json")]
        parameters: PathBuf,

        /// Path to strips JSON file
        #[arg(short, long, default_value = "data/strips.json")]
        samples: PathBuf,

        /// Output JSON file
        #[arg(short, long, default_value = "data/strip_quality.json")]
        output: PathBuf,
    },

    /// Compute the majority quality color per region for one month
    Regions {
        /// Path to strips JSON file
        #[arg(short, long, default_value = "data/strips.json")]
        samples: PathBuf,

        /// Path to region boundaries GeoJSON file
        #[arg(short, long, default_value = "data/thailand-provinces.json")]
        regions: PathBuf,

        /// Recompute strip colors from these parameter ranges instead of
        /// using the stored colors
        #[arg(short, long)]
        parameters: Option<PathBuf>,

        /// Calendar month to aggregate (YYYY-MM), defaults to the current month
        #[arg(short, long)]
        month: Option<String>,

        /// Feature property holding the region name
        #[arg(long, default_value = DEFAULT_REGION_NAME_PROPERTY)]
        name_property: String,

        /// Output JSON file
        #[arg(short, long, default_value = "data/region_colors.json")]
        output: PathBuf,

        /// Also output GeoJSON
        #[arg(long)]
        geojson: bool,
    },

    /// Print the region containing one DMS coordinate pair
    Locate {
        /// DMS latitude, e.g. 18°47'46.1"N
        #[arg(long, allow_hyphen_values = true)]
        latitude: String,

        /// DMS longitude, e.g. 98°59'13.3"E
        #[arg(long, allow_hyphen_values = true)]
        longitude: String,

        /// Path to region boundaries GeoJSON file
        #[arg(short, long, default_value = "data/thailand-provinces.json")]
        regions: PathBuf,

        /// Feature property holding the region name
        #[arg(long, default_value = DEFAULT_REGION_NAME_PROPERTY)]
        name_property: String,
    },
}

/// One evaluated strip as written to the output file
#[derive(Serialize)]
struct EvaluatedStrip {
    #[serde(flatten)]
    result: SampleQualityResult,
    summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    gaps: Vec<ClassificationGap>,
}

#[derive(Serialize)]
struct RegionColorsOutput {
    month: String,
    strips_total: usize,
    strips_in_month: usize,
    /// In-month strips that fell inside a region and were counted
    strips_tallied: usize,
    regions: Vec<report::RegionReport>,
    generated_at: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "strip_quality=debug,info"
    } else {
        "strip_quality=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match args.command {
        Command::Evaluate {
            parameters,
            samples,
            output,
        } => evaluate(&parameters, &samples, &output),
        Command::Regions {
            samples,
            regions,
            parameters,
            month,
            name_property,
            output,
            geojson,
        } => regions_command(
            &samples,
            &regions,
            parameters.as_deref(),
            month.as_deref(),
            &name_property,
            &output,
            geojson,
        ),
        Command::Locate {
            latitude,
            longitude,
            regions,
            name_property,
        } => locate(&latitude, &longitude, &regions, &name_property),
    }
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn evaluate(parameters: &Path, samples: &Path, output: &Path) -> Result<()> {
    let ranges = loader::load_parameter_ranges(parameters)?;
    let strips = loader::load_samples(samples)?;

    let evaluated: Vec<EvaluatedStrip> = strips
        .iter()
        .map(|strip| {
            let evaluation = evaluate_sample(strip.id, &strip.measurements, &ranges);
            EvaluatedStrip {
                summary: evaluation.result.summary(),
                result: evaluation.result,
                gaps: evaluation.gaps,
            }
        })
        .collect();

    let mut by_color: HashMap<QualityColor, usize> = HashMap::new();
    for strip in &evaluated {
        *by_color.entry(strip.result.color).or_default() += 1;
    }
    let gap_count: usize = evaluated.iter().map(|s| s.gaps.len()).sum();

    info!("Writing {} results to {:?}", evaluated.len(), output);
    write_json(output, &evaluated)?;

    info!("Evaluated {} strips", evaluated.len());
    for color in [
        QualityColor::Good,
        QualityColor::Caution,
        QualityColor::Bad,
        QualityColor::Unknown,
    ] {
        info!("  {:?}: {}", color, by_color.get(&color).copied().unwrap_or(0));
    }
    if gap_count > 0 {
        warn!("{} measurements skipped", gap_count);
    }

    Ok(())
}

/// First instant of the requested month, or of the current UTC month
fn month_start(month: Option<&str>) -> Result<NaiveDate> {
    match month {
        Some(m) => NaiveDate::parse_from_str(&format!("{}-01", m), "%Y-%m-%d")
            .with_context(|| format!("month must be YYYY-MM, got {:?}", m)),
        None => {
            let today = Utc::now().date_naive();
            NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                .context("current month out of range")
        }
    }
}

fn same_month(taken_at: &DateTime<Utc>, month: NaiveDate) -> bool {
    taken_at.year() == month.year() && taken_at.month() == month.month()
}

/// Resolve a strip's region and color, or `None` when it has no usable color
fn locate_strip(
    strip: &SampleRecord,
    locator: &RegionLocator<'_>,
    ranges: Option<&HashMap<u32, ParameterRange>>,
) -> Option<LocatedSample> {
    let color = match ranges {
        Some(ranges) => evaluate_sample(strip.id, &strip.measurements, ranges).result.color,
        None => strip.quality_color?,
    };

    let region = match (strip.latitude.as_deref(), strip.longitude.as_deref()) {
        (Some(lat), Some(lon)) => match parse_point(lat, lon) {
            Ok(point) => {
                let region = locator.locate(point);
                if region.is_none() {
                    warn!("Strip {}: outside every region", strip.id);
                }
                region.map(str::to_string)
            }
            Err(e) => {
                warn!("Strip {}: {}", strip.id, e);
                None
            }
        },
        _ => {
            warn!("Strip {}: missing coordinates", strip.id);
            None
        }
    };

    Some(LocatedSample {
        sample_id: strip.id,
        taken_at: strip.taken_at,
        region,
        color,
    })
}

fn regions_command(
    samples: &Path,
    regions: &Path,
    parameters: Option<&Path>,
    month: Option<&str>,
    name_property: &str,
    output: &Path,
    geojson: bool,
) -> Result<()> {
    let month = month_start(month)?;
    let strips = loader::load_samples(samples)?;
    let boundaries = loader::load_regions(regions, name_property)?;
    let ranges = parameters
        .map(|path| loader::load_parameter_ranges(path))
        .transpose()?;

    let locator = RegionLocator::new(&boundaries);
    let located: Vec<LocatedSample> = strips
        .iter()
        .filter_map(|strip| locate_strip(strip, &locator, ranges.as_ref()))
        .collect();

    let in_month = |s: &LocatedSample| same_month(&s.taken_at, month);
    let colors = aggregate_region_colors(&located, in_month);

    let result = RegionColorsOutput {
        month: month.format("%Y-%m").to_string(),
        strips_total: strips.len(),
        strips_in_month: located.iter().filter(|s| in_month(s)).count(),
        strips_tallied: located
            .iter()
            .filter(|s| in_month(s) && s.region.is_some())
            .count(),
        regions: report::region_report(&boundaries, &colors),
        generated_at: Utc::now().to_rfc3339(),
    };

    info!("Writing output to {:?}", output);
    write_json(output, &result)?;

    if geojson {
        let geojson_path = output.with_extension("geojson");
        info!("Writing GeoJSON to {:?}", geojson_path);
        write_json(&geojson_path, &report::to_geojson(&boundaries, &colors))?;
    }

    info!("Region colors for {}:", result.month);
    for entry in &result.regions {
        info!("  {}: {:?} ({})", entry.region, entry.status, entry.color.hex());
    }

    Ok(())
}

fn locate(latitude: &str, longitude: &str, regions: &Path, name_property: &str) -> Result<()> {
    let point = parse_point(latitude, longitude)?;
    let boundaries = loader::load_regions(regions, name_property)?;
    let locator = RegionLocator::new(&boundaries);

    match locator.locate(point) {
        Some(name) => println!("{}", name),
        None => println!(
            "({:.6}, {:.6}) is outside every region",
            point.latitude, point.longitude
        ),
    }

    Ok(())
}
