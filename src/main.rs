use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use parcelize::landuse::{self, LandUsePlan};
use parcelize::{Connectivity, ExtractionConfig, ParcelDocument, Pipeline, SiteLayout};

#[derive(Parser)]
#[command(name = "parcelize")]
#[command(about = "Extract land parcels from road and site-mask rasters")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract parcel polygons for every site (or the given sites)
    Extract(ExtractArgs),
    /// Merge land-use assignments into a parcel document
    Annotate(AnnotateArgs),
}

#[derive(clap::Args)]
struct ExtractArgs {
    /// Directory holding <id>_condition.png road rasters
    #[arg(long, value_name = "DIR", default_value = "input/roads")]
    roads_dir: PathBuf,

    /// Directory holding <id>_mask.png site masks
    #[arg(long, value_name = "DIR", default_value = "input/masks")]
    masks_dir: PathBuf,

    /// Directory receiving <id>_parcels.json
    #[arg(long, value_name = "DIR", default_value = "result/parcels")]
    output_dir: PathBuf,

    /// JSON configuration file; flags below override its fields
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Site id to process (repeatable); defaults to every site found
    #[arg(long = "site", value_name = "ID")]
    sites: Vec<String>,

    /// Square working resolution in pixels
    #[arg(long, value_name = "PX")]
    working_size: Option<u32>,

    /// Condition luminance below this is road
    #[arg(long, value_name = "0-255")]
    road_threshold: Option<u8>,

    /// Minimum parcel area in pixels
    #[arg(long, value_name = "PX")]
    min_area: Option<u32>,

    /// Polygon simplification tolerance in pixels
    #[arg(long, value_name = "PX")]
    epsilon: Option<f64>,

    /// Labelling adjacency rule
    #[arg(long, value_enum)]
    connectivity: Option<Connectivity>,

    /// Also write <id>_roads.json road overlays
    #[arg(long)]
    with_roads: bool,

    /// Save intermediate grids to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

#[derive(clap::Args)]
struct AnnotateArgs {
    /// Parcel document produced by `extract`
    #[arg(long, value_name = "FILE")]
    parcels: PathBuf,

    /// Land-use service response with parcels[].{id, land_use}
    #[arg(long, value_name = "FILE")]
    assignments: PathBuf,

    /// Output plan document
    #[arg(long, value_name = "FILE")]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match args.command {
        Command::Extract(extract) => run_extract(extract),
        Command::Annotate(annotate) => run_annotate(annotate),
    }
}

fn run_extract(args: ExtractArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ExtractionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ExtractionConfig::default(),
    };
    if let Some(size) = args.working_size {
        config.working_size = (size, size);
    }
    if let Some(threshold) = args.road_threshold {
        config.road_threshold = threshold;
    }
    if let Some(min_area) = args.min_area {
        config.min_parcel_area_px = min_area;
    }
    if let Some(epsilon) = args.epsilon {
        config.simplify_epsilon = epsilon;
    }
    if let Some(connectivity) = args.connectivity {
        config.connectivity = connectivity;
    }

    let layout = SiteLayout {
        roads_dir: args.roads_dir,
        masks_dir: args.masks_dir,
        output_dir: args.output_dir,
    };

    let mut pipeline = Pipeline::new(layout, config)?.with_roads(args.with_roads);
    if let Some(debug_dir) = args.debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let outcomes = if args.sites.is_empty() {
        pipeline.run_all()?
    } else {
        pipeline.run_batch(&args.sites)
    };

    println!("\n=== Parcel Extraction Results ===");
    println!("Sites processed: {}", outcomes.len());

    let mut failed = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(site) => println!(
                "  {}: {} parcels ({} labels, {} too small, {} on border, {} degenerate) -> {}",
                outcome.site_id,
                site.report.emitted,
                site.report.raw_labels,
                site.report.too_small,
                site.report.touching_border,
                site.report.degenerate,
                site.parcels_path.display()
            ),
            Err(err) => {
                failed += 1;
                println!("  {}: FAILED - {}", outcome.site_id, err);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} sites failed", outcomes.len());
    }
    Ok(())
}

fn run_annotate(args: AnnotateArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.parcels)
        .with_context(|| format!("Failed to read {}", args.parcels.display()))?;
    let document: ParcelDocument = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", args.parcels.display()))?;

    let assignments = landuse::read_assignments(&args.assignments)?;
    let plan = LandUsePlan::merge(document, &assignments)?;

    let mut out = serde_json::to_string_pretty(&plan)?;
    out.push('\n');
    std::fs::write(&args.out, out)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    println!("Saved land-use plan: {}", args.out.display());
    for (land_use, count) in plan.summary() {
        println!("  {land_use:?}: {count}");
    }
    Ok(())
}
