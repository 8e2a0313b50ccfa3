use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blockcalc::calculator::Pipeline;
use blockcalc::combinator::Predicate;
use blockcalc::config::{BoundingBoxMode, Config, DataType, InputRaster, Operation, OutputSettings};
use blockcalc::readers::{BlockSource, GdalRaster, load_in_memory};
use blockcalc::stats::{self, ClassCounts, RasterSummary};
use blockcalc::writers::{OutputSpec, new_raster_from_base};

const TILE_SIZE: usize = 256;

#[derive(Parser)]
#[command(name = "blockcalc")]
#[command(author, version, about = "Tiled, nodata-aware raster calculator", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline described by a JSON config
    Run {
        config: PathBuf,
    },
    /// Merge overlapping rasters, keeping the largest valid sample
    Merge {
        /// Output raster
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "-1")]
        nodata_out: f64,
        #[arg(long)]
        data_type: Option<DataType>,
        #[arg(long, default_value = "union")]
        mode: BoundingBoxMode,
        /// Input rasters or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Share of a region of interest whose values reach a threshold
    Area {
        /// Region-of-interest raster
        #[arg(long)]
        roi: PathBuf,
        /// Raster tested against the threshold
        #[arg(long)]
        values: PathBuf,
        #[arg(long)]
        threshold: f64,
        #[arg(long, default_value = "1")]
        roi_value: f64,
        /// Load both rasters whole instead of reading them block by block
        #[arg(long)]
        in_memory: bool,
    },
    /// Show grid and value summary of a raster
    Info {
        input: PathBuf,
    },
    /// Create a raster on the grid of another, filled with one value
    Blank {
        #[arg(long)]
        base: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value = "-1")]
        nodata: f64,
        #[arg(long, default_value = "int16")]
        data_type: DataType,
        #[arg(long, default_value = "-1")]
        fill: f64,
    },
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_pipeline(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let nodata_out = config.nodata_out();
    let operation = config.operation();
    let output = config.output().path.clone();

    let pipeline = Pipeline::new(config)?;
    info!("{}", pipeline);
    let summary = pipeline.run()?;

    println!(
        "Output saved to: {} ({}x{})",
        output.display(),
        summary.cols,
        summary.rows
    );

    if operation == Operation::Classify {
        let written = GdalRaster::open(&output, "output", Some(nodata_out))?;
        let counts = stats::class_counts(&written, nodata_out, TILE_SIZE)?;
        println!("  {}", counts);
        print_fraction(&counts);
    } else {
        println!("  Nodata pixels: {}", summary.nodata_pixels);
    }
    println!("  Processing time: {:.2?}", start.elapsed());

    Ok(())
}

fn print_fraction(counts: &ClassCounts) {
    match counts.match_fraction() {
        Ok(fraction) => println!("  Match: {:.2}% of valid pixels", fraction * 100.0),
        Err(e) => println!("  Match: n/a ({})", e),
    }
}

fn area(
    roi: &Path,
    values: &Path,
    threshold: f64,
    roi_value: f64,
    in_memory: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let predicate = Predicate::at_least(threshold);

    let tally = if in_memory {
        let roi = load_in_memory(roi, "roi")?;
        let values = load_in_memory(values, "values")?;
        let tile_size = roi.info().rows.max(roi.info().cols).max(1);
        stats::area_ratio(&roi, &values, roi_value, &predicate, tile_size)?
    } else {
        let roi = GdalRaster::open(roi, "roi", None)?;
        let values = GdalRaster::open(values, "values", None)?;
        stats::area_ratio(&roi, &values, roi_value, &predicate, TILE_SIZE)?
    };

    println!(
        "ROI pixels: {}, {} {}: {}",
        tally.roi_pixels,
        values.display(),
        predicate,
        tally.matching_pixels
    );
    println!("  Area: {:.2}%", tally.percentage()?);

    Ok(())
}

fn info_command(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let raster = GdalRaster::open(input, "input", None)?;
    let info = raster.info();

    println!("{}", input.display());
    println!("  Size: {} x {}", info.cols, info.rows);
    println!("  Geotransform: {:?}", info.geo_transform);
    match info.data_type {
        Some(data_type) => println!("  Data type: {}", data_type),
        None => println!("  Data type: unsupported"),
    }
    match info.nodata {
        Some(nodata) => println!("  Nodata: {}", nodata),
        None => println!("  Nodata: not set"),
    }
    println!("{}", RasterSummary::from_source(&raster, TILE_SIZE)?);

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Run { config } => {
            let config = Config::from_file(&config)?;
            run_pipeline(config)?;
        }
        Commands::Merge {
            output,
            nodata_out,
            data_type,
            mode,
            inputs,
        } => {
            let inputs = inputs
                .into_iter()
                .enumerate()
                .map(|(i, path)| InputRaster {
                    name: format!("input{}", i),
                    path,
                    nodata: None,
                })
                .collect();
            let mut settings = OutputSettings::new(output);
            settings.data_type = data_type;
            settings.bounding_box_mode = mode;

            let config = Config::new(Operation::MergeMax, inputs, settings).with_nodata_out(nodata_out);
            run_pipeline(config)?;
        }
        Commands::Area {
            roi,
            values,
            threshold,
            roi_value,
            in_memory,
        } => area(&roi, &values, threshold, roi_value, in_memory)?,
        Commands::Info { input } => info_command(&input)?,
        Commands::Blank {
            base,
            output,
            nodata,
            data_type,
            fill,
        } => {
            new_raster_from_base(&base, &output, &OutputSpec::new(data_type, nodata), fill)?;
            println!("Blank raster saved to: {}", output.display());
        }
    }

    Ok(())
}
