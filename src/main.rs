//! FARS CLI
//!
//! Command line front end for reading accident files, summarizing accident
//! counts by month and drawing per-state accident maps.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fars::{make_filename, FarsConfig, MapOutcome, StatePlotter, Summarizer, Year};
use plotters::prelude::{BitMapBackend, IntoDrawingArea};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "fars")]
#[command(about = "Summarize and map FARS accident data", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory containing accident_<year>.csv.bz2 files
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "fars=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the file name used for a year
    Filename {
        #[arg(value_name = "YEAR")]
        year: Year,
    },
    /// Load one year's file and print it
    Read {
        #[arg(value_name = "YEAR")]
        year: Year,
    },
    /// Load (MONTH, year) tables for several years, skipping missing ones
    Years {
        #[arg(value_name = "YEAR", required = true)]
        years: Vec<Year>,
    },
    /// Count accidents per month for each year
    Summarize {
        #[arg(value_name = "YEAR", required = true)]
        years: Vec<Year>,
    },
    /// Draw accident locations for one state and year as a PNG
    Map {
        /// FARS state code
        #[arg(short, long)]
        state: i64,

        #[arg(short, long)]
        year: Year,

        /// PNG file to write
        #[arg(short, long, default_value = "map.png")]
        output: PathBuf,

        /// GeoJSON file with state boundary outlines
        #[arg(short, long)]
        boundaries: Option<PathBuf>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FarsConfig::from_file(path)?,
        None => FarsConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);
    let reader = config.reader();

    match cli.command {
        Commands::Filename { year } => {
            println!("{}", make_filename(year));
        }
        Commands::Read { year } => {
            let df = reader
                .read_year(year)
                .with_context(|| format!("reading year {}", year))?;
            println!("{}", df);
        }
        Commands::Years { years } => {
            for (year, table) in years.iter().zip(reader.read_years(&years)) {
                match table {
                    Some(df) => println!("{}: {} rows\n{}", year, df.height(), df),
                    None => println!("{}: NULL", year),
                }
            }
        }
        Commands::Summarize { years } => {
            let summary = Summarizer::summarize_years(&reader, &years)?;
            println!("{}", summary);
        }
        Commands::Map {
            state,
            year,
            output,
            boundaries,
            width,
            height,
        } => {
            if boundaries.is_some() {
                config.boundaries = boundaries;
            }
            let size = (
                width.unwrap_or(config.width),
                height.unwrap_or(config.height),
            );
            let outlines = config
                .load_outlines()
                .context("loading boundary outlines")?;

            let area = BitMapBackend::new(&output, size).into_drawing_area();
            match StatePlotter::map_state(&reader, state, year, outlines.as_ref(), &area)? {
                MapOutcome::NoAccidents => {}
                MapOutcome::Drawn { records, plotted } => {
                    info!(
                        state,
                        %year,
                        records,
                        plotted,
                        output = %output.display(),
                        "state map written"
                    );
                }
            }
        }
    }

    Ok(())
}
