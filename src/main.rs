//! `fars` - command line front end for the FARS report library.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fars_report::{
    charts::{map_state_input, MapOutcome},
    config::{self, Config},
    data::{make_filename, parse_year},
    logging,
    stats::MonthlySummary,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "fars", about = "FARS accident summaries and state maps")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding accident_<year>.csv.bz2 files
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load years in parallel
    #[arg(long, global = true)]
    parallel: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the data file name for a year
    Filename { year: String },
    /// Monthly accident counts for one or more years
    Summarize {
        #[arg(required = true)]
        years: Vec<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Plot a state's accidents for one year
    Map {
        state: String,
        year: String,
        /// Output PNG path
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    logging::init("info");
    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.parallel |= cli.parallel;

    match cli.command {
        Command::Filename { year } => println!("{}", make_filename(parse_year(&year)?)),

        Command::Summarize { years, json } => {
            let years = years
                .iter()
                .map(|raw| parse_year(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let summary = MonthlySummary::load(&config.loader(), &years, config.parallel)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary.to_dataframe()?);
            }
        }

        Command::Map { state, year, out } => {
            let year = parse_year(&year)?;
            if let Some(out) = out {
                config.map.output = out;
            }
            let options = config.map.options()?;

            match map_state_input(&config.loader(), &state, year, &options)? {
                MapOutcome::Rendered { path, points, .. } => {
                    info!("wrote {} points to {}", points, path.display())
                }
                MapOutcome::NothingToPlot => println!("no accidents to plot"),
                MapOutcome::NoCoordinates { rows } => {
                    println!("{rows} accidents, none with valid coordinates")
                }
            }
        }
    };

    Ok(())
}
