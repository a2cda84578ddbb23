use anyhow::Context;
use chart::{ChartOptions, MileageChart};
use clap::{ArgAction, Parser, ValueHint};
use compute::{cumulative, YearLog};
use read::{open_input, read_activities, Filter};
use std::{fs::File, io, num::NonZeroUsize, path::PathBuf};
use tracing_subscriber::EnvFilter;
use write::write_series;

mod chart;
mod compute;
mod data;
mod read;
mod write;

/// Chart how your mileage adds up over a year, from a Strava-style activity export.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Year to chart
    #[arg(long, default_value_t = 2021)]
    year: i32,

    /// Activity export (CSV)
    #[arg(long, default_value = "activities.csv", value_hint = ValueHint::FilePath)]
    file: PathBuf,

    /// Activity type to keep, compared exactly (Run, Walk, Ride, ...)
    #[arg(long = "activity_type", default_value = "Run")]
    activity_type: String,

    /// Chart title, also the name of the PNG file
    #[arg(long = "graph_name", default_value = "2021 Running Mileage")]
    graph_name: String,

    /// Label the running total every N days; the last day is always labelled
    #[arg(long = "annotate_every", default_value = "30")]
    annotate_every: NonZeroUsize,

    /// Where the PNG is written
    #[arg(long = "output_dir", default_value = ".", value_hint = ValueHint::DirPath)]
    output_dir: PathBuf,

    /// Also write the daily series as CSV to this path
    #[arg(long = "series_csv", value_hint = ValueHint::FilePath)]
    series_csv: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let filter = Filter {
        year: cli.year,
        activity_type: &cli.activity_type,
    };
    let mut log = YearLog::new(cli.year);
    read_activities(open_input(&cli.file)?, &filter, &mut log).map_err(|e| {
        let what = if e.is_parse_error() {
            "malformed activity export"
        } else {
            "cannot read activities from"
        };
        anyhow::Error::new(e).context(format!("{what} {}", cli.file.display()))
    })?;
    println!(
        "Number of {} activities in year: {}",
        cli.activity_type,
        log.len()
    );

    let series = cumulative(&log.daily()?)?;
    if let Some(path) = &cli.series_csv {
        let out = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_series(out, &series)?;
    }

    let options = ChartOptions {
        annotate_every: cli.annotate_every,
        ..ChartOptions::default()
    };
    MileageChart::new(&cli.graph_name, &series, options).render(&cli.output_dir)?;
    Ok(())
}
