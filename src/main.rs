use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use rust_gpx_metrics::activity::{build_activity, ActivityMetrics};
use rust_gpx_metrics::elevation::ElevationStrategy;
use rust_gpx_metrics::gpx_reader::read_gpx_file;
use rust_gpx_metrics::overview::{
    format_hhmmss, format_mmss, load_activities, overview_rows, print_overview, write_overview_csv,
    OverviewConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Running metrics from GPX workouts", long_about = None)]
struct Cli {
    /// Count only elevation steps larger than this many meters
    /// (default: every step counts)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Debug logging
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every activity in a folder, newest first
    Overview {
        /// Folder searched recursively for .gpx files
        #[arg(default_value = "gpx")]
        folder: PathBuf,

        /// Also write the table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Worker threads (defaults to the number of cores)
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Print every metric of a single GPX file
    Show {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let strategy = match cli.threshold {
        Some(threshold) => ElevationStrategy::threshold(threshold).context("invalid --threshold")?,
        None => ElevationStrategy::cumulative(),
    };

    match cli.command {
        Command::Overview { folder, csv, threads } => {
            let defaults = OverviewConfig::default();
            let config = OverviewConfig {
                gpx_folder: folder,
                elevation_strategy: strategy,
                csv_output: csv,
                threads: threads.unwrap_or(defaults.threads),
            };
            run_overview(&config)
        }
        Command::Show { file } => {
            let track = read_gpx_file(&file)?;
            let metrics = build_activity(track, &strategy)?;
            print_metrics(&metrics);
            Ok(())
        }
    }
}

fn run_overview(config: &OverviewConfig) -> Result<()> {
    let overview = load_activities(config)
        .with_context(|| format!("loading activities from {}", config.gpx_folder.display()))?;
    print_overview(&overview);

    if let Some(csv_path) = &config.csv_output {
        write_overview_csv(&overview_rows(&overview.activities), csv_path)
            .with_context(|| format!("writing {}", csv_path.display()))?;
        println!("\nResults saved to: {}", csv_path.display());
    }
    Ok(())
}

fn print_metrics(metrics: &ActivityMetrics) {
    let or_na = |value: Option<String>| value.unwrap_or_else(|| "n/a".to_string());

    println!("\n{} ({})", metrics.name(), metrics.source_id());
    println!("  Type:            {}", metrics.activity_type());
    println!("  Start:           {}", metrics.start_time().to_rfc3339());
    println!("  Points:          {}", metrics.sample_count());
    println!("  Duration:        {}", format_hhmmss(metrics.duration_seconds()));
    println!("  Distance:        {:.2} km", metrics.distance_km());
    println!(
        "  Pace:            {}",
        or_na(metrics.average_pace().ok().map(|p| format!("{} /km", format_mmss(p))))
    );
    println!("  Elevation gain:  {}", or_na(metrics.elevation_gain().map(|g| format!("{:.1} m", g))));
    println!("  Elevation loss:  {}", or_na(metrics.elevation_loss().map(|l| format!("{:.1} m", l))));
    println!("  Avg heart rate:  {}", or_na(metrics.average_heart_rate().map(|hr| hr.to_string())));
    println!("  Max heart rate:  {}", or_na(metrics.max_heart_rate().map(|hr| hr.to_string())));
    println!("  Avg cadence:     {}", or_na(metrics.average_cadence().map(|c| c.to_string())));
    println!("  Max cadence:     {}", or_na(metrics.max_cadence().map(|c| c.to_string())));
}
