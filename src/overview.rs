//! Activities overview: build every GPX file in a folder and list the
//! results newest first.
//!
//! A file that fails to decode or build is logged and left out; the batch
//! keeps going.

use std::path::{Path, PathBuf};

use csv::Writer;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::activity::{build_activity, ActivityMetrics};
use crate::elevation::ElevationStrategy;
use crate::gpx_reader::read_gpx_file;

#[derive(Debug, Clone)]
pub struct OverviewConfig {
    pub gpx_folder: PathBuf,
    pub elevation_strategy: ElevationStrategy,
    /// Where to write the overview CSV, if anywhere.
    pub csv_output: Option<PathBuf>,
    pub threads: usize,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        OverviewConfig {
            gpx_folder: PathBuf::from("gpx"),
            elevation_strategy: ElevationStrategy::default(),
            csv_output: None,
            threads: num_cpus::get(),
        }
    }
}

/// A file that could not be turned into an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct Overview {
    /// Sorted by start time, newest first.
    pub activities: Vec<ActivityMetrics>,
    pub skipped: Vec<SkippedFile>,
}

/// One display row, as shown in the overview table and CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Distance (Km)")]
    pub distance_km: String,
    #[serde(rename = "Duration")]
    pub duration: String,
    #[serde(rename = "Pace (min/Km)")]
    pub pace: String,
    #[serde(rename = "Avg HR")]
    pub average_heart_rate: String,
    #[serde(rename = "Elev. Gain")]
    pub elevation_gain: String,
}

const HEADERS: [&str; 7] = [
    "Date",
    "Name",
    "Distance (Km)",
    "Duration",
    "Pace (min/Km)",
    "Avg HR",
    "Elev. Gain",
];

impl OverviewRow {
    pub fn from_metrics(metrics: &ActivityMetrics) -> Self {
        OverviewRow {
            date: metrics.start_time().format("%Y-%m-%d").to_string(),
            name: metrics.name().to_string(),
            distance_km: format!("{:.2}", metrics.distance_km()),
            duration: format_hhmmss(metrics.duration_seconds()),
            pace: metrics
                .average_pace()
                .map(format_mmss)
                .unwrap_or_else(|_| "--:--".to_string()),
            average_heart_rate: metrics
                .average_heart_rate()
                .map(|hr| hr.to_string())
                .unwrap_or_default(),
            elevation_gain: metrics
                .elevation_gain()
                .map(|gain| format!("{:.1}", gain))
                .unwrap_or_else(|| "n/a".to_string()),
        }
    }

    fn cells(&self) -> [&str; 7] {
        [
            &self.date,
            &self.name,
            &self.distance_km,
            &self.duration,
            &self.pace,
            &self.average_heart_rate,
            &self.elevation_gain,
        ]
    }
}

/// Seconds as `MM:SS`; minutes are not wrapped at 60.
pub fn format_mmss(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Seconds as `HH:MM:SS`.
pub fn format_hhmmss(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, total % 60)
}

/// All `.gpx` files under `folder`, extension matched case-insensitively.
pub fn collect_gpx_files(folder: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut gpx_files = Vec::new();
    for entry in WalkDir::new(folder) {
        let entry = entry?;
        if entry.file_type().is_file() {
            if let Some(extension) = entry.path().extension() {
                if extension.to_string_lossy().to_lowercase() == "gpx" {
                    gpx_files.push(entry.path().to_path_buf());
                }
            }
        }
    }
    gpx_files.sort();
    Ok(gpx_files)
}

pub fn load_activities(config: &OverviewConfig) -> anyhow::Result<Overview> {
    let gpx_files = collect_gpx_files(&config.gpx_folder)?;
    info!(
        files = gpx_files.len(),
        threads = config.threads,
        strategy = %config.elevation_strategy.describe(),
        "loading activities from {}",
        config.gpx_folder.display()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.max(1))
        .build()?;

    let strategy = config.elevation_strategy;
    let results: Vec<(PathBuf, Result<ActivityMetrics, String>)> = pool.install(|| {
        gpx_files
            .par_iter()
            .map(|path| (path.clone(), load_one(path, &strategy)))
            .collect()
    });

    let mut overview = Overview::default();
    for (path, result) in results {
        match result {
            Ok(metrics) => overview.activities.push(metrics),
            Err(reason) => {
                warn!("skipping {}: {}", path.display(), reason);
                overview.skipped.push(SkippedFile { path, reason });
            }
        }
    }

    overview
        .activities
        .sort_by(|a, b| b.start_time().cmp(&a.start_time()));

    info!(
        loaded = overview.activities.len(),
        skipped = overview.skipped.len(),
        "overview ready"
    );
    Ok(overview)
}

fn load_one(path: &Path, strategy: &ElevationStrategy) -> Result<ActivityMetrics, String> {
    let track = read_gpx_file(path).map_err(|e| e.to_string())?;
    build_activity(track, strategy).map_err(|e| e.to_string())
}

pub fn overview_rows(activities: &[ActivityMetrics]) -> Vec<OverviewRow> {
    activities.iter().map(OverviewRow::from_metrics).collect()
}

pub fn write_overview_csv(rows: &[OverviewRow], output_path: &Path) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_path(output_path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Renders rows as a left-aligned plain text table.
pub fn render_table(rows: &[OverviewRow]) -> String {
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[&str]| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_line(&HEADERS)];
    lines.push(
        widths
            .iter()
            .map(|&w| "-".repeat(w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(format_line(&row.cells()));
    }
    lines.join("\n")
}

pub fn print_overview(overview: &Overview) {
    println!("\nActivities Overview");
    println!("===================");

    if overview.activities.is_empty() {
        println!("No GPX activities found.");
    } else {
        println!("{}", render_table(&overview_rows(&overview.activities)));
    }

    if !overview.skipped.is_empty() {
        println!("\n{} file(s) skipped:", overview.skipped.len());
        for skipped in &overview.skipped {
            println!("  {}: {}", skipped.path.display(), skipped.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpx_reader::tests::MORNING_RUN;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_mmss(0.0), "00:00");
        assert_eq!(format_mmss(330.7), "05:30");
        assert_eq!(format_mmss(3725.0), "62:05");
        assert_eq!(format_hhmmss(3725.0), "01:02:05");
        assert_eq!(format_hhmmss(59.9), "00:00:59");
    }

    #[test]
    fn test_collect_gpx_files_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.gpx", "");
        write(dir.path(), "B.GPX", "");
        write(dir.path(), "notes.txt", "");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "c.gpx", "");

        let files = collect_gpx_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len(), 3);
        assert!(names.contains(&"B.GPX".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn test_load_activities_skips_broken_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "may.gpx", MORNING_RUN);
        write(
            dir.path(),
            "june.gpx",
            &MORNING_RUN
                .replace("2023-05-01", "2023-06-01")
                .replace("Morning Run", "June Run"),
        );
        write(dir.path(), "broken.gpx", "<gpx>not really</gpx");

        let config = OverviewConfig {
            gpx_folder: dir.path().to_path_buf(),
            threads: 2,
            ..OverviewConfig::default()
        };
        let overview = load_activities(&config).unwrap();

        assert_eq!(overview.activities.len(), 2);
        assert_eq!(overview.activities[0].name(), "June Run");
        assert_eq!(overview.activities[1].name(), "Morning Run");
        assert_eq!(overview.skipped.len(), 1);
        assert!(overview.skipped[0].path.ends_with("broken.gpx"));
    }

    #[test]
    fn test_rows_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "run.gpx", MORNING_RUN);

        let config = OverviewConfig {
            gpx_folder: dir.path().to_path_buf(),
            elevation_strategy: ElevationStrategy::threshold(3.0).unwrap(),
            threads: 1,
            ..OverviewConfig::default()
        };
        let overview = load_activities(&config).unwrap();
        let rows = overview_rows(&overview.activities);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date, "2023-05-01");
        assert_eq!(row.name, "Morning Run");
        assert_eq!(row.duration, "00:02:00");
        assert_eq!(row.average_heart_rate, "145");
        assert_eq!(row.elevation_gain, "5.0");

        let csv_path = dir.path().join("overview.csv");
        write_overview_csv(&rows, &csv_path).unwrap();
        let written = fs::read_to_string(&csv_path).unwrap();
        assert!(written.starts_with("Date,Name,Distance (Km),Duration,Pace (min/Km),Avg HR,Elev. Gain"));
        assert!(written.contains("Morning Run"));

        let table = render_table(&rows);
        assert!(table.lines().next().unwrap().starts_with("Date"));
        assert_eq!(table.lines().count(), 3);
    }
}
