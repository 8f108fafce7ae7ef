use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use wrf_dbz_class::classify::{ConvStraSeparator, StormModeC5};
use wrf_dbz_class::config::Config;
use wrf_dbz_class::pipeline::process_date_range;
use wrf_dbz_class::time_utils::format_yyyymmdd;

fn main() {
    let config = match Config::from_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    println!(
        "wrf_dbz_class: {} {} - {} (C/S level {}, {} km grid)",
        config.scenario,
        format_yyyymmdd(config.start_date),
        format_yyyymmdd(config.end_date),
        config.cs_level,
        config.grid_spacing_km
    );

    let cs = ConvStraSeparator::default();
    let sm = StormModeC5::default();

    let summary = match process_date_range(&config, &cs, &sm) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Run failed: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Classified {} day(s), {} failed, runtime {:.1} s",
        summary.completed.len(),
        summary.failed.len(),
        summary.elapsed.as_secs_f64()
    );
    for (date, error) in &summary.failed {
        eprintln!("  {}: {}", date, error);
    }

    if let Some(path) = &config.runtime_log {
        if let Err(e) = append_runtime_log(path, &config, summary.elapsed) {
            eprintln!("Warning: could not append runtime log {}: {}", path.display(), e);
        }
    }

    if !summary.all_succeeded() {
        std::process::exit(1);
    }
}

/// Append the wall-clock accounting record for this run.
fn append_runtime_log(path: &Path, config: &Config, elapsed: Duration) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let seconds = elapsed.as_secs_f64();

    writeln!(file, "{}", config.scenario)?;
    writeln!(
        file,
        "{} - {}",
        format_yyyymmdd(config.start_date),
        format_yyyymmdd(config.end_date)
    )?;
    writeln!(file, "RUNTIME: {:.6} SEC", seconds)?;
    writeln!(file, "RUNTIME: {:.6} MIN", seconds / 60.0)?;
    writeln!(file, "RUNTIME: {:.6} HOUR", seconds / 3600.0)?;
    Ok(())
}
