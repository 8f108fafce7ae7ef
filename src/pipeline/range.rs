use chrono::NaiveDate;
use std::time::{Duration, Instant};

use super::day::{process_day, DaySummary};
use crate::classify::{ConvStraClassifier, StormModeClassifier};
use crate::config::Config;
use crate::error::PipelineError;
use crate::parallel::process_days_parallel;
use crate::time_utils::date_range_inclusive;

/// Aggregate outcome of a date-range run.
#[derive(Debug)]
pub struct RangeSummary {
    pub completed: Vec<DaySummary>,
    pub failed: Vec<(NaiveDate, PipelineError)>,
    pub elapsed: Duration,
}

impl RangeSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run the day driver over every calendar day of the configured range,
/// ascending, with no shared mutable state between days.
///
/// Days are independent: a failing day is recorded and the range
/// continues, unless `halt_on_error` restores the fail-fast behavior.
/// With `num_threads > 1` the days are distributed over a dedicated
/// thread pool; each day's all-or-nothing persistence is unaffected and
/// no day is ever handled by two workers. Fail-fast ordering only exists
/// sequentially, so `halt_on_error` always runs the days one at a time
/// (`Config::validate` rejects the combination up front).
pub fn process_date_range<C, S>(config: &Config, cs: &C, sm: &S) -> Result<RangeSummary, String>
where
    C: ConvStraClassifier + Sync,
    S: StormModeClassifier + Sync,
{
    let started = Instant::now();
    let days = date_range_inclusive(config.start_date, config.end_date);

    let mut completed = Vec::new();
    let mut failed = Vec::new();

    if config.num_threads > 1 && !config.halt_on_error {
        let results = process_days_parallel(config, &days, cs, sm)?;
        for (date, result) in results {
            match result {
                Ok(summary) => completed.push(summary),
                Err(error) => {
                    eprintln!("  {} failed: {}", date, error);
                    failed.push((date, error));
                }
            }
        }
    } else {
        for &date in &days {
            println!("Processing {} {}", config.scenario, date);
            match process_day(config, date, cs, sm) {
                Ok(summary) => {
                    println!(
                        "  {} done: {} time step(s) in {:.1} s",
                        date,
                        summary.timesteps,
                        summary.elapsed.as_secs_f64()
                    );
                    completed.push(summary);
                }
                Err(error) => {
                    eprintln!("  {} failed: {}", date, error);
                    failed.push((date, error));
                    if config.halt_on_error {
                        break;
                    }
                }
            }
        }
    }

    Ok(RangeSummary {
        completed,
        failed,
        elapsed: started.elapsed(),
    })
}
