use chrono::NaiveDate;
use rayon::prelude::*;

use crate::classify::{ConvStraClassifier, StormModeClassifier};
use crate::config::Config;
use crate::error::PipelineError;
use crate::pipeline::day::{process_day, DaySummary};

/// Process independent calendar days on a dedicated thread pool.
///
/// Each day opens and amends only its own dataset, so days can run
/// concurrently without write contention; results come back keyed by
/// date in the input order.
pub fn process_days_parallel<C, S>(
    config: &Config,
    days: &[NaiveDate],
    cs: &C,
    sm: &S,
) -> Result<Vec<(NaiveDate, Result<DaySummary, PipelineError>)>, String>
where
    C: ConvStraClassifier + Sync,
    S: StormModeClassifier + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()
        .map_err(|e| format!("Failed to create thread pool: {}", e))?;

    println!(
        "Processing {} day(s) in parallel using {} threads",
        days.len(),
        config.num_threads
    );

    Ok(pool.install(|| {
        days.par_iter()
            .map(|&date| (date, process_day(config, date, cs, sm)))
            .collect()
    }))
}
