use chrono::NaiveDate;
use ndarray::{Array3, Axis};
use std::time::{Duration, Instant};

use super::timestep::{classify_timestep, ClassifyOptions, GridStatics, TimestepLabels};
use crate::classify::{ConvStraClassifier, StormModeClassifier, ThresholdRegime};
use crate::config::Config;
use crate::data_io::{write_day_labels, DayDataset, LabelSpec, CS_MASK_VAR};
use crate::error::PipelineError;

/// Outcome of one successfully processed day.
#[derive(Debug, Clone)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub timesteps: usize,
    pub elapsed: Duration,
}

/// Process one calendar day: classify every time step in stored
/// ascending order, stack the per-step label fields along a leading time
/// axis in memory, then amend the day's dBZ file in a single write-back.
///
/// All-or-nothing: any failing step aborts the day before anything is
/// written, so a failed day can be re-run as-is.
pub fn process_day<C, S>(
    config: &Config,
    date: NaiveDate,
    cs: &C,
    sm: &S,
) -> Result<DaySummary, PipelineError>
where
    C: ConvStraClassifier,
    S: StormModeClassifier,
{
    let started = Instant::now();

    let dataset = DayDataset::open(config, date)?;
    let n_time = dataset.num_timesteps();
    if n_time == 0 {
        return Err(PipelineError::MissingInput(format!(
            "{} has no time steps",
            dataset.dbz_path().display()
        )));
    }

    // The stacked label order is later relied upon to align one-to-one
    // with the stored time coordinate.
    let times = dataset.times()?;
    if times.len() != n_time {
        return Err(PipelineError::shape_mismatch(
            "time coordinate",
            &[n_time],
            &[times.len()],
        ));
    }
    if !times.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(PipelineError::MissingInput(format!(
            "time coordinate in {} is not strictly ascending",
            dataset.dbz_path().display()
        )));
    }

    let statics = GridStatics {
        latitude: dataset.latitude()?,
        longitude: dataset.longitude()?,
    };
    let opts = ClassifyOptions::from_config(config);

    let mut steps: Vec<TimestepLabels> = Vec::with_capacity(n_time);
    for t in 0..n_time {
        if config.verbose {
            println!("  {} step {}/{} ({})", date, t + 1, n_time, times[t]);
        }
        steps.push(classify_timestep(&dataset, t, &statics, cs, sm, &opts)?);
    }

    // Release the read handles before amending the dBZ file.
    let dbz_path = dataset.dbz_path().to_path_buf();
    drop(dataset);

    let mut labels = Vec::with_capacity(1 + opts.regimes.len());
    labels.push((
        cs_mask_spec(config),
        stack_steps(steps.iter().map(|s| &s.cs_mask))?,
    ));
    for (index, &regime) in opts.regimes.iter().enumerate() {
        labels.push((
            storm_mode_spec(regime),
            stack_steps(steps.iter().map(|s| &s.storm_modes[index].1))?,
        ));
    }

    write_day_labels(&dbz_path, &labels)?;

    Ok(DaySummary {
        date,
        timesteps: n_time,
        elapsed: started.elapsed(),
    })
}

/// Join the per-step 2-D fields into one (Time, south_north, west_east)
/// array, preserving step order.
fn stack_steps<'a, I>(steps: I) -> Result<Array3<i32>, PipelineError>
where
    I: Iterator<Item = &'a ndarray::Array2<i32>>,
{
    let views: Vec<_> = steps.map(|s| s.view()).collect();
    ndarray::stack(Axis(0), &views).map_err(|e| {
        PipelineError::MissingInput(format!("cannot stack per-step label fields: {}", e))
    })
}

fn cs_mask_spec(config: &Config) -> LabelSpec {
    LabelSpec {
        name: CS_MASK_VAR.to_string(),
        long_name: "Convective/Stratiform Mask".to_string(),
        description: format!(
            "Derived mask for convective (1-4), stratiform (0) and missing (-1) echoes from model level: {}",
            config.cs_level
        ),
    }
}

fn storm_mode_spec(regime: ThresholdRegime) -> LabelSpec {
    LabelSpec {
        name: regime.variable_name().to_string(),
        long_name: format!("Storm Mode ({} thresholds)", regime.name()),
        description: format!(
            "Classified Storm Modes with {} thresholds (1:DCC; 2:OCC; 3:WCC; 4:DWCC; 5:BSR)",
            regime.name()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_stack_steps_preserves_order() {
        let step0 = array![[1, 2], [3, 4]];
        let step1 = array![[5, 6], [7, 8]];
        let stacked = stack_steps([&step0, &step1].into_iter()).unwrap();

        assert_eq!(stacked.dim(), (2, 2, 2));
        assert_eq!(stacked[[0, 0, 1]], 2);
        assert_eq!(stacked[[1, 1, 0]], 7);
    }

    #[test]
    fn test_stack_steps_rejects_mixed_extents() {
        let step0 = array![[1, 2]];
        let step1 = array![[1], [2]];
        assert!(stack_steps([&step0, &step1].into_iter()).is_err());
    }

    #[test]
    fn test_storm_mode_spec_names_follow_regime() {
        let moderate = storm_mode_spec(ThresholdRegime::Moderate);
        assert_eq!(moderate.name, "Storm_Mode_mod");
        assert!(moderate.description.contains("moderate"));

        let strong = storm_mode_spec(ThresholdRegime::Strong);
        assert_eq!(strong.name, "Storm_Mode_str");
        assert!(strong.long_name.contains("strong"));
    }
}
