use ndarray::{Array2, Axis};

use crate::classify::{
    ConvStraClassifier, StormMode, StormModeClassifier, StormModeMasks, ThresholdRegime,
    CS_MAX_TIER, CS_MISSING,
};
use crate::config::Config;
use crate::data_io::DayDataset;
use crate::error::PipelineError;
use crate::math::{composite_reflectivity, destagger_vertical};

/// Horizontal grids read once per day; constant across its time steps.
pub struct GridStatics {
    pub latitude: Array2<f32>,
    pub longitude: Array2<f32>,
}

/// Classification parameters extracted from the run configuration.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub cs_level: usize,
    pub grid_spacing_km: f64,
    pub regimes: Vec<ThresholdRegime>,
}

impl ClassifyOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cs_level: config.cs_level,
            grid_spacing_km: config.grid_spacing_km,
            regimes: config.regimes.clone(),
        }
    }
}

/// One time step's label fields, shaped like the horizontal grid.
pub struct TimestepLabels {
    pub cs_mask: Array2<i32>,
    /// One merged label field per requested regime, in request order.
    pub storm_modes: Vec<(ThresholdRegime, Array2<i32>)>,
}

/// Normalize the raw C/S classifier output into the stored label domain
/// {-1, 0, 1..4}.
///
/// The rules are applied as sequential overrides, in this order: columns
/// whose reflectivity is <= 0 are forced to the missing sentinel, then
/// columns whose reflectivity is NaN are forced to -1, so undefined
/// input always wins. Raw NaN labels (the classifier's required NaN
/// propagation) also land on -1.
pub fn normalize_cs_mask(raw: &Array2<f32>, refl_level: &Array2<f32>) -> Array2<i32> {
    Array2::from_shape_fn(raw.dim(), |idx| {
        let raw_label = raw[idx];
        let refl = refl_level[idx];

        let mut label = if raw_label.is_finite() {
            (raw_label.round() as i32).clamp(CS_MISSING, CS_MAX_TIER)
        } else {
            CS_MISSING
        };
        if refl.is_finite() && refl <= 0.0 {
            label = CS_MISSING;
        }
        if refl.is_nan() {
            label = CS_MISSING;
        }
        label
    })
}

/// Fold the five storm-mode masks into one label field under the fixed
/// precedence DWCC > DCC > WCC > OCC > BSR; columns with no mask set
/// get 0. Pure and per-column.
pub fn merge_storm_mode(masks: &StormModeMasks) -> Array2<i32> {
    Array2::from_shape_fn(masks.dcc.dim(), |idx| {
        if masks.dwcc[idx] {
            StormMode::DeepWideCore.code()
        } else if masks.dcc[idx] {
            StormMode::DeepCore.code()
        } else if masks.wcc[idx] {
            StormMode::WideCore.code()
        } else if masks.occ[idx] {
            StormMode::OrdinaryCore.code()
        } else if masks.bsr[idx] {
            StormMode::BroadStratiform.code()
        } else {
            StormMode::None.code()
        }
    })
}

/// Classify one time step: C/S mask from the designated model level,
/// then one merged storm-mode field per requested regime. No I/O side
/// effects; all slicing is read-only against the open day dataset.
pub fn classify_timestep<C, S>(
    dataset: &DayDataset,
    t: usize,
    statics: &GridStatics,
    cs: &C,
    sm: &S,
    opts: &ClassifyOptions,
) -> Result<TimestepLabels, PipelineError>
where
    C: ConvStraClassifier,
    S: StormModeClassifier,
{
    let refl = dataset.reflectivity_at(t)?;
    let (nk, nj, ni) = refl.dim();

    if opts.cs_level >= nk {
        return Err(PipelineError::MissingInput(format!(
            "C/S model level {} out of range for {} levels",
            opts.cs_level, nk
        )));
    }
    if statics.latitude.dim() != (nj, ni) {
        return Err(PipelineError::shape_mismatch(
            "latitude grid",
            &[nj, ni],
            &[statics.latitude.dim().0, statics.latitude.dim().1],
        ));
    }
    if statics.longitude.dim() != (nj, ni) {
        return Err(PipelineError::shape_mismatch(
            "longitude grid",
            &[nj, ni],
            &[statics.longitude.dim().0, statics.longitude.dim().1],
        ));
    }

    let refl_level = refl.index_axis(Axis(0), opts.cs_level).to_owned();
    let products = cs.classify(
        refl_level.view(),
        statics.latitude.view(),
        statics.longitude.view(),
        opts.grid_spacing_km,
    )?;
    if products.labels.dim() != (nj, ni) {
        return Err(PipelineError::shape_mismatch(
            "C/S classifier labels",
            &[nj, ni],
            &[products.labels.dim().0, products.labels.dim().1],
        ));
    }
    let cs_mask = normalize_cs_mask(&products.labels, &refl_level);

    let composite = composite_reflectivity(refl.view());
    let height = destagger_vertical(dataset.staggered_height_at(t)?.view());
    if height.dim() != refl.dim() {
        return Err(PipelineError::shape_mismatch(
            "destaggered height",
            &[nk, nj, ni],
            &[height.dim().0, height.dim().1, height.dim().2],
        ));
    }

    let mut storm_modes = Vec::with_capacity(opts.regimes.len());
    for &regime in &opts.regimes {
        let masks = sm.classify(
            refl.view(),
            composite.view(),
            cs_mask.view(),
            height.view(),
            opts.grid_spacing_km,
            regime,
        )?;
        storm_modes.push((regime, merge_storm_mode(&masks)));
    }

    Ok(TimestepLabels {
        cs_mask,
        storm_modes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_normalize_keeps_valid_labels() {
        let raw = array![[0.0f32, 2.0], [4.0, 1.0]];
        let refl = array![[5.0f32, 30.0], [55.0, 12.0]];
        let mask = normalize_cs_mask(&raw, &refl);
        assert_eq!(mask, array![[0, 2], [4, 1]]);
    }

    #[test]
    fn test_normalize_nan_reflectivity_wins() {
        // Same column targeted by both rules: NaN input must end at -1.
        let raw = array![[2.0f32, 3.0]];
        let refl = array![[f32::NAN, 45.0]];
        let mask = normalize_cs_mask(&raw, &refl);
        assert_eq!(mask[[0, 0]], -1);
        assert_eq!(mask[[0, 1]], 3);
    }

    #[test]
    fn test_normalize_nonpositive_reflectivity_is_missing() {
        let raw = array![[1.0f32, 0.0, 2.0]];
        let refl = array![[0.0f32, -12.0, 18.0]];
        let mask = normalize_cs_mask(&raw, &refl);
        assert_eq!(mask, array![[-1, -1, 2]]);
    }

    #[test]
    fn test_normalize_raw_nan_label_is_missing() {
        let raw = array![[f32::NAN]];
        let refl = array![[25.0f32]];
        let mask = normalize_cs_mask(&raw, &refl);
        assert_eq!(mask[[0, 0]], -1);
    }

    #[test]
    fn test_normalize_closes_label_domain() {
        // Out-of-domain raw values are clamped into {-1..4}.
        let raw = array![[9.0f32, -7.0]];
        let refl = array![[40.0f32, 40.0]];
        let mask = normalize_cs_mask(&raw, &refl);
        for &v in mask.iter() {
            assert!((-1..=4).contains(&v));
        }
    }

    fn empty_masks(nj: usize, ni: usize) -> StormModeMasks {
        StormModeMasks {
            dcc: Array2::from_elem((nj, ni), false),
            occ: Array2::from_elem((nj, ni), false),
            wcc: Array2::from_elem((nj, ni), false),
            dwcc: Array2::from_elem((nj, ni), false),
            bsr: Array2::from_elem((nj, ni), false),
        }
    }

    #[test]
    fn test_merge_single_mask_maps_to_its_code() {
        let mut masks = empty_masks(2, 3);
        masks.dcc[[0, 0]] = true;
        masks.occ[[0, 1]] = true;
        masks.wcc[[0, 2]] = true;
        masks.dwcc[[1, 0]] = true;
        masks.bsr[[1, 1]] = true;

        let merged = merge_storm_mode(&masks);
        assert_eq!(merged, array![[1, 2, 3], [4, 5, 0]]);
    }

    #[test]
    fn test_merge_unset_column_is_zero() {
        let merged = merge_storm_mode(&empty_masks(3, 3));
        assert!(merged.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_merge_precedence_on_overlap() {
        // Deep and wide overlap on one column: the deep-wide arbitration
        // is the classifier's, but deep alone outranks wide.
        let mut masks = empty_masks(1, 2);
        masks.dcc[[0, 0]] = true;
        masks.wcc[[0, 0]] = true;
        masks.occ[[0, 1]] = true;
        masks.bsr[[0, 1]] = true;

        let merged = merge_storm_mode(&masks);
        assert_eq!(merged[[0, 0]], 1);
        assert_eq!(merged[[0, 1]], 2);
    }

    #[test]
    fn test_merge_deep_wide_outranks_everything() {
        let mut masks = empty_masks(1, 1);
        masks.dcc[[0, 0]] = true;
        masks.wcc[[0, 0]] = true;
        masks.dwcc[[0, 0]] = true;
        masks.bsr[[0, 0]] = true;

        let merged = merge_storm_mode(&masks);
        assert_eq!(merged[[0, 0]], 4);
    }
}
