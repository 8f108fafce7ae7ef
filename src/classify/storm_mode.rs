use ndarray::{Array2, ArrayView2, ArrayView3};
use std::collections::VecDeque;

use super::{ClassifierError, StormModeClassifier, StormModeMasks, ThresholdRegime};
use crate::math::echo_top_height;

/// One threshold set for the five-category storm-mode classification.
#[derive(Debug, Clone, Copy)]
pub struct ModeThresholds {
    /// Core reflectivity for echo-top and wide-core membership (dBZ)
    pub core_dbz: f32,
    /// Echo-top height at `core_dbz` that makes a convective core deep (m)
    pub deep_top_m: f32,
    /// Contiguous convective-core area that makes a core wide (km^2)
    pub wide_area_km2: f64,
    /// Contiguous stratiform-echo area for a broad stratiform region (km^2)
    pub bsr_area_km2: f64,
}

/// Five-category storm-mode classifier: Deep, Ordinary, Wide, and
/// Deep-Wide Convective Cores plus Broad Stratiform Regions, evaluated
/// under a moderate or strong threshold set.
///
/// A convective column (C/S tier >= 1) is Deep when its core-reflectivity
/// echo top reaches the regime's height threshold, Ordinary otherwise.
/// Wide cores are 4-connected regions of convective columns at core
/// composite reflectivity whose area meets the regime's area threshold;
/// a column both Deep and Wide is a Deep-Wide core. Broad stratiform
/// regions are contiguous stratiform-echo areas above the regime's
/// stratiform area threshold.
#[derive(Debug, Clone)]
pub struct StormModeC5 {
    pub moderate: ModeThresholds,
    pub strong: ModeThresholds,
}

impl Default for StormModeC5 {
    fn default() -> Self {
        Self {
            moderate: ModeThresholds {
                core_dbz: 30.0,
                deep_top_m: 8_000.0,
                wide_area_km2: 800.0,
                bsr_area_km2: 40_000.0,
            },
            strong: ModeThresholds {
                core_dbz: 40.0,
                deep_top_m: 10_000.0,
                wide_area_km2: 1_000.0,
                bsr_area_km2: 50_000.0,
            },
        }
    }
}

impl StormModeC5 {
    pub fn thresholds(&self, regime: ThresholdRegime) -> &ModeThresholds {
        match regime {
            ThresholdRegime::Moderate => &self.moderate,
            ThresholdRegime::Strong => &self.strong,
        }
    }
}

impl StormModeClassifier for StormModeC5 {
    fn classify(
        &self,
        refl: ArrayView3<f32>,
        composite: ArrayView2<f32>,
        cs_mask: ArrayView2<i32>,
        height: ArrayView3<f32>,
        grid_spacing_km: f64,
        regime: ThresholdRegime,
    ) -> Result<StormModeMasks, ClassifierError> {
        let (_, nj, ni) = refl.dim();
        if composite.dim() != (nj, ni) || cs_mask.dim() != (nj, ni) {
            return Err(ClassifierError::InvalidInput(format!(
                "composite {:?} / C-S mask {:?} do not match reflectivity columns ({}, {})",
                composite.dim(),
                cs_mask.dim(),
                nj,
                ni
            )));
        }
        if refl.dim() != height.dim() {
            return Err(ClassifierError::InvalidInput(format!(
                "height extent {:?} does not match reflectivity {:?}",
                height.dim(),
                refl.dim()
            )));
        }
        if !composite.iter().any(|v| v.is_finite()) {
            return Err(ClassifierError::InvalidInput(
                "composite reflectivity contains no valid echoes".to_string(),
            ));
        }

        let thr = self.thresholds(regime);
        let cell_area_km2 = grid_spacing_km * grid_spacing_km;

        let convective = cs_mask.mapv(|v| v >= 1);
        let core_top = echo_top_height(refl, height, thr.core_dbz);

        let mut dcc = Array2::from_elem((nj, ni), false);
        let mut occ = Array2::from_elem((nj, ni), false);
        for j in 0..nj {
            for i in 0..ni {
                if !convective[[j, i]] {
                    continue;
                }
                let top = core_top[[j, i]];
                if top.is_finite() && top >= thr.deep_top_m {
                    dcc[[j, i]] = true;
                } else {
                    occ[[j, i]] = true;
                }
            }
        }

        // Wide cores: contiguous convective columns at core composite
        // reflectivity covering enough area.
        let wide_candidate = Array2::from_shape_fn((nj, ni), |(j, i)| {
            convective[[j, i]] && composite[[j, i]].is_finite() && composite[[j, i]] >= thr.core_dbz
        });
        let mut wcc = Array2::from_elem((nj, ni), false);
        for region in contiguous_regions(&wide_candidate) {
            if region.len() as f64 * cell_area_km2 >= thr.wide_area_km2 {
                for (j, i) in region {
                    wcc[[j, i]] = true;
                }
            }
        }

        let dwcc = Array2::from_shape_fn((nj, ni), |(j, i)| wcc[[j, i]] && dcc[[j, i]]);

        // Broad stratiform: contiguous stratiform echo covering enough area.
        let bsr_candidate = Array2::from_shape_fn((nj, ni), |(j, i)| {
            cs_mask[[j, i]] == 0 && composite[[j, i]].is_finite()
        });
        let mut bsr = Array2::from_elem((nj, ni), false);
        for region in contiguous_regions(&bsr_candidate) {
            if region.len() as f64 * cell_area_km2 >= thr.bsr_area_km2 {
                for (j, i) in region {
                    bsr[[j, i]] = true;
                }
            }
        }

        Ok(StormModeMasks {
            dcc,
            occ,
            wcc,
            dwcc,
            bsr,
        })
    }
}

/// 4-connected regions of set cells, each returned as its member indices.
fn contiguous_regions(mask: &Array2<bool>) -> Vec<Vec<(usize, usize)>> {
    let (nj, ni) = mask.dim();
    let mut visited = Array2::from_elem((nj, ni), false);
    let mut regions = Vec::new();

    for j in 0..nj {
        for i in 0..ni {
            if !mask[[j, i]] || visited[[j, i]] {
                continue;
            }
            let mut region = Vec::new();
            let mut queue = VecDeque::new();
            visited[[j, i]] = true;
            queue.push_back((j, i));
            while let Some((cj, ci)) = queue.pop_front() {
                region.push((cj, ci));
                let mut push = |nj_, ni_: usize| {
                    if mask[[nj_, ni_]] && !visited[[nj_, ni_]] {
                        visited[[nj_, ni_]] = true;
                        queue.push_back((nj_, ni_));
                    }
                };
                if cj > 0 {
                    push(cj - 1, ci);
                }
                if cj + 1 < nj {
                    push(cj + 1, ci);
                }
                if ci > 0 {
                    push(cj, ci - 1);
                }
                if ci + 1 < ni {
                    push(cj, ci + 1);
                }
            }
            regions.push(region);
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    /// Two model levels at 2 km and 9 km over a 4x4 grid, thresholds
    /// shrunk so single cells can qualify as wide/broad.
    fn test_classifier() -> StormModeC5 {
        StormModeC5 {
            moderate: ModeThresholds {
                core_dbz: 30.0,
                deep_top_m: 8_000.0,
                wide_area_km2: 32.0,
                bsr_area_km2: 64.0,
            },
            strong: ModeThresholds {
                core_dbz: 40.0,
                deep_top_m: 10_000.0,
                wide_area_km2: 48.0,
                bsr_area_km2: 96.0,
            },
        }
    }

    fn heights(nj: usize, ni: usize) -> Array3<f32> {
        let mut z = Array3::zeros((2, nj, ni));
        z.index_axis_mut(ndarray::Axis(0), 0).fill(2_000.0);
        z.index_axis_mut(ndarray::Axis(0), 1).fill(9_000.0);
        z
    }

    #[test]
    fn test_deep_vs_ordinary_core() {
        let mut refl = Array3::from_elem((2, 4, 4), f32::NAN);
        // Deep column at (1,1): 45 dBZ through both levels.
        refl[[0, 1, 1]] = 45.0;
        refl[[1, 1, 1]] = 45.0;
        // Shallow column at (2,2): echo only at the bottom level.
        refl[[0, 2, 2]] = 35.0;

        let composite = crate::math::composite_reflectivity(refl.view());
        let mut cs = Array2::zeros((4, 4));
        cs[[1, 1]] = 3;
        cs[[2, 2]] = 1;

        let z = heights(4, 4);
        let masks = test_classifier()
            .classify(
                refl.view(),
                composite.view(),
                cs.view(),
                z.view(),
                4.0,
                ThresholdRegime::Moderate,
            )
            .unwrap();

        assert!(masks.dcc[[1, 1]]);
        assert!(!masks.occ[[1, 1]]);
        assert!(masks.occ[[2, 2]]);
        assert!(!masks.dcc[[2, 2]]);
        assert!(!masks.dcc[[0, 0]] && !masks.occ[[0, 0]]);
    }

    #[test]
    fn test_wide_core_needs_contiguous_area() {
        let mut refl = Array3::from_elem((2, 4, 4), f32::NAN);
        // Two adjacent convective columns, 16 km^2 each at 4 km spacing.
        for (j, i) in [(1, 1), (1, 2)] {
            refl[[0, j, i]] = 45.0;
            refl[[1, j, i]] = 45.0;
        }
        // An isolated one that stays below the area threshold alone.
        refl[[0, 3, 0]] = 45.0;

        let composite = crate::math::composite_reflectivity(refl.view());
        let mut cs = Array2::zeros((4, 4));
        cs[[1, 1]] = 2;
        cs[[1, 2]] = 2;
        cs[[3, 0]] = 2;

        let z = heights(4, 4);
        let masks = test_classifier()
            .classify(
                refl.view(),
                composite.view(),
                cs.view(),
                z.view(),
                4.0,
                ThresholdRegime::Moderate,
            )
            .unwrap();

        assert!(masks.wcc[[1, 1]] && masks.wcc[[1, 2]]);
        assert!(!masks.wcc[[3, 0]]);
        // Deep and wide at once.
        assert!(masks.dwcc[[1, 1]]);
        assert!(!masks.dwcc[[3, 0]]);
    }

    #[test]
    fn test_broad_stratiform_region() {
        let mut refl = Array3::from_elem((2, 4, 4), f32::NAN);
        // A 2x2 block of stratiform echo: 64 km^2 at 4 km spacing.
        for (j, i) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            refl[[0, j, i]] = 18.0;
        }
        // Lone stratiform cell elsewhere.
        refl[[0, 3, 3]] = 18.0;

        let composite = crate::math::composite_reflectivity(refl.view());
        let cs = Array2::zeros((4, 4));

        let z = heights(4, 4);
        let masks = test_classifier()
            .classify(
                refl.view(),
                composite.view(),
                cs.view(),
                z.view(),
                4.0,
                ThresholdRegime::Moderate,
            )
            .unwrap();

        assert!(masks.bsr[[0, 0]] && masks.bsr[[1, 1]]);
        assert!(!masks.bsr[[3, 3]]);
    }

    #[test]
    fn test_strong_regime_is_stricter() {
        let mut refl = Array3::from_elem((2, 4, 4), f32::NAN);
        // 35 dBZ through both levels: deep under moderate (30 dBZ top at
        // 9 km) but not under strong (no 40 dBZ echo at all).
        refl[[0, 1, 1]] = 35.0;
        refl[[1, 1, 1]] = 35.0;

        let composite = crate::math::composite_reflectivity(refl.view());
        let mut cs = Array2::zeros((4, 4));
        cs[[1, 1]] = 2;

        let z = heights(4, 4);
        let classifier = test_classifier();

        let moderate = classifier
            .classify(
                refl.view(),
                composite.view(),
                cs.view(),
                z.view(),
                4.0,
                ThresholdRegime::Moderate,
            )
            .unwrap();
        let strong = classifier
            .classify(
                refl.view(),
                composite.view(),
                cs.view(),
                z.view(),
                4.0,
                ThresholdRegime::Strong,
            )
            .unwrap();

        assert!(moderate.dcc[[1, 1]]);
        assert!(!strong.dcc[[1, 1]]);
        assert!(strong.occ[[1, 1]]);
    }

    #[test]
    fn test_all_nan_composite_is_rejected() {
        let refl = Array3::from_elem((2, 4, 4), f32::NAN);
        let composite = Array2::from_elem((4, 4), f32::NAN);
        let cs = Array2::from_elem((4, 4), -1);
        let z = heights(4, 4);

        let result = test_classifier().classify(
            refl.view(),
            composite.view(),
            cs.view(),
            z.view(),
            4.0,
            ThresholdRegime::Moderate,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_contiguous_regions_diagonals_split() {
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[0, 0]] = true;
        mask[[1, 1]] = true;
        mask[[1, 2]] = true;

        let mut regions = contiguous_regions(&mask);
        regions.sort_by_key(|r| r.len());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].len(), 1);
        assert_eq!(regions[1].len(), 2);
    }
}
