use ndarray::{Array2, ArrayView2};

use super::{ClassifierError, ConvStraClassifier, ConvStraProducts};

/// Background-exceedance convective/stratiform separation after Steiner
/// et al. (1995): a column is a convective center when its reflectivity
/// either reaches a fixed convective threshold or stands out against the
/// background mean within the radius of influence; centers claim their
/// surroundings out to a convective radius that grows with background
/// intensity. Convective columns are binned into intensity tiers 1..4.
#[derive(Debug, Clone)]
pub struct ConvStraSeparator {
    /// Reflectivity at which a column is convective regardless of background (dBZ)
    pub conv_threshold_dbz: f32,
    /// Radius of influence for the background mean (km)
    pub background_radius_km: f64,
    /// Tier bin edges; reflectivity below the first edge is tier 1 (dBZ)
    pub tier_edges_dbz: [f32; 3],
}

impl Default for ConvStraSeparator {
    fn default() -> Self {
        Self {
            conv_threshold_dbz: 40.0,
            background_radius_km: 11.0,
            tier_edges_dbz: [30.0, 40.0, 50.0],
        }
    }
}

impl ConvStraSeparator {
    /// Minimum exceedance over the background for a convective center,
    /// as a function of the background intensity (Steiner et al. 1995).
    fn peakedness(background_dbz: f32) -> f32 {
        if background_dbz < 0.0 {
            10.0
        } else {
            (10.0 - background_dbz * background_dbz / 180.0).max(0.0)
        }
    }

    /// Convective radius claimed around a center, stepped by background
    /// intensity (km).
    fn convective_radius_km(background_dbz: f32) -> f64 {
        match background_dbz {
            b if b < 25.0 => 1.0,
            b if b < 30.0 => 2.0,
            b if b < 35.0 => 3.0,
            b if b < 40.0 => 4.0,
            _ => 5.0,
        }
    }

    fn tier(&self, refl_dbz: f32) -> f32 {
        let mut tier = 1;
        for edge in &self.tier_edges_dbz {
            if refl_dbz >= *edge {
                tier += 1;
            }
        }
        tier as f32
    }

    /// Mean of the finite reflectivity values within the radius of
    /// influence, the center cell included.
    fn background_mean(&self, refl: ArrayView2<f32>, grid_spacing_km: f64) -> Array2<f32> {
        let (nj, ni) = refl.dim();
        let reach = (self.background_radius_km / grid_spacing_km).floor() as isize;
        let radius_sq = self.background_radius_km * self.background_radius_km;

        let mut background = Array2::from_elem((nj, ni), f32::NAN);
        for j in 0..nj as isize {
            for i in 0..ni as isize {
                let mut sum = 0.0f64;
                let mut count = 0usize;
                for dj in -reach..=reach {
                    for di in -reach..=reach {
                        let dist_sq = ((dj * dj + di * di) as f64)
                            * grid_spacing_km
                            * grid_spacing_km;
                        if dist_sq > radius_sq {
                            continue;
                        }
                        let (jj, ii) = (j + dj, i + di);
                        if jj < 0 || ii < 0 || jj >= nj as isize || ii >= ni as isize {
                            continue;
                        }
                        let v = refl[[jj as usize, ii as usize]];
                        if v.is_finite() {
                            sum += v as f64;
                            count += 1;
                        }
                    }
                }
                if count > 0 {
                    background[[j as usize, i as usize]] = (sum / count as f64) as f32;
                }
            }
        }
        background
    }
}

impl ConvStraClassifier for ConvStraSeparator {
    fn classify(
        &self,
        refl: ArrayView2<f32>,
        lat: ArrayView2<f32>,
        lon: ArrayView2<f32>,
        grid_spacing_km: f64,
    ) -> Result<ConvStraProducts, ClassifierError> {
        let (nj, ni) = refl.dim();
        if lat.dim() != (nj, ni) || lon.dim() != (nj, ni) {
            return Err(ClassifierError::InvalidInput(format!(
                "lat/lon extent {:?}/{:?} does not match reflectivity {:?}",
                lat.dim(),
                lon.dim(),
                refl.dim()
            )));
        }
        if !refl.iter().any(|v| v.is_finite()) {
            return Err(ClassifierError::InvalidInput(
                "reflectivity field contains no valid echoes".to_string(),
            ));
        }

        let background = self.background_mean(refl, grid_spacing_km);

        // Centers: fixed threshold or background exceedance.
        let mut cores = Array2::from_elem((nj, ni), false);
        for j in 0..nj {
            for i in 0..ni {
                let v = refl[[j, i]];
                if !v.is_finite() || v <= 0.0 {
                    continue;
                }
                let bg = background[[j, i]];
                if v >= self.conv_threshold_dbz || v - bg >= Self::peakedness(bg) {
                    cores[[j, i]] = true;
                }
            }
        }

        // Start from stratiform everywhere an echo is defined, NaN where
        // the input is NaN, then let the centers claim their radius.
        let mut labels = refl.mapv(|v| if v.is_finite() { 0.0 } else { f32::NAN });
        for j in 0..nj as isize {
            for i in 0..ni as isize {
                if !cores[[j as usize, i as usize]] {
                    continue;
                }
                let radius = Self::convective_radius_km(background[[j as usize, i as usize]]);
                let reach = (radius / grid_spacing_km).ceil() as isize;
                for dj in -reach..=reach {
                    for di in -reach..=reach {
                        let dist_sq =
                            ((dj * dj + di * di) as f64) * grid_spacing_km * grid_spacing_km;
                        if dist_sq > radius * radius {
                            continue;
                        }
                        let (jj, ii) = (j + dj, i + di);
                        if jj < 0 || ii < 0 || jj >= nj as isize || ii >= ni as isize {
                            continue;
                        }
                        let (jj, ii) = (jj as usize, ii as usize);
                        let v = refl[[jj, ii]];
                        if v.is_finite() && v > 0.0 {
                            labels[[jj, ii]] = self.tier(v);
                        }
                    }
                }
            }
        }

        Ok(ConvStraProducts {
            labels,
            cores,
            background,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn flat_grid(nj: usize, ni: usize, value: f32) -> (Array2<f32>, Array2<f32>, Array2<f32>) {
        let refl = Array2::from_elem((nj, ni), value);
        let lat = Array2::from_shape_fn((nj, ni), |(j, _)| 40.0 + j as f32 * 0.04);
        let lon = Array2::from_shape_fn((nj, ni), |(_, i)| -100.0 + i as f32 * 0.04);
        (refl, lat, lon)
    }

    #[test]
    fn test_flat_low_field_is_stratiform() {
        let (refl, lat, lon) = flat_grid(9, 9, 10.0);
        let sep = ConvStraSeparator::default();
        let products = sep.classify(refl.view(), lat.view(), lon.view(), 4.0).unwrap();

        assert!(products.labels.iter().all(|&v| v == 0.0));
        assert!(!products.cores.iter().any(|&c| c));
    }

    #[test]
    fn test_isolated_peak_is_convective() {
        let (mut refl, lat, lon) = flat_grid(9, 9, 10.0);
        refl[[4, 4]] = 52.0;
        let sep = ConvStraSeparator::default();
        let products = sep.classify(refl.view(), lat.view(), lon.view(), 4.0).unwrap();

        assert!(products.cores[[4, 4]]);
        // 52 dBZ sits above the last tier edge.
        assert_eq!(products.labels[[4, 4]], 4.0);
        // Far corner stays stratiform.
        assert_eq!(products.labels[[0, 0]], 0.0);
    }

    #[test]
    fn test_nan_input_propagates_to_labels() {
        let (mut refl, lat, lon) = flat_grid(5, 5, 10.0);
        refl[[2, 3]] = f32::NAN;
        let sep = ConvStraSeparator::default();
        let products = sep.classify(refl.view(), lat.view(), lon.view(), 4.0).unwrap();

        assert!(products.labels[[2, 3]].is_nan());
        assert_eq!(products.labels[[0, 0]], 0.0);
    }

    #[test]
    fn test_all_nan_field_is_rejected() {
        let (_, lat, lon) = flat_grid(4, 4, 0.0);
        let refl = Array2::from_elem((4, 4), f32::NAN);
        let sep = ConvStraSeparator::default();
        assert!(sep.classify(refl.view(), lat.view(), lon.view(), 4.0).is_err());
    }

    #[test]
    fn test_mismatched_grids_are_rejected() {
        let (refl, lat, _) = flat_grid(5, 5, 10.0);
        let lon = Array2::zeros((4, 5));
        let sep = ConvStraSeparator::default();
        assert!(sep.classify(refl.view(), lat.view(), lon.view(), 4.0).is_err());
    }

    #[test]
    fn test_peakedness_clamps() {
        assert_eq!(ConvStraSeparator::peakedness(-5.0), 10.0);
        assert!(ConvStraSeparator::peakedness(20.0) < 10.0);
        assert_eq!(ConvStraSeparator::peakedness(60.0), 0.0);
    }
}
