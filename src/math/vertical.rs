use ndarray::{Array2, Array3, ArrayView3, Axis, Zip};

/// Interpolate a vertically staggered field onto the unstaggered model
/// levels: level k becomes the midpoint of staggered levels k and k+1.
///
/// Input shape (nk+1, nj, ni), output shape (nk, nj, ni).
pub fn destagger_vertical(staggered: ArrayView3<f32>) -> Array3<f32> {
    let (nk_stag, nj, ni) = staggered.dim();
    assert!(nk_stag >= 2, "staggered field needs at least two levels");

    let mut out = Array3::zeros((nk_stag - 1, nj, ni));
    for k in 0..nk_stag - 1 {
        let lower = staggered.index_axis(Axis(0), k);
        let upper = staggered.index_axis(Axis(0), k + 1);
        let mut level = out.index_axis_mut(Axis(0), k);
        Zip::from(&mut level)
            .and(&lower)
            .and(&upper)
            .for_each(|dst, &lo, &hi| *dst = 0.5 * (lo + hi));
    }
    out
}

/// Column-wise maximum over the vertical axis, skipping NaN. Columns with
/// no finite value stay NaN.
///
/// Input shape (nk, nj, ni), output shape (nj, ni).
pub fn composite_reflectivity(refl: ArrayView3<f32>) -> Array2<f32> {
    let (nk, nj, ni) = refl.dim();
    let mut composite = Array2::from_elem((nj, ni), f32::NAN);
    for k in 0..nk {
        let level = refl.index_axis(Axis(0), k);
        Zip::from(&mut composite).and(&level).for_each(|max, &v| {
            if v.is_finite() && (max.is_nan() || v > *max) {
                *max = v;
            }
        });
    }
    composite
}

/// Highest level at which reflectivity reaches `threshold_dbz`, reported
/// as the height of that level. Columns that never reach the threshold
/// stay NaN.
///
/// `refl` and `height` share shape (nk, nj, ni); output is (nj, ni) in
/// the units of `height`.
pub fn echo_top_height(
    refl: ArrayView3<f32>,
    height: ArrayView3<f32>,
    threshold_dbz: f32,
) -> Array2<f32> {
    let (nk, nj, ni) = refl.dim();
    assert_eq!(refl.dim(), height.dim(), "reflectivity/height extent");

    let mut top = Array2::from_elem((nj, ni), f32::NAN);
    for k in 0..nk {
        let level_refl = refl.index_axis(Axis(0), k);
        let level_z = height.index_axis(Axis(0), k);
        Zip::from(&mut top)
            .and(&level_refl)
            .and(&level_z)
            .for_each(|t, &r, &z| {
                if r.is_finite() && r >= threshold_dbz && z.is_finite() && (t.is_nan() || z > *t) {
                    *t = z;
                }
            });
    }
    top
}
