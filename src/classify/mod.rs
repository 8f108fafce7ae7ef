pub mod conv_stra;
pub mod storm_mode;

pub use conv_stra::ConvStraSeparator;
pub use storm_mode::{ModeThresholds, StormModeC5};

use ndarray::{Array2, ArrayView2, ArrayView3};
use thiserror::Error;

/// Errors raised by the classifiers on malformed input. Propagated to the
/// day driver unchanged.
#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("invalid classifier input: {0}")]
    InvalidInput(String),
}

/// Sentinel for columns whose input reflectivity is undefined or below
/// the valid range.
pub const CS_MISSING: i32 = -1;
/// Stratiform echo label.
pub const CS_STRATIFORM: i32 = 0;
/// Highest convective intensity tier.
pub const CS_MAX_TIER: i32 = 4;

/// Storm-mode categories and their stored integer codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum StormMode {
    None = 0,
    DeepCore = 1,
    OrdinaryCore = 2,
    WideCore = 3,
    DeepWideCore = 4,
    BroadStratiform = 5,
}

impl StormMode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Threshold sensitivity regime for the storm-mode classification. Each
/// regime produces its own label variable over the same inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdRegime {
    Moderate,
    Strong,
}

impl ThresholdRegime {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Moderate => "moderate",
            Self::Strong => "strong",
        }
    }

    /// Name of the label variable this regime is persisted under.
    pub fn variable_name(&self) -> &'static str {
        match self {
            Self::Moderate => "Storm_Mode_mod",
            Self::Strong => "Storm_Mode_str",
        }
    }
}

impl std::fmt::Display for ThresholdRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw output of the convective/stratiform separation.
///
/// `labels` carries the per-column ordinal result: NaN where the input
/// reflectivity is NaN, 0 for stratiform, 1..4 for convective tiers.
/// `cores` marks the convective centers, `background` the smoothed
/// background reflectivity; the pipeline consumes only `labels`.
#[derive(Debug, Clone)]
pub struct ConvStraProducts {
    pub labels: Array2<f32>,
    pub cores: Array2<bool>,
    pub background: Array2<f32>,
}

/// Convective/stratiform discriminator over a single-level reflectivity
/// field. Implementations own their numeric policy; NaN input columns
/// must map to NaN labels.
pub trait ConvStraClassifier {
    fn classify(
        &self,
        refl: ArrayView2<f32>,
        lat: ArrayView2<f32>,
        lon: ArrayView2<f32>,
        grid_spacing_km: f64,
    ) -> Result<ConvStraProducts, ClassifierError>;
}

/// One boolean field per storm-mode category, all over the horizontal
/// grid. The masks are not guaranteed mutually exclusive; the pipeline
/// arbitrates overlaps.
#[derive(Debug, Clone)]
pub struct StormModeMasks {
    pub dcc: Array2<bool>,
    pub occ: Array2<bool>,
    pub wcc: Array2<bool>,
    pub dwcc: Array2<bool>,
    pub bsr: Array2<bool>,
}

/// Storm-mode discriminator over the full reflectivity column, its
/// composite, the normalized C/S mask, and the unstaggered height column.
pub trait StormModeClassifier {
    fn classify(
        &self,
        refl: ArrayView3<f32>,
        composite: ArrayView2<f32>,
        cs_mask: ArrayView2<i32>,
        height: ArrayView3<f32>,
        grid_spacing_km: f64,
        regime: ThresholdRegime,
    ) -> Result<StormModeMasks, ClassifierError>;
}
