use thiserror::Error;

use crate::classify::ClassifierError;

/// Day-scoped pipeline errors. None of these are retried; a failing day
/// leaves no partial label state on disk, so re-running the day is safe.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required file, variable, dimension, or vertical level is absent
    /// from a day's dataset.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// Input fields disagree in extent, or an overwrite target has a
    /// different shape than the new data.
    #[error("shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    /// A classifier rejected its input; propagated unchanged.
    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    /// The label write-back failed. The day's in-memory result is lost.
    #[error("persistence error: {0}")]
    Persistence(#[source] netcdf::Error),
}

impl PipelineError {
    /// Helper for the common extent check on 2-D fields.
    pub fn shape_mismatch(what: impl Into<String>, expected: &[usize], found: &[usize]) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}
