use ndarray::Array3;
use std::path::Path;

use super::utils::get_variable_units;
use super::{SOUTH_NORTH_DIM, TIME_DIM, WEST_EAST_DIM};
use crate::error::PipelineError;

/// Identity and descriptive attributes of one persisted label variable.
#[derive(Debug, Clone)]
pub struct LabelSpec {
    pub name: String,
    pub long_name: String,
    pub description: String,
}

/// Amend a day's dBZ file with the stacked label fields, in one pass.
///
/// Each variable is created with its attributes when absent, or
/// overwritten in place when already present with the same shape;
/// overwriting a variable of a different shape is an error. No other
/// variable in the file is touched.
pub fn write_day_labels(
    path: &Path,
    labels: &[(LabelSpec, Array3<i32>)],
) -> Result<(), PipelineError> {
    let mut file = netcdf::append(path).map_err(PipelineError::Persistence)?;

    for (spec, field) in labels {
        let (nt, nj, ni) = field.dim();

        let existing_shape: Option<Vec<usize>> = file
            .variable(&spec.name)
            .map(|v| v.dimensions().iter().map(|d| d.len()).collect());

        match existing_shape {
            Some(shape) => {
                // Reprocessing: overwrite in place, same shape only.
                if shape != [nt, nj, ni] {
                    return Err(PipelineError::shape_mismatch(
                        format!("overwrite target '{}'", spec.name),
                        &[nt, nj, ni],
                        &shape,
                    ));
                }
            }
            None => {
                for dim in [TIME_DIM, SOUTH_NORTH_DIM, WEST_EAST_DIM] {
                    if file.dimension(dim).is_none() {
                        return Err(PipelineError::MissingInput(format!(
                            "dimension '{}' not found in {}",
                            dim,
                            path.display()
                        )));
                    }
                }
                let mut var = file
                    .add_variable::<i32>(&spec.name, &[TIME_DIM, SOUTH_NORTH_DIM, WEST_EAST_DIM])
                    .map_err(PipelineError::Persistence)?;
                var.put_attribute("long_name", spec.long_name.as_str())
                    .map_err(PipelineError::Persistence)?;
                var.put_attribute("description", spec.description.as_str())
                    .map_err(PipelineError::Persistence)?;
                var.put_attribute("units", get_variable_units(&spec.name))
                    .map_err(PipelineError::Persistence)?;
            }
        }

        let mut var = file.variable_mut(&spec.name).ok_or_else(|| {
            PipelineError::MissingInput(format!("variable '{}' vanished during write", spec.name))
        })?;
        let flat: Vec<i32> = field.iter().copied().collect();
        var.put_values(&flat, (0..nt, 0..nj, 0..ni))
            .map_err(PipelineError::Persistence)?;
    }

    Ok(())
}
