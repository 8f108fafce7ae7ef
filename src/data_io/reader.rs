use chrono::{Duration, NaiveDate, NaiveDateTime};
use ndarray::{Array2, Array3};
use std::path::{Path, PathBuf};

use super::utils::validate_wrf_dimensions;
use super::{DBZ_VAR, HEIGHT_VAR, LAT_VAR, LON_VAR, TIMES_VAR, XTIME_VAR};
use crate::config::Config;
use crate::error::PipelineError;

/// Read-only view of one calendar day's input pair: the derived-dBZ file
/// and its companion geopotential-height file.
///
/// Both handles stay open for the lifetime of the value; the day driver
/// drops it before the label write-back so the dBZ file is never open
/// twice.
pub struct DayDataset {
    dbz: netcdf::File,
    z: netcdf::File,
    dbz_path: PathBuf,
    date: NaiveDate,
    n_time: usize,
    n_level: usize,
    n_level_stag: usize,
    n_south_north: usize,
    n_west_east: usize,
}

impl DayDataset {
    /// Open the day's input files and validate their extents against each
    /// other.
    pub fn open(config: &Config, date: NaiveDate) -> Result<Self, PipelineError> {
        let dbz_path = config.dbz_path(date);
        let z_path = config.z_path(date);

        let dbz = open_file(&dbz_path)?;
        let z = open_file(&z_path)?;

        let dbz_shape = variable_shape(&dbz, &dbz_path, DBZ_VAR)?;
        validate_wrf_dimensions(&dbz_shape).map_err(|e| {
            PipelineError::MissingInput(format!(
                "variable '{}' in {}: {}",
                DBZ_VAR,
                dbz_path.display(),
                e
            ))
        })?;
        let (n_time, n_level, n_south_north, n_west_east) =
            (dbz_shape[0], dbz_shape[1], dbz_shape[2], dbz_shape[3]);

        let z_shape = variable_shape(&z, &z_path, HEIGHT_VAR)?;
        validate_wrf_dimensions(&z_shape).map_err(|e| {
            PipelineError::MissingInput(format!(
                "variable '{}' in {}: {}",
                HEIGHT_VAR,
                z_path.display(),
                e
            ))
        })?;
        if z_shape[0] != n_time || z_shape[2] != n_south_north || z_shape[3] != n_west_east {
            return Err(PipelineError::shape_mismatch(
                format!("'{}' against '{}'", HEIGHT_VAR, DBZ_VAR),
                &[n_time, n_south_north, n_west_east],
                &[z_shape[0], z_shape[2], z_shape[3]],
            ));
        }
        let n_level_stag = z_shape[1];
        if n_level_stag < 2 {
            return Err(PipelineError::MissingInput(format!(
                "variable '{}' in {} has {} staggered level(s), cannot destagger",
                HEIGHT_VAR,
                z_path.display(),
                n_level_stag
            )));
        }

        Ok(Self {
            dbz,
            z,
            dbz_path,
            date,
            n_time,
            n_level,
            n_level_stag,
            n_south_north,
            n_west_east,
        })
    }

    pub fn num_timesteps(&self) -> usize {
        self.n_time
    }

    pub fn num_levels(&self) -> usize {
        self.n_level
    }

    /// Horizontal extent as (south_north, west_east).
    pub fn horizontal_extent(&self) -> (usize, usize) {
        (self.n_south_north, self.n_west_east)
    }

    pub fn dbz_path(&self) -> &Path {
        &self.dbz_path
    }

    /// The time coordinate in stored order, from the WRF `Times` char
    /// array or a numeric `XTIME` (minutes into the day) fallback.
    pub fn times(&self) -> Result<Vec<NaiveDateTime>, PipelineError> {
        if let Some(times_var) = self.dbz.variable(TIMES_VAR) {
            let dims: Vec<usize> = times_var.dimensions().iter().map(|d| d.len()).collect();
            if dims.len() != 2 {
                return Err(PipelineError::MissingInput(format!(
                    "variable '{}' is {}-dimensional, expected (Time, DateStrLen)",
                    TIMES_VAR,
                    dims.len()
                )));
            }
            let (num_times, date_str_len) = (dims[0], dims[1]);
            let raw: Vec<u8> = times_var
                .get_values(..)
                .map_err(|e| PipelineError::MissingInput(format!("cannot read '{}': {}", TIMES_VAR, e)))?;

            let mut parsed = Vec::with_capacity(num_times);
            for t in 0..num_times {
                let bytes = &raw[t * date_str_len..(t + 1) * date_str_len];
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| {
                        PipelineError::MissingInput(format!("invalid UTF-8 in '{}': {}", TIMES_VAR, e))
                    })?
                    .trim_end_matches('\0')
                    .trim();
                let datetime = NaiveDateTime::parse_from_str(text, "%Y-%m-%d_%H:%M:%S")
                    .map_err(|_| {
                        PipelineError::MissingInput(format!(
                            "cannot parse time string '{}' in '{}'",
                            text, TIMES_VAR
                        ))
                    })?;
                parsed.push(datetime);
            }
            return Ok(parsed);
        }

        if let Some(xtime_var) = self.dbz.variable(XTIME_VAR) {
            let minutes: Vec<f64> = xtime_var
                .get_values(..)
                .map_err(|e| PipelineError::MissingInput(format!("cannot read '{}': {}", XTIME_VAR, e)))?;
            let midnight = self
                .date
                .and_hms_opt(0, 0, 0)
                .expect("midnight is a valid time");
            return Ok(minutes
                .into_iter()
                .map(|m| midnight + Duration::seconds((m * 60.0) as i64))
                .collect());
        }

        Err(PipelineError::MissingInput(format!(
            "no time coordinate in {}: tried '{}', '{}'",
            self.dbz_path.display(),
            TIMES_VAR,
            XTIME_VAR
        )))
    }

    /// Latitude grid, constant across the day.
    pub fn latitude(&self) -> Result<Array2<f32>, PipelineError> {
        self.horizontal_grid(LAT_VAR)
    }

    /// Longitude grid, constant across the day.
    pub fn longitude(&self) -> Result<Array2<f32>, PipelineError> {
        self.horizontal_grid(LON_VAR)
    }

    fn horizontal_grid(&self, name: &str) -> Result<Array2<f32>, PipelineError> {
        let var = self.dbz.variable(name).ok_or_else(|| {
            PipelineError::MissingInput(format!(
                "variable '{}' not found in {}",
                name,
                self.dbz_path.display()
            ))
        })?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if shape != [self.n_south_north, self.n_west_east] {
            return Err(PipelineError::shape_mismatch(
                format!("'{}'", name),
                &[self.n_south_north, self.n_west_east],
                &shape,
            ));
        }
        let data: Vec<f32> = var
            .get_values((0..self.n_south_north, 0..self.n_west_east))
            .map_err(|e| PipelineError::MissingInput(format!("cannot read '{}': {}", name, e)))?;
        Array2::from_shape_vec((self.n_south_north, self.n_west_east), data)
            .map_err(|e| PipelineError::MissingInput(format!("cannot shape '{}': {}", name, e)))
    }

    /// Full reflectivity column at one time index, shaped
    /// (bottom_top, south_north, west_east).
    pub fn reflectivity_at(&self, t: usize) -> Result<Array3<f32>, PipelineError> {
        self.column_at(&self.dbz, DBZ_VAR, t, self.n_level)
    }

    /// Vertically staggered geopotential height at one time index, shaped
    /// (bottom_top_stag, south_north, west_east).
    pub fn staggered_height_at(&self, t: usize) -> Result<Array3<f32>, PipelineError> {
        self.column_at(&self.z, HEIGHT_VAR, t, self.n_level_stag)
    }

    fn column_at(
        &self,
        file: &netcdf::File,
        name: &str,
        t: usize,
        n_level: usize,
    ) -> Result<Array3<f32>, PipelineError> {
        if t >= self.n_time {
            return Err(PipelineError::MissingInput(format!(
                "time index {} out of range for {} steps",
                t, self.n_time
            )));
        }
        let var = file.variable(name).ok_or_else(|| {
            PipelineError::MissingInput(format!("variable '{}' disappeared mid-read", name))
        })?;
        let data: Vec<f32> = var
            .get_values((
                t..t + 1,
                0..n_level,
                0..self.n_south_north,
                0..self.n_west_east,
            ))
            .map_err(|e| {
                PipelineError::MissingInput(format!("cannot read '{}' at step {}: {}", name, t, e))
            })?;
        Array3::from_shape_vec((n_level, self.n_south_north, self.n_west_east), data)
            .map_err(|e| PipelineError::MissingInput(format!("cannot shape '{}': {}", name, e)))
    }
}

fn open_file(path: &Path) -> Result<netcdf::File, PipelineError> {
    netcdf::open(path)
        .map_err(|e| PipelineError::MissingInput(format!("cannot open {}: {}", path.display(), e)))
}

fn variable_shape(
    file: &netcdf::File,
    path: &Path,
    name: &str,
) -> Result<Vec<usize>, PipelineError> {
    let var = file.variable(name).ok_or_else(|| {
        PipelineError::MissingInput(format!(
            "variable '{}' not found in {}",
            name,
            path.display()
        ))
    })?;
    Ok(var.dimensions().iter().map(|d| d.len()).collect())
}
