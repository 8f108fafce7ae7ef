/// Utility helpers for the WRF-derived NetCDF files.
use super::{DBZ_VAR, HEIGHT_VAR, LAT_VAR, LON_VAR, XTIME_VAR};

/// Units of the variables this pipeline reads and writes.
pub fn get_variable_units(variable_name: &str) -> &'static str {
    match variable_name {
        v if v == DBZ_VAR => "dBZ",
        v if v == HEIGHT_VAR => "m",
        v if v == LAT_VAR => "degrees_north",
        v if v == LON_VAR => "degrees_east",
        v if v == XTIME_VAR => "minutes",
        // Label variables are dimensionless category codes.
        "CS_mask" | "Storm_Mode_mod" | "Storm_Mode_str" => "1",
        _ => "unknown",
    }
}

/// Validate NetCDF dimension ordering for a 4-D WRF field.
/// Expected order: [Time, bottom_top, south_north, west_east]
pub fn validate_wrf_dimensions(shape: &[usize]) -> Result<(), String> {
    if shape.len() != 4 {
        return Err(format!("Expected 4 dimensions, got {}", shape.len()));
    }

    let (nt, nk, nj, ni) = (shape[0], shape[1], shape[2], shape[3]);
    if nt == 0 || nk == 0 || nj == 0 || ni == 0 {
        return Err("All dimensions must be greater than 0".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_variable_units() {
        assert_eq!(get_variable_units("dBZ"), "dBZ");
        assert_eq!(get_variable_units("Z"), "m");
        assert_eq!(get_variable_units("CS_mask"), "1");
        assert_eq!(get_variable_units("unknown_var"), "unknown");
    }

    #[test]
    fn test_validate_wrf_dimensions() {
        assert!(validate_wrf_dimensions(&[8, 50, 1015, 1359]).is_ok());
        assert!(validate_wrf_dimensions(&[8, 50, 1015]).is_err());
        assert!(validate_wrf_dimensions(&[8, 0, 10, 10]).is_err());
    }
}
