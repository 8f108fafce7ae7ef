pub mod reader;
pub mod utils;
pub mod writer;

pub use reader::DayDataset;
pub use writer::{write_day_labels, LabelSpec};

/// Variable and dimension names of the WRF-derived per-day files.
pub const DBZ_VAR: &str = "dBZ";
pub const HEIGHT_VAR: &str = "Z";
pub const LAT_VAR: &str = "XLAT";
pub const LON_VAR: &str = "XLONG";
pub const TIMES_VAR: &str = "Times";
pub const XTIME_VAR: &str = "XTIME";

pub const TIME_DIM: &str = "Time";
pub const LEVEL_DIM: &str = "bottom_top";
pub const SOUTH_NORTH_DIM: &str = "south_north";
pub const WEST_EAST_DIM: &str = "west_east";

/// Name of the persisted convective/stratiform label variable.
pub const CS_MASK_VAR: &str = "CS_mask";
