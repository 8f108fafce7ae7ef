pub mod day;
pub mod range;
pub mod timestep;

pub use day::{process_day, DaySummary};
pub use range::{process_date_range, RangeSummary};
pub use timestep::{
    classify_timestep, merge_storm_mode, normalize_cs_mask, ClassifyOptions, GridStatics,
    TimestepLabels,
};
