pub mod vertical;

pub use vertical::*;
