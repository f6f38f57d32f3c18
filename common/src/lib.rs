pub mod file_format;
pub mod float_ext;
pub mod log_setup;
pub mod parallel;
pub mod serde;

pub use file_format::{FileExtensionError, FileFormat, FileFormatResult};
pub use log_setup::{setup_logging, setup_logging_in};

/// Default tolerance for comparing `f64` values.
pub const EPSILON: f64 = 1e-9;
