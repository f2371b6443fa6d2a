pub mod date_format;
pub mod file;
pub mod serde_helpers;
