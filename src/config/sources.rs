//! Config sources, lowest to highest precedence after the defaults.

pub mod environment;
pub mod global_file;
pub mod workspace_file;
