pub mod files;
pub mod stats;
