pub mod dataset;

pub use dataset::{load_records, read_records};
