pub mod trainer;


pub use trainer::{batch_ranges, validate_dataset, EpochReport, Trainer};
