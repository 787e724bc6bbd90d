pub mod dataset_builder;

pub use dataset_builder::{DatasetBuilder, RatingReport};
