pub mod play;

pub use play::{PlayStoreClient, ReviewSource, Sort};
