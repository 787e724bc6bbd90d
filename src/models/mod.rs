pub mod analysis;
pub mod app_info;
pub mod review;

pub use analysis::ReviewAnalysis;
pub use app_info::AppInfo;
pub use review::Review;
