mod achievements;
mod reports;
pub mod stores;

pub use achievements::AchievementLifecycle;
pub use reports::ReportAggregator;
