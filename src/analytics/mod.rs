pub mod commers;
pub mod daily_report;
