pub mod refresh;
pub mod report;
