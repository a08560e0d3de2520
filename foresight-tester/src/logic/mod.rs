pub mod planner;
pub mod reports;
pub mod tester;

pub use tester::*;
