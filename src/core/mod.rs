pub mod math;
pub mod types;
