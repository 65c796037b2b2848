pub mod optimize;
pub mod units;
