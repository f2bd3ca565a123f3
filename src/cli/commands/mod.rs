pub mod serve;
pub mod usage;
