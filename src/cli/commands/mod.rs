pub mod config;
pub mod estimate;
pub mod serve;
pub mod stats;
pub mod tickets;
