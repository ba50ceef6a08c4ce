pub mod config;
pub mod keeper;
pub mod seed;

pub use config::KeeperConfig;
pub use keeper::{CycleStats, Keeper};
