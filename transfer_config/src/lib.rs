pub mod macros;
pub mod transfer_config;

pub mod groups;

// Re-exported for use inside the config_group macro
pub use utils::ParsableConfigValue;
pub use transfer_config::{TransferConfig, transfer_config};
