#![cfg_attr(feature = "strict", deny(warnings))]

mod guards;
pub use guards::EnvVarGuard;

pub mod byte_size;
pub use byte_size::{ByteSize, ByteSizeParseError};

pub mod configuration_utils;
pub use configuration_utils::ParsableConfigValue;
