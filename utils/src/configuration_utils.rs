use std::str::FromStr;

use tracing::{Level, event, info, warn};

use crate::ByteSize;

#[cfg(not(feature = "elevated_information_level"))]
pub const INFORMATION_LOG_LEVEL: Level = Level::DEBUG;
#[cfg(feature = "elevated_information_level")]
pub const INFORMATION_LOG_LEVEL: Level = Level::INFO;

/// How a configuration value is read from its environment string.
pub trait ParsableConfigValue: std::fmt::Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// The parsed value of `value`, or `default` when it is absent or unparsable.  Unparsable
    /// values log a warning naming the variable.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        let Some(raw) = value else {
            event!(INFORMATION_LOG_LEVEL, "Config: {variable_name} = {default:?} (default)");
            return default;
        };

        match Self::parse_user_value(&raw) {
            Some(v) => {
                info!("Config: {variable_name} = {v:?} (from environment)");
                v
            },
            None => {
                warn!("Config: could not parse {raw:?} for {variable_name}; using default {default:?}");
                default
            },
        }
    }
}

/// Types parsed through their `FromStr` impl after trimming whitespace.
pub trait FromStrParseable: FromStr + std::fmt::Debug {}

impl<T: FromStrParseable> ParsableConfigValue for T {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.trim().parse::<T>().ok()
    }
}

impl FromStrParseable for usize {}
impl FromStrParseable for u32 {}
impl FromStrParseable for u64 {}
impl FromStrParseable for String {}
impl FromStrParseable for ByteSize {}

/// Accepts 1/true/yes/y/on and 0/false/no/n/off, case-insensitively.
fn parse_bool_value(value: &str) -> Option<bool> {
    let t = value.trim().to_ascii_lowercase();

    match t.as_str() {
        "0" | "false" | "no" | "n" | "off" => Some(false),
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        _ => None,
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_bool_value(value)
    }
}

impl<T: ParsableConfigValue> ParsableConfigValue for Option<T> {
    fn parse_user_value(value: &str) -> Option<Self> {
        T::parse_user_value(value).map(Some)
    }
}
