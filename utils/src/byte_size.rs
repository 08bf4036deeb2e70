use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use thiserror::Error;

/// A number of bytes that can be written in configuration values with a unit suffix.
///
/// Decimal suffixes (`kb`, `mb`, `gb`, `tb`) scale by powers of 1000, binary suffixes
/// (`kib`, `mib`, `gib`, `tib`) by powers of 1024.  A bare number or a `b` suffix is a
/// plain byte count.  Parsing is case-insensitive and ignores whitespace between the
/// number and the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(u64);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ByteSizeParseError {
    #[error("empty byte size")]
    Empty,

    #[error("invalid number in byte size '{0}'")]
    InvalidNumber(String),

    #[error("unknown byte size unit '{0}'")]
    UnknownUnit(String),

    #[error("byte size '{0}' overflows u64")]
    Overflow(String),
}

impl ByteSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    let m = match unit {
        "" | "b" => 1,
        "k" | "kb" => 1_000,
        "m" | "mb" => 1_000_000,
        "g" | "gb" => 1_000_000_000,
        "t" | "tb" => 1_000_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        "tib" => 1 << 40,
        _ => return None,
    };
    Some(m)
}

impl FromStr for ByteSize {
    type Err = ByteSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if s.is_empty() {
            return Err(ByteSizeParseError::Empty);
        }

        let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        let (number, unit) = s.split_at(split);

        let number: u64 = number
            .parse()
            .map_err(|_| ByteSizeParseError::InvalidNumber(s.clone()))?;
        let multiplier = unit_multiplier(unit.trim()).ok_or_else(|| ByteSizeParseError::UnknownUnit(unit.to_owned()))?;

        number
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or(ByteSizeParseError::Overflow(s))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b", self.0)
    }
}

impl Deref for ByteSize {
    type Target = u64;

    fn deref(&self) -> &u64 {
        &self.0
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}
