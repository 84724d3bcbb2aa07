//! Contract currency arithmetic.
//!
//! Coin values are 128-bit unsigned integers. All arithmetic in the
//! revision protocol is checked: an underflow means the renter tried to
//! spend more than a contract holds, which is a negotiation error, never
//! a panic.
//!
//! JSON representations use decimal strings, since 128-bit values exceed
//! what many JSON consumers can parse as numbers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An amount of coins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(u128);

impl Currency {
    /// The zero amount.
    pub const ZERO: Currency = Currency(0);

    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u128 {
        self.0
    }

    pub fn checked_add(self, rhs: Currency) -> Option<Currency> {
        self.0.checked_add(rhs.0).map(Currency)
    }

    pub fn checked_sub(self, rhs: Currency) -> Option<Currency> {
        self.0.checked_sub(rhs.0).map(Currency)
    }

    pub fn checked_mul(self, rhs: u64) -> Option<Currency> {
        self.0.checked_mul(u128::from(rhs)).map(Currency)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for Currency {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Currency(s.parse()?))
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
