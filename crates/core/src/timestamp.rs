//! Wall-clock timestamps with ISO-8601 rendering.

use core::str::FromStr;

use chrono::{NaiveDateTime, SubsecRound, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, ModelResult};

const ISO_SECONDS: &str = "%Y-%m-%dT%H:%M:%S";
const ISO_MICROS: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A naive local date-time, held at microsecond precision.
///
/// Sub-microsecond digits are dropped on construction so that
/// [`Timestamp::to_iso_string`] and [`Timestamp::parse_iso`] round-trip exactly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self(value.trunc_subsecs(6))
    }

    pub fn as_naive(&self) -> &NaiveDateTime {
        &self.0
    }

    /// Render as `YYYY-MM-DDTHH:MM:SS[.ffffff]`.
    ///
    /// The fractional part is omitted when the microsecond component is zero.
    pub fn to_iso_string(&self) -> String {
        let format = if self.0.nanosecond() == 0 {
            ISO_SECONDS
        } else {
            ISO_MICROS
        };
        self.0.format(format).to_string()
    }

    /// Parse an ISO-8601 date-time (with or without fractional seconds).
    pub fn parse_iso(value: &str) -> ModelResult<Self> {
        NaiveDateTime::from_str(value)
            .map(Self::from_naive)
            .map_err(|_| ModelError::invalid_timestamp("timestamp", value))
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::from_naive(value)
    }
}

impl core::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse_iso(&raw).map_err(serde::de::Error::custom)
    }
}
