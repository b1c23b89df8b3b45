use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// How divergent values of one field may be combined.
///
/// Every entry of a record's field table carries one of these tags; the
/// merge engine consults the tag instead of inspecting value types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Either side is acceptable: a conflict is auto-mergeable and `ours`
    /// is suggested.
    TakeEither,
    /// Numeric limit: a conflict auto-merges to the larger value.
    NumericMax,
    /// Unordered collection: a conflict auto-merges to the union.
    SetUnion,
    /// Capability flag: combined with OR, never surfaced as a conflict.
    BooleanOr,
    /// Needs a caller decision: a conflict is not auto-mergeable.
    Manual,
}

impl MergePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TakeEither => "take_either",
            Self::NumericMax => "numeric_max",
            Self::SetUnion => "set_union",
            Self::BooleanOr => "boolean_or",
            Self::Manual => "manual",
        }
    }

    /// Returns `true` if a conflict under this policy can be merged without
    /// caller input.
    pub fn auto_merges(&self) -> bool {
        !matches!(self, Self::Manual)
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergePolicy {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "take_either" => Ok(Self::TakeEither),
            "numeric_max" => Ok(Self::NumericMax),
            "set_union" => Ok(Self::SetUnion),
            "boolean_or" => Ok(Self::BooleanOr),
            "manual" => Ok(Self::Manual),
            _ => Err(TypeError::UnknownPolicy(s.to_string())),
        }
    }
}
