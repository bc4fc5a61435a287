//! Frame phases
//!
//! Every frame runs `Early`, then `Lua`, then `Late`. `Early` and `Late`
//! may fan out across workers; `Lua` hosts the embedded script runtime,
//! which is not reentrant across threads, so it always runs serially on
//! the frame loop thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Pre-script work with disjoint component ownership.
    Early,
    /// Script execution. Never parallel.
    Lua,
    /// Pre-render work with disjoint component ownership.
    Late,
}

impl Phase {
    /// Phases in frame order.
    pub const ALL: [Phase; 3] = [Phase::Early, Phase::Lua, Phase::Late];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Early => "early",
            Phase::Lua => "lua",
            Phase::Late => "late",
        }
    }

    /// Whether the phase must run on the calling thread regardless of
    /// the requested parallelism.
    pub fn is_serial(self) -> bool {
        matches!(self, Phase::Lua)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A phase tag coming from config or script that names no phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown phase tag '{tag}' (expected early, lua or late)")]
pub struct UnknownPhase {
    tag: String,
}

impl UnknownPhase {
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "early" => Ok(Phase::Early),
            "lua" => Ok(Phase::Lua),
            "late" => Ok(Phase::Late),
            _ => Err(UnknownPhase { tag: s.to_string() }),
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = UnknownPhase;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Phase::Early),
            1 => Ok(Phase::Lua),
            2 => Ok(Phase::Late),
            other => Err(UnknownPhase {
                tag: other.to_string(),
            }),
        }
    }
}
