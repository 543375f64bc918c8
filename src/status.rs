//! Lifecycle of a deduplicated validation error.
//!
//! Status lives on the error record, so it is shared by every URL that
//! references the same canonical key. The graph is fully connected: there is
//! no terminal state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStatus {
    /// Seen, not yet reviewed. Initial state.
    #[default]
    New,
    Acknowledged,
    Ignored,
}

impl ErrorStatus {
    pub const ALL: [ErrorStatus; 3] = [Self::New, Self::Acknowledged, Self::Ignored];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Acknowledged => "acknowledged",
            Self::Ignored => "ignored",
        }
    }

    /// Valid successor states from this state.
    pub fn valid_transitions(self) -> &'static [ErrorStatus] {
        match self {
            Self::New => &[Self::Acknowledged, Self::Ignored],
            Self::Acknowledged => &[Self::New, Self::Ignored],
            Self::Ignored => &[Self::New, Self::Acknowledged],
        }
    }

    /// Staying in the current state is always allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        self == target || self.valid_transitions().contains(&target)
    }

    pub fn transition_to(self, target: Self) -> Result<Self, StoreError> {
        if !self.can_transition_to(target) {
            return Err(StoreError::InvalidTransition {
                from: self,
                to: target,
            });
        }
        Ok(target)
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "acknowledged" | "ack" => Ok(Self::Acknowledged),
            "ignored" | "ignore" => Ok(Self::Ignored),
            other => Err(format!(
                "unknown status `{}`. Valid: `new`, `acknowledged`, `ignored`",
                other
            )),
        }
    }
}
