//! Night actions as a tagged union.
//!
//! Ability/target combinations that make no sense are unrepresentable:
//! an action always names exactly one target, and the variant says what
//! happens to it.

use nw_core::{NightAbility, PlayerId, Role};
use serde::{Deserialize, Serialize};

/// One submitted night action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "ability", content = "target")]
pub enum NightAction {
    /// The mafia's nightly kill.
    Kill(PlayerId),
    /// The doctor's shield.
    Heal(PlayerId),
    /// The detective's alignment check.
    Investigate(PlayerId),
    /// The detective's single-use gunshot, taken instead of a check.
    Shoot(PlayerId),
}

impl NightAction {
    /// The player this action is aimed at.
    pub fn target(self) -> PlayerId {
        match self {
            Self::Kill(t) | Self::Heal(t) | Self::Investigate(t) | Self::Shoot(t) => t,
        }
    }

    /// True if `role` is entitled to submit this action.
    pub fn allowed_for(self, role: Role) -> bool {
        match self {
            Self::Kill(_) => role.ability() == Some(NightAbility::Kill),
            Self::Heal(_) => role.ability() == Some(NightAbility::Heal),
            Self::Investigate(_) | Self::Shoot(_) => {
                role.ability() == Some(NightAbility::Investigate)
            }
        }
    }

    /// Verb used in confirmations and logs.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Kill(_) => "kill",
            Self::Heal(_) => "heal",
            Self::Investigate(_) => "investigate",
            Self::Shoot(_) => "shoot",
        }
    }
}

impl std::fmt::Display for NightAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.verb(), self.target())
    }
}
