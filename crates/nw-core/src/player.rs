//! Players and their identifiers.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Unique identifier of a participant within a session.
///
/// Ids come from the chat platform and are positive for humans; the
/// negative range is reserved for automated participants, which the
/// engine mints itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl PlayerId {
    /// True if this id belongs to an automated participant.
    pub fn is_automated(self) -> bool {
        self.0 < 0
    }

    /// Mint the id for the `n`-th automated participant (1-based).
    pub fn automated(n: i64) -> Self {
        Self(-n)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One roster slot: a human player or an automated stand-in.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    /// Platform identifier (negative for automated participants).
    pub id: PlayerId,
    /// Display name shown in announcements.
    pub name: String,
    /// Assigned role; `None` until the deal.
    pub role: Option<Role>,
    /// Dead players stay in the roster but can no longer act or vote.
    pub alive: bool,
    /// Throwable item granted by an active special event, if still held.
    pub item: Option<&'static str>,
}

impl Player {
    /// Create a living, role-less roster entry.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            role: None,
            alive: true,
            item: None,
        }
    }

    /// True if this slot is driven by the engine rather than a human.
    pub fn is_automated(&self) -> bool {
        self.id.is_automated()
    }

    /// The assigned role's team, if roles have been dealt.
    pub fn is_mafia(&self) -> bool {
        self.role.is_some_and(Role::is_mafia)
    }
}
