//! The role catalog: teams, night abilities, and the deal for a given
//! roster size.

use serde::{Deserialize, Serialize};

/// Minimum roster size required to deal roles and start a game.
pub const MIN_PLAYERS: usize = 5;

/// Maximum roster size accepted during registration.
pub const MAX_PLAYERS: usize = 15;

/// Roster size at which the second mafia role enters the deal.
pub const SECOND_MAFIA_AT: usize = 7;

/// Which side a role wins with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// The informed minority. Wins by reaching parity with the citizens.
    Mafia,
    /// The uninformed majority. Wins by eliminating every mafioso.
    Citizens,
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mafia => write!(f, "mafia"),
            Self::Citizens => write!(f, "citizens"),
        }
    }
}

/// The ability a role may exercise during the night phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightAbility {
    /// Pick a victim for the mafia.
    Kill,
    /// Shield one player from tonight's kill.
    Heal,
    /// Learn a player's alignment.
    Investigate,
}

impl std::fmt::Display for NightAbility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kill => write!(f, "kill"),
            Self::Heal => write!(f, "heal"),
            Self::Investigate => write!(f, "investigate"),
        }
    }
}

/// A role in the deal.
///
/// Exactly one [`Role::Godfather`] is always dealt; a [`Role::Mobster`]
/// joins at [`SECOND_MAFIA_AT`] players; one [`Role::Doctor`] and one
/// [`Role::Detective`] are always dealt; everyone else is a
/// [`Role::Villager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Leads the mafia. Investigations always read him as a citizen.
    Godfather,
    /// Second mafioso, dealt only in larger games.
    Mobster,
    /// May shield one player per night, but never himself twice in a row.
    Doctor,
    /// Investigates one player per night, and carries a single bullet.
    Detective,
    /// No night ability. Votes are his only weapon.
    Villager,
}

impl Role {
    /// The team this role wins with.
    pub fn team(self) -> Team {
        match self {
            Self::Godfather | Self::Mobster => Team::Mafia,
            Self::Doctor | Self::Detective | Self::Villager => Team::Citizens,
        }
    }

    /// The night ability of this role, if any.
    pub fn ability(self) -> Option<NightAbility> {
        match self {
            Self::Godfather | Self::Mobster => Some(NightAbility::Kill),
            Self::Doctor => Some(NightAbility::Heal),
            Self::Detective => Some(NightAbility::Investigate),
            Self::Villager => None,
        }
    }

    /// True for mafia-team roles.
    pub fn is_mafia(self) -> bool {
        self.team() == Team::Mafia
    }

    /// True if investigations report this role as a citizen regardless of
    /// its real team.
    pub fn investigation_immune(self) -> bool {
        matches!(self, Self::Godfather)
    }

    /// Display name used on role cards and in the final reveal.
    pub fn title(self) -> &'static str {
        match self {
            Self::Godfather => "the Godfather",
            Self::Mobster => "the Mobster",
            Self::Doctor => "the Doctor",
            Self::Detective => "the Detective",
            Self::Villager => "a Villager",
        }
    }

    /// One-line description for the role card.
    pub fn blurb(self) -> &'static str {
        match self {
            Self::Godfather => {
                "You lead the mafia. Choose a victim each night; investigations cannot touch you."
            }
            Self::Mobster => "You kill for the Godfather. Keep your head down by day.",
            Self::Doctor => {
                "Each night you may shield one player. You cannot shield yourself twice in a row."
            }
            Self::Detective => {
                "Each night, investigate one player, or spend your only bullet instead."
            }
            Self::Villager => "You have no special ability. Observe, discuss, vote.",
        }
    }

    /// Build the role list for a roster of `count` players.
    ///
    /// Always one Godfather, one Doctor, one Detective; a Mobster from
    /// [`SECOND_MAFIA_AT`] players up; Villagers pad the rest. The list is
    /// returned in catalog order; the caller shuffles it before dealing.
    pub fn deal(count: usize) -> Vec<Role> {
        let mut roles = vec![Self::Godfather];
        if count >= SECOND_MAFIA_AT {
            roles.push(Self::Mobster);
        }
        roles.push(Self::Doctor);
        roles.push(Self::Detective);
        while roles.len() < count {
            roles.push(Self::Villager);
        }
        roles
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}
