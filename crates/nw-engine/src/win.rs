//! Win evaluation and the end-of-game summary.

use nw_core::Role;
use serde::Serialize;

use crate::session::Session;

/// Who won, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Every mafioso is dead.
    CitizensWin,
    /// The mafia reached parity, or the game was cut short.
    MafiaWin {
        /// True when the win was forced because only automated
        /// participants remained alive.
        forced: bool,
    },
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CitizensWin => write!(f, "The citizens win! The mafia has been rooted out."),
            Self::MafiaWin { forced: false } => {
                write!(f, "The mafia wins! The town belongs to them now.")
            }
            Self::MafiaWin { forced: true } => write!(
                f,
                "No humans left standing; only the machines would play on. The mafia takes the town by default."
            ),
        }
    }
}

/// Check the victory predicate over the living roster.
///
/// Citizens win at zero living mafia. The mafia wins at parity
/// (`mafia >= citizens`, deliberately `>=`), or immediately when no
/// living human remains, since an all-automated game would never end
/// on its own.
pub fn evaluate(session: &Session) -> Option<Verdict> {
    if session.living().any(|p| p.role.is_none()) {
        return None;
    }
    let mafia = session.living().filter(|p| p.is_mafia()).count();
    let citizens = session.living_count() - mafia;
    if mafia == 0 {
        return Some(Verdict::CitizensWin);
    }
    let humans_alive = session.humans_alive();
    if mafia >= citizens || !humans_alive {
        return Some(Verdict::MafiaWin {
            forced: !humans_alive && mafia < citizens,
        });
    }
    None
}

/// One line of the final role reveal.
#[derive(Debug, Clone, Serialize)]
pub struct RevealEntry {
    /// Display name.
    pub name: String,
    /// The revealed role.
    pub role: Role,
    /// Alive at the end.
    pub alive: bool,
    /// Automated participant marker.
    pub automated: bool,
}

/// Full role reveal and statistics, broadcast when the game ends.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    /// Who won.
    pub verdict: Verdict,
    /// Rounds played.
    pub rounds: u32,
    /// Total participants.
    pub participants: usize,
    /// Of which automated.
    pub automated: usize,
    /// Whether the detective's bullet was spent.
    pub bullet_spent: bool,
    /// The active special event, if there was one.
    pub special_event: Option<&'static str>,
    /// The reveal, in join order.
    pub reveal: Vec<RevealEntry>,
}

/// Build the end-of-game summary for a decided session.
pub fn summary(session: &Session, verdict: Verdict) -> GameSummary {
    GameSummary {
        verdict,
        rounds: session.round,
        participants: session.players().len(),
        automated: session.players().iter().filter(|p| p.is_automated()).count(),
        bullet_spent: session.gun_fired,
        special_event: session.special_event.map(|e| e.name),
        reveal: session
            .players()
            .iter()
            .map(|p| RevealEntry {
                name: p.name.clone(),
                role: p.role.unwrap_or(Role::Villager),
                alive: p.alive,
                automated: p.is_automated(),
            })
            .collect(),
    }
}

impl std::fmt::Display for GameSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.verdict)?;
        writeln!(f, "Roles:")?;
        for entry in &self.reveal {
            writeln!(
                f,
                "  {} {}{}: {}",
                if entry.alive { "alive" } else { "dead " },
                if entry.automated { "[bot] " } else { "" },
                entry.name,
                entry.role.title()
            )?;
        }
        writeln!(f, "Rounds played: {}", self.rounds)?;
        writeln!(
            f,
            "Participants: {} ({} automated)",
            self.participants, self.automated
        )?;
        writeln!(
            f,
            "Detective's bullet: {}",
            if self.bullet_spent { "spent" } else { "unused" }
        )?;
        if let Some(event) = self.special_event {
            writeln!(f, "Special event: {event}")?;
        }
        Ok(())
    }
}
