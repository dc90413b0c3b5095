//! Vote resolution: nomination tallying with a recorded random
//! tie-break, and the final yes/no count with the rope-break perk.

use std::collections::HashMap;

use nw_core::{Chance, PlayerId, Role};
use serde::Serialize;

/// The nominee chosen from the day's nomination votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NominationResult {
    /// Who faces the final vote.
    pub nominee: PlayerId,
    /// How many votes the nominee drew.
    pub votes: usize,
    /// How many candidates shared the maximum; 1 means no tie-break
    /// was needed. Ties are broken uniformly at random, openly and by
    /// design.
    pub tied_among: usize,
}

/// Tally nominations and pick the nominee.
///
/// Abstentions (`None`) are ignored. The candidate with the most votes
/// wins; an exact tie is broken uniformly at random. Returns `None`
/// when nobody nominated anyone, which skips the day.
pub fn resolve_nominations(
    nominations: &HashMap<PlayerId, Option<PlayerId>>,
    chance: &mut dyn Chance,
) -> Option<NominationResult> {
    let mut counts: HashMap<PlayerId, usize> = HashMap::new();
    for nominee in nominations.values().flatten() {
        *counts.entry(*nominee).or_default() += 1;
    }
    let top = counts.values().copied().max()?;
    let mut candidates: Vec<PlayerId> = counts
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(id, _)| *id)
        .collect();
    candidates.sort_unstable();
    let tied_among = candidates.len();
    let nominee = candidates[chance.index(candidates.len())];
    Some(NominationResult {
        nominee,
        votes: top,
        tied_among,
    })
}

/// Count yes/no ballots.
pub fn tally_ballots(ballots: &HashMap<PlayerId, bool>) -> (usize, usize) {
    let yes = ballots.values().filter(|v| **v).count();
    (yes, ballots.len() - yes)
}

/// What the final vote did to the nominee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VoteOutcome {
    /// The majority voted yes and the elimination stuck.
    Eliminated {
        /// The revealed role of the eliminated player.
        role: Role,
    },
    /// The majority voted yes, but the rope broke.
    RopeBroke,
    /// No majority; the nominee stays.
    Spared,
}

/// The public result of the final vote.
#[derive(Debug, Clone, Serialize)]
pub struct VoteReport {
    /// The nominee's name.
    pub nominee: String,
    /// Yes votes.
    pub yes: usize,
    /// No votes.
    pub no: usize,
    /// What happened.
    pub outcome: VoteOutcome,
}

impl std::fmt::Display for VoteReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Vote on {}: {} for, {} against.",
            self.nominee, self.yes, self.no
        )?;
        match &self.outcome {
            VoteOutcome::Eliminated { role } => {
                write!(
                    f,
                    "{} has been eliminated. They were {}.",
                    self.nominee,
                    role.title()
                )
            }
            VoteOutcome::RopeBroke => write!(
                f,
                "Perk: the rope broke! {} walks away from the gallows.",
                self.nominee
            ),
            VoteOutcome::Spared => write!(f, "Not enough votes. {} stays.", self.nominee),
        }
    }
}
