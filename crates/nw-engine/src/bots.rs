//! Decision policies for automated participants.
//!
//! Bots produce the same actions and votes a human would submit, and
//! the engine feeds them through the identical submission paths; the
//! completion checks cannot tell the difference. All choices draw from
//! the session's [`Chance`] policy.

use nw_core::{Chance, NightAbility, PlayerId};

use crate::action::NightAction;
use crate::session::Session;

/// Night actions for every living automated participant with a usable
/// ability. Bot detectives never act.
pub fn night_actions(session: &Session, chance: &mut dyn Chance) -> Vec<(PlayerId, NightAction)> {
    let mut actions = Vec::new();
    for bot in session.living().filter(|p| p.is_automated()) {
        let Some(ability) = bot.role.and_then(|r| r.ability()) else {
            continue;
        };
        match ability {
            NightAbility::Kill => {
                let targets: Vec<PlayerId> = session
                    .living()
                    .filter(|p| !p.is_mafia())
                    .map(|p| p.id)
                    .collect();
                if !targets.is_empty() {
                    let target = targets[chance.index(targets.len())];
                    actions.push((bot.id, NightAction::Kill(target)));
                }
            }
            NightAbility::Heal => {
                let forbidden_self = session.last_healed == Some(bot.id);
                let targets: Vec<PlayerId> = session
                    .living()
                    .filter(|p| p.id != bot.id || !forbidden_self)
                    .map(|p| p.id)
                    .collect();
                if !targets.is_empty() {
                    let target = targets[chance.index(targets.len())];
                    actions.push((bot.id, NightAction::Heal(target)));
                }
            }
            // The completion gate does not wait for bot detectives.
            NightAbility::Investigate => {}
        }
    }
    actions
}

/// Item throws for bots holding an event item: a coin-weighted gate on
/// acting at all, then a uniform living target.
pub fn throws(session: &Session, chance: &mut dyn Chance) -> Vec<(PlayerId, PlayerId)> {
    if session.special_event.is_none() {
        return Vec::new();
    }
    let mut throws = Vec::new();
    for bot in session.living().filter(|p| p.is_automated()) {
        if bot.item.is_none() || session.throws.contains_key(&bot.id) {
            continue;
        }
        if !chance.bot_throws() {
            continue;
        }
        let targets: Vec<PlayerId> = session
            .living()
            .filter(|p| p.id != bot.id)
            .map(|p| p.id)
            .collect();
        if targets.is_empty() {
            continue;
        }
        throws.push((bot.id, targets[chance.index(targets.len())]));
    }
    throws
}

/// Nomination votes for every living bot. A bot piles onto any nominee
/// already holding two or more votes, otherwise picks a living player
/// at random. Bots never abstain.
pub fn nominations(
    session: &Session,
    chance: &mut dyn Chance,
) -> Vec<(PlayerId, Option<PlayerId>)> {
    // Working tally: votes already submitted plus the ones generated
    // here, so later bots see earlier bots' choices.
    let mut tally: std::collections::HashMap<PlayerId, usize> = std::collections::HashMap::new();
    for nominee in session.nominations.values().flatten() {
        *tally.entry(*nominee).or_default() += 1;
    }
    let mut votes = Vec::new();
    let bots: Vec<PlayerId> = session
        .living()
        .filter(|p| p.is_automated() && !session.nominations.contains_key(&p.id))
        .map(|p| p.id)
        .collect();
    for bot in bots {
        let mut frontrunners: Vec<PlayerId> = tally
            .iter()
            .filter(|(id, count)| **count >= 2 && **id != bot)
            .map(|(id, _)| *id)
            .collect();
        frontrunners.sort_unstable();
        let choice = if frontrunners.is_empty() {
            let others: Vec<PlayerId> = session
                .living()
                .filter(|p| p.id != bot)
                .map(|p| p.id)
                .collect();
            if others.is_empty() {
                continue;
            }
            others[chance.index(others.len())]
        } else {
            frontrunners[chance.index(frontrunners.len())]
        };
        *tally.entry(choice).or_default() += 1;
        votes.push((bot, Some(choice)));
    }
    votes
}

/// Final-vote ballots: every living bot flips a coin.
pub fn ballots(session: &Session, chance: &mut dyn Chance) -> Vec<(PlayerId, bool)> {
    session
        .living()
        .filter(|p| p.is_automated() && !session.ballots.contains_key(&p.id))
        .map(|p| (p.id, chance.coin_flip()))
        .collect()
}
