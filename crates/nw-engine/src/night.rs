//! Night resolution: turns the round's submitted actions into deaths,
//! investigation results, and perk events.
//!
//! The evaluation order is fixed and authoritative: thrown-item rolls,
//! the mafia kill (with its misfire), the heal, investigations, the
//! detective's shot, then item-hit application. The outcome depends
//! only on this order, never on submission order. Victims form a set:
//! a second cause of death is reported as a perk, not a second death.

use nw_core::{Chance, PlayerId, Role};
use serde::Serialize;

use crate::action::NightAction;
use crate::session::Session;

/// One confirmed death, with the role revealed in the morning report.
#[derive(Debug, Clone, Serialize)]
pub struct Death {
    /// Who died.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// The revealed role.
    pub role: Role,
}

/// A private investigation result, delivered to the detective only.
#[derive(Debug, Clone, Serialize)]
pub struct InvestigationResult {
    /// The investigating player.
    pub detective: PlayerId,
    /// The investigated player.
    pub target: PlayerId,
    /// The investigated player's name.
    pub target_name: String,
    /// The alignment reported to the detective.
    pub reported_mafia: bool,
    /// Whether the error roll flipped the report. Recorded for the
    /// round, never disclosed to the detective.
    pub intuition_failed: bool,
}

impl std::fmt::Display for InvestigationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.reported_mafia {
            write!(f, "Your investigation of {} found: MAFIA.", self.target_name)
        } else {
            write!(
                f,
                "Your investigation of {} found: not mafia.",
                self.target_name
            )
        }
    }
}

/// A rule twist that fired during resolution, called out in the report.
#[derive(Debug, Clone, Serialize)]
pub enum PerkEvent {
    /// The mafia's gun jammed; the kill was voided.
    Misfire,
    /// The doctor's shield negated the mafia kill.
    Saved {
        /// Who was saved.
        name: String,
    },
    /// The doctor's shield negated the detective's shot.
    SavedFromShot {
        /// Who was saved.
        name: String,
    },
    /// The detective spent the bullet.
    GunFired {
        /// Who was shot.
        target: String,
    },
    /// A thrown item connected.
    ItemHit {
        /// Who threw.
        thrower: String,
        /// Who was hit.
        target: String,
        /// The item name.
        item: &'static str,
    },
    /// A thrown item missed.
    ItemMiss {
        /// Who threw.
        thrower: String,
        /// Who dodged.
        target: String,
        /// The item name.
        item: &'static str,
    },
    /// A thrown item connected, but the target was already dead.
    ItemWasted {
        /// Who threw.
        thrower: String,
        /// The already-dead target.
        target: String,
        /// The item name.
        item: &'static str,
    },
}

impl std::fmt::Display for PerkEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Misfire => write!(f, "Perk: the mafia's gun jammed! The shot went wide."),
            Self::Saved { name } => write!(f, "The doctor pulled {name} back from the brink!"),
            Self::SavedFromShot { name } => {
                write!(f, "The doctor saved {name} from the detective's bullet!")
            }
            Self::GunFired { target } => {
                write!(f, "The detective opened fire on {target} in the dark!")
            }
            Self::ItemHit {
                thrower,
                target,
                item,
            } => write!(f, "{thrower}'s {item} struck {target} down!"),
            Self::ItemMiss {
                thrower,
                target,
                item,
            } => write!(f, "{thrower}'s {item} sailed past {target}."),
            Self::ItemWasted {
                thrower,
                target,
                item,
            } => write!(
                f,
                "{thrower}'s {item} hit {target}, who was already dead."
            ),
        }
    }
}

/// Everything the morning announcement needs.
#[derive(Debug, Clone, Serialize)]
pub struct NightReport {
    /// Which round this night belonged to.
    pub round: u32,
    /// Confirmed deaths, in resolution order.
    pub deaths: Vec<Death>,
    /// Name of the player the doctor saved from the kill, if any.
    pub saved: Option<String>,
    /// Perk events, in resolution order.
    pub perks: Vec<PerkEvent>,
}

impl std::fmt::Display for NightReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Morning of day {}.", self.round)?;
        match self.deaths.as_slice() {
            [] => {
                if let Some(saved) = &self.saved {
                    writeln!(f, "A miracle: {saved} was attacked but survived the night!")?;
                } else {
                    writeln!(f, "A quiet night. Everyone wakes up.")?;
                }
            }
            [death] => {
                writeln!(
                    f,
                    "{} did not wake up. They were {}.",
                    death.name,
                    death.role.title()
                )?;
            }
            deaths => {
                writeln!(f, "A bloody night. {} are dead:", deaths.len())?;
                for death in deaths {
                    writeln!(f, "  {} ({})", death.name, death.role.title())?;
                }
            }
        }
        for perk in &self.perks {
            writeln!(f, "{perk}")?;
        }
        Ok(())
    }
}

/// Position of a player in the roster; used to give map-backed
/// submissions a stable evaluation order.
fn roster_index(session: &Session, id: PlayerId) -> usize {
    session
        .players()
        .iter()
        .position(|p| p.id == id)
        .unwrap_or(usize::MAX)
}

fn name_of(session: &Session, id: PlayerId) -> String {
    session
        .player(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}

/// Resolve the night. Mutates `alive` flags and the doctor's
/// `last_healed` marker; returns the public report and the private
/// investigation results.
pub fn resolve(
    session: &mut Session,
    chance: &mut dyn Chance,
) -> (NightReport, Vec<InvestigationResult>) {
    let mut perks = Vec::new();
    let mut victims: Vec<PlayerId> = Vec::new();
    let mut investigations = Vec::new();

    // Step 1: hit rolls for thrown items, independent of everything else.
    let mut throw_rolls: Vec<(PlayerId, PlayerId, bool)> = Vec::new();
    if let Some(event) = session.special_event {
        let mut throws: Vec<(PlayerId, PlayerId)> =
            session.throws.iter().map(|(t, v)| (*t, *v)).collect();
        throws.sort_by_key(|(thrower, _)| roster_index(session, *thrower));
        for (thrower, target) in throws {
            if session.player(target).is_some_and(|p| p.alive) {
                throw_rolls.push((thrower, target, chance.item_hits(event.hit_percent)));
            }
        }
    }

    // Step 2: the mafia kill. With two submissions the Godfather's
    // target is authoritative.
    let mut kill_victim: Option<PlayerId> = None;
    for player in session.players() {
        if let Some(NightAction::Kill(target)) = session.night_actions.get(&player.id) {
            if player.role == Some(Role::Godfather) {
                kill_victim = Some(*target);
                break;
            }
            if kill_victim.is_none() {
                kill_victim = Some(*target);
            }
        }
    }
    if let Some(victim) = kill_victim {
        if chance.misfire() {
            perks.push(PerkEvent::Misfire);
        } else {
            victims.push(victim);
        }
    }

    // Step 3: the heal. Negates the kill on a match; always updates the
    // consecutive-self-heal marker.
    let mut healed: Option<PlayerId> = None;
    for player in session.players() {
        if let Some(NightAction::Heal(target)) = session.night_actions.get(&player.id) {
            healed = Some(*target);
            break;
        }
    }
    let mut saved = None;
    if let Some(target) = healed {
        session.last_healed = Some(target);
        if victims.contains(&target) {
            victims.retain(|v| *v != target);
            let name = name_of(session, target);
            perks.push(PerkEvent::Saved { name: name.clone() });
            saved = Some(name);
        }
    }

    // Step 4: investigations. The Godfather's immunity is absolute; the
    // error roll is only consulted for everyone else.
    let mut checks: Vec<(PlayerId, PlayerId)> = session
        .night_actions
        .iter()
        .filter_map(|(actor, action)| match action {
            NightAction::Investigate(target) => Some((*actor, *target)),
            _ => None,
        })
        .collect();
    checks.sort_by_key(|(actor, _)| roster_index(session, *actor));
    for (detective, target) in checks {
        let Some(role) = session.player(target).and_then(|p| p.role) else {
            continue;
        };
        let (reported_mafia, intuition_failed) = if role.investigation_immune() {
            (false, false)
        } else if chance.investigation_error() {
            (!role.is_mafia(), true)
        } else {
            (role.is_mafia(), false)
        };
        investigations.push(InvestigationResult {
            detective,
            target,
            target_name: name_of(session, target),
            reported_mafia,
            intuition_failed,
        });
    }

    // Step 5: the detective's shot. The heal saves from it
    // independently of saving from the kill.
    let mut shot: Option<PlayerId> = None;
    for player in session.players() {
        if let Some(NightAction::Shoot(target)) = session.night_actions.get(&player.id) {
            shot = Some(*target);
            break;
        }
    }
    if let Some(target) = shot {
        if healed == Some(target) {
            perks.push(PerkEvent::SavedFromShot {
                name: name_of(session, target),
            });
        } else {
            perks.push(PerkEvent::GunFired {
                target: name_of(session, target),
            });
            if !victims.contains(&target) {
                victims.push(target);
            }
        }
    }

    // Step 6: apply successful item hits; a target already down is a
    // wasted throw, not a second death.
    for (thrower, target, hit) in throw_rolls {
        let thrower_name = name_of(session, thrower);
        let target_name = name_of(session, target);
        let item = session.special_event.map_or("item", |e| e.item);
        if !hit {
            perks.push(PerkEvent::ItemMiss {
                thrower: thrower_name,
                target: target_name,
                item,
            });
        } else if victims.contains(&target) {
            perks.push(PerkEvent::ItemWasted {
                thrower: thrower_name,
                target: target_name,
                item,
            });
        } else {
            victims.push(target);
            perks.push(PerkEvent::ItemHit {
                thrower: thrower_name,
                target: target_name,
                item,
            });
        }
    }

    // Step 7: flip the victims' alive flags and reveal their roles.
    let mut deaths = Vec::new();
    for victim in victims {
        if let Some(player) = session.player_mut(victim) {
            player.alive = false;
            deaths.push(Death {
                id: victim,
                name: player.name.clone(),
                role: player.role.unwrap_or(Role::Villager),
            });
        }
    }

    (
        NightReport {
            round: session.round,
            deaths,
            saved,
            perks,
        },
        investigations,
    )
}
