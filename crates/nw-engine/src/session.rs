//! Session state: the authoritative record of one chat's game.
//!
//! A [`Session`] holds the roster in join order, the current phase and
//! round, everything submitted during the running phase, and the
//! one-shot flags that survive across rounds. It enforces roster and
//! targeting rules; the phase *transitions* live in
//! [`crate::engine::Game`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nw_core::chance::{self, Chance};
use nw_core::role::{MAX_PLAYERS, MIN_PLAYERS};
use nw_core::{Player, PlayerId, Role, SpecialEvent};

use crate::action::NightAction;
use crate::error::{EngineError, EngineResult};

/// Identifier of the chat a session is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The game's phase graph. `Ended` is terminal; the only back-edge is
/// `Night → Registration` when role delivery fails during start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Players join and leave; nothing is hidden yet.
    Registration,
    /// Hidden actions are collected.
    Night,
    /// The night outcome is being announced.
    Morning,
    /// Open discussion; ends only on the timer.
    Discussion,
    /// Everyone proposes (or abstains from proposing) a candidate.
    Nomination,
    /// Yes/no vote on the nominated candidate.
    FinalVote,
    /// The game is over; the session awaits destruction.
    Ended,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registration => write!(f, "registration"),
            Self::Night => write!(f, "night"),
            Self::Morning => write!(f, "morning"),
            Self::Discussion => write!(f, "discussion"),
            Self::Nomination => write!(f, "nomination"),
            Self::FinalVote => write!(f, "final vote"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Names handed to automated participants, in minting order.
const AUTOMATED_NAMES: [&str; 10] = [
    "Anton", "Bohdan", "Daryna", "Ivanka", "Marko", "Nazar", "Olha", "Petro", "Roksolana",
    "Yarema",
];

/// The mutable state of one chat's game.
#[derive(Debug)]
pub struct Session {
    /// The chat this session belongs to.
    pub chat: ChatId,
    /// The player who created the session and may start or end it.
    pub admin: PlayerId,
    /// Current phase.
    pub phase: Phase,
    /// Round counter; the first night is round 1.
    pub round: u32,
    /// Special event rolled at creation, if any.
    pub special_event: Option<SpecialEvent>,
    /// Night actions submitted this round, one per actor.
    pub night_actions: HashMap<PlayerId, NightAction>,
    /// Item throws submitted this round (thrower → target).
    pub throws: HashMap<PlayerId, PlayerId>,
    /// Nomination votes this day; `None` is an abstention.
    pub nominations: HashMap<PlayerId, Option<PlayerId>>,
    /// Yes/no ballots on the current nominee.
    pub ballots: HashMap<PlayerId, bool>,
    /// The candidate facing the final vote, if one has been chosen.
    pub nominee: Option<PlayerId>,
    /// Set once the detective's single bullet is spent; never reset.
    pub gun_fired: bool,
    /// Who the doctor shielded last night (self-heal restriction).
    pub last_healed: Option<PlayerId>,
    /// Exactly-once guard for the current phase's resolver.
    pub phase_resolved: bool,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the game ended, if it has.
    pub ended_at: Option<DateTime<Utc>>,
    players: Vec<Player>,
    next_automated: i64,
}

impl Session {
    /// Create a fresh session in registration.
    pub fn new(chat: ChatId, admin: PlayerId, special_event: Option<SpecialEvent>) -> Self {
        Self {
            chat,
            admin,
            phase: Phase::Registration,
            round: 0,
            special_event,
            night_actions: HashMap::new(),
            throws: HashMap::new(),
            nominations: HashMap::new(),
            ballots: HashMap::new(),
            nominee: None,
            gun_fired: false,
            last_healed: None,
            phase_resolved: false,
            created_at: Utc::now(),
            ended_at: None,
            players: Vec::new(),
            next_automated: 0,
        }
    }

    /// The roster in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a roster entry.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Look up a roster entry mutably.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Living players, in join order.
    pub fn living(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    /// Number of living players.
    pub fn living_count(&self) -> usize {
        self.living().count()
    }

    /// True while at least one living human remains.
    pub fn humans_alive(&self) -> bool {
        self.living().any(|p| !p.is_automated())
    }

    /// Names of living mafia members other than `of` (role-card allies).
    pub fn mafia_allies(&self, of: PlayerId) -> Vec<String> {
        self.living()
            .filter(|p| p.is_mafia() && p.id != of)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Add a human player during registration.
    pub fn join(&mut self, id: PlayerId, name: impl Into<String>) -> EngineResult<()> {
        if self.phase != Phase::Registration {
            return Err(EngineError::InvalidPhase(self.phase));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(EngineError::RosterFull { max: MAX_PLAYERS });
        }
        if self.player(id).is_some() {
            return Err(EngineError::DuplicateAction(id));
        }
        self.players.push(Player::new(id, name));
        Ok(())
    }

    /// Withdraw a player during registration.
    pub fn leave(&mut self, id: PlayerId) -> EngineResult<()> {
        if self.phase != Phase::Registration {
            return Err(EngineError::InvalidPhase(self.phase));
        }
        let before = self.players.len();
        self.players.retain(|p| p.id != id);
        if self.players.len() == before {
            return Err(EngineError::UnknownPlayer(id));
        }
        Ok(())
    }

    /// Add up to `count` automated participants; returns their names.
    pub fn add_automated(&mut self, count: usize) -> EngineResult<Vec<String>> {
        if self.phase != Phase::Registration {
            return Err(EngineError::InvalidPhase(self.phase));
        }
        let free = MAX_PLAYERS.saturating_sub(self.players.len());
        if free == 0 {
            return Err(EngineError::RosterFull { max: MAX_PLAYERS });
        }
        let mut names = Vec::new();
        for _ in 0..count.min(free) {
            self.next_automated += 1;
            let id = PlayerId::automated(self.next_automated);
            let base = AUTOMATED_NAMES[(self.next_automated as usize - 1) % AUTOMATED_NAMES.len()];
            let name = if self.next_automated as usize <= AUTOMATED_NAMES.len() {
                base.to_string()
            } else {
                format!("{base} {}", self.next_automated)
            };
            self.players.push(Player::new(id, &name));
            names.push(name);
        }
        Ok(names)
    }

    /// Remove players entirely (registration drop-outs and unreachable
    /// players purged before roles are revealed).
    pub fn purge(&mut self, ids: &[PlayerId]) {
        self.players.retain(|p| !ids.contains(&p.id));
    }

    /// Deal roles: shuffle the ids, shuffle the role list independently,
    /// and zip them. Rolls item grants if a special event is active.
    pub fn assign_roles(&mut self, rng: &mut dyn Chance) -> EngineResult<()> {
        if self.players.len() < MIN_PLAYERS {
            return Err(EngineError::RosterTooSmall {
                have: self.players.len(),
                min: MIN_PLAYERS,
            });
        }
        let mut ids: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        chance::shuffle(rng, &mut ids);
        let mut roles = Role::deal(ids.len());
        chance::shuffle(rng, &mut roles);
        for (id, role) in ids.into_iter().zip(roles) {
            if let Some(player) = self.player_mut(id) {
                player.role = Some(role);
                player.alive = true;
            }
        }
        if let Some(event) = self.special_event {
            for player in &mut self.players {
                if rng.grants_item(event.grant_percent) {
                    player.item = Some(event.item);
                }
            }
        }
        Ok(())
    }

    /// Enter a phase, clearing the exactly-once resolution guard.
    pub fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_resolved = false;
    }

    /// Clear per-night submissions on night entry.
    pub fn clear_night(&mut self) {
        self.night_actions.clear();
        self.throws.clear();
    }

    /// Fall back to registration after a failed start: roles are taken
    /// back, the dead rise, and every one-shot flag resets. The roster
    /// itself is kept.
    pub fn reset_to_registration(&mut self) {
        self.enter(Phase::Registration);
        self.round = 0;
        self.night_actions.clear();
        self.throws.clear();
        self.nominations.clear();
        self.ballots.clear();
        self.nominee = None;
        self.gun_fired = false;
        self.last_healed = None;
        for player in &mut self.players {
            player.role = None;
            player.alive = true;
            player.item = None;
        }
    }

    /// Living players that the night waits for: everyone with a night
    /// ability, except automated detectives (which never investigate).
    pub fn required_night_actors(&self) -> Vec<PlayerId> {
        self.living()
            .filter(|p| {
                p.role.is_some_and(|r| r.ability().is_some())
                    && !(p.is_automated() && p.role == Some(Role::Detective))
            })
            .map(|p| p.id)
            .collect()
    }

    /// True once every required night actor has submitted.
    pub fn night_complete(&self) -> bool {
        self.required_night_actors()
            .iter()
            .all(|id| self.night_actions.contains_key(id))
    }

    /// True once every living player has nominated or abstained.
    pub fn nominations_complete(&self) -> bool {
        self.living().all(|p| self.nominations.contains_key(&p.id))
    }

    /// True once every living player has cast a yes/no ballot.
    pub fn ballots_complete(&self) -> bool {
        self.living().all(|p| self.ballots.contains_key(&p.id))
    }

    /// A point-in-time view for status queries.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            phase: self.phase,
            round: self.round,
            participants: self.players.len(),
            automated: self.players.iter().filter(|p| p.is_automated()).count(),
            living: self.living_count(),
            bullet_spent: self.gun_fired,
            special_event: self.special_event.map(|e| e.name),
            players: self
                .players
                .iter()
                .map(|p| PlayerStatus {
                    name: p.name.clone(),
                    alive: p.alive,
                    automated: p.is_automated(),
                })
                .collect(),
        }
    }
}

/// A point-in-time, spoiler-free view of a session.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Current round (0 during registration).
    pub round: u32,
    /// Total roster size.
    pub participants: usize,
    /// How many roster slots are automated.
    pub automated: usize,
    /// How many participants are still alive.
    pub living: usize,
    /// Whether the detective's bullet has been spent.
    pub bullet_spent: bool,
    /// Name of the active special event, if any.
    pub special_event: Option<&'static str>,
    /// Per-player public status, in join order.
    pub players: Vec<PlayerStatus>,
}

impl StatusSnapshot {
    /// Render the snapshot as pretty JSON for platform layers that want
    /// structured status instead of text.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Public per-player status line.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatus {
    /// Display name.
    pub name: String,
    /// Alive or eliminated.
    pub alive: bool,
    /// Automated participant marker.
    pub automated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nw_core::DiceChance;

    fn session_with(n: usize) -> Session {
        let mut s = Session::new(ChatId(1), PlayerId(1), None);
        for i in 0..n {
            s.join(PlayerId(i as i64 + 1), format!("p{i}")).unwrap();
        }
        s
    }

    #[test]
    fn join_and_leave() {
        let mut s = session_with(2);
        assert_eq!(s.players().len(), 2);
        s.leave(PlayerId(1)).unwrap();
        assert_eq!(s.players().len(), 1);
        assert_eq!(s.leave(PlayerId(1)), Err(EngineError::UnknownPlayer(PlayerId(1))));
    }

    #[test]
    fn join_rejects_duplicates() {
        let mut s = session_with(1);
        assert_eq!(
            s.join(PlayerId(1), "again"),
            Err(EngineError::DuplicateAction(PlayerId(1)))
        );
    }

    #[test]
    fn roster_is_capped() {
        let mut s = session_with(MAX_PLAYERS);
        assert_eq!(
            s.join(PlayerId(99), "late"),
            Err(EngineError::RosterFull { max: MAX_PLAYERS })
        );
    }

    #[test]
    fn automated_players_get_negative_ids_and_names() {
        let mut s = session_with(3);
        let names = s.add_automated(2).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(s.players().len(), 5);
        assert_eq!(s.players().iter().filter(|p| p.is_automated()).count(), 2);
    }

    #[test]
    fn add_automated_respects_the_cap() {
        let mut s = session_with(14);
        let names = s.add_automated(5).unwrap();
        assert_eq!(names.len(), 1);
        assert_eq!(s.players().len(), MAX_PLAYERS);
        assert!(s.add_automated(1).is_err());
    }

    #[test]
    fn assign_roles_needs_five() {
        let mut s = session_with(4);
        let mut chance = DiceChance::seeded(1);
        assert_eq!(
            s.assign_roles(&mut chance),
            Err(EngineError::RosterTooSmall { have: 4, min: 5 })
        );
    }

    #[test]
    fn assign_roles_covers_everyone() {
        let mut s = session_with(8);
        let mut chance = DiceChance::seeded(1);
        s.assign_roles(&mut chance).unwrap();
        assert!(s.players().iter().all(|p| p.role.is_some() && p.alive));
        let godfathers = s
            .players()
            .iter()
            .filter(|p| p.role == Some(Role::Godfather))
            .count();
        assert_eq!(godfathers, 1);
    }

    #[test]
    fn reset_takes_roles_back() {
        let mut s = session_with(6);
        let mut chance = DiceChance::seeded(1);
        s.assign_roles(&mut chance).unwrap();
        s.enter(Phase::Night);
        s.gun_fired = true;
        s.reset_to_registration();
        assert_eq!(s.phase, Phase::Registration);
        assert!(!s.gun_fired);
        assert!(s.players().iter().all(|p| p.role.is_none() && p.alive));
    }

    #[test]
    fn night_completion_ignores_automated_detective() {
        let mut s = session_with(4);
        s.add_automated(1).unwrap();
        // Hand-assign: the automated slot is the detective.
        let roles = [Role::Godfather, Role::Doctor, Role::Villager, Role::Villager];
        for (player, role) in s.players.iter_mut().zip(roles) {
            player.role = Some(role);
        }
        let bot = s.players.iter_mut().find(|p| p.is_automated()).unwrap();
        bot.role = Some(Role::Detective);
        let required = s.required_night_actors();
        assert_eq!(required.len(), 2); // godfather + doctor only
        assert!(!s.night_complete());
        for id in required {
            s.night_actions.insert(id, NightAction::Heal(PlayerId(1)));
        }
        assert!(s.night_complete());
    }

    #[test]
    fn snapshot_reflects_state() {
        let mut s = session_with(5);
        s.add_automated(1).unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.participants, 6);
        assert_eq!(snap.automated, 1);
        assert_eq!(snap.living, 6);
        assert_eq!(snap.phase, Phase::Registration);
        assert!(!snap.bullet_spent);
    }

    #[test]
    fn snapshot_serializes() {
        let s = session_with(5);
        let json = s.snapshot().to_json();
        assert!(json.contains("\"registration\""));
        assert!(json.contains("\"participants\": 5"));
    }
}
