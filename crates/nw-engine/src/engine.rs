//! The phase engine: one [`Game`] drives one session through the phase
//! graph, resolving each phase exactly once.
//!
//! Phase graph: `registration → night → morning → discussion →
//! nomination → final vote → (night | ended)`. The single back-edge is
//! `night → registration` when role delivery fails. A phase completes
//! either when everyone required has acted or when its timer fires,
//! whichever happens first; the loser of that race hits the
//! `phase_resolved` guard and becomes a no-op.

use chrono::Utc;

use nw_core::chance::{self, Chance};
use nw_core::role::MIN_PLAYERS;
use nw_core::special::SPECIAL_EVENTS;
use nw_core::{DiceChance, GameConfig, PlayerId};

use crate::action::NightAction;
use crate::bots;
use crate::error::{EngineError, EngineResult};
use crate::gateway::{Announcement, Gateway, PhaseTimer, TimerId};
use crate::night;
use crate::session::{ChatId, Phase, Session, StatusSnapshot};
use crate::vote::{self, VoteOutcome, VoteReport};
use crate::win::{self, Verdict};

/// One session's engine: state, chance policy, and timer bookkeeping.
pub struct Game {
    session: Session,
    config: GameConfig,
    chance: Box<dyn Chance + Send>,
    timer: Option<TimerId>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("session", &self.session)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Create a session in registration. The special-event roll happens
    /// here, once, using the config's seed if one is pinned.
    pub fn new(chat: ChatId, admin: PlayerId, config: GameConfig) -> Self {
        let chance: Box<dyn Chance + Send> = match config.seed {
            Some(seed) => Box::new(DiceChance::seeded(seed)),
            None => Box::new(DiceChance::new()),
        };
        Self::with_chance(chat, admin, config, chance)
    }

    /// Create a session with an explicit chance policy (the test seam).
    pub fn with_chance(
        chat: ChatId,
        admin: PlayerId,
        config: GameConfig,
        mut chance: Box<dyn Chance + Send>,
    ) -> Self {
        let special_event = if chance.special_event() {
            chance::pick(chance.as_mut(), SPECIAL_EVENTS).copied()
        } else {
            None
        };
        let session = Session::new(chat, admin, special_event);
        Self {
            session,
            config,
            chance,
            timer: None,
        }
    }

    /// Read access to the session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A public status snapshot.
    pub fn status(&self) -> StatusSnapshot {
        self.session.snapshot()
    }

    /// True once the session has reached its terminal phase.
    pub fn is_over(&self) -> bool {
        self.session.phase == Phase::Ended
    }

    /// Add a human player during registration.
    pub fn join(&mut self, id: PlayerId, name: impl Into<String>) -> EngineResult<()> {
        self.session.join(id, name)
    }

    /// Withdraw a player during registration.
    pub fn leave(&mut self, id: PlayerId) -> EngineResult<()> {
        self.session.leave(id)
    }

    /// Add automated participants during registration; returns their
    /// names for the join announcement.
    pub fn add_automated(&mut self, count: usize) -> EngineResult<Vec<String>> {
        self.session.add_automated(count)
    }

    /// Start the game: deal roles, deliver role cards, enter the first
    /// night. Only the session admin or a chat administrator may start.
    ///
    /// Unreachable humans are purged before their roles become public;
    /// if fewer than five participants remain, the session reverts to
    /// registration and this returns
    /// [`EngineError::UnreachablePlayers`].
    pub fn begin(&mut self, requested_by: PlayerId, gateway: &mut dyn Gateway) -> EngineResult<()> {
        if self.session.phase != Phase::Registration {
            return Err(EngineError::InvalidPhase(self.session.phase));
        }
        if requested_by != self.session.admin
            && !gateway.is_administrator(self.session.chat, requested_by)
        {
            return Err(EngineError::NotAuthorized);
        }
        self.session.assign_roles(self.chance.as_mut())?;
        log::info!(
            "session {}: roles dealt to {} participants",
            self.session.chat,
            self.session.players().len()
        );

        let humans: Vec<PlayerId> = self
            .session
            .players()
            .iter()
            .filter(|p| !p.is_automated())
            .map(|p| p.id)
            .collect();
        let mut unreachable = Vec::new();
        for id in humans {
            let Some(role) = self.session.player(id).and_then(|p| p.role) else {
                continue;
            };
            let allies = if role.is_mafia() {
                self.session.mafia_allies(id)
            } else {
                Vec::new()
            };
            let card = Announcement::RoleCard { role, allies };
            if gateway.deliver_private(id, &card).is_err() {
                unreachable.push(id);
            }
        }
        if !unreachable.is_empty() {
            let count = unreachable.len();
            log::warn!(
                "session {}: {count} player(s) unreachable during role delivery",
                self.session.chat
            );
            self.session.purge(&unreachable);
            if self.session.players().len() < MIN_PLAYERS {
                self.session.reset_to_registration();
                gateway.broadcast(
                    self.session.chat,
                    &Announcement::GameAborted {
                        reason: format!(
                            "{count} player(s) never opened a private chat and too few remain; back to registration"
                        ),
                    },
                );
                return Err(EngineError::UnreachablePlayers { count });
            }
        }

        // Item grant notes are gameplay messages: failures are logged
        // and ignored.
        let granted: Vec<(PlayerId, &'static str)> = self
            .session
            .players()
            .iter()
            .filter(|p| !p.is_automated())
            .filter_map(|p| p.item.map(|item| (p.id, item)))
            .collect();
        if let Some(event) = self.session.special_event {
            for (id, item) in granted {
                let note = Announcement::ItemGranted {
                    event: event.name,
                    item,
                };
                if gateway.deliver_private(id, &note).is_err() {
                    log::warn!("session {}: item note undeliverable", self.session.chat);
                }
            }
        }

        self.enter_night(gateway);
        Ok(())
    }

    /// Submit a night action on behalf of any living actor. Human or
    /// automated, the contract is identical.
    pub fn submit_night_action(
        &mut self,
        actor: PlayerId,
        action: NightAction,
        gateway: &mut dyn Gateway,
    ) -> EngineResult<()> {
        if self.session.phase != Phase::Night {
            return Err(EngineError::InvalidPhase(self.session.phase));
        }
        let player = self
            .session
            .player(actor)
            .ok_or(EngineError::UnknownPlayer(actor))?;
        if !player.alive {
            return Err(EngineError::DeadActor);
        }
        let role = player.role.ok_or(EngineError::AbilityMismatch)?;
        if !action.allowed_for(role) {
            return Err(EngineError::AbilityMismatch);
        }
        if matches!(action, NightAction::Shoot(_)) && self.session.gun_fired {
            return Err(EngineError::AbilityExhausted);
        }
        if self.session.night_actions.contains_key(&actor) {
            return Err(EngineError::DuplicateAction(actor));
        }
        let target = action.target();
        let target_player = self
            .session
            .player(target)
            .ok_or(EngineError::InvalidTarget("no such player"))?;
        if !target_player.alive {
            return Err(EngineError::InvalidTarget("the target is already dead"));
        }
        match action {
            NightAction::Kill(_) => {
                if target_player.is_mafia() {
                    return Err(EngineError::InvalidTarget("the mafia does not eat its own"));
                }
            }
            NightAction::Heal(_) => {
                if target == actor && self.session.last_healed == Some(actor) {
                    return Err(EngineError::InvalidTarget(
                        "you cannot shield yourself twice in a row",
                    ));
                }
            }
            NightAction::Investigate(_) | NightAction::Shoot(_) => {
                if target == actor {
                    return Err(EngineError::InvalidTarget("you cannot target yourself"));
                }
            }
        }
        if matches!(action, NightAction::Shoot(_)) {
            // The bullet is spent on submission, resolved or not.
            self.session.gun_fired = true;
        }
        self.session.night_actions.insert(actor, action);
        log::debug!(
            "session {}: {actor} submitted {}",
            self.session.chat,
            action.verb()
        );
        if self.session.night_complete() {
            self.resolve_night(gateway);
        }
        Ok(())
    }

    /// Submit an item throw, or `None` to keep the item for a later
    /// night. Throws never gate night completion.
    pub fn submit_throw(
        &mut self,
        thrower: PlayerId,
        target: Option<PlayerId>,
        _gateway: &mut dyn Gateway,
    ) -> EngineResult<()> {
        if self.session.phase != Phase::Night {
            return Err(EngineError::InvalidPhase(self.session.phase));
        }
        if self.session.special_event.is_none() {
            return Err(EngineError::AbilityMismatch);
        }
        let player = self
            .session
            .player(thrower)
            .ok_or(EngineError::UnknownPlayer(thrower))?;
        if !player.alive {
            return Err(EngineError::DeadActor);
        }
        if player.item.is_none() {
            return Err(EngineError::AbilityExhausted);
        }
        if self.session.throws.contains_key(&thrower) {
            return Err(EngineError::DuplicateAction(thrower));
        }
        let Some(target) = target else {
            // Keeping the item is always allowed.
            return Ok(());
        };
        let target_player = self
            .session
            .player(target)
            .ok_or(EngineError::InvalidTarget("no such player"))?;
        if !target_player.alive {
            return Err(EngineError::InvalidTarget("the target is already dead"));
        }
        if target == thrower {
            return Err(EngineError::InvalidTarget("you cannot target yourself"));
        }
        if let Some(p) = self.session.player_mut(thrower) {
            p.item = None;
        }
        self.session.throws.insert(thrower, target);
        log::debug!("session {}: {thrower} threw at {target}", self.session.chat);
        Ok(())
    }

    /// Submit a nomination vote; `None` abstains.
    pub fn submit_nomination(
        &mut self,
        voter: PlayerId,
        nominee: Option<PlayerId>,
        gateway: &mut dyn Gateway,
    ) -> EngineResult<()> {
        if self.session.phase != Phase::Nomination {
            return Err(EngineError::InvalidPhase(self.session.phase));
        }
        let player = self
            .session
            .player(voter)
            .ok_or(EngineError::UnknownPlayer(voter))?;
        if !player.alive {
            return Err(EngineError::DeadActor);
        }
        if self.session.nominations.contains_key(&voter) {
            return Err(EngineError::DuplicateAction(voter));
        }
        if let Some(target) = nominee {
            let target_player = self
                .session
                .player(target)
                .ok_or(EngineError::InvalidTarget("no such player"))?;
            if !target_player.alive {
                return Err(EngineError::InvalidTarget("the target is already dead"));
            }
            if target == voter {
                return Err(EngineError::InvalidTarget("you cannot nominate yourself"));
            }
        }
        self.session.nominations.insert(voter, nominee);
        if self.session.nominations_complete() {
            self.resolve_nominations(gateway);
        }
        Ok(())
    }

    /// Submit a yes/no ballot on the current nominee.
    pub fn submit_final_vote(
        &mut self,
        voter: PlayerId,
        approve: bool,
        gateway: &mut dyn Gateway,
    ) -> EngineResult<()> {
        if self.session.phase != Phase::FinalVote {
            return Err(EngineError::InvalidPhase(self.session.phase));
        }
        let player = self
            .session
            .player(voter)
            .ok_or(EngineError::UnknownPlayer(voter))?;
        if !player.alive {
            return Err(EngineError::DeadActor);
        }
        if self.session.ballots.contains_key(&voter) {
            return Err(EngineError::DuplicateAction(voter));
        }
        self.session.ballots.insert(voter, approve);
        if self.session.ballots_complete() {
            self.resolve_final_vote(gateway);
        }
        Ok(())
    }

    /// A scheduled timer elapsed. Stale timers (cancelled, superseded,
    /// or racing a completion that already resolved the phase) are
    /// discarded silently.
    pub fn timer_fired(&mut self, timer: TimerId, gateway: &mut dyn Gateway) {
        if self.timer != Some(timer) {
            log::debug!(
                "session {}: stale timer {timer:?} discarded",
                self.session.chat
            );
            return;
        }
        self.timer = None;
        match self.session.phase {
            Phase::Night => self.resolve_night(gateway),
            Phase::Discussion => self.enter_nomination(gateway),
            Phase::Nomination => self.resolve_nominations(gateway),
            Phase::FinalVote => self.resolve_final_vote(gateway),
            phase => log::debug!("session {}: timer in {phase}; ignored", self.session.chat),
        }
    }

    /// Terminate the session outright, cancelling whatever is in
    /// flight. Only the session admin or a chat administrator may.
    pub fn terminate(
        &mut self,
        requested_by: PlayerId,
        gateway: &mut dyn Gateway,
    ) -> EngineResult<()> {
        if self.session.phase == Phase::Ended {
            return Err(EngineError::InvalidPhase(Phase::Ended));
        }
        if requested_by != self.session.admin
            && !gateway.is_administrator(self.session.chat, requested_by)
        {
            return Err(EngineError::NotAuthorized);
        }
        self.cancel_timer(gateway);
        self.session.enter(Phase::Ended);
        self.session.ended_at = Some(Utc::now());
        gateway.broadcast(
            self.session.chat,
            &Announcement::GameAborted {
                reason: "terminated by the administrator".into(),
            },
        );
        log::info!("session {}: terminated", self.session.chat);
        Ok(())
    }

    fn cancel_timer(&mut self, gateway: &mut dyn Gateway) {
        if let Some(id) = self.timer.take() {
            gateway.cancel(id);
        }
    }

    fn enter_night(&mut self, gateway: &mut dyn Gateway) {
        self.cancel_timer(gateway);
        self.session.round += 1;
        self.session.enter(Phase::Night);
        self.session.clear_night();
        let seconds = self.config.night_seconds;
        gateway.broadcast(
            self.session.chat,
            &Announcement::NightBegins {
                round: self.session.round,
                seconds,
            },
        );
        self.timer = Some(gateway.schedule(self.session.chat, PhaseTimer::Night, seconds));
        log::info!(
            "session {}: night {} begins",
            self.session.chat,
            self.session.round
        );

        // Bots act on entry through the ordinary submission paths.
        // Throws go first: they never complete the phase, so none are
        // lost if the last bot action resolves the night.
        let throws = bots::throws(&self.session, self.chance.as_mut());
        for (thrower, target) in throws {
            if let Err(err) = self.submit_throw(thrower, Some(target), gateway) {
                log::debug!("session {}: bot throw rejected: {err}", self.session.chat);
            }
        }
        let actions = bots::night_actions(&self.session, self.chance.as_mut());
        for (actor, action) in actions {
            if self.session.phase != Phase::Night {
                break;
            }
            if let Err(err) = self.submit_night_action(actor, action, gateway) {
                log::debug!("session {}: bot action rejected: {err}", self.session.chat);
            }
        }
    }

    fn resolve_night(&mut self, gateway: &mut dyn Gateway) {
        if self.session.phase != Phase::Night || self.session.phase_resolved {
            return;
        }
        self.session.phase_resolved = true;
        self.cancel_timer(gateway);
        let (report, investigations) = night::resolve(&mut self.session, self.chance.as_mut());
        self.session.enter(Phase::Morning);
        for check in investigations {
            let detective = check.detective;
            if detective.is_automated() {
                continue;
            }
            if gateway
                .deliver_private(detective, &Announcement::Investigation(check))
                .is_err()
            {
                log::warn!(
                    "session {}: investigation result undeliverable to {detective}",
                    self.session.chat
                );
            }
        }
        gateway.broadcast(self.session.chat, &Announcement::MorningReport(report));
        if let Some(verdict) = win::evaluate(&self.session) {
            self.finish(verdict, gateway);
        } else {
            self.enter_discussion(gateway);
        }
    }

    fn enter_discussion(&mut self, gateway: &mut dyn Gateway) {
        self.session.enter(Phase::Discussion);
        let seconds = self.config.discussion_seconds;
        gateway.broadcast(
            self.session.chat,
            &Announcement::DiscussionBegins { seconds },
        );
        self.timer = Some(gateway.schedule(self.session.chat, PhaseTimer::Discussion, seconds));
    }

    fn enter_nomination(&mut self, gateway: &mut dyn Gateway) {
        self.session.enter(Phase::Nomination);
        self.session.nominations.clear();
        self.session.nominee = None;
        let seconds = self.config.nomination_seconds;
        gateway.broadcast(
            self.session.chat,
            &Announcement::NominationBegins {
                living: self.session.living_count(),
                seconds,
            },
        );
        self.timer = Some(gateway.schedule(self.session.chat, PhaseTimer::Nomination, seconds));
        let votes = bots::nominations(&self.session, self.chance.as_mut());
        for (voter, choice) in votes {
            if self.session.phase != Phase::Nomination {
                break;
            }
            if let Err(err) = self.submit_nomination(voter, choice, gateway) {
                log::debug!("session {}: bot vote rejected: {err}", self.session.chat);
            }
        }
    }

    fn resolve_nominations(&mut self, gateway: &mut dyn Gateway) {
        if self.session.phase != Phase::Nomination || self.session.phase_resolved {
            return;
        }
        self.session.phase_resolved = true;
        self.cancel_timer(gateway);
        let Some(result) = vote::resolve_nominations(&self.session.nominations, self.chance.as_mut())
        else {
            gateway.broadcast(self.session.chat, &Announcement::DaySkipped);
            self.enter_night(gateway);
            return;
        };
        self.session.nominee = Some(result.nominee);
        self.session.ballots.clear();
        self.session.enter(Phase::FinalVote);
        let seconds = self.config.final_vote_seconds;
        let nominee_name = self
            .session
            .player(result.nominee)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| result.nominee.to_string());
        gateway.broadcast(
            self.session.chat,
            &Announcement::FinalVoteBegins {
                nominee: nominee_name,
                votes: result.votes,
                tied_among: result.tied_among,
                seconds,
            },
        );
        self.timer = Some(gateway.schedule(self.session.chat, PhaseTimer::FinalVote, seconds));
        let ballots = bots::ballots(&self.session, self.chance.as_mut());
        for (voter, approve) in ballots {
            if self.session.phase != Phase::FinalVote {
                break;
            }
            if let Err(err) = self.submit_final_vote(voter, approve, gateway) {
                log::debug!("session {}: bot ballot rejected: {err}", self.session.chat);
            }
        }
    }

    fn resolve_final_vote(&mut self, gateway: &mut dyn Gateway) {
        if self.session.phase != Phase::FinalVote || self.session.phase_resolved {
            return;
        }
        self.session.phase_resolved = true;
        self.cancel_timer(gateway);
        let Some(nominee) = self.session.nominee.take() else {
            self.enter_night(gateway);
            return;
        };
        let (yes, no) = vote::tally_ballots(&self.session.ballots);
        let nominee_name = self
            .session
            .player(nominee)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| nominee.to_string());
        let outcome = if yes > no {
            if self.chance.rope_breaks() {
                VoteOutcome::RopeBroke
            } else {
                let role = self
                    .session
                    .player_mut(nominee)
                    .map(|p| {
                        p.alive = false;
                        p.role.unwrap_or(nw_core::Role::Villager)
                    })
                    .unwrap_or(nw_core::Role::Villager);
                VoteOutcome::Eliminated { role }
            }
        } else {
            VoteOutcome::Spared
        };
        gateway.broadcast(
            self.session.chat,
            &Announcement::VoteReport(VoteReport {
                nominee: nominee_name,
                yes,
                no,
                outcome,
            }),
        );
        if let Some(verdict) = win::evaluate(&self.session) {
            self.finish(verdict, gateway);
        } else {
            self.enter_night(gateway);
        }
    }

    fn finish(&mut self, verdict: Verdict, gateway: &mut dyn Gateway) {
        self.cancel_timer(gateway);
        let summary = win::summary(&self.session, verdict);
        self.session.enter(Phase::Ended);
        self.session.ended_at = Some(Utc::now());
        gateway.broadcast(self.session.chat, &Announcement::GameOver(summary));
        log::info!("session {}: game over", self.session.chat);
    }
}
