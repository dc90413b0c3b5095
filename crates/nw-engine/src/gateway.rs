//! The boundary to the chat platform.
//!
//! The engine never talks to a chat API. It hands structured
//! [`Announcement`]s to a [`Gateway`] and asks it for timers; the
//! platform layer decides how to render and deliver them. Every
//! announcement also has a plain-text `Display` rendering that a thin
//! frontend (like the `nw` binary) can print as-is.

use nw_core::{PlayerId, Role};
use serde::Serialize;
use thiserror::Error;

use crate::night::{InvestigationResult, NightReport};
use crate::session::ChatId;
use crate::vote::VoteReport;
use crate::win::GameSummary;

/// Handle of a scheduled phase timer, minted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimerId(pub u64);

/// Which phase a scheduled timer closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhaseTimer {
    /// Ends the night if actions are still missing.
    Night,
    /// Ends the discussion (the only way it ends).
    Discussion,
    /// Ends the nomination stage.
    Nomination,
    /// Ends the final vote.
    FinalVote,
}

impl std::fmt::Display for PhaseTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Night => write!(f, "night"),
            Self::Discussion => write!(f, "discussion"),
            Self::Nomination => write!(f, "nomination"),
            Self::FinalVote => write!(f, "final vote"),
        }
    }
}

/// A private delivery failed (blocked bot, closed DMs, network).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("private delivery failed")]
pub struct DeliveryError;

/// Structured outbound content. The engine produces these; the
/// platform layer renders them.
#[derive(Debug, Clone, Serialize)]
pub enum Announcement {
    /// A player's secret role card, delivered privately at the start.
    RoleCard {
        /// The assigned role.
        role: Role,
        /// Living mafia teammates, listed only on mafia cards.
        allies: Vec<String>,
    },
    /// A special-event item landed in a player's pocket.
    ItemGranted {
        /// The event's name.
        event: &'static str,
        /// The item's name.
        item: &'static str,
    },
    /// Night has fallen; hidden actions are open.
    NightBegins {
        /// Round number.
        round: u32,
        /// Timer length.
        seconds: u64,
    },
    /// The resolved night, announced to the whole chat.
    MorningReport(NightReport),
    /// A private investigation result for the detective.
    Investigation(InvestigationResult),
    /// Open discussion has started.
    DiscussionBegins {
        /// Timer length.
        seconds: u64,
    },
    /// The nomination stage has started.
    NominationBegins {
        /// How many players may vote.
        living: usize,
        /// Timer length.
        seconds: u64,
    },
    /// Nobody was nominated; the day is skipped.
    DaySkipped,
    /// A nominee faces the final vote.
    FinalVoteBegins {
        /// The nominee's name.
        nominee: String,
        /// Votes the nominee drew.
        votes: usize,
        /// Size of the tie the random break resolved (1 = no tie).
        tied_among: usize,
        /// Timer length.
        seconds: u64,
    },
    /// The final vote's outcome.
    VoteReport(VoteReport),
    /// The game is over: verdict, reveal, statistics.
    GameOver(GameSummary),
    /// The session ended without a verdict (termination or failed start).
    GameAborted {
        /// Human-readable reason.
        reason: String,
    },
}

impl std::fmt::Display for Announcement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoleCard { role, allies } => {
                write!(f, "Your role: {}. {}", role.title(), role.blurb())?;
                if !allies.is_empty() {
                    write!(f, " Your allies: {}.", allies.join(", "))?;
                }
                Ok(())
            }
            Self::ItemGranted { event, item } => {
                write!(f, "{event}: you found a {item}! Throw it at night, or keep it.")
            }
            Self::NightBegins { round, seconds } => {
                write!(
                    f,
                    "Night {round} falls. The town sleeps; some do not. {seconds} seconds."
                )
            }
            Self::MorningReport(report) => write!(f, "{report}"),
            Self::Investigation(result) => write!(f, "{result}"),
            Self::DiscussionBegins { seconds } => {
                write!(f, "Time to talk. Discussion is open for {seconds} seconds.")
            }
            Self::NominationBegins { living, seconds } => {
                write!(
                    f,
                    "Who goes to the gallows? {living} players may nominate ({seconds} seconds)."
                )
            }
            Self::DaySkipped => write!(f, "Nobody was nominated. The day passes; night falls."),
            Self::FinalVoteBegins {
                nominee,
                votes,
                tied_among,
                seconds,
            } => {
                write!(f, "{nominee} is nominated with {votes} vote(s)")?;
                if *tied_among > 1 {
                    write!(f, " (tie of {tied_among}, broken by lot)")?;
                }
                write!(f, ". Yes or no, {seconds} seconds.")
            }
            Self::VoteReport(report) => write!(f, "{report}"),
            Self::GameOver(summary) => write!(f, "{summary}"),
            Self::GameAborted { reason } => write!(f, "The game is over: {reason}"),
        }
    }
}

/// What the engine needs from the chat platform.
///
/// Implementations are thin: deliver, broadcast, keep timers, answer an
/// admin lookup. All game logic stays on the engine side of this trait.
pub trait Gateway {
    /// Deliver a private message to one player. Failure during role
    /// delivery marks the player unreachable; at any other time the
    /// engine logs and moves on.
    fn deliver_private(
        &mut self,
        player: PlayerId,
        announcement: &Announcement,
    ) -> Result<(), DeliveryError>;

    /// Post to the session's chat. Fire-and-forget.
    fn broadcast(&mut self, chat: ChatId, announcement: &Announcement);

    /// Schedule a phase timer; the platform calls
    /// [`crate::engine::Game::timer_fired`] with the returned id when
    /// it elapses.
    fn schedule(&mut self, chat: ChatId, timer: PhaseTimer, seconds: u64) -> TimerId;

    /// Cancel a scheduled timer. Best-effort: a timer that fires anyway
    /// is discarded by the engine's phase guard.
    fn cancel(&mut self, timer: TimerId);

    /// Whether `user` is an administrator of `chat`. Consulted only
    /// when starting or terminating a session.
    fn is_administrator(&mut self, chat: ChatId, user: PlayerId) -> bool;
}
