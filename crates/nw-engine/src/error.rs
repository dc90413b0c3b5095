//! Error types for the game engine.
//!
//! Every rule violation is a recoverable rejection carried back to the
//! platform layer; nothing here ever tears down a session except
//! [`EngineError::SessionFault`], which reports a teardown that already
//! happened.

use nw_core::PlayerId;
use thiserror::Error;

use crate::session::Phase;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Rejection reasons reported to the platform layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The submission does not belong to the current phase.
    #[error("not allowed during the {0} phase")]
    InvalidPhase(Phase),

    /// The actor already acted or voted this round.
    #[error("player {0} has already acted this round")]
    DuplicateAction(PlayerId),

    /// The chosen target is dead, absent, or otherwise disallowed.
    #[error("invalid target: {0}")]
    InvalidTarget(&'static str),

    /// The actor's role does not have the submitted ability.
    #[error("your role cannot do that")]
    AbilityMismatch,

    /// A single-use ability was already spent earlier in the session.
    #[error("that ability has already been spent")]
    AbilityExhausted,

    /// Registration is capped.
    #[error("the roster is full ({max} participants)")]
    RosterFull {
        /// The registration cap.
        max: usize,
    },

    /// Not enough participants to deal roles.
    #[error("need at least {min} participants, have {have}")]
    RosterTooSmall {
        /// Current roster size.
        have: usize,
        /// Required minimum.
        min: usize,
    },

    /// Role delivery failed and the session fell back to registration.
    #[error("{count} player(s) could not receive their role")]
    UnreachablePlayers {
        /// How many players were purged as unreachable.
        count: usize,
    },

    /// The actor is not in this session's roster.
    #[error("player {0} is not part of this game")]
    UnknownPlayer(PlayerId),

    /// Dead players can neither act nor vote.
    #[error("dead players cannot act")]
    DeadActor,

    /// No session exists for the chat.
    #[error("no session in this chat")]
    SessionNotFound,

    /// A live session already occupies the chat.
    #[error("a session is already running in this chat")]
    SessionActive,

    /// The requester is not allowed to start or end the session.
    #[error("only an administrator may do that")]
    NotAuthorized,

    /// The session panicked mid-update and has been torn down.
    #[error("the session failed and has been closed")]
    SessionFault,
}
