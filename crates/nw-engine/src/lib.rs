//! Session engine for Nachtwache, a Mafia party game for chat groups.
//!
//! The engine owns the full game loop for any number of independent
//! chat sessions: registration, hidden role assignment, night action
//! resolution, the two-round elimination vote, automated participants,
//! perk twists, and win evaluation. Everything platform-specific
//! (message rendering, delivery, timers, admin lookups) sits behind the
//! [`gateway::Gateway`] trait.

pub mod action;
pub mod bots;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod night;
pub mod registry;
pub mod session;
pub mod vote;
pub mod win;

pub use action::NightAction;
pub use engine::Game;
pub use error::{EngineError, EngineResult};
pub use gateway::{Announcement, DeliveryError, Gateway, PhaseTimer, TimerId};
pub use night::NightReport;
pub use registry::SessionRegistry;
pub use session::{ChatId, Phase, Session, StatusSnapshot};
pub use vote::{VoteOutcome, VoteReport};
pub use win::{GameSummary, Verdict};
