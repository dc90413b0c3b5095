//! Core types for Nachtwache, a Mafia party game engine for chat groups.
//!
//! This crate holds the leaf vocabulary shared by the engine and any
//! frontend: the role catalog, players, the chance-policy seam behind
//! which all randomness lives, special events, and session
//! configuration. It knows nothing about phases, chats, or messaging.

pub mod chance;
pub mod config;
pub mod player;
pub mod role;
pub mod special;

pub use chance::{Chance, DiceChance, ForcedChance};
pub use config::GameConfig;
pub use player::{Player, PlayerId};
pub use role::{NightAbility, Role, Team};
pub use special::SpecialEvent;
