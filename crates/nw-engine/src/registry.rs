//! The process-wide session registry.
//!
//! One live session per chat, each behind its own mutex so sessions
//! never contend with each other. A session that panicked mid-update
//! (poisoned lock) is torn down on next access and reported as
//! [`EngineError::SessionFault`]; its siblings are untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use nw_core::{GameConfig, PlayerId};

use crate::engine::Game;
use crate::error::{EngineError, EngineResult};
use crate::session::ChatId;

/// Process-wide map from chat to its one session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ChatId, Arc<Mutex<Game>>>>,
}

impl SessionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for `chat`. Fails with
    /// [`EngineError::SessionActive`] while a live session exists; an
    /// ended or faulted session is replaced.
    pub fn create(
        &self,
        chat: ChatId,
        admin: PlayerId,
        config: GameConfig,
    ) -> EngineResult<Arc<Mutex<Game>>> {
        let mut sessions = self.lock_map();
        if let Some(existing) = sessions.get(&chat) {
            match existing.lock() {
                Ok(game) if !game.is_over() => return Err(EngineError::SessionActive),
                Ok(_) => {}
                Err(_) => {
                    log::error!("session {chat}: replacing poisoned session");
                }
            }
        }
        let game = Arc::new(Mutex::new(Game::new(chat, admin, config)));
        sessions.insert(chat, Arc::clone(&game));
        log::info!("session {chat}: created");
        Ok(game)
    }

    /// The session handle for `chat`, if one exists.
    pub fn get(&self, chat: ChatId) -> Option<Arc<Mutex<Game>>> {
        self.lock_map().get(&chat).cloned()
    }

    /// Drop the session for `chat`. Returns whether one existed.
    pub fn destroy(&self, chat: ChatId) -> bool {
        let removed = self.lock_map().remove(&chat).is_some();
        if removed {
            log::info!("session {chat}: destroyed");
        }
        removed
    }

    /// Run `f` against the chat's session under its lock.
    ///
    /// Returns [`EngineError::SessionNotFound`] without a session, and
    /// [`EngineError::SessionFault`] (after tearing the session down)
    /// if a previous holder panicked inside the lock.
    pub fn with_session<T>(
        &self,
        chat: ChatId,
        f: impl FnOnce(&mut Game) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let handle = self.get(chat).ok_or(EngineError::SessionNotFound)?;
        let mut game = match handle.lock() {
            Ok(game) => game,
            Err(_) => {
                log::error!("session {chat}: poisoned; tearing down");
                self.destroy(chat);
                return Err(EngineError::SessionFault);
            }
        };
        f(&mut game)
    }

    /// Remove every ended session; returns how many were reaped. The
    /// platform layer calls this after its final-message grace period.
    pub fn reap_ended(&self) -> usize {
        let mut sessions = self.lock_map();
        let before = sessions.len();
        sessions.retain(|_, handle| match handle.lock() {
            Ok(game) => !game.is_over(),
            Err(_) => false,
        });
        before - sessions.len()
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.lock_map().len()
    }

    /// True when no session is registered.
    pub fn is_empty(&self) -> bool {
        self.lock_map().is_empty()
    }

    fn lock_map(&self) -> std::sync::MutexGuard<'_, HashMap<ChatId, Arc<Mutex<Game>>>> {
        // The map itself holds no game invariants; recover from a
        // poisoned guard rather than cascading the panic.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig::default().with_seed(1)
    }

    #[test]
    fn create_get_destroy() {
        let registry = SessionRegistry::new();
        registry.create(ChatId(1), PlayerId(1), config()).unwrap();
        assert!(registry.get(ChatId(1)).is_some());
        assert!(registry.destroy(ChatId(1)));
        assert!(registry.get(ChatId(1)).is_none());
        assert!(!registry.destroy(ChatId(1)));
    }

    #[test]
    fn one_live_session_per_chat() {
        let registry = SessionRegistry::new();
        registry.create(ChatId(1), PlayerId(1), config()).unwrap();
        assert!(matches!(
            registry.create(ChatId(1), PlayerId(2), config()),
            Err(EngineError::SessionActive)
        ));
        // A different chat is independent.
        assert!(registry.create(ChatId(2), PlayerId(1), config()).is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn with_session_requires_a_session() {
        let registry = SessionRegistry::new();
        let result = registry.with_session(ChatId(9), |_| Ok(()));
        assert_eq!(result, Err(EngineError::SessionNotFound));
    }

    #[test]
    fn with_session_runs_under_the_lock() {
        let registry = SessionRegistry::new();
        registry.create(ChatId(1), PlayerId(1), config()).unwrap();
        registry
            .with_session(ChatId(1), |game| game.join(PlayerId(2), "Olena"))
            .unwrap();
        registry
            .with_session(ChatId(1), |game| {
                assert_eq!(game.session().players().len(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn poisoned_session_is_torn_down_alone() {
        let registry = SessionRegistry::new();
        registry.create(ChatId(1), PlayerId(1), config()).unwrap();
        registry.create(ChatId(2), PlayerId(1), config()).unwrap();

        // Poison chat 1's lock by panicking while holding it.
        let handle = registry.get(ChatId(1)).unwrap();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = handle.lock().unwrap();
            panic!("boom");
        }));

        assert_eq!(
            registry.with_session(ChatId(1), |_| Ok(())),
            Err(EngineError::SessionFault)
        );
        assert!(registry.get(ChatId(1)).is_none());
        // The sibling session is untouched.
        assert!(registry.with_session(ChatId(2), |_| Ok(())).is_ok());
    }

    #[test]
    fn reap_removes_only_ended_sessions() {
        let registry = SessionRegistry::new();
        registry.create(ChatId(1), PlayerId(1), config()).unwrap();
        registry.create(ChatId(2), PlayerId(1), config()).unwrap();
        assert_eq!(registry.reap_ended(), 0);
        assert_eq!(registry.len(), 2);
    }
}
