//! In-memory conversation sessions.
//!
//! Sessions are append-only transcripts keyed by UUID. The full history
//! is retained for display and audit; bounding to a recent tail happens
//! downstream when the retrieval query and prompt are assembled, never
//! in storage. Turns are never edited or removed once appended
//! (`clear_session` empties a transcript but keeps the id valid).

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::RagError;
use crate::models::Turn;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new, empty session. Ids are unique for the process
    /// lifetime.
    pub fn create_session(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().unwrap().insert(id.clone(), Vec::new());
        id
    }

    /// Full ordered history of a session.
    pub fn get_history(&self, session_id: &str) -> Result<Vec<Turn>, RagError> {
        self.sessions
            .read()
            .unwrap()
            .get(session_id)
            .cloned()
            .ok_or_else(|| RagError::SessionNotFound(session_id.to_string()))
    }

    /// The most recent `max_turns` turns, oldest first.
    ///
    /// This is the bounded tail handed downstream for context assembly;
    /// the stored transcript itself is never truncated.
    pub fn recent_history(&self, session_id: &str, max_turns: usize) -> Result<Vec<Turn>, RagError> {
        let sessions = self.sessions.read().unwrap();
        let turns = sessions
            .get(session_id)
            .ok_or_else(|| RagError::SessionNotFound(session_id.to_string()))?;
        Ok(turns[turns.len().saturating_sub(max_turns)..].to_vec())
    }

    pub fn append_turn(&self, session_id: &str, turn: Turn) -> Result<(), RagError> {
        let mut sessions = self.sessions.write().unwrap();
        let turns = sessions
            .get_mut(session_id)
            .ok_or_else(|| RagError::SessionNotFound(session_id.to_string()))?;
        turns.push(turn);
        Ok(())
    }

    /// Empty a session's transcript without invalidating its id.
    pub fn clear_session(&self, session_id: &str) -> Result<(), RagError> {
        let mut sessions = self.sessions.write().unwrap();
        let turns = sessions
            .get_mut(session_id)
            .ok_or_else(|| RagError::SessionNotFound(session_id.to_string()))?;
        turns.clear();
        Ok(())
    }

    pub fn delete_session(&self, session_id: &str) -> Result<(), RagError> {
        self.sessions
            .write()
            .unwrap()
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| RagError::SessionNotFound(session_id.to_string()))
    }

    pub fn list_sessions(&self) -> Vec<String> {
        self.sessions.read().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(q: &str) -> Turn {
        Turn::new(q, format!("answer to {}", q), Vec::new())
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let store = SessionStore::new();
        let a = store.create_session();
        let b = store.create_session();
        assert_ne!(a, b);
    }

    #[test]
    fn append_then_read_yields_last_turn() {
        let store = SessionStore::new();
        let id = store.create_session();
        store.append_turn(&id, turn("q1")).unwrap();
        store.append_turn(&id, turn("q2")).unwrap();
        let history = store.get_history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().unwrap().question, "q2");
    }

    #[test]
    fn recent_history_is_the_tail_and_leaves_storage_intact() {
        let store = SessionStore::new();
        let id = store.create_session();
        for i in 0..5 {
            store.append_turn(&id, turn(&format!("q{}", i))).unwrap();
        }
        let tail = store.recent_history(&id, 2).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].question, "q3");
        assert_eq!(tail[1].question, "q4");
        // Asking for more than exists returns everything
        assert_eq!(store.recent_history(&id, 99).unwrap().len(), 5);
        // Storage keeps the full transcript
        assert_eq!(store.get_history(&id).unwrap().len(), 5);
    }

    #[test]
    fn sessions_do_not_interfere() {
        let store = SessionStore::new();
        let a = store.create_session();
        let b = store.create_session();
        store.append_turn(&a, turn("only in a")).unwrap();
        assert_eq!(store.get_history(&a).unwrap().len(), 1);
        assert!(store.get_history(&b).unwrap().is_empty());
    }

    #[test]
    fn unknown_session_is_an_error() {
        let store = SessionStore::new();
        assert!(matches!(
            store.get_history("nope"),
            Err(RagError::SessionNotFound(_))
        ));
        assert!(matches!(
            store.append_turn("nope", turn("q")),
            Err(RagError::SessionNotFound(_))
        ));
    }

    #[test]
    fn clear_keeps_the_session_alive() {
        let store = SessionStore::new();
        let id = store.create_session();
        store.append_turn(&id, turn("q")).unwrap();
        store.clear_session(&id).unwrap();
        assert!(store.get_history(&id).unwrap().is_empty());
        // still appendable
        store.append_turn(&id, turn("q2")).unwrap();
    }

    #[test]
    fn delete_removes_the_session() {
        let store = SessionStore::new();
        let id = store.create_session();
        store.delete_session(&id).unwrap();
        assert!(store.get_history(&id).is_err());
        assert!(store.list_sessions().is_empty());
    }
}
