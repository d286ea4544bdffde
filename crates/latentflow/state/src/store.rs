use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::StateConfig;
use crate::latent::LatentState;

/// In-memory session store.
///
/// Each session id maps to an independent state; callers take a copy with
/// [`get`](Self::get), run a transaction on it, then [`commit`](Self::commit)
/// it back. One in-flight transaction per session is the caller's contract.
pub struct StateStore {
    config: StateConfig,
    sessions: RwLock<HashMap<String, LatentState>>,
}

impl StateStore {
    pub fn new(config: StateConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// State for a session, created fresh on first access.
    pub fn get(&self, session_id: &str) -> LatentState {
        if let Some(state) = self.sessions.read().get(session_id) {
            return state.clone();
        }

        let mut sessions = self.sessions.write();
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session = %session_id, "Creating session state");
                LatentState::new(&self.config)
            })
            .clone()
    }

    pub fn commit(&self, session_id: &str, state: LatentState) {
        self.sessions.write().insert(session_id.to_string(), state);
    }

    pub fn remove(&self, session_id: &str) -> Option<LatentState> {
        self.sessions.write().remove(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latentflow_types::Block;
    use serde_json::json;

    #[test]
    fn first_get_creates_fresh_state() {
        let store = StateStore::default();
        let state = store.get("s1");
        assert_eq!(state.counter(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn commit_replaces_session_state() {
        let store = StateStore::default();
        let mut state = store.get("s1");
        state.update(Block::event(json!("hello")));
        store.commit("s1", state);

        assert_eq!(store.get("s1").counter(), 1);
        assert_eq!(store.get("s2").counter(), 0);
        assert_eq!(store.session_ids(), vec!["s1", "s2"]);
    }

    #[test]
    fn sessions_are_independent_across_threads() {
        let store = std::sync::Arc::new(StateStore::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let id = format!("s{i}");
                    let mut state = store.get(&id);
                    for n in 0..=i {
                        state.update(Block::event(json!(n)));
                    }
                    store.commit(&id, state);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for i in 0..4u64 {
            assert_eq!(store.get(&format!("s{i}")).counter(), i + 1);
        }
    }
}
