use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::prompt_history::PromptHistory;

/// One `PromptHistory` per open UI page. Sessions never share history.
#[derive(Debug)]
pub struct SessionStore {
    sessions: BTreeMap<u64, PromptHistory>,
    next_id: u64,
    max_sessions: usize,
}

impl SessionStore {
    pub const DEFAULT_MAX_SESSIONS: usize = 32;

    pub fn new(max_sessions: usize) -> Self {
        let max_sessions = if max_sessions == 0 {
            Self::DEFAULT_MAX_SESSIONS
        } else {
            max_sessions
        };
        Self {
            sessions: BTreeMap::new(),
            next_id: 1,
            max_sessions,
        }
    }

    pub fn open(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.sessions.insert(id, PromptHistory::new());

        // Ids grow monotonically, so the first key is the oldest session.
        while self.sessions.len() > self.max_sessions {
            if let Some((evicted, _)) = self.sessions.pop_first() {
                info!(session = evicted, "evicted oldest session");
            }
        }

        debug!(session = id, open = self.sessions.len(), "opened session");
        id
    }

    pub fn contains(&self, id: u64) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&PromptHistory> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut PromptHistory> {
        self.sessions.get_mut(&id)
    }

    pub fn close(&mut self, id: u64) -> bool {
        self.sessions.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SESSIONS)
    }
}
