use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;
use std::ops::RangeInclusive;
use tracing::debug;

pub const UNDO_LIMIT: usize = 50;
pub const RANDOM_PICK_RANGE: RangeInclusive<usize> = 3..=7;

/// Outcome of a history operation. The no-op variants are not errors; the UI
/// maps them to feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Applied,
    Unchanged,
    NothingToUndo,
    NothingToRedo,
    NothingToClear,
}

impl HistoryStatus {
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

/// Prompt buffer with a linear undo/redo history.
#[derive(Debug, Clone, Default)]
pub struct PromptHistory {
    buffer: String,
    undo_stack: VecDeque<String>,
    redo_stack: Vec<String>,
}

impl PromptHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn append(&mut self, text: &str) -> HistoryStatus {
        if text.is_empty() {
            return HistoryStatus::Unchanged;
        }

        self.checkpoint();
        self.push_text(text);
        debug!(len = self.buffer.len(), "appended keyword");
        HistoryStatus::Applied
    }

    pub fn clear(&mut self) -> HistoryStatus {
        if self.buffer.is_empty() {
            return HistoryStatus::NothingToClear;
        }

        self.checkpoint();
        self.buffer.clear();
        HistoryStatus::Applied
    }

    pub fn undo(&mut self) -> HistoryStatus {
        let Some(previous) = self.undo_stack.pop_back() else {
            return HistoryStatus::NothingToUndo;
        };

        let current = std::mem::replace(&mut self.buffer, previous);
        self.redo_stack.push(current);
        HistoryStatus::Applied
    }

    pub fn redo(&mut self) -> HistoryStatus {
        let Some(next) = self.redo_stack.pop() else {
            return HistoryStatus::NothingToRedo;
        };

        let current = std::mem::replace(&mut self.buffer, next);
        self.push_undo(current);
        HistoryStatus::Applied
    }

    /// Appends a random pick of keywords drawn from every list together.
    ///
    /// The pre-call buffer is recorded for undo even when nothing can be
    /// picked. Returns the keywords in the order they were appended.
    pub fn generate_random<I, L, R>(&mut self, keyword_lists: I, rng: &mut R) -> Vec<String>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[String]>,
        R: Rng + ?Sized,
    {
        self.checkpoint();

        let mut pool: Vec<&str> = Vec::new();
        let lists: Vec<L> = keyword_lists.into_iter().collect();
        for list in &lists {
            pool.extend(list.as_ref().iter().map(String::as_str));
        }

        pool.shuffle(rng);
        let count = rng.random_range(RANDOM_PICK_RANGE).min(pool.len());
        let picked: Vec<String> = pool[..count].iter().map(|k| (*k).to_string()).collect();

        if !picked.is_empty() {
            self.push_text(&picked.join(" "));
        }
        debug!(picked = picked.len(), pool = pool.len(), "generated random keywords");
        picked
    }

    fn checkpoint(&mut self) {
        self.push_undo(self.buffer.clone());
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, snapshot: String) {
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > UNDO_LIMIT {
            self.undo_stack.pop_front();
        }
    }

    fn push_text(&mut self, text: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(text);
    }
}
