//! Room chat log. In memory only; it lives and dies with the active room.

use std::collections::VecDeque;

use serde::Serialize;

use super::identity::Profile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub user: Profile,
    pub text: String,
    /// Milliseconds since Unix epoch.
    pub ts: i64,
}

/// Append-only log that forgets its oldest entries past `limit`.
#[derive(Debug)]
pub struct ChatLog {
    entries: VecDeque<ChatEntry>,
    limit: usize,
}

impl ChatLog {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { entries: VecDeque::new(), limit }
    }

    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    #[must_use]
    pub fn entries(&self) -> Vec<ChatEntry> {
        self.entries.iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trim and cap a message at `max_chars` characters. `None` if nothing is
/// left to say.
#[must_use]
pub fn sanitize(text: &str, max_chars: usize) -> Option<String> {
    let text: String = text.trim().chars().take(max_chars).collect();
    if text.is_empty() { None } else { Some(text) }
}
