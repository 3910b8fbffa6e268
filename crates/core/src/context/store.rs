use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::types::{ConversationId, Tone, Turn, TurnRole};

/// Per-conversation state: bounded turn history plus the signals the
/// classifier derived from the latest user message.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub id: ConversationId,
    history: VecDeque<Turn>,
    pub language: String,
    pub tone: Tone,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl ConversationContext {
    fn new(id: ConversationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            history: VecDeque::new(),
            language: "unknown".into(),
            tone: Tone::Unknown,
            created_at: now,
            last_active_at: now,
        }
    }

    /// Append a turn, evicting the oldest when past `cap`.
    fn append(&mut self, role: TurnRole, text: impl Into<String>, cap: usize, now: DateTime<Utc>) {
        if self.history.len() >= cap {
            self.history.pop_front();
        }
        self.history.push_back(Turn { role, text: text.into(), at: now });
        self.last_active_at = now;
    }

    fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_active_at > timeout
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The trailing `limit` turns in chronological order.
    pub fn recent(&self, limit: usize) -> Vec<&Turn> {
        let skip = self.history.len().saturating_sub(limit);
        self.history.iter().skip(skip).collect()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }
}

/// Store-level counters for the owner stats surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub contexts: usize,
    pub total_turns: usize,
}

/// Owns every ConversationContext. Pure in-memory; contexts expire after
/// the configured idle timeout and are rebuilt on the next message.
#[derive(Debug)]
pub struct ContextStore {
    contexts: HashMap<ConversationId, ConversationContext>,
    max_turns: usize,
    timeout: Duration,
}

impl ContextStore {
    pub fn new(max_turns: usize, timeout_hours: i64) -> Self {
        Self {
            contexts: HashMap::new(),
            max_turns,
            timeout: Duration::hours(timeout_hours),
        }
    }

    /// Return the context for `id`, creating a fresh one if none exists
    /// or the existing one has expired. Never returns an expired context.
    pub fn get_or_create(
        &mut self,
        id: &ConversationId,
        now: DateTime<Utc>,
    ) -> &mut ConversationContext {
        let timeout = self.timeout;
        let entry = self
            .contexts
            .entry(id.clone())
            .or_insert_with(|| ConversationContext::new(id.clone(), now));
        if entry.is_expired(now, timeout) {
            tracing::info!(conversation = %id, "context expired, starting fresh");
            *entry = ConversationContext::new(id.clone(), now);
        }
        entry
    }

    /// Append a turn to the conversation, creating the context if needed.
    pub fn append_turn(
        &mut self,
        id: &ConversationId,
        role: TurnRole,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let cap = self.max_turns;
        self.get_or_create(id, now).append(role, text, cap, now);
    }

    /// Drop every context idle past the timeout. Returns how many were
    /// removed.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let timeout = self.timeout;
        let before = self.contexts.len();
        self.contexts.retain(|_, ctx| !ctx.is_expired(now, timeout));
        let removed = before - self.contexts.len();
        if removed > 0 {
            tracing::info!(removed, "swept expired conversation contexts");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            contexts: self.contexts.len(),
            total_turns: self.contexts.values().map(|c| c.history_len()).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ConversationId {
        ConversationId::new(s)
    }

    #[test]
    fn creates_on_first_lookup() {
        let mut store = ContextStore::new(10, 2);
        let now = Utc::now();
        let ctx = store.get_or_create(&id("a"), now);
        assert_eq!(ctx.history_len(), 0);
        assert_eq!(ctx.tone, Tone::Unknown);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn history_never_exceeds_cap() {
        let mut store = ContextStore::new(5, 2);
        let now = Utc::now();
        for i in 0..50 {
            store.append_turn(&id("a"), TurnRole::User, format!("msg {i}"), now);
        }
        assert_eq!(store.get_or_create(&id("a"), now).history_len(), 5);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut store = ContextStore::new(3, 2);
        let now = Utc::now();
        for text in ["A", "B", "C", "D"] {
            store.append_turn(&id("a"), TurnRole::User, text, now);
        }
        let ctx = store.get_or_create(&id("a"), now);
        let texts: Vec<&str> = ctx.turns().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["B", "C", "D"]);
    }

    #[test]
    fn expired_context_is_replaced() {
        let mut store = ContextStore::new(10, 2);
        let t0 = Utc::now();
        store.append_turn(&id("a"), TurnRole::User, "old message", t0);

        // Three hours later the context is past the 2h timeout
        let t1 = t0 + Duration::hours(3);
        let ctx = store.get_or_create(&id("a"), t1);
        assert_eq!(ctx.history_len(), 0, "expired context must come back fresh");
    }

    #[test]
    fn activity_refreshes_expiry() {
        let mut store = ContextStore::new(10, 2);
        let t0 = Utc::now();
        store.append_turn(&id("a"), TurnRole::User, "first", t0);
        // 90 minutes later: still alive, and activity resets the clock
        let t1 = t0 + Duration::minutes(90);
        store.append_turn(&id("a"), TurnRole::Assistant, "second", t1);
        // 90 more minutes after the refresh: still alive
        let t2 = t1 + Duration::minutes(90);
        assert_eq!(store.get_or_create(&id("a"), t2).history_len(), 2);
    }

    #[test]
    fn sweep_removes_only_expired() {
        let mut store = ContextStore::new(10, 2);
        let t0 = Utc::now();
        store.append_turn(&id("stale"), TurnRole::User, "hi", t0);
        let t1 = t0 + Duration::hours(3);
        store.append_turn(&id("fresh"), TurnRole::User, "hi", t1);

        assert_eq!(store.sweep_expired(t1), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.sweep_expired(t1), 0);
    }

    #[test]
    fn recent_returns_trailing_turns_in_order() {
        let mut store = ContextStore::new(10, 2);
        let now = Utc::now();
        for text in ["one", "two", "three", "four"] {
            store.append_turn(&id("a"), TurnRole::User, text, now);
        }
        let ctx = store.get_or_create(&id("a"), now);
        let texts: Vec<&str> = ctx.recent(2).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["three", "four"]);
    }

    #[test]
    fn stats_counts_contexts_and_turns() {
        let mut store = ContextStore::new(10, 2);
        let now = Utc::now();
        store.append_turn(&id("a"), TurnRole::User, "x", now);
        store.append_turn(&id("b"), TurnRole::User, "y", now);
        store.append_turn(&id("b"), TurnRole::Assistant, "z", now);
        assert_eq!(store.stats(), StoreStats { contexts: 2, total_turns: 3 });
    }
}
