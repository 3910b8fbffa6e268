use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::{ChatKind, ConversationId};

/// Which recipients a broadcast targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFilter {
    All,
    UsersOnly,
    GroupsOnly,
}

impl TargetFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::UsersOnly => "users",
            Self::GroupsOnly => "groups",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "users" => Some(Self::UsersOnly),
            "groups" => Some(Self::GroupsOnly),
            _ => None,
        }
    }

    pub fn matches(&self, kind: ChatKind) -> bool {
        match self {
            Self::All => true,
            Self::UsersOnly => kind == ChatKind::Private,
            Self::GroupsOnly => kind == ChatKind::Group,
        }
    }
}

/// A resolved broadcast recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: ConversationId,
    pub kind: ChatKind,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("recipient registry unavailable: {0}")]
    Unavailable(String),
}

/// The recipient-registry collaborator: knows every chat the bot has
/// seen, hands out broadcast target snapshots and drops recipients that
/// turned permanently unreachable.
#[async_trait]
pub trait RecipientRegistry: Send + Sync {
    async fn list(&self, filter: TargetFilter) -> Result<Vec<Recipient>, RegistryError>;

    /// Forget a recipient (blocked the bot, chat deleted, ...).
    async fn remove(&self, id: &ConversationId);

    /// Note that a conversation was active just now.
    async fn record_activity(&self, id: &ConversationId, kind: ChatKind);
}

/// In-memory registry, populated from message activity. Serves the REPL
/// front-end and the tests.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    chats: Mutex<HashMap<ConversationId, ChatKind>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chats.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecipientRegistry for InMemoryRegistry {
    async fn list(&self, filter: TargetFilter) -> Result<Vec<Recipient>, RegistryError> {
        let chats = self.chats.lock().unwrap();
        let mut recipients: Vec<Recipient> = chats
            .iter()
            .filter(|(_, kind)| filter.matches(**kind))
            .map(|(id, kind)| Recipient { id: id.clone(), kind: *kind })
            .collect();
        // Stable order keeps fan-out batches reproducible
        recipients.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(recipients)
    }

    async fn remove(&self, id: &ConversationId) {
        self.chats.lock().unwrap().remove(id);
    }

    async fn record_activity(&self, id: &ConversationId, kind: ChatKind) {
        self.chats.lock().unwrap().insert(id.clone(), kind);
    }
}
