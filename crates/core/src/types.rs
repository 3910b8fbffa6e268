use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of chat a message arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatKind {
    Private,
    Group,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "private" => Self::Private,
            _ => Self::Group,
        }
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Coarse emotional register of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tone {
    Neutral,
    Casual,
    Excited,
    Sad,
    Formal,
    Flirty,
    Unknown,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Casual => "casual",
            Self::Excited => "excited",
            Self::Sad => "sad",
            Self::Formal => "formal",
            Self::Flirty => "flirty",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "neutral" => Self::Neutral,
            "casual" => Self::Casual,
            "excited" => Self::Excited,
            "sad" => Self::Sad,
            "formal" => Self::Formal,
            "flirty" => Self::Flirty,
            _ => Self::Unknown,
        }
    }
}

/// Opaque conversation key: one chat + sender identity pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Key a chat + sender identity pair.
    pub fn pair(chat_id: &str, sender_id: &str) -> Self {
        Self(format!("{chat_id}:{sender_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Classifier output for a single message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// ISO-639 code, or "unknown".
    pub language: String,
    pub tone: Tone,
}

/// Inbound chat event delivered by the transport collaborator.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub conversation: ConversationId,
    /// Display name of the sender, when the transport provides one.
    pub sender: Option<String>,
    pub text: String,
    pub chat: ChatKind,
    pub at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn private(
        conversation: ConversationId,
        sender: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self { conversation, sender, text: text.into(), chat: ChatKind::Private, at: Utc::now() }
    }

    pub fn group(
        conversation: ConversationId,
        sender: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self { conversation, sender, text: text.into(), chat: ChatKind::Group, at: Utc::now() }
    }
}

/// Outbound reply addressed back to the originating conversation.
#[derive(Debug, Clone)]
pub struct OutgoingReply {
    pub conversation: ConversationId,
    pub text: String,
}

impl OutgoingReply {
    pub fn new(conversation: ConversationId, text: impl Into<String>) -> Self {
        Self { conversation, text: text.into() }
    }
}
