use crate::error::ChatError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub const PHOTO_PREVIEW: &str = "📷 Photo";
pub const VOICE_PREVIEW: &str = "🎤 Voice message";
const JUST_NOW: &str = "now";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Me,
    Them,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    Text { text: String },
    Image { url: String },
    Voice { audio_url: String, duration_secs: f64 },
}

impl MessageBody {
    pub fn preview(&self) -> &str {
        match self {
            MessageBody::Text { text } => text,
            MessageBody::Image { .. } => PHOTO_PREVIEW,
            MessageBody::Voice { .. } => VOICE_PREVIEW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    #[serde(flatten)]
    pub body: MessageBody,
    pub sender: Sender,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: u64,
    pub user: String,
    pub avatar_url: String,
    pub last_message: String,
    pub time: String,
    pub unread: u32,
    pub online: bool,
    pub messages: Vec<ChatMessage>,
}

/// In-memory chat list with a single selected chat. Nothing is persisted.
#[derive(Debug, Default)]
pub struct ChatStore {
    chats: Vec<Chat>,
    selected: Option<u64>,
}

impl ChatStore {
    pub fn new(chats: Vec<Chat>) -> Self {
        Self {
            chats,
            selected: None,
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let chats = serde_json::from_str(json).context("Failed to parse chats")?;
        Ok(Self::new(chats))
    }

    pub fn chats(&self) -> &[Chat] {
        &self.chats
    }

    pub fn selected(&self) -> Option<&Chat> {
        let id = self.selected?;
        self.chats.iter().find(|chat| chat.id == id)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn select(&mut self, chat_id: u64) -> Result<&Chat, ChatError> {
        let chat = self
            .chats
            .iter_mut()
            .find(|chat| chat.id == chat_id)
            .ok_or(ChatError::UnknownChat(chat_id))?;
        chat.unread = 0;
        self.selected = Some(chat_id);
        Ok(chat)
    }

    /// Appends a message sent by the local user to the selected chat.
    #[instrument(level = "debug", skip(self, body))]
    pub fn add_message(&mut self, body: MessageBody, time: &str) -> Result<&ChatMessage, ChatError> {
        let id = self.selected.ok_or(ChatError::NoChatSelected)?;
        let chat = self
            .chats
            .iter_mut()
            .find(|chat| chat.id == id)
            .ok_or(ChatError::UnknownChat(id))?;

        let message_id = chat.messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        chat.last_message = body.preview().to_string();
        chat.time = JUST_NOW.to_string();
        chat.messages.push(ChatMessage {
            id: message_id,
            body,
            sender: Sender::Me,
            time: time.to_string(),
        });
        Ok(&chat.messages[chat.messages.len() - 1])
    }
}
