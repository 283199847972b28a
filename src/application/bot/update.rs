use serde::{Deserialize, Serialize};

use super::state::ChatKey;

/// One incoming event from the chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotUpdate {
    pub sender: ChatKey,
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    Text(String),
    Callback(String),
}

impl BotUpdate {
    pub fn text(sender: ChatKey, username: Option<&str>, text: &str) -> Self {
        Self {
            sender,
            chat_id: sender,
            username: username.map(str::to_string),
            first_name: String::new(),
            kind: UpdateKind::Text(text.to_string()),
        }
    }

    pub fn callback(sender: ChatKey, username: Option<&str>, data: &str) -> Self {
        Self {
            sender,
            chat_id: sender,
            username: username.map(str::to_string),
            first_name: String::new(),
            kind: UpdateKind::Callback(data.to_string()),
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReplyButton {
    Callback { label: String, data: String },
    Url { label: String, url: String },
}

/// Message the bot sends back to the chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BotReply {
    pub chat_id: i64,
    pub text: String,
    pub button: Option<ReplyButton>,
}

impl BotReply {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            button: None,
        }
    }

    pub fn with_button(mut self, button: ReplyButton) -> Self {
        self.button = Some(button);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("update carries neither a message nor a callback query")]
    UnsupportedUpdate,
    #[error("update has no sender")]
    MissingSender,
}

// Subset of the Telegram Bot API `Update` object that the registration flow reads.

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
    pub callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    pub from: Option<TelegramUser>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramCallbackQuery {
    pub from: TelegramUser,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

impl TryFrom<TelegramUpdate> for BotUpdate {
    type Error = BotError;

    fn try_from(update: TelegramUpdate) -> Result<Self, Self::Error> {
        if let Some(message) = update.message {
            let from = message.from.ok_or(BotError::MissingSender)?;
            let text = message.text.ok_or(BotError::UnsupportedUpdate)?;
            return Ok(BotUpdate {
                sender: from.id,
                chat_id: message.chat.id,
                username: from.username,
                first_name: from.first_name,
                kind: UpdateKind::Text(text),
            });
        }

        if let Some(query) = update.callback_query {
            let data = query.data.ok_or(BotError::UnsupportedUpdate)?;
            // Callbacks are answered in the private chat, whose id is the user id.
            return Ok(BotUpdate {
                sender: query.from.id,
                chat_id: query.from.id,
                username: query.from.username,
                first_name: query.from.first_name,
                kind: UpdateKind::Callback(data),
            });
        }

        Err(BotError::UnsupportedUpdate)
    }
}

/// Webhook response body asking Telegram to deliver `reply`.
pub fn send_message_body(reply: &BotReply) -> serde_json::Value {
    let mut body = serde_json::json!({
        "method": "sendMessage",
        "chat_id": reply.chat_id,
        "text": reply.text,
    });

    let button = match &reply.button {
        Some(ReplyButton::Callback { label, data }) => {
            Some(serde_json::json!({ "text": label, "callback_data": data }))
        }
        Some(ReplyButton::Url { label, url }) => {
            Some(serde_json::json!({ "text": label, "url": url }))
        }
        None => None,
    };
    if let Some(button) = button {
        body["reply_markup"] = serde_json::json!({ "inline_keyboard": [[button]] });
    }
    body
}
