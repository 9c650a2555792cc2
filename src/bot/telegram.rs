//! Minimal client for the Telegram Bot HTTP API

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::BotError;

/// One incoming update. Only the kinds the bot reacts to are decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub inline_query: Option<InlineQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineQuery {
    pub id: String,
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub username: Option<String>,
}

/// Article offered as an inline query answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineArticle {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub title: String,
    pub input_message_content: InputTextMessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputTextMessageContent {
    pub message_text: String,
}

impl InlineArticle {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: "article",
            id: id.into(),
            title: title.into(),
            input_message_content: InputTextMessageContent {
                message_text: text.into(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            // long polls must outlive the server-side wait
            .timeout(poll_timeout + Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T, BotError> {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(BotError::Api(format!(
                "{} failed: {}",
                method,
                response.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }

    pub async fn get_me(&self) -> Result<BotUser, BotError> {
        self.call("getMe", serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, BotError> {
        self.call(
            "getUpdates",
            serde_json::json!({
                "offset": offset,
                "timeout": timeout.as_secs(),
                "allowed_updates": ["message", "inline_query"],
            }),
        )
        .await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), BotError> {
        let _: Message = self
            .call("sendMessage", serde_json::json!({ "chat_id": chat_id, "text": text }))
            .await?;
        Ok(())
    }

    pub async fn answer_inline_query(
        &self,
        inline_query_id: &str,
        results: &[InlineArticle],
    ) -> Result<(), BotError> {
        let _: bool = self
            .call(
                "answerInlineQuery",
                serde_json::json!({ "inline_query_id": inline_query_id, "results": results }),
            )
            .await?;
        Ok(())
    }
}
