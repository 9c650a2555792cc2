//! Chat bot: greets users, lists the catalog's titles and answers inline
//! queries with the upper-cased text.

pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::{error::AppError, repository::books::BooksRepository};

use self::telegram::{InlineArticle, TelegramClient, Update};

pub const GREETING: &str = "I'm a bot, please talk to me!";
pub const EMPTY_CATALOG: &str = "The catalog has no books yet.";

/// Telegram rejects longer message texts
const MAX_MESSAGE_CHARS: usize = 4096;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Bot API error: {0}")]
    Api(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] AppError),
}

/// Where the bot reads book titles from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TitleSource: Send + Sync {
    async fn titles(&self) -> Result<Vec<String>, AppError>;
}

#[async_trait]
impl TitleSource for BooksRepository {
    async fn titles(&self) -> Result<Vec<String>, AppError> {
        self.list_titles().await
    }
}

/// What the bot does in response to one update
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SendMessage { chat_id: i64, text: String },
    AnswerInline { inline_query_id: String, results: Vec<InlineArticle> },
}

/// Command name of a message such as `/start` or `/get_books@library_bot args`.
/// Commands addressed to another bot are ignored.
pub fn parse_command<'a>(text: &'a str, bot_username: Option<&str>) -> Option<&'a str> {
    let token = text.split_whitespace().next()?.strip_prefix('/')?;
    let (command, target) = match token.split_once('@') {
        Some((command, target)) => (command, Some(target)),
        None => (token, None),
    };
    match (target, bot_username) {
        (Some(target), Some(me)) if !target.eq_ignore_ascii_case(me) => None,
        _ if command.is_empty() => None,
        _ => Some(command),
    }
}

/// Joins titles one per line, split into messages Telegram accepts
pub fn title_messages(titles: &[String]) -> Vec<String> {
    if titles.is_empty() {
        return vec![EMPTY_CATALOG.to_string()];
    }

    let mut messages = Vec::new();
    let mut current = String::new();
    for title in titles {
        let title: String = title.chars().take(MAX_MESSAGE_CHARS).collect();
        let needed = title.chars().count() + usize::from(!current.is_empty());
        if !current.is_empty() && current.chars().count() + needed > MAX_MESSAGE_CHARS {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&title);
    }
    messages.push(current);
    messages
}

pub struct Bot<S> {
    client: TelegramClient,
    titles: S,
    username: Option<String>,
    poll_timeout: Duration,
}

impl<S: TitleSource> Bot<S> {
    pub fn new(client: TelegramClient, titles: S, poll_timeout: Duration) -> Self {
        Self {
            client,
            titles,
            username: None,
            poll_timeout,
        }
    }

    /// Poll for updates until the process is stopped
    pub async fn run(mut self) -> Result<(), BotError> {
        let me = self.client.get_me().await?;
        tracing::info!(bot_id = me.id, username = ?me.username, "Bot connected");
        self.username = me.username;

        let mut offset = 0;
        let mut backoff = Duration::from_secs(1);
        loop {
            let updates = match self.client.get_updates(offset, self.poll_timeout).await {
                Ok(updates) => {
                    backoff = Duration::from_secs(1);
                    updates
                }
                Err(e) => {
                    tracing::warn!("Polling failed, retrying in {:?}: {}", backoff, e);
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                if let Err(e) = self.dispatch(&update).await {
                    tracing::error!(update_id = update.update_id, "Failed to handle update: {}", e);
                }
            }
        }
    }

    async fn dispatch(&self, update: &Update) -> Result<(), BotError> {
        for action in handle_update(update, self.username.as_deref(), &self.titles).await? {
            match action {
                Action::SendMessage { chat_id, text } => self.client.send_message(chat_id, &text).await?,
                Action::AnswerInline {
                    inline_query_id,
                    results,
                } => {
                    self.client
                        .answer_inline_query(&inline_query_id, &results)
                        .await?
                }
            }
        }
        Ok(())
    }
}

/// Decide the replies to one update
pub async fn handle_update<S: TitleSource + ?Sized>(
    update: &Update,
    bot_username: Option<&str>,
    titles: &S,
) -> Result<Vec<Action>, BotError> {
    if let Some(message) = &update.message {
        let Some(command) = message.text.as_deref().and_then(|t| parse_command(t, bot_username)) else {
            return Ok(Vec::new());
        };
        let chat_id = message.chat.id;
        return match command {
            "start" => Ok(vec![Action::SendMessage {
                chat_id,
                text: GREETING.to_string(),
            }]),
            "get_books" => {
                let titles = titles.titles().await?;
                tracing::info!(chat_id, count = titles.len(), "Listing book titles");
                Ok(title_messages(&titles)
                    .into_iter()
                    .map(|text| Action::SendMessage { chat_id, text })
                    .collect())
            }
            _ => Ok(Vec::new()),
        };
    }

    if let Some(query) = &update.inline_query {
        if query.query.is_empty() {
            return Ok(Vec::new());
        }
        return Ok(vec![Action::AnswerInline {
            inline_query_id: query.id.clone(),
            results: vec![InlineArticle::new("caps", "Caps", query.query.to_uppercase())],
        }]);
    }

    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::telegram::{Chat, InlineQuery, Message};

    fn message(text: &str) -> Update {
        Update {
            update_id: 1,
            message: Some(Message {
                message_id: 1,
                chat: Chat { id: 42 },
                text: Some(text.to_string()),
            }),
            inline_query: None,
        }
    }

    fn inline(query: &str) -> Update {
        Update {
            update_id: 2,
            message: None,
            inline_query: Some(InlineQuery {
                id: "q1".into(),
                query: query.into(),
            }),
        }
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/start", None), Some("start"));
        assert_eq!(parse_command("/get_books@library_bot now", Some("Library_Bot")), Some("get_books"));
        assert_eq!(parse_command("/start@other_bot", Some("library_bot")), None);
        assert_eq!(parse_command("hello", None), None);
        assert_eq!(parse_command("/", None), None);
    }

    #[test]
    fn test_title_messages() {
        assert_eq!(title_messages(&[]), vec![EMPTY_CATALOG.to_string()]);
        let titles = vec!["Dune".to_string(), "Emma".to_string()];
        assert_eq!(title_messages(&titles), vec!["Dune\nEmma".to_string()]);

        let long: Vec<String> = (0..3).map(|i| format!("{}{}", i, "x".repeat(2000))).collect();
        let messages = title_messages(&long);
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.chars().count() <= MAX_MESSAGE_CHARS));
    }

    #[tokio::test]
    async fn test_start_greets_without_reading_titles() {
        let mut source = MockTitleSource::new();
        source.expect_titles().never();

        let actions = handle_update(&message("/start"), None, &source).await.unwrap();
        assert_eq!(
            actions,
            vec![Action::SendMessage {
                chat_id: 42,
                text: GREETING.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_get_books_lists_titles() {
        let mut source = MockTitleSource::new();
        source
            .expect_titles()
            .times(1)
            .returning(|| Ok(vec!["Anna Karenina".to_string(), "War and Peace".to_string()]));

        let actions = handle_update(&message("/get_books"), None, &source).await.unwrap();
        assert_eq!(
            actions,
            vec![Action::SendMessage {
                chat_id: 42,
                text: "Anna Karenina\nWar and Peace".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_inline_caps() {
        let source = MockTitleSource::new();

        let actions = handle_update(&inline("read more"), None, &source).await.unwrap();
        match &actions[..] {
            [Action::AnswerInline { inline_query_id, results }] => {
                assert_eq!(inline_query_id, "q1");
                assert_eq!(results[0].title, "Caps");
                assert_eq!(results[0].input_message_content.message_text, "READ MORE");
            }
            other => panic!("unexpected actions: {other:?}"),
        }

        assert!(handle_update(&inline(""), None, &source).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plain_text_is_ignored() {
        let source = MockTitleSource::new();
        assert!(handle_update(&message("hi"), None, &source).await.unwrap().is_empty());
    }
}
