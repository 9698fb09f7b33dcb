use std::sync::Arc;

use tracing::{debug, warn};
use webpulse_models::{ChatReply, IndexOutcome, PriceOutcome, SearchOutcome, Tool};

use crate::error::RouteError;
use crate::services::BridgeServices;

/// Results listed in a web search answer.
const MAX_SEARCH_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Price,
    WebSearch,
    Headlines,
    Index,
    Note,
    FreeText,
}

#[derive(Debug, Clone, Copy)]
enum Pattern {
    Prefix(&'static str),
    Exact(&'static str),
}

/// Checked in order, case-insensitively, against the trimmed command. The
/// first match wins; anything unmatched is free text.
const COMMANDS: &[(Pattern, CommandKind)] = &[
    (Pattern::Prefix("prix "), CommandKind::Price),
    (Pattern::Prefix("price "), CommandKind::Price),
    (Pattern::Prefix("web:"), CommandKind::WebSearch),
    (Pattern::Prefix("search:"), CommandKind::WebSearch),
    (Pattern::Exact("actu crypto"), CommandKind::Headlines),
    (Pattern::Exact("news"), CommandKind::Headlines),
    (Pattern::Exact("sentiment"), CommandKind::Index),
    (Pattern::Prefix("memo:"), CommandKind::Note),
    (Pattern::Prefix("note:"), CommandKind::Note),
];

/// Classify a command and return its argument (trimmed, original case).
pub fn parse_command(command: &str) -> (CommandKind, &str) {
    let command = command.trim();
    for (pattern, kind) in COMMANDS {
        match *pattern {
            Pattern::Prefix(prefix) => {
                let matches = command
                    .get(..prefix.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(prefix));
                if matches {
                    return (*kind, command[prefix.len()..].trim());
                }
            }
            Pattern::Exact(word) => {
                if command.eq_ignore_ascii_case(word) {
                    return (*kind, "");
                }
            }
        }
    }
    (CommandKind::FreeText, command)
}

/// Dispatches one free-text command to the matching service.
pub struct CommandRouter {
    services: Arc<BridgeServices>,
}

impl CommandRouter {
    pub fn new(services: Arc<BridgeServices>) -> Self {
        Self { services }
    }

    /// Rejects before looking at the command when the caller is not
    /// authorized. Otherwise always produces a reply.
    pub async fn route(&self, command: &str, authorized: bool) -> Result<ChatReply, RouteError> {
        if !authorized {
            return Err(RouteError::Unauthorized);
        }

        let (kind, arg) = parse_command(command);
        debug!(?kind, "Routing command");

        let reply = match kind {
            CommandKind::Price => self.price(arg).await,
            CommandKind::WebSearch => self.web_search(arg).await,
            CommandKind::Headlines => self.headlines().await,
            CommandKind::Index => self.index().await,
            CommandKind::Note => self.note(arg).await,
            CommandKind::FreeText => ChatReply::plain(self.services.complete(arg).await),
        };
        Ok(reply)
    }

    async fn price(&self, symbol: &str) -> ChatReply {
        let answer = match self.services.resolver.resolve(symbol).await {
            PriceOutcome::Quote(q) => {
                format!("{}: {:.4} (src: {})", q.symbol(), q.price(), q.source())
            }
            PriceOutcome::Error(e) => format!("Price unavailable ({})", e.error),
        };
        ChatReply::new(answer, vec![Tool::Price])
    }

    async fn web_search(&self, query: &str) -> ChatReply {
        match self.services.web_search(query).await {
            SearchOutcome::Results { results, .. } => {
                let mut answer = String::from("Top results:");
                for hit in results.iter().take(MAX_SEARCH_LINES) {
                    answer.push_str(&format!("\n- {} ({})", hit.title, hit.url));
                }
                ChatReply::new(answer, vec![Tool::WebSearch])
            }
            SearchOutcome::Error { error } => {
                ChatReply::plain(format!("Web search disabled ({error})."))
            }
        }
    }

    async fn headlines(&self) -> ChatReply {
        let aggregator = &self.services.aggregator;
        let lines = aggregator.headlines(aggregator.clamp_limit(None)).await;
        let answer = format!("Latest news:\n{}", lines.join("\n"));
        ChatReply::new(answer, vec![Tool::RssCrypto])
    }

    async fn index(&self) -> ChatReply {
        match self.services.sentiment_index().await {
            IndexOutcome::Reading(reading) => ChatReply::new(
                format!(
                    "Fear&Greed: {} ({})",
                    reading.value.as_deref().unwrap_or("?"),
                    reading.classification.as_deref().unwrap_or("?")
                ),
                vec![Tool::FearGreed],
            ),
            IndexOutcome::Error { error } => {
                ChatReply::plain(format!("Sentiment unavailable ({error})."))
            }
        }
    }

    async fn note(&self, text: &str) -> ChatReply {
        if self.services.notes.is_none() {
            return ChatReply::plain("Could not save note (note log disabled).");
        }
        if text.is_empty() {
            return ChatReply::plain("Could not save note (empty note).");
        }
        let text = text.to_string();
        match self.services.with_notes(move |notes| notes.append(&text)).await {
            Some(Ok(record)) => {
                ChatReply::new(format!("Note saved: {}", record.path), vec![Tool::NoteLog])
            }
            Some(Err(e)) => {
                warn!(error = %e, "Note append failed");
                ChatReply::plain(format!("Could not save note ({e})."))
            }
            None => ChatReply::plain("Could not save note (note log disabled)."),
        }
    }
}
