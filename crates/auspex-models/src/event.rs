use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::command::CommandStatus;

/// What every event variant exposes to the decision loop.
pub trait EventPayload {
    fn id(&self) -> &str;
    fn event_type(&self) -> &'static str;
    fn data(&self) -> serde_json::Value;
    /// Lines handed to the model as new messages.
    fn to_prompts(&self) -> Vec<String>;
}

/// An input to the decision loop produced by some external source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Market(MarketSnapshot),
    News(NewsItem),
    Chat(ChatMessage),
    CommandResult(CommandOutcome),
}

impl Event {
    fn payload(&self) -> &dyn EventPayload {
        match self {
            Event::Market(e) => e,
            Event::News(e) => e,
            Event::Chat(e) => e,
            Event::CommandResult(e) => e,
        }
    }
}

impl EventPayload for Event {
    fn id(&self) -> &str {
        self.payload().id()
    }

    fn event_type(&self) -> &'static str {
        self.payload().event_type()
    }

    fn data(&self) -> serde_json::Value {
        self.payload().data()
    }

    fn to_prompts(&self) -> Vec<String> {
        self.payload().to_prompts()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub id: String,
    pub symbol: String,
    pub price: Decimal,
    #[serde(default)]
    pub change_24h_pct: Option<Decimal>,
    #[serde(default)]
    pub funding_rate: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
}

impl EventPayload for MarketSnapshot {
    fn id(&self) -> &str {
        &self.id
    }

    fn event_type(&self) -> &'static str {
        "market"
    }

    fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn to_prompts(&self) -> Vec<String> {
        let mut line = format!(
            "[market {}] {} price={}",
            self.observed_at.to_rfc3339(),
            self.symbol,
            self.price
        );
        if let Some(change) = self.change_24h_pct {
            line.push_str(&format!(" change_24h={change}%"));
        }
        if let Some(funding) = self.funding_rate {
            line.push_str(&format!(" funding={funding}"));
        }
        vec![line]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsItem {
    pub id: String,
    pub source: String,
    pub headline: String,
    #[serde(default)]
    pub body: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl EventPayload for NewsItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn event_type(&self) -> &'static str {
        "news"
    }

    fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn to_prompts(&self) -> Vec<String> {
        let mut prompts = vec![format!("[news {}] {}", self.source, self.headline)];
        if let Some(body) = self.body.as_deref().filter(|b| !b.trim().is_empty()) {
            prompts.push(body.trim().to_string());
        }
        prompts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub text: String,
}

impl EventPayload for ChatMessage {
    fn id(&self) -> &str {
        &self.id
    }

    fn event_type(&self) -> &'static str {
        "chat"
    }

    fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn to_prompts(&self) -> Vec<String> {
        vec![format!("{}: {}", self.author, self.text)]
    }
}

/// Feedback about a previously issued command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandOutcome {
    pub id: String,
    pub command_id: String,
    pub command_name: String,
    pub status: CommandStatus,
    #[serde(default)]
    pub error: Option<String>,
}

impl EventPayload for CommandOutcome {
    fn id(&self) -> &str {
        &self.id
    }

    fn event_type(&self) -> &'static str {
        "command_result"
    }

    fn data(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn to_prompts(&self) -> Vec<String> {
        let status = match self.status {
            CommandStatus::Pending => "pending",
            CommandStatus::Completed => "completed",
            CommandStatus::Failed => "failed",
        };
        let mut line = format!(
            "[command {}] {} is {status}",
            self.command_id, self.command_name
        );
        if let Some(error) = &self.error {
            line.push_str(&format!(": {error}"));
        }
        vec![line]
    }
}
