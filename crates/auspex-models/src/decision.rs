use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// The structured result of one model completion.
///
/// Every section is optional and independent: a completion carrying only an
/// action, or only thoughts, is a valid decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<Thoughts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default, alias = "memory_update", skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryUpdate>,
}

impl Decision {
    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), &'static str> {
        if let Some(action) = &self.action {
            if action.name.trim().is_empty() {
                return Err("action name must not be empty");
            }
        }
        Ok(())
    }

    /// The spoken summary, if the model produced one.
    pub fn spoken(&self) -> Option<String> {
        self.thoughts
            .as_ref()
            .and_then(|t| t.speak.as_ref())
            .map(ThoughtValue::canonical)
    }
}

/// Free-form reasoning fields. Models fill in whichever they like.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Thoughts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ThoughtValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ThoughtValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<ThoughtValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<ThoughtValue>,
    /// Short summary meant to be shown or spoken to the operator.
    #[serde(default, alias = "spoken_summary", skip_serializing_if = "Option::is_none")]
    pub speak: Option<ThoughtValue>,
}

impl Thoughts {
    /// Canonicalized `(field, text)` pairs for the fields that are present.
    pub fn canonical_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("plan", &self.plan),
            ("analysis", &self.analysis),
            ("detail", &self.detail),
            ("reflection", &self.reflection),
            ("speak", &self.speak),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| (field, v.canonical())))
        .collect()
    }
}

/// A thought field is either plain text or an arbitrary JSON structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThoughtValue {
    Text(String),
    Structured(serde_json::Value),
}

impl ThoughtValue {
    /// Single string form used for persistence, prompting and matching.
    ///
    /// Text is returned verbatim. Structured values render as compact JSON;
    /// object keys come out sorted so equal structures canonicalize equally.
    pub fn canonical(&self) -> String {
        match self {
            ThoughtValue::Text(text) => text.clone(),
            ThoughtValue::Structured(value) => value.to_string(),
        }
    }
}

impl From<&str> for ThoughtValue {
    fn from(text: &str) -> Self {
        ThoughtValue::Text(text.to_string())
    }
}

/// A command the model wants executed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_args")]
    pub args: BTreeMap<String, String>,
}

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Parse an argument as a decimal. `Ok(None)` if the argument is absent.
    pub fn decimal_arg(&self, key: &str) -> Result<Option<Decimal>, rust_decimal::Error> {
        self.args
            .get(key)
            .map(|raw| Decimal::from_str(raw.trim()))
            .transpose()
    }
}

/// Accepts a string map, canonicalizing scalar numbers and booleans to
/// strings. Nested objects or arrays are rejected rather than flattened.
fn deserialize_args<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, serde_json::Value>> = Option::deserialize(deserializer)?;
    let mut args = BTreeMap::new();
    for (key, value) in raw.unwrap_or_default() {
        let text = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => {
                return Err(D::Error::custom(format!(
                    "argument `{key}` must be a scalar, got {other}"
                )))
            }
        };
        args.insert(key, text);
    }
    Ok(args)
}

/// Replacement content for the model's long-term notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryUpdate {
    #[serde(default)]
    pub content: String,
}
