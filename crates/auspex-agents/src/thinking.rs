use auspex_models::config::ThinkingConfig;

/// Literal, case-sensitive markers around a reasoning block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingMarkers {
    pub start: String,
    pub end: String,
}

impl ThinkingMarkers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl Default for ThinkingMarkers {
    fn default() -> Self {
        Self::from(&ThinkingConfig::default())
    }
}

impl From<&ThinkingConfig> for ThinkingMarkers {
    fn from(config: &ThinkingConfig) -> Self {
        Self::new(&config.start_marker, &config.end_marker)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkingSplit {
    /// `None` when no valid marker pair was found.
    pub reasoning: Option<String>,
    pub content: String,
}

/// Separate the first reasoning block from the rest of a completion.
///
/// Only the first start/end pair is consumed. If either marker is missing,
/// or the first end marker does not come after the first start marker, the
/// text is returned unchanged with no reasoning.
pub fn split_thinking(text: &str, markers: &ThinkingMarkers) -> ThinkingSplit {
    let unchanged = || ThinkingSplit {
        reasoning: None,
        content: text.to_string(),
    };

    if markers.start.is_empty() || markers.end.is_empty() {
        return unchanged();
    }
    let (Some(start), Some(end)) = (text.find(&markers.start), text.find(&markers.end)) else {
        return unchanged();
    };
    let inner_start = start + markers.start.len();
    if end <= start || end < inner_start {
        return unchanged();
    }

    let reasoning = text[inner_start..end].trim().to_string();
    let prefix = text[..start].trim();
    let suffix = text[end + markers.end.len()..].trim();

    let content = match (prefix.is_empty(), suffix.is_empty()) {
        (true, true) => String::new(),
        (false, true) => prefix.to_string(),
        (true, false) => suffix.to_string(),
        (false, false) => format!("{prefix} {suffix}"),
    };

    ThinkingSplit {
        reasoning: Some(reasoning),
        content,
    }
}
