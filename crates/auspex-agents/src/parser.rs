use auspex_models::decision::Decision;

use crate::error::AgentError;

/// Parse a Decision from model output that may contain surrounding prose
/// or common JSON malformations.
///
/// Handles:
/// - Clean JSON: `{"action": {"name": "hold"}}`
/// - Markdown-wrapped: ```json\n{...}\n```
/// - Prefix/suffix text: `Here is my decision:\n{...}\nGood luck.`
/// - Single-quoted keys and strings, trailing commas, raw line breaks
///   inside strings, and `\_` escapes
///
/// Returns `NoObject` when the text holds no balanced object at all and
/// `InvalidObject` when one was found but does not decode to a valid
/// Decision.
pub fn parse_decision(text: &str) -> Result<Decision, AgentError> {
    let span = locate_object(text).ok_or(AgentError::NoObject(text.len()))?;
    let json = normalize(span);

    let decision: Decision = serde_json::from_str(&json)
        .map_err(|e| AgentError::InvalidObject(format!("{e}\nJSON: {json}")))?;
    decision
        .validate()
        .map_err(|e| AgentError::InvalidObject(e.to_string()))?;
    Ok(decision)
}

/// Extract and normalize the first JSON object, for callers that decode
/// into their own types.
pub fn extract_json(text: &str) -> Result<String, AgentError> {
    let span = locate_object(text).ok_or(AgentError::NoObject(text.len()))?;
    let json = normalize(span);
    match serde_json::from_str::<serde_json::Value>(&json) {
        Ok(serde_json::Value::Object(_)) => Ok(json),
        Ok(other) => Err(AgentError::InvalidObject(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(AgentError::InvalidObject(e.to_string())),
    }
}

/// Find the first `{` and its balanced `}`.
///
/// Braces inside double- or single-quoted literals are ignored.
pub fn locate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let body = &text[start..];
    let chars: Vec<(usize, char)> = body.char_indices().collect();

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let (offset, ch) = chars[i];
        match quote {
            Some(q) => {
                if ch == '\\' {
                    i += 2;
                    continue;
                }
                if ch == q
                    && (q == '"' || closes_single_quote(chars[i + 1..].iter().map(|c| c.1)))
                {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&body[..=offset]);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    None
}

/// Rewrite a located object into strict JSON.
///
/// Strips code fences, converts single-quoted literals to double-quoted
/// ones, drops backslashes before underscores, escapes raw control
/// characters inside literals and removes trailing commas.
pub fn normalize(span: &str) -> String {
    let chars: Vec<char> = span.chars().collect();
    let mut out = String::with_capacity(span.len());
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Some(q) => match ch {
                '\\' => {
                    match chars.get(i + 1) {
                        Some('_') => out.push('_'),
                        Some('\'') => out.push('\''),
                        Some(&next) => {
                            out.push('\\');
                            out.push(next);
                        }
                        None => out.push_str("\\\\"),
                    }
                    i += 2;
                    continue;
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
                '"' if q == '\'' => out.push_str("\\\""),
                c if c == q => {
                    if q == '"' || closes_single_quote(chars[i + 1..].iter().copied()) {
                        out.push('"');
                        quote = None;
                    } else {
                        out.push('\'');
                    }
                }
                c => out.push(c),
            },
            None => match ch {
                '"' | '\'' => {
                    out.push('"');
                    quote = Some(ch);
                }
                '`' if chars[i..].starts_with(&['`', '`', '`']) => {
                    i += 3;
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '-') {
                        i += 1;
                    }
                    continue;
                }
                ',' if matches!(
                    next_significant(chars[i + 1..].iter().copied()),
                    Some('}' | ']')
                ) => {}
                '\\' if chars.get(i + 1) == Some(&'_') => {}
                c => out.push(c),
            },
        }
        i += 1;
    }

    out
}

fn next_significant(mut rest: impl Iterator<Item = char>) -> Option<char> {
    rest.find(|c| !c.is_whitespace())
}

/// A `'` only ends a single-quoted literal when structure follows it, so
/// apostrophes inside text (`'don't'`) survive.
fn closes_single_quote(rest: impl Iterator<Item = char>) -> bool {
    match next_significant(rest) {
        None => true,
        Some(c) => matches!(c, ':' | ',' | '}' | ']'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action_name(text: &str) -> String {
        parse_decision(text).unwrap().action.unwrap().name
    }

    #[test]
    fn canonical_decision() {
        let input = r#"{"thoughts": {"plan": "hold"}, "action": {"name": "open_long", "args": {"symbol": "BTCUSDT", "quantity": "0.1"}}}"#;
        let decision = parse_decision(input).unwrap();
        let action = decision.action.unwrap();
        assert_eq!(action.name, "open_long");
        assert_eq!(action.args.len(), 2);
        assert_eq!(action.args["quantity"], "0.1");
    }

    #[test]
    fn surrounding_prose() {
        let input = "Based on the chart, here is my decision:\n{\"action\": {\"name\": \"close_position\"}}\nLet me know.";
        assert_eq!(action_name(input), "close_position");
    }

    #[test]
    fn markdown_fence() {
        let input = "```json\n{\"action\": {\"name\": \"hold\"}}\n```";
        assert_eq!(action_name(input), "hold");
    }

    #[test]
    fn fence_inside_span_is_stripped() {
        let span = "{```json\n\"action\": {\"name\": \"hold\"}```}";
        assert_eq!(action_name(span), "hold");
    }

    #[test]
    fn single_quoted_keys_and_values() {
        let input = "{'action': {'name': 'open_short', 'args': {'reason': 'he said \"sell\"'}}}";
        let action = parse_decision(input).unwrap().action.unwrap();
        assert_eq!(action.name, "open_short");
        assert_eq!(action.args["reason"], "he said \"sell\"");
    }

    #[test]
    fn apostrophe_inside_single_quoted_value() {
        let input = "{'thoughts': {'plan': 'don't chase, it's extended'}, 'action': {'name': 'hold'}}";
        let decision = parse_decision(input).unwrap();
        assert_eq!(decision.action.unwrap().name, "hold");
        assert_eq!(
            decision.thoughts.unwrap().plan.unwrap().canonical(),
            "don't chase, it's extended"
        );
    }

    #[test]
    fn trailing_commas() {
        let input = r#"{"action": {"name": "open_long", "args": {"symbol": "ETHUSDT",},}, "thoughts": {"detail": [1, 2, ], },}"#;
        assert_eq!(action_name(input), "open_long");
    }

    #[test]
    fn raw_newlines_inside_strings() {
        let input = "{\"thoughts\": {\"analysis\": \"line one\nline two\r\nline three\"}, \"action\": {\"name\": \"hold\"}}";
        let decision = parse_decision(input).unwrap();
        assert_eq!(decision.action.unwrap().name, "hold");
        let analysis = decision.thoughts.unwrap().analysis.unwrap().canonical();
        assert!(analysis.contains("line one"));
        assert!(analysis.contains("line two"));
        assert!(analysis.contains("line three"));
    }

    #[test]
    fn escaped_underscores() {
        let input = r#"{"action": {"name": "close\_all\_positions", "args": {"order\_type": "market"}}}"#;
        let action = parse_decision(input).unwrap().action.unwrap();
        assert_eq!(action.name, "close_all_positions");
        assert_eq!(action.args["order_type"], "market");
    }

    #[test]
    fn every_malformation_at_once() {
        let input = "Sure! Here you go:\n```json\n{\n  'thoughts': {'plan': 'scale in\nslowly',},\n  'action': {'name': 'open\\_long', 'args': {'symbol': 'SOLUSDT',},},\n}\n```\nThanks";
        let decision = parse_decision(input).unwrap();
        assert_eq!(decision.action.unwrap().name, "open_long");
        let plan = decision.thoughts.unwrap().plan.unwrap().canonical();
        assert!(plan.contains("scale in"));
        assert!(plan.contains("slowly"));
    }

    #[test]
    fn braces_inside_strings() {
        let input = r#"{"thoughts": {"plan": "range {low} to {high}"}, "action": {"name": "hold"}} trailing }"#;
        let decision = parse_decision(input).unwrap();
        assert_eq!(
            decision.thoughts.unwrap().plan.unwrap().canonical(),
            "range {low} to {high}"
        );
    }

    #[test]
    fn first_object_wins() {
        let input = r#"{"action": {"name": "first"}} and then {"action": {"name": "second"}}"#;
        assert_eq!(action_name(input), "first");
    }

    #[test]
    fn thoughts_only() {
        let decision = parse_decision(r#"{"thoughts": {"reflection": "no edge today"}}"#).unwrap();
        assert!(decision.action.is_none());
        assert!(decision.thoughts.is_some());
    }

    #[test]
    fn no_object_at_all() {
        let err = parse_decision("I would rather not trade today.").unwrap_err();
        assert!(matches!(err, AgentError::NoObject(_)));
        assert!(err.is_malformed_output());
    }

    #[test]
    fn unbalanced_object_is_not_located() {
        let err = parse_decision("{\"action\": {\"name\": \"hold\"}").unwrap_err();
        assert!(matches!(err, AgentError::NoObject(_)));
    }

    #[test]
    fn located_but_invalid() {
        let err = parse_decision("{\"action\": {\"name\": hold}}").unwrap_err();
        assert!(matches!(err, AgentError::InvalidObject(_)));
    }

    #[test]
    fn empty_action_name_is_invalid() {
        let err = parse_decision(r#"{"action": {"name": ""}}"#).unwrap_err();
        assert!(matches!(err, AgentError::InvalidObject(_)));
    }

    #[test]
    fn wrong_section_type_is_invalid() {
        let err = parse_decision(r#"{"action": "buy everything"}"#).unwrap_err();
        assert!(matches!(err, AgentError::InvalidObject(_)));
    }

    #[test]
    fn extract_json_normalizes() {
        let json = extract_json("noise {'a': 'b',} noise").unwrap();
        assert_eq!(json, r#"{"a": "b"}"#);
    }

    #[test]
    fn locate_handles_multibyte_text() {
        let input = "décision → {\"thoughts\": {\"speak\": \"très bien 👍\"}}";
        let span = locate_object(input).unwrap();
        assert!(span.starts_with('{') && span.ends_with('}'));
        let decision = parse_decision(input).unwrap();
        assert_eq!(decision.spoken().as_deref(), Some("très bien 👍"));
    }
}
