use crate::session::Session;

/// Schema description included in every decision system prompt.
fn decision_schema() -> String {
    let example = serde_json::json!({
        "thoughts": {
            "plan": "<what you intend to do over the next few cycles>",
            "analysis": "<what the new messages tell you>",
            "detail": "<numbers and levels behind the call>",
            "reflection": "<what went right or wrong with earlier commands>",
            "speak": "<one sentence summary for the operator>"
        },
        "action": {
            "name": "<command name, e.g. open_long, close_position, hold>",
            "args": {"symbol": "BTCUSDT", "quantity": "0.01"}
        },
        "memory": {
            "content": "<notes worth remembering next cycle>"
        }
    });
    serde_json::to_string_pretty(&example).unwrap_or_default()
}

pub fn decision_system_prompt() -> String {
    format!(
        "You are a trading agent. Each turn you receive the conversation so far and new \
         messages (market snapshots, news, operator chat, results of earlier commands). \
         Decide whether to act.\n\n\
         ## OUTPUT FORMAT\n\n\
         Respond with exactly ONE JSON object and nothing else:\n\n\
         {schema}\n\n\
         ## RULES\n\n\
         - Every section is optional. Omit `action` entirely when you want to wait.\n\
         - When `action` is present, `name` must be non-empty.\n\
         - `args` values are strings.\n\
         - Use double quotes. Do not add comments or trailing commas.\n\
         - Never issue the same command twice for the same intent; earlier commands are \
         tracked and retried for you.\n",
        schema = decision_schema()
    )
}

/// Build the user prompt from the session history and the new messages.
pub fn build_user_prompt(session: &dyn Session, messages: &[String]) -> String {
    let mut prompt = format!("## SESSION {}\n\n### HISTORY\n", session.id());

    let history = session.chats();
    if history.is_empty() {
        prompt.push_str("(none)\n");
    }
    for chat in &history {
        prompt.push_str(chat);
        prompt.push('\n');
    }

    prompt.push_str("\n### NEW MESSAGES\n");
    if messages.is_empty() {
        prompt.push_str("(none)\n");
    }
    for message in messages {
        prompt.push_str(message);
        prompt.push('\n');
    }
    prompt
}
