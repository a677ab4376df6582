use std::collections::VecDeque;

/// A conversation the agents read from and the engine appends to.
pub trait Session: Send + Sync {
    fn id(&self) -> &str;
    fn chats(&self) -> Vec<String>;
    fn add_chat(&mut self, text: String);
}

/// In-memory session. Optionally keeps only the most recent `max_chats`.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    chats: VecDeque<String>,
    max_chats: Option<usize>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            chats: VecDeque::new(),
            max_chats: None,
        }
    }

    pub fn with_max_chats(mut self, max_chats: usize) -> Self {
        self.max_chats = Some(max_chats);
        self.enforce_cap();
        self
    }

    fn enforce_cap(&mut self) {
        if let Some(max) = self.max_chats {
            while self.chats.len() > max {
                self.chats.pop_front();
            }
        }
    }
}

impl Session for ChatSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn chats(&self) -> Vec<String> {
        self.chats.iter().cloned().collect()
    }

    fn add_chat(&mut self, text: String) {
        self.chats.push_back(text);
        self.enforce_cap();
    }
}
