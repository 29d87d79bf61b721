use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Identity of a log entry. Allocated once per message, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Author {
    User,
    Assistant,
}

impl Author {
    pub fn as_str(self) -> &'static str {
        match self {
            Author::User => "user",
            Author::Assistant => "assistant",
        }
    }

    pub fn is_user(self) -> bool {
        self == Author::User
    }

    pub fn is_assistant(self) -> bool {
        self == Author::Assistant
    }
}

impl AsRef<str> for Author {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Author {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Author::User),
            "assistant" => Ok(Author::Assistant),
            _ => Err(format!("invalid author: {value}")),
        }
    }
}

impl TryFrom<String> for Author {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Author> for String {
    fn from(value: Author) -> Self {
        value.as_str().to_string()
    }
}

/// One conversation turn.
///
/// `content` is mutable only while `streaming` is true; once a message is
/// finalized it never changes again. The log enforces this by routing all
/// content updates through methods that refuse non-streaming entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Local>,
    pub streaming: bool,
}

impl ChatMessage {
    pub fn is_user(&self) -> bool {
        self.author.is_user()
    }

    pub fn is_assistant(&self) -> bool {
        self.author.is_assistant()
    }
}

/// Ordered record of conversation turns.
///
/// Append-only, with one exception: at most one entry at a time is an
/// in-flight assistant placeholder (`streaming = true`), and that entry's
/// content may be replaced until the stream completes or is abandoned.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    fn push(&mut self, author: Author, content: String, streaming: bool) -> MessageId {
        let id = self.allocate_id();
        self.entries.push(ChatMessage {
            id,
            author,
            content,
            created_at: Local::now(),
            streaming,
        });
        id
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Author::User, content.into(), false)
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Author::Assistant, content.into(), false)
    }

    /// Open the assistant placeholder for an incoming stream.
    ///
    /// Callers start a new stream only after the previous one has been
    /// completed or abandoned.
    pub fn begin_assistant_stream(&mut self) -> MessageId {
        debug_assert!(
            self.streaming_message().is_none(),
            "streaming placeholder already present"
        );
        self.push(Author::Assistant, String::new(), true)
    }

    /// Replace the placeholder's content with a full snapshot.
    ///
    /// Stream updates carry the entire answer so far, not a delta, so the
    /// previous content is discarded wholesale. Returns false if `id` does
    /// not name a live streaming entry.
    pub fn replace_streaming_content(&mut self, id: MessageId, content: impl Into<String>) -> bool {
        match self.streaming_entry_mut(id) {
            Some(entry) => {
                entry.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Finalize the placeholder with the authoritative final text.
    pub fn complete_stream(&mut self, id: MessageId, final_content: impl Into<String>) -> bool {
        match self.streaming_entry_mut(id) {
            Some(entry) => {
                entry.content = final_content.into();
                entry.streaming = false;
                true
            }
            None => false,
        }
    }

    /// Close the placeholder without new content, keeping whatever partial
    /// text had arrived. Used when a session ends on an error or timeout.
    pub fn abandon_stream(&mut self, id: MessageId) -> bool {
        match self.streaming_entry_mut(id) {
            Some(entry) => {
                entry.streaming = false;
                true
            }
            None => false,
        }
    }

    fn streaming_entry_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id && entry.streaming)
    }

    pub fn streaming_message(&self) -> Option<&ChatMessage> {
        self.entries.iter().find(|entry| entry.streaming)
    }

    pub fn get(&self, id: MessageId) -> Option<&ChatMessage> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Render-only view of the conversation in arrival order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
