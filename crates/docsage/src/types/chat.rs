//! Conversation types: sessions, messages, citations

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One conversation thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Creation timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Bumped on every new message; always >= the newest message's created_at
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// One turn in a session. Append-only; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: Uuid,
    /// Parent session ID
    pub session_id: Uuid,
    /// Author role
    pub role: Role,
    /// Content text
    pub content: String,
    /// Citations backing an assistant message; empty for user messages
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Creation timestamp; ordering within a session follows this
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A reference back to the chunk that supports an answer span
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citation {
    /// Source filename
    pub filename: String,
    /// First page of the cited chunk (1-indexed)
    pub page_start: u32,
    /// Last page of the cited chunk (1-indexed)
    pub page_end: u32,
    /// ID of the cited chunk
    pub chunk_id: String,
}

impl Citation {
    /// Format for inline display, e.g. `report.pdf p2-3`
    pub fn format_inline(&self) -> String {
        if self.page_start == self.page_end {
            format!("{} p{}", self.filename, self.page_start)
        } else {
            format!("{} p{}-{}", self.filename, self.page_start, self.page_end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_inline_format() {
        let single = Citation {
            filename: "a.pdf".into(),
            page_start: 2,
            page_end: 2,
            chunk_id: "c-0".into(),
        };
        assert_eq!(single.format_inline(), "a.pdf p2");

        let range = Citation {
            page_end: 4,
            ..single
        };
        assert_eq!(range.format_inline(), "a.pdf p2-4");
    }
}
