//! Outbound message content.

use serde_json::{Map, Value, json};

use crate::domain::entities::{MessageFlags, MessageId};
use crate::infrastructure::discord::rest::FileUpload;

/// Content for sending, editing or replying, shared by channel messages and
/// interaction responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageOptions {
    pub content: Option<String>,
    pub embeds: Vec<Value>,
    pub components: Vec<Value>,
    pub allowed_mentions: Option<Value>,
    pub tts: bool,
    pub suppress_embeds: bool,
    pub suppress_notifications: bool,
    /// Only honoured in interaction responses.
    pub ephemeral: bool,
    pub reply_to: Option<MessageId>,
    pub files: Vec<FileUpload>,
}

impl MessageOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Adds one action row.
    #[must_use]
    pub fn component(mut self, row: Value) -> Self {
        self.components.push(row);
        self
    }

    #[must_use]
    pub fn allowed_mentions(mut self, allowed_mentions: Value) -> Self {
        self.allowed_mentions = Some(allowed_mentions);
        self
    }

    #[must_use]
    pub const fn tts(mut self) -> Self {
        self.tts = true;
        self
    }

    #[must_use]
    pub const fn suppress_embeds(mut self) -> Self {
        self.suppress_embeds = true;
        self
    }

    #[must_use]
    pub const fn suppress_notifications(mut self) -> Self {
        self.suppress_notifications = true;
        self
    }

    #[must_use]
    pub const fn ephemeral(mut self) -> Self {
        self.ephemeral = true;
        self
    }

    #[must_use]
    pub const fn reply_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }

    #[must_use]
    pub fn file(mut self, file: FileUpload) -> Self {
        self.files.push(file);
        self
    }

    #[must_use]
    pub fn flags(&self) -> MessageFlags {
        let mut flags = MessageFlags::empty();
        if self.suppress_embeds {
            flags |= MessageFlags::SUPPRESS_EMBEDS;
        }
        if self.suppress_notifications {
            flags |= MessageFlags::SUPPRESS_NOTIFICATIONS;
        }
        if self.ephemeral {
            flags |= MessageFlags::EPHEMERAL;
        }
        flags
    }

    /// Splits into the JSON body and the files to upload with it.
    ///
    /// Only fields that were set are written, so the same body works for
    /// partial edits.
    #[must_use]
    pub fn into_parts(self) -> (Value, Vec<FileUpload>) {
        let flags = self.flags();
        let mut body = Map::new();

        if let Some(content) = self.content {
            body.insert("content".into(), Value::String(content));
        }
        if !self.embeds.is_empty() {
            body.insert("embeds".into(), Value::Array(self.embeds));
        }
        if !self.components.is_empty() {
            body.insert("components".into(), Value::Array(self.components));
        }
        if let Some(allowed_mentions) = self.allowed_mentions {
            body.insert("allowed_mentions".into(), allowed_mentions);
        }
        if self.tts {
            body.insert("tts".into(), Value::Bool(true));
        }
        if !flags.is_empty() {
            body.insert("flags".into(), json!(flags.bits()));
        }
        if let Some(message_id) = self.reply_to {
            body.insert(
                "message_reference".into(),
                json!({ "message_id": message_id }),
            );
        }

        (Value::Object(body), self.files)
    }
}

impl From<&str> for MessageOptions {
    fn from(content: &str) -> Self {
        Self::new().content(content)
    }
}

impl From<String> for MessageOptions {
    fn from(content: String) -> Self {
        Self::new().content(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_content() {
        let (body, files) = MessageOptions::from("hello").into_parts();
        assert_eq!(body, json!({ "content": "hello" }));
        assert!(files.is_empty());
    }

    #[test]
    fn test_flags_are_combined() {
        let (body, _) = MessageOptions::new()
            .content("quiet")
            .suppress_embeds()
            .suppress_notifications()
            .ephemeral()
            .into_parts();

        assert_eq!(body["flags"], json!(4 | 4096 | 64));
    }

    #[test]
    fn test_reply_sets_reference() {
        let (body, _) = MessageOptions::from("pong")
            .reply_to(MessageId(42))
            .into_parts();

        assert_eq!(body["message_reference"], json!({ "message_id": "42" }));
    }

    #[test]
    fn test_files_are_split_off() {
        let (body, files) = MessageOptions::from("see attached")
            .file(FileUpload::new("log.txt", b"line".to_vec()))
            .into_parts();

        assert_eq!(body, json!({ "content": "see attached" }));
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "log.txt");
    }
}
