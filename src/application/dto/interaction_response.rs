//! Interaction callback bodies.

use serde::Serialize;
use serde_json::{Value, json};

use super::MessageOptions;
use crate::domain::entities::MessageFlags;
use crate::infrastructure::discord::rest::FileUpload;

/// Callback type sent to `POST /interactions/{id}/{token}/callback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InteractionCallbackType {
    Pong = 1,
    ChannelMessage = 4,
    DeferredChannelMessage = 5,
    DeferredUpdateMessage = 6,
    UpdateMessage = 7,
    AutocompleteResult = 8,
    Modal = 9,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandChoice {
    pub name: String,
    pub value: Value,
}

impl CommandChoice {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResponse {
    pub kind: InteractionCallbackType,
    pub data: Option<Value>,
    pub files: Vec<FileUpload>,
}

impl InteractionResponse {
    /// Type 4: answers with a message.
    #[must_use]
    pub fn reply(options: MessageOptions) -> Self {
        Self::with_message(InteractionCallbackType::ChannelMessage, options)
    }

    /// Type 5: shows a loading state, edit the original response later.
    #[must_use]
    pub fn defer(ephemeral: bool) -> Self {
        Self {
            kind: InteractionCallbackType::DeferredChannelMessage,
            data: ephemeral.then(|| json!({ "flags": MessageFlags::EPHEMERAL.bits() })),
            files: Vec::new(),
        }
    }

    /// Type 6: acknowledges a component without a visible change.
    #[must_use]
    pub const fn defer_update() -> Self {
        Self {
            kind: InteractionCallbackType::DeferredUpdateMessage,
            data: None,
            files: Vec::new(),
        }
    }

    /// Type 7: edits the message the component is attached to.
    #[must_use]
    pub fn update(options: MessageOptions) -> Self {
        Self::with_message(InteractionCallbackType::UpdateMessage, options)
    }

    /// Type 8: autocomplete suggestions, at most 25.
    #[must_use]
    pub fn choices(mut choices: Vec<CommandChoice>) -> Self {
        choices.truncate(25);
        Self {
            kind: InteractionCallbackType::AutocompleteResult,
            data: Some(json!({ "choices": choices })),
            files: Vec::new(),
        }
    }

    /// Type 9: opens a modal. `components` are action rows of text inputs.
    #[must_use]
    pub fn modal(custom_id: impl Into<String>, title: impl Into<String>, components: Vec<Value>) -> Self {
        Self {
            kind: InteractionCallbackType::Modal,
            data: Some(json!({
                "custom_id": custom_id.into(),
                "title": title.into(),
                "components": components,
            })),
            files: Vec::new(),
        }
    }

    fn with_message(kind: InteractionCallbackType, options: MessageOptions) -> Self {
        let (data, files) = options.into_parts();
        Self {
            kind,
            data: Some(data),
            files,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (Value, Vec<FileUpload>) {
        let mut body = json!({ "type": self.kind as u8 });
        if let Some(data) = self.data {
            body["data"] = data;
        }
        (body, self.files)
    }
}
