//! Request body encoding: JSON, multipart uploads and the audit-log reason.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::{Map, Value};

use super::error::{RestError, RestResult};

/// Body key lifted into the `X-Audit-Log-Reason` header.
pub const REASON_KEY: &str = "reason";

/// A file sent as one `files[n]` multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub data: Bytes,
    pub content_type: Option<String>,
    pub description: Option<String>,
}

impl FileUpload {
    #[must_use]
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
            content_type: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Alt text shown for the attachment.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn metadata(&self, index: usize) -> Value {
        let mut meta = Map::new();
        meta.insert("id".to_string(), Value::from(index));
        meta.insert("filename".to_string(), Value::from(self.filename.clone()));
        if let Some(description) = &self.description {
            meta.insert("description".to_string(), Value::from(description.clone()));
        }
        Value::Object(meta)
    }
}

/// Encoded request payload, before it is attached to a reqwest builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Multipart {
        /// Sent as the `payload_json` part.
        payload_json: Value,
        files: Vec<FileUpload>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBody {
    /// Raw reason text, not yet percent-encoded.
    pub reason: Option<String>,
    pub payload: Payload,
}

impl EncodedBody {
    /// Splits the audit-log reason out of `body` and picks JSON or multipart.
    ///
    /// With files, each upload's `{id, filename}` is prepended to the
    /// payload's `attachments` list, or to `data.attachments` for interaction
    /// callbacks, which wrap the message in `data`.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Encode`] if files are given with a non-object body.
    pub fn encode(body: Option<Value>, files: Vec<FileUpload>) -> RestResult<Self> {
        let mut body = body;
        let reason = match body.as_mut().and_then(Value::as_object_mut) {
            Some(object) => match object.remove(REASON_KEY) {
                Some(Value::String(reason)) => Some(reason),
                Some(Value::Null) | None => None,
                Some(other) => {
                    return Err(RestError::encode(format!(
                        "audit log reason must be a string, got {other}"
                    )));
                }
            },
            None => None,
        };

        // A body that only carried the reason is not sent at all.
        if reason.is_some() && body.as_ref().and_then(Value::as_object).is_some_and(Map::is_empty) {
            body = None;
        }

        if files.is_empty() {
            let payload = body.map_or(Payload::Empty, Payload::Json);
            return Ok(Self { reason, payload });
        }

        let mut payload_json = body.unwrap_or_else(|| Value::Object(Map::new()));
        let Some(root) = payload_json.as_object_mut() else {
            return Err(RestError::encode("multipart payload must be a JSON object"));
        };

        let target = if root.get("data").is_some_and(Value::is_object) {
            root.get_mut("data")
                .and_then(Value::as_object_mut)
                .ok_or_else(|| RestError::encode("`data` must be an object"))?
        } else {
            root
        };

        let existing = match target.remove("attachments") {
            Some(Value::Array(existing)) => existing,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err(RestError::encode("`attachments` must be an array")),
        };

        let mut attachments: Vec<Value> = files
            .iter()
            .enumerate()
            .map(|(index, file)| file.metadata(index))
            .collect();
        attachments.extend(existing);
        target.insert("attachments".to_string(), Value::Array(attachments));

        Ok(Self {
            reason,
            payload: Payload::Multipart {
                payload_json,
                files,
            },
        })
    }

    /// Header value for the reason, if any.
    #[must_use]
    pub fn reason_header(&self) -> Option<String> {
        self.reason.as_deref().map(encode_reason)
    }
}

/// Percent-encodes an audit-log reason for use as a header value.
#[must_use]
pub fn encode_reason(reason: &str) -> String {
    percent_encode(reason)
}

/// Percent-encodes a path segment or header value, spaces as `%20`.
#[must_use]
pub fn percent_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Builds the reqwest form for a multipart payload.
///
/// # Errors
///
/// Returns [`RestError::Encode`] if a content type is not a valid MIME type or
/// the payload cannot be serialized.
pub fn into_form(payload_json: &Value, files: Vec<FileUpload>) -> RestResult<Form> {
    let mut form = Form::new();

    for (index, file) in files.into_iter().enumerate() {
        let mut part = Part::bytes(file.data.to_vec()).file_name(file.filename);
        if let Some(content_type) = &file.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| RestError::encode(format!("invalid content type: {e}")))?;
        }
        form = form.part(format!("files[{index}]"), part);
    }

    let json = serde_json::to_string(payload_json)
        .map_err(|e| RestError::encode(format!("payload_json: {e}")))?;
    let payload = Part::text(json)
        .mime_str("application/json")
        .map_err(|e| RestError::encode(e.to_string()))?;

    Ok(form.part("payload_json", payload))
}
