//! Application command data and option flattening.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use super::snowflake::snowflake;
use super::{
    Attachment, AttachmentId, ChannelId, GuildId, GuildMember, MessageId, Role, RoleId, User,
    UserId,
};
use crate::domain::errors::DecodeError;

snowflake!(
    /// Unique identifier for a registered application command.
    CommandId
);

/// Application command type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "u8")]
#[allow(missing_docs)]
pub enum CommandType {
    #[default]
    ChatInput,
    User,
    Message,
    PrimaryEntryPoint,
}

impl From<u8> for CommandType {
    fn from(value: u8) -> Self {
        match value {
            2 => Self::User,
            3 => Self::Message,
            4 => Self::PrimaryEntryPoint,
            _ => Self::ChatInput,
        }
    }
}

/// Command option type codes.
#[allow(missing_docs)]
pub mod option_type {
    pub const SUB_COMMAND: u8 = 1;
    pub const SUB_COMMAND_GROUP: u8 = 2;
    pub const STRING: u8 = 3;
    pub const INTEGER: u8 = 4;
    pub const BOOLEAN: u8 = 5;
    pub const USER: u8 = 6;
    pub const CHANNEL: u8 = 7;
    pub const ROLE: u8 = 8;
    pub const MENTIONABLE: u8 = 9;
    pub const NUMBER: u8 = 10;
    pub const ATTACHMENT: u8 = 11;
}

/// Entities referenced by option values, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[allow(missing_docs)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<UserId, User>,
    /// Partial members: no `user`, `deaf` or `mute`.
    #[serde(default)]
    pub members: HashMap<UserId, GuildMember>,
    #[serde(default)]
    pub roles: HashMap<RoleId, Role>,
    /// Partial channels.
    #[serde(default)]
    pub channels: HashMap<ChannelId, Value>,
    #[serde(default)]
    pub messages: HashMap<MessageId, Value>,
    #[serde(default)]
    pub attachments: HashMap<AttachmentId, Attachment>,
}

/// The option the user is typing into during autocomplete.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusedOption {
    /// Option name.
    pub name: String,
    /// Partial input. Not type checked.
    pub value: Value,
}

/// Option values flattened by type.
///
/// Lookups return `None` for options the user left out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOptions {
    strings: Vec<(String, String)>,
    integers: Vec<(String, i64)>,
    numbers: Vec<(String, f64)>,
    booleans: Vec<(String, bool)>,
    users: Vec<(String, UserId)>,
    channels: Vec<(String, ChannelId)>,
    roles: Vec<(String, RoleId)>,
    mentionables: Vec<(String, u64)>,
    attachments: Vec<(String, String)>,
    focused: Option<FocusedOption>,
}

fn find<'a, T>(entries: &'a [(String, T)], name: &str) -> Option<&'a T> {
    entries.iter().find(|(key, _)| key == name).map(|(_, value)| value)
}

impl CommandOptions {
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        find(&self.strings, name).map(String::as_str)
    }

    #[must_use]
    pub fn integer(&self, name: &str) -> Option<i64> {
        find(&self.integers, name).copied()
    }

    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        find(&self.numbers, name).copied()
    }

    #[must_use]
    pub fn boolean(&self, name: &str) -> Option<bool> {
        find(&self.booleans, name).copied()
    }

    #[must_use]
    pub fn user(&self, name: &str) -> Option<UserId> {
        find(&self.users, name).copied()
    }

    #[must_use]
    pub fn channel(&self, name: &str) -> Option<ChannelId> {
        find(&self.channels, name).copied()
    }

    #[must_use]
    pub fn role(&self, name: &str) -> Option<RoleId> {
        find(&self.roles, name).copied()
    }

    /// A user or role id.
    #[must_use]
    pub fn mentionable(&self, name: &str) -> Option<u64> {
        find(&self.mentionables, name).copied()
    }

    /// URL of the uploaded attachment.
    #[must_use]
    pub fn attachment_url(&self, name: &str) -> Option<&str> {
        find(&self.attachments, name).map(String::as_str)
    }

    #[must_use]
    pub const fn focused(&self) -> Option<&FocusedOption> {
        self.focused.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.focused.is_none()
    }

    /// Number of non-focused options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
            + self.integers.len()
            + self.numbers.len()
            + self.booleans.len()
            + self.users.len()
            + self.channels.len()
            + self.roles.len()
            + self.mentionables.len()
            + self.attachments.len()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawOption {
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    focused: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCommandData {
    id: CommandId,
    name: String,
    #[serde(rename = "type", default)]
    kind: CommandType,
    #[serde(default)]
    resolved: Option<ResolvedData>,
    #[serde(default)]
    options: Vec<RawOption>,
    #[serde(default)]
    guild_id: Option<GuildId>,
    #[serde(default, with = "crate::domain::serde_utils::snowflake_option")]
    target_id: Option<u64>,
}

/// Data of an application command or autocomplete interaction.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct ApplicationCommandData {
    pub id: CommandId,
    pub name: String,
    pub kind: CommandType,
    /// Set for guild-scoped commands.
    pub guild_id: Option<GuildId>,
    /// User or message targeted by a context menu command.
    pub target_id: Option<u64>,
    pub subcommand_group: Option<String>,
    pub subcommand: Option<String>,
    pub options: CommandOptions,
    pub resolved: ResolvedData,
}

impl ApplicationCommandData {
    /// Decodes command data, flattening the option tree.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the payload is malformed or an option value
    /// does not match its declared type.
    pub fn decode(value: Value) -> Result<Self, DecodeError> {
        let raw: RawCommandData = serde_json::from_value(value)
            .map_err(|e| DecodeError::payload("application command data", e))?;

        let mut data = Self {
            id: raw.id,
            name: raw.name,
            kind: raw.kind,
            guild_id: raw.guild_id,
            target_id: raw.target_id,
            subcommand_group: None,
            subcommand: None,
            options: CommandOptions::default(),
            resolved: raw.resolved.unwrap_or_default(),
        };
        data.collect(raw.options)?;

        Ok(data)
    }

    /// Command name followed by the group and sub-command, e.g. `tag edit title`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        [
            Some(self.name.as_str()),
            self.subcommand_group.as_deref(),
            self.subcommand.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Resolved user for a user option.
    #[must_use]
    pub fn resolved_user(&self, name: &str) -> Option<&User> {
        self.options
            .user(name)
            .and_then(|id| self.resolved.users.get(&id))
    }

    fn collect(&mut self, options: Vec<RawOption>) -> Result<(), DecodeError> {
        for option in options {
            if option.focused {
                self.options.focused = Some(FocusedOption {
                    name: option.name,
                    value: option.value.unwrap_or(Value::Null),
                });
                continue;
            }

            match option.kind {
                option_type::SUB_COMMAND => {
                    self.subcommand = Some(option.name);
                    return self.collect(option.options);
                }
                option_type::SUB_COMMAND_GROUP => {
                    self.subcommand_group = Some(option.name);
                    return self.collect(option.options);
                }
                _ => self.push_value(option)?,
            }
        }

        Ok(())
    }

    fn push_value(&mut self, option: RawOption) -> Result<(), DecodeError> {
        let RawOption {
            name, kind, value, ..
        } = option;
        let Some(value) = value else {
            return Err(DecodeError::MissingOptionValue { name });
        };
        let mismatch = |expected| DecodeError::option_type(&name, kind, expected, &value);
        let options = &mut self.options;

        match kind {
            option_type::STRING => {
                let text = value.as_str().ok_or_else(|| mismatch("a string"))?;
                options.strings.push((name.clone(), text.to_string()));
            }
            option_type::INTEGER => {
                let integer = value.as_i64().ok_or_else(|| mismatch("an integer"))?;
                options.integers.push((name.clone(), integer));
            }
            option_type::NUMBER => {
                let number = value.as_f64().ok_or_else(|| mismatch("a number"))?;
                options.numbers.push((name.clone(), number));
            }
            option_type::BOOLEAN => {
                let flag = value.as_bool().ok_or_else(|| mismatch("a boolean"))?;
                options.booleans.push((name.clone(), flag));
            }
            option_type::USER
            | option_type::CHANNEL
            | option_type::ROLE
            | option_type::MENTIONABLE => {
                let id = value
                    .as_str()
                    .and_then(|s| s.parse::<u64>().ok())
                    .ok_or_else(|| mismatch("a snowflake string"))?;
                match kind {
                    option_type::USER => options.users.push((name.clone(), UserId(id))),
                    option_type::CHANNEL => options.channels.push((name.clone(), ChannelId(id))),
                    option_type::ROLE => options.roles.push((name.clone(), RoleId(id))),
                    _ => options.mentionables.push((name.clone(), id)),
                }
            }
            option_type::ATTACHMENT => {
                let key = value.as_str().ok_or_else(|| mismatch("an attachment id"))?;
                let url = key
                    .parse::<AttachmentId>()
                    .ok()
                    .and_then(|id| self.resolved.attachments.get(&id))
                    .map(|attachment| attachment.url.clone())
                    .ok_or_else(|| DecodeError::UnresolvedAttachment {
                        name: name.clone(),
                        key: key.to_string(),
                    })?;
                options.attachments.push((name.clone(), url));
            }
            // Option types added after this crate was written are ignored.
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn command(options: Value) -> Value {
        serde_json::json!({
            "id": "771825006014889984",
            "name": "blep",
            "type": 1,
            "options": options
        })
    }

    #[test]
    fn test_flattens_typed_options() {
        let data = ApplicationCommandData::decode(command(serde_json::json!([
            { "name": "animal", "type": 3, "value": "animal_dog" },
            { "name": "count", "type": 4, "value": 5 },
            { "name": "ratio", "type": 10, "value": 0.5 },
            { "name": "only_smol", "type": 5, "value": true },
            { "name": "owner", "type": 6, "value": "53908232506183680" },
            { "name": "where", "type": 7, "value": "41771983429993937" },
            { "name": "role", "type": 8, "value": "41771983423143936" },
            { "name": "who", "type": 9, "value": "41771983423143936" }
        ])))
        .unwrap();

        let options = &data.options;
        assert_eq!(options.string("animal"), Some("animal_dog"));
        assert_eq!(options.integer("count"), Some(5));
        assert_eq!(options.number("ratio"), Some(0.5));
        assert_eq!(options.boolean("only_smol"), Some(true));
        assert_eq!(options.user("owner"), Some(UserId(53_908_232_506_183_680)));
        assert_eq!(options.channel("where"), Some(ChannelId(41_771_983_429_993_937)));
        assert_eq!(options.role("role"), Some(RoleId(41_771_983_423_143_936)));
        assert_eq!(options.mentionable("who"), Some(41_771_983_423_143_936));
        assert_eq!(options.len(), 8);
        assert_eq!(options.string("missing"), None);
        assert_eq!(data.qualified_name(), "blep");
    }

    #[test]
    fn test_integer_option_given_a_string_is_a_decode_error() {
        let err = ApplicationCommandData::decode(command(serde_json::json!([
            { "name": "count", "type": 4, "value": "5" }
        ])))
        .unwrap_err();

        assert!(matches!(
            err,
            DecodeError::OptionType { ref name, option_type: 4, .. } if name == "count"
        ));
    }

    #[test_case(3, serde_json::json!(1) ; "string given a number")]
    #[test_case(4, serde_json::json!(1.5) ; "integer given a float")]
    #[test_case(10, serde_json::json!("1.5") ; "number given a string")]
    #[test_case(5, serde_json::json!("true") ; "boolean given a string")]
    #[test_case(6, serde_json::json!(42) ; "user given a number")]
    #[test_case(11, serde_json::json!(7) ; "attachment given a number")]
    fn test_option_type_mismatch(kind: u8, value: Value) {
        let result = ApplicationCommandData::decode(command(serde_json::json!([
            { "name": "opt", "type": kind, "value": value }
        ])));
        assert!(matches!(result, Err(DecodeError::OptionType { .. })));
    }

    #[test]
    fn test_subcommand_group_recurses_and_records_path() {
        let data = ApplicationCommandData::decode(command(serde_json::json!([{
            "name": "tag",
            "type": 2,
            "options": [{
                "name": "edit",
                "type": 1,
                "options": [{ "name": "content", "type": 3, "value": "hi" }]
            }]
        }])))
        .unwrap();

        assert_eq!(data.subcommand_group.as_deref(), Some("tag"));
        assert_eq!(data.subcommand.as_deref(), Some("edit"));
        assert_eq!(data.options.string("content"), Some("hi"));
        assert_eq!(data.qualified_name(), "blep tag edit");
    }

    #[test]
    fn test_focused_option_is_recorded_and_skipped() {
        let data = ApplicationCommandData::decode(command(serde_json::json!([
            { "name": "query", "type": 4, "value": "12", "focused": true },
            { "name": "exact", "type": 5, "value": false }
        ])))
        .unwrap();

        let focused = data.options.focused().unwrap();
        assert_eq!(focused.name, "query");
        assert_eq!(focused.value, serde_json::json!("12"));
        assert_eq!(data.options.integer("query"), None);
        assert_eq!(data.options.boolean("exact"), Some(false));
    }

    #[test]
    fn test_attachment_option_resolves_url() {
        let mut raw = command(serde_json::json!([
            { "name": "file", "type": 11, "value": "1099" }
        ]));
        raw["resolved"] = serde_json::json!({
            "attachments": {
                "1099": {
                    "id": "1099",
                    "filename": "log.txt",
                    "size": 12,
                    "url": "https://cdn.discordapp.com/attachments/1/1099/log.txt"
                }
            }
        });

        let data = ApplicationCommandData::decode(raw).unwrap();
        assert_eq!(
            data.options.attachment_url("file"),
            Some("https://cdn.discordapp.com/attachments/1/1099/log.txt")
        );
    }

    #[test]
    fn test_unresolved_attachment_is_a_decode_error() {
        let result = ApplicationCommandData::decode(command(serde_json::json!([
            { "name": "file", "type": 11, "value": "1099" }
        ])));
        assert!(matches!(result, Err(DecodeError::UnresolvedAttachment { .. })));
    }

    #[test]
    fn test_resolved_user_lookup() {
        let mut raw = command(serde_json::json!([
            { "name": "target", "type": 6, "value": "7" }
        ]));
        raw["resolved"] = serde_json::json!({
            "users": { "7": { "id": "7", "username": "seven" } }
        });

        let data = ApplicationCommandData::decode(raw).unwrap();
        assert_eq!(data.resolved_user("target").map(User::username), Some("seven"));
    }
}
