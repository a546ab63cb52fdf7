use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::entities::{AnyGuild, Channel, Interaction, RawChannel};
use crate::domain::errors::DecodeError;
use crate::domain::events::{Event, RawEvent};

/// Turns raw dispatches into typed [`Event`]s.
///
/// Failures are per payload; the caller logs them and keeps going.
pub struct EventTranslator;

impl EventTranslator {
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the payload does not match its event type.
    pub fn translate(raw: RawEvent) -> Result<Event, DecodeError> {
        let RawEvent {
            event_type, data, ..
        } = raw;

        let event = match event_type.as_str() {
            "READY" => Event::Ready(Box::new(parse(&event_type, data)?)),
            "RESUMED" => Event::Resumed,

            "CHANNEL_CREATE" => Event::ChannelCreate(Box::new(parse_channel(&event_type, data)?)),
            "CHANNEL_UPDATE" => Event::ChannelUpdate(Box::new(parse_channel(&event_type, data)?)),
            "CHANNEL_DELETE" => Event::ChannelDelete(Box::new(parse_channel(&event_type, data)?)),
            "CHANNEL_PINS_UPDATE" => Event::ChannelPinsUpdate(parse(&event_type, data)?),
            "THREAD_CREATE" => Event::ThreadCreate(Box::new(parse_channel(&event_type, data)?)),
            "THREAD_UPDATE" => Event::ThreadUpdate(Box::new(parse_channel(&event_type, data)?)),
            "THREAD_DELETE" => Event::ThreadDelete(parse(&event_type, data)?),

            "GUILD_CREATE" => Event::GuildCreate(parse_guild(&event_type, data)?),
            "GUILD_UPDATE" => Event::GuildUpdate(Box::new(parse(&event_type, data)?)),
            "GUILD_DELETE" => Event::GuildDelete(parse(&event_type, data)?),
            "GUILD_MEMBER_ADD" => Event::GuildMemberAdd(Box::new(parse(&event_type, data)?)),
            "GUILD_MEMBER_REMOVE" => Event::GuildMemberRemove(parse(&event_type, data)?),
            "GUILD_MEMBER_UPDATE" => Event::GuildMemberUpdate(Box::new(parse(&event_type, data)?)),
            "GUILD_MEMBERS_CHUNK" => Event::GuildMembersChunk(parse(&event_type, data)?),

            "INTERACTION_CREATE" => Event::InteractionCreate(Box::new(Interaction::decode(data)?)),
            "INVITE_CREATE" => Event::InviteCreate(data),
            "INVITE_DELETE" => Event::InviteDelete(data),

            "MESSAGE_CREATE" => Event::MessageCreate(Box::new(parse(&event_type, data)?)),
            "MESSAGE_UPDATE" => Event::MessageUpdate(Box::new(parse(&event_type, data)?)),
            "MESSAGE_DELETE" => Event::MessageDelete(parse(&event_type, data)?),
            "MESSAGE_DELETE_BULK" => Event::MessageDeleteBulk(parse(&event_type, data)?),

            "PRESENCE_UPDATE" => Event::PresenceUpdate(Box::new(parse(&event_type, data)?)),
            "USER_UPDATE" => Event::UserUpdate(Box::new(parse(&event_type, data)?)),

            _ => Event::Unknown { event_type, data },
        };

        Ok(event)
    }
}

fn parse<T: DeserializeOwned>(event_type: &str, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|e| DecodeError::payload(event_type, e))
}

// Goes through RawChannel so an unknown type surfaces as its own error.
fn parse_channel(event_type: &str, data: Value) -> Result<Channel, DecodeError> {
    let raw: RawChannel = parse(event_type, data)?;
    Channel::try_from(raw)
}

fn parse_guild(event_type: &str, data: Value) -> Result<AnyGuild, DecodeError> {
    AnyGuild::try_from(data).map_err(|e| DecodeError::payload(event_type, e))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::entities::{ChannelId, GuildId, MessageId};
    use crate::domain::events::EventType;

    fn raw(event_type: &str, data: Value) -> RawEvent {
        RawEvent {
            event_type: event_type.to_string(),
            sequence: Some(1),
            data,
        }
    }

    #[test]
    fn test_message_create() {
        let event = EventTranslator::translate(raw(
            "MESSAGE_CREATE",
            json!({
                "id": "10",
                "channel_id": "20",
                "guild_id": "30",
                "author": { "id": "40", "username": "someone" },
                "content": "!ping"
            }),
        ))
        .unwrap();

        let Event::MessageCreate(message) = &event else {
            panic!("expected MessageCreate, got {event:?}");
        };
        assert_eq!(message.id, MessageId(10));
        assert_eq!(message.content, "!ping");
        assert_eq!(event.guild_id(), Some(GuildId(30)));
        assert!(event.is_message_event());
    }

    #[test]
    fn test_message_delete_bulk() {
        let event = EventTranslator::translate(raw(
            "MESSAGE_DELETE_BULK",
            json!({ "ids": ["1", "2"], "channel_id": "20" }),
        ))
        .unwrap();

        let Event::MessageDeleteBulk(bulk) = event else {
            panic!("expected MessageDeleteBulk");
        };
        assert_eq!(bulk.ids, vec![MessageId(1), MessageId(2)]);
        assert_eq!(bulk.channel_id, ChannelId(20));
    }

    #[test]
    fn test_channel_create_picks_variant() {
        let event = EventTranslator::translate(raw(
            "CHANNEL_CREATE",
            json!({ "id": "5", "type": 4, "guild_id": "30", "name": "General", "position": 0 }),
        ))
        .unwrap();

        let Event::ChannelCreate(channel) = event else {
            panic!("expected ChannelCreate");
        };
        assert!(matches!(*channel, Channel::Category(_)));
        assert_eq!(channel.guild_id(), Some(GuildId(30)));
    }

    #[test]
    fn test_unknown_channel_type_is_a_decode_error() {
        let err = EventTranslator::translate(raw(
            "CHANNEL_UPDATE",
            json!({ "id": "5", "type": 99, "guild_id": "30", "name": "odd" }),
        ))
        .unwrap_err();

        assert!(matches!(err, DecodeError::UnknownChannelType(99)));
    }

    #[test]
    fn test_guild_create_shapes() {
        let unavailable = EventTranslator::translate(raw(
            "GUILD_CREATE",
            json!({ "id": "30", "unavailable": true }),
        ))
        .unwrap();
        assert!(matches!(unavailable, Event::GuildCreate(AnyGuild::Unavailable(_))));

        let joined = EventTranslator::translate(raw(
            "GUILD_CREATE",
            json!({ "id": "30", "name": "Home", "joined_at": "2024-01-01T00:00:00+00:00" }),
        ))
        .unwrap();
        assert!(matches!(joined, Event::GuildCreate(AnyGuild::New(_))));

        let plain = EventTranslator::translate(raw("GUILD_CREATE", json!({ "id": "30", "name": "Home" })))
            .unwrap();
        assert!(matches!(plain, Event::GuildCreate(AnyGuild::Available(_))));
        assert_eq!(plain.guild_id(), Some(GuildId(30)));
    }

    #[test]
    fn test_guild_delete() {
        let event = EventTranslator::translate(raw("GUILD_DELETE", json!({ "id": "30" }))).unwrap();
        let Event::GuildDelete(guild) = event else {
            panic!("expected GuildDelete");
        };
        assert!(!guild.unavailable);
    }

    #[test]
    fn test_interaction_ping() {
        let event = EventTranslator::translate(raw(
            "INTERACTION_CREATE",
            json!({
                "id": "1",
                "application_id": "2",
                "type": 1,
                "token": "tok",
                "user": { "id": "3", "username": "dm" }
            }),
        ))
        .unwrap();

        assert_eq!(event.event_type(), EventType::InteractionCreate);
    }

    #[test]
    fn test_unknown_dispatch_keeps_payload() {
        let event =
            EventTranslator::translate(raw("TYPING_START", json!({ "channel_id": "1" }))).unwrap();

        assert_eq!(
            event,
            Event::Unknown {
                event_type: "TYPING_START".to_string(),
                data: json!({ "channel_id": "1" }),
            }
        );
    }

    #[test]
    fn test_resumed_and_invites() {
        assert_eq!(
            EventTranslator::translate(raw("RESUMED", Value::Null)).unwrap(),
            Event::Resumed
        );
        let invite = EventTranslator::translate(raw("INVITE_DELETE", json!({ "code": "abc" }))).unwrap();
        assert_eq!(invite.event_type(), EventType::InviteDelete);
    }

    #[test]
    fn test_malformed_payload_names_the_event() {
        let err = EventTranslator::translate(raw("MESSAGE_CREATE", json!({ "content": "x" })))
            .unwrap_err();

        assert!(err.to_string().starts_with("malformed MESSAGE_CREATE payload"));
    }
}
