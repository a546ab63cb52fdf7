use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::{
    CLIENT_PROPERTIES_BROWSER, CLIENT_PROPERTIES_DEVICE, CLIENT_PROPERTIES_OS, GatewayOpcode,
    LARGE_THRESHOLD,
};
use super::error::{GatewayError, GatewayResult};
use crate::domain::entities::{Activity, GuildId, PresenceStatus, UserId};

/// Outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    fn new(opcode: GatewayOpcode, d: Value) -> Self {
        Self {
            op: opcode.as_u8(),
            d,
            s: None,
            t: None,
        }
    }

    fn from_data<T: Serialize>(opcode: GatewayOpcode, data: &T) -> GatewayResult<Self> {
        let d = serde_json::to_value(data)
            .map_err(|e| GatewayError::serialization(e.to_string()))?;
        Ok(Self::new(opcode, d))
    }

    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self::new(
            GatewayOpcode::Heartbeat,
            sequence.map_or(Value::Null, |s| Value::Number(s.into())),
        )
    }

    /// # Errors
    /// Returns a serialization error if the presence cannot be encoded.
    pub fn identify(
        token: &str,
        intents: u32,
        presence: Option<&PresenceUpdate>,
    ) -> GatewayResult<Self> {
        let identify = IdentifyData {
            token,
            properties: IdentifyProperties {
                os: CLIENT_PROPERTIES_OS,
                browser: CLIENT_PROPERTIES_BROWSER,
                device: CLIENT_PROPERTIES_DEVICE,
            },
            large_threshold: LARGE_THRESHOLD,
            intents,
            presence,
        };

        Self::from_data(GatewayOpcode::Identify, &identify)
    }

    /// # Errors
    /// Returns a serialization error if the frame cannot be encoded.
    pub fn resume(token: &str, session_id: &str, sequence: Option<u64>) -> GatewayResult<Self> {
        let resume = ResumeData {
            token,
            session_id,
            seq: sequence,
        };

        Self::from_data(GatewayOpcode::Resume, &resume)
    }

    /// # Errors
    /// Returns a serialization error if the presence cannot be encoded.
    pub fn presence_update(presence: &PresenceUpdate) -> GatewayResult<Self> {
        Self::from_data(GatewayOpcode::PresenceUpdate, presence)
    }

    /// # Errors
    /// Returns a serialization error if the request cannot be encoded.
    pub fn request_guild_members(request: &RequestGuildMembers) -> GatewayResult<Self> {
        Self::from_data(GatewayOpcode::RequestGuildMembers, request)
    }

    #[must_use]
    pub const fn opcode(&self) -> Option<GatewayOpcode> {
        GatewayOpcode::from_u8(self.op)
    }
}

#[derive(Debug, Serialize)]
struct IdentifyData<'a> {
    token: &'a str,
    properties: IdentifyProperties,
    large_threshold: u16,
    intents: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence: Option<&'a PresenceUpdate>,
}

#[derive(Debug, Serialize)]
struct IdentifyProperties {
    os: &'static str,
    browser: &'static str,
    device: &'static str,
}

#[derive(Debug, Serialize)]
struct ResumeData<'a> {
    token: &'a str,
    session_id: &'a str,
    seq: Option<u64>,
}

/// Bot presence, sent with Identify and with opcode 3.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// Unix millis since the client went idle.
    pub since: Option<u64>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub status: PresenceStatus,
    #[serde(default)]
    pub afk: bool,
}

impl PresenceUpdate {
    #[must_use]
    pub fn new(status: PresenceStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }
}

/// Opcode 8 request; answers arrive as `GUILD_MEMBERS_CHUNK` dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestGuildMembers {
    pub guild_id: GuildId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub limit: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub presences: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<UserId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl RequestGuildMembers {
    /// Every member whose name starts with `query`; an empty query with
    /// limit 0 asks for the whole guild.
    #[must_use]
    pub fn by_query(guild_id: GuildId, query: impl Into<String>, limit: u32) -> Self {
        Self {
            guild_id,
            query: Some(query.into()),
            limit,
            presences: false,
            user_ids: None,
            nonce: None,
        }
    }

    #[must_use]
    pub fn by_ids(guild_id: GuildId, user_ids: Vec<UserId>) -> Self {
        Self {
            guild_id,
            query: None,
            limit: 0,
            presences: false,
            user_ids: Some(user_ids),
            nonce: None,
        }
    }

    #[must_use]
    pub const fn with_presences(mut self) -> Self {
        self.presences = true;
        self
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// Inbound frame.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GatewayMessage {
    pub op: u8,
    #[serde(default)]
    pub d: Option<Value>,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayMessage {
    /// # Errors
    /// Returns a serialization error for malformed JSON.
    pub fn parse(json: &str) -> GatewayResult<Self> {
        serde_json::from_str(json).map_err(|e| GatewayError::serialization(e.to_string()))
    }

    #[must_use]
    pub const fn opcode(&self) -> Option<GatewayOpcode> {
        GatewayOpcode::from_u8(self.op)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HelloPayload {
    pub heartbeat_interval: u64,
}

/// The fields of `READY` the connection itself needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadySession {
    pub session_id: String,
    pub resume_gateway_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ActivityType;

    #[test]
    fn test_heartbeat_payload() {
        let payload = GatewayPayload::heartbeat(Some(42));
        assert_eq!(payload.op, 1);
        assert_eq!(payload.d, Value::Number(42.into()));
    }

    #[test]
    fn test_heartbeat_null_sequence() {
        let payload = GatewayPayload::heartbeat(None);
        assert_eq!(payload.d, Value::Null);
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"op":1,"d":null}"#);
    }

    #[test]
    fn test_identify_payload_structure() {
        let presence = PresenceUpdate::new(PresenceStatus::Idle)
            .with_activity(Activity::new(ActivityType::Watching, "the logs"));
        let payload = GatewayPayload::identify("test_token", 513, Some(&presence)).unwrap();
        assert_eq!(payload.opcode(), Some(GatewayOpcode::Identify));

        let obj = payload.d.as_object().unwrap();
        assert_eq!(obj["token"], "test_token");
        assert_eq!(obj["intents"], 513);
        assert_eq!(obj["large_threshold"], 250);
        assert_eq!(obj["properties"]["browser"], "gatebird");
        assert_eq!(obj["presence"]["status"], "idle");
        assert_eq!(obj["presence"]["activities"][0]["type"], 3);
    }

    #[test]
    fn test_identify_without_presence_omits_key() {
        let payload = GatewayPayload::identify("t", 1, None).unwrap();
        assert!(payload.d.get("presence").is_none());
    }

    #[test]
    fn test_resume_payload() {
        let payload = GatewayPayload::resume("token", "session123", Some(100)).unwrap();
        assert_eq!(payload.op, 6);

        let obj = payload.d.as_object().unwrap();
        assert_eq!(obj.get("session_id").unwrap(), "session123");
        assert_eq!(obj.get("seq").unwrap(), 100);
    }

    #[test]
    fn test_request_guild_members_payload() {
        let request = RequestGuildMembers::by_ids(GuildId(1), vec![UserId(2)]).with_nonce("n");
        let payload = GatewayPayload::request_guild_members(&request).unwrap();
        assert_eq!(payload.op, 8);
        assert_eq!(
            payload.d,
            serde_json::json!({ "guild_id": "1", "limit": 0, "user_ids": ["2"], "nonce": "n" })
        );
    }

    #[test]
    fn test_parse_dispatch_frame() {
        let message =
            GatewayMessage::parse(r#"{"op":0,"d":{"a":1},"s":7,"t":"MESSAGE_CREATE"}"#).unwrap();
        assert_eq!(message.opcode(), Some(GatewayOpcode::Dispatch));
        assert_eq!(message.s, Some(7));
        assert_eq!(message.t.as_deref(), Some("MESSAGE_CREATE"));

        assert!(GatewayMessage::parse("{not json").is_err());
    }
}
