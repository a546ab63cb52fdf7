use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GuildId, Presence, RoleId, User, UserId};
use crate::domain::serde_utils::nullable_bits;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuildMember {
    /// Absent on members embedded in `MESSAGE_CREATE`.
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
    /// Null for members that joined through a guest invite.
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub premium_since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default, deserialize_with = "nullable_bits::deserialize")]
    pub flags: u64,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub permissions: Option<String>,
    #[serde(default)]
    pub communication_disabled_until: Option<DateTime<Utc>>,
    /// Set on `GUILD_MEMBER_ADD`/`GUILD_MEMBER_UPDATE` payloads.
    #[serde(default)]
    pub guild_id: Option<GuildId>,
}

impl GuildMember {
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(User::id)
    }

    #[must_use]
    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }

    /// Nickname, then global name, then username.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.nick
            .as_deref()
            .or_else(|| self.user.as_ref().map(User::display_name))
    }

    #[must_use]
    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.communication_disabled_until
            .is_some_and(|until| until > now)
    }
}

/// Payload of `GUILD_MEMBER_REMOVE`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[allow(missing_docs)]
pub struct GuildMemberRemove {
    pub guild_id: GuildId,
    pub user: User,
}

/// One page of a `REQUEST_GUILD_MEMBERS` answer.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[allow(missing_docs)]
pub struct GuildMembersChunk {
    pub guild_id: GuildId,
    #[serde(default)]
    pub members: Vec<GuildMember>,
    pub chunk_index: u32,
    pub chunk_count: u32,
    #[serde(default)]
    pub not_found: Vec<UserId>,
    #[serde(default)]
    pub presences: Vec<Presence>,
    #[serde(default)]
    pub nonce: Option<String>,
}

impl GuildMembersChunk {
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.chunk_index + 1 >= self.chunk_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_from_guild_member_add() {
        let member: GuildMember = serde_json::from_value(serde_json::json!({
            "guild_id": "41771983423143937",
            "user": { "id": "5", "username": "five" },
            "nick": null,
            "roles": ["41771983423143936"],
            "joined_at": "2015-04-26T06:26:56.936000+00:00",
            "deaf": false,
            "mute": false,
            "communication_disabled_until": "2015-04-27T06:26:56+00:00"
        }))
        .unwrap();

        assert_eq!(member.user_id(), Some(UserId(5)));
        assert_eq!(member.guild_id, Some(GuildId(41_771_983_423_143_937)));
        assert_eq!(member.roles(), &[RoleId(41_771_983_423_143_936)]);
        assert_eq!(member.display_name(), Some("five"));
        assert!(member.joined_at.is_some());
        assert!(!member.is_timed_out(Utc::now()));
    }

    #[test]
    fn test_members_chunk() {
        let chunk: GuildMembersChunk = serde_json::from_value(serde_json::json!({
            "guild_id": "1",
            "members": [{ "user": { "id": "2", "username": "two" }, "roles": [] }],
            "chunk_index": 1,
            "chunk_count": 2,
            "not_found": ["3"],
            "nonce": "abc"
        }))
        .unwrap();

        assert!(chunk.is_last());
        assert_eq!(chunk.not_found, vec![UserId(3)]);
        assert_eq!(chunk.members[0].user_id(), Some(UserId(2)));
    }
}
