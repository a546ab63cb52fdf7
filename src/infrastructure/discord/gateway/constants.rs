use std::time::Duration;

/// Gateway protocol version pinned in the connection URL.
pub const GATEWAY_VERSION: u8 = 10;
pub const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xff, 0xff];

/// Wait after an unacknowledged heartbeat before declaring the socket dead.
pub const ZOMBIE_GRACE: Duration = Duration::from_millis(500);

pub const RECONNECT_DELAY_BASE: Duration = Duration::from_secs(1);
pub const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(60);
pub const RECONNECT_JITTER_MAX: Duration = Duration::from_millis(500);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

pub const CLIENT_PROPERTIES_OS: &str = std::env::consts::OS;
pub const CLIENT_PROPERTIES_BROWSER: &str = "gatebird";
pub const CLIENT_PROPERTIES_DEVICE: &str = "gatebird";

pub const LARGE_THRESHOLD: u16 = 250;

/// Clean close; the server drops the session.
pub const CLOSE_NORMAL: u16 = 1000;
/// "Going away"; the session stays resumable.
pub const CLOSE_GOING_AWAY: u16 = 1001;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOpcode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    Resume = 6,
    Reconnect = 7,
    RequestGuildMembers = 8,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

impl GatewayOpcode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::PresenceUpdate),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            8 => Some(Self::RequestGuildMembers),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl From<GatewayOpcode> for u8 {
    fn from(opcode: GatewayOpcode) -> Self {
        opcode.as_u8()
    }
}

macro_rules! gateway_intents {
    ($($variant:ident = $bit:literal => $name:literal),* $(,)?) => {
        /// One event category the connection subscribes to.
        #[repr(u32)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GatewayIntent {
            $($variant = 1 << $bit,)*
        }

        impl GatewayIntent {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Name used in config files, e.g. `guild_messages`.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

gateway_intents! {
    Guilds = 0 => "guilds",
    GuildMembers = 1 => "guild_members",
    GuildModeration = 2 => "guild_moderation",
    GuildExpressions = 3 => "guild_expressions",
    GuildIntegrations = 4 => "guild_integrations",
    GuildWebhooks = 5 => "guild_webhooks",
    GuildInvites = 6 => "guild_invites",
    GuildVoiceStates = 7 => "guild_voice_states",
    GuildPresences = 8 => "guild_presences",
    GuildMessages = 9 => "guild_messages",
    GuildMessageReactions = 10 => "guild_message_reactions",
    GuildMessageTyping = 11 => "guild_message_typing",
    DirectMessages = 12 => "direct_messages",
    DirectMessageReactions = 13 => "direct_message_reactions",
    DirectMessageTyping = 14 => "direct_message_typing",
    MessageContent = 15 => "message_content",
    GuildScheduledEvents = 16 => "guild_scheduled_events",
    AutoModerationConfiguration = 20 => "auto_moderation_configuration",
    AutoModerationExecution = 21 => "auto_moderation_execution",
    GuildMessagePolls = 24 => "guild_message_polls",
    DirectMessagePolls = 25 => "direct_message_polls",
}

impl GatewayIntent {
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Intents that must be enabled in the developer portal.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(
            self,
            Self::GuildMembers | Self::GuildPresences | Self::MessageContent
        )
    }
}

impl From<GatewayIntent> for u32 {
    fn from(intent: GatewayIntent) -> Self {
        intent.as_u32()
    }
}

impl std::str::FromStr for GatewayIntent {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|intent| intent.name() == normalized)
            .ok_or_else(|| format!("unknown gateway intent: {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GatewayIntents(u32);

impl GatewayIntents {
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn with(mut self, intent: GatewayIntent) -> Self {
        self.0 |= intent.as_u32();
        self
    }

    #[must_use]
    pub const fn has(self, intent: GatewayIntent) -> bool {
        (self.0 & intent.as_u32()) != 0
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Guilds, guild and direct messages, and message content.
    #[must_use]
    pub const fn default_bot() -> Self {
        Self::new()
            .with(GatewayIntent::Guilds)
            .with(GatewayIntent::GuildMessages)
            .with(GatewayIntent::DirectMessages)
            .with(GatewayIntent::MessageContent)
    }

    /// Every intent that needs no portal approval.
    #[must_use]
    pub fn non_privileged() -> Self {
        GatewayIntent::ALL
            .iter()
            .filter(|intent| !intent.is_privileged())
            .fold(Self::new(), |acc, intent| acc.with(*intent))
    }

    /// Parses a list of intent names.
    ///
    /// # Errors
    /// Returns the first unknown name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        names.iter().try_fold(Self::new(), |acc, name| {
            Ok(acc.with(name.as_ref().parse::<GatewayIntent>()?))
        })
    }
}

impl From<GatewayIntents> for u32 {
    fn from(intents: GatewayIntents) -> Self {
        intents.as_u32()
    }
}

impl std::ops::BitOr<GatewayIntent> for GatewayIntents {
    type Output = Self;

    fn bitor(self, rhs: GatewayIntent) -> Self {
        self.with(rhs)
    }
}
