//! WebSocket close codes
//!
//! Gateway-specific close codes the server attaches when it drops the
//! connection. They decide two things on our side: whether to dial again at
//! all, and whether the session is still worth resuming.

/// Gateway WebSocket close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error, try again
    UnknownError = 4000,
    /// We sent an opcode the server does not recognize
    UnknownOpcode = 4001,
    /// We sent a payload the server could not decode
    DecodeError = 4002,
    /// We sent a frame before identifying
    NotAuthenticated = 4003,
    /// The token was rejected
    AuthenticationFailed = 4004,
    /// We identified twice on one connection
    AlreadyAuthenticated = 4005,
    /// The sequence sent with a resume was invalid
    InvalidSequence = 4007,
    /// We sent frames too quickly
    RateLimited = 4008,
    /// The session lived past its deadline
    SessionTimeout = 4009,
    /// Invalid shard sent at identify
    InvalidShard = 4010,
    /// The server requires sharding this client does not do
    ShardingRequired = 4011,
    /// Invalid gateway protocol version
    InvalidApiVersion = 4012,
    /// Invalid intents bitmask
    InvalidIntents = 4013,
    /// Intents the token is not approved for
    DisallowedIntents = 4014,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimeout),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether dialing again can help.
    ///
    /// Configuration-shaped rejections (bad token, bad intents, bad version)
    /// will fail identically on every attempt.
    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        !matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Whether the session survives this close and a resume may be attempted.
    #[must_use]
    pub const fn can_resume(self) -> bool {
        self.should_reconnect()
            && !matches!(
                self,
                Self::NotAuthenticated
                    | Self::AlreadyAuthenticated
                    | Self::InvalidSequence
                    | Self::SessionTimeout
            )
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error",
            Self::UnknownOpcode => "Unknown opcode sent",
            Self::DecodeError => "Payload could not be decoded",
            Self::NotAuthenticated => "Sent a frame before identifying",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Identified more than once",
            Self::InvalidSequence => "Invalid resume sequence",
            Self::RateLimited => "Rate limited",
            Self::SessionTimeout => "Session timed out",
            Self::InvalidShard => "Invalid shard",
            Self::ShardingRequired => "Sharding required",
            Self::InvalidApiVersion => "Invalid gateway version",
            Self::InvalidIntents => "Invalid intents",
            Self::DisallowedIntents => "Disallowed intents",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.description(), self.as_u16())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}
