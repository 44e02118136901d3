//! Event structure and related types for the SSH alert pipeline

use chrono::{DateTime, NaiveDateTime};
use std::fmt;

/// Leap year used to validate syslog timestamps, which carry no year
const SYSLOG_REFERENCE_YEAR: i32 = 2000;

/// Display format for parsed timestamps
const DISPLAY_FORMAT: &str = "%b %d %H:%M:%S";

/// ISO-like layouts accepted besides strict RFC 3339
const ISO_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Kind of security event, one per pattern rule name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Accepted,
    Failed,
    SessionOpened,
    SessionClosed,
    Disconnected,
    Error,
    /// Kind named by a custom rule table
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Accepted => "Accepted",
            EventKind::Failed => "Failed",
            EventKind::SessionOpened => "SessionOpened",
            EventKind::SessionClosed => "SessionClosed",
            EventKind::Disconnected => "Disconnected",
            EventKind::Error => "Error",
            EventKind::Other(name) => name,
        }
    }

    /// Auth method assumed when a rule of this kind does not capture one.
    ///
    /// sshd omits the method token on most failed password attempts.
    pub fn default_auth_method(&self) -> Option<&'static str> {
        match self {
            EventKind::Failed => Some("password"),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort parsed event time
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventTime {
    Parsed(NaiveDateTime),
    /// Token that could not be parsed, kept as-is
    Raw(String),
    #[default]
    Unknown,
}

impl EventTime {
    /// Parse an RFC 3339 / ISO 8601 or classic syslog (`Jan 10 03:14:07`) token
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.is_empty() {
            return EventTime::Unknown;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
            return EventTime::Parsed(dt.naive_local());
        }

        for format in ISO_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(token, format) {
                return EventTime::Parsed(dt);
            }
        }

        let with_year = format!("{} {}", SYSLOG_REFERENCE_YEAR, token);
        if let Ok(dt) = NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S") {
            return EventTime::Parsed(dt);
        }

        EventTime::Raw(token.to_string())
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventTime::Unknown)
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Parsed(dt) => write!(f, "{}", dt.format(DISPLAY_FORMAT)),
            EventTime::Raw(raw) => f.write_str(raw),
            EventTime::Unknown => f.write_str(Event::UNKNOWN),
        }
    }
}

/// Event field addressable by a rule capture slot or a fixed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Timestamp,
    ServerName,
    ServerIp,
    Username,
    ClientIp,
    Port,
    AuthMethod,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Timestamp,
        Field::ServerName,
        Field::ServerIp,
        Field::Username,
        Field::ClientIp,
        Field::Port,
        Field::AuthMethod,
    ];

    /// Named capture group that fills this field
    pub fn capture_name(&self) -> &'static str {
        match self {
            Field::Timestamp => "ts",
            Field::ServerName => "server_name",
            Field::ServerIp => "server_ip",
            Field::Username => "username",
            Field::ClientIp => "client_ip",
            Field::Port => "port",
            Field::AuthMethod => "auth_type",
        }
    }
}

/// Structured security event derived from one matched log line
///
/// `None` marks a field the matched rule did not provide. It is never
/// replaced with an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: EventTime,
    pub server_name: Option<String>,
    pub server_ip: Option<String>,
    pub username: Option<String>,
    pub client_ip: Option<String>,
    pub port: Option<u16>,
    pub auth_method: Option<String>,
    /// Original line, verbatim
    pub raw_line: String,
}

impl Event {
    /// Rendering of a field the log line did not carry
    pub const UNKNOWN: &'static str = "N/A";

    /// Create an event with every optional field unknown
    pub fn new(kind: EventKind, raw_line: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp: EventTime::Unknown,
            server_name: None,
            server_ip: None,
            username: None,
            client_ip: None,
            port: None,
            auth_method: None,
            raw_line: raw_line.into(),
        }
    }

    /// Set a field from its textual value.
    ///
    /// Blank values leave the field unknown. A port that is not a valid
    /// number stays unknown; the raw line still carries it.
    pub fn set_field(&mut self, field: Field, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }

        match field {
            Field::Timestamp => self.timestamp = EventTime::parse(value),
            Field::ServerName => self.server_name = Some(value.to_string()),
            Field::ServerIp => self.server_ip = Some(value.to_string()),
            Field::Username => self.username = Some(value.to_string()),
            Field::ClientIp => self.client_ip = Some(value.to_string()),
            Field::Port => self.port = value.parse().ok(),
            Field::AuthMethod => self.auth_method = Some(value.to_string()),
        }
    }

    pub fn has_field(&self, field: Field) -> bool {
        match field {
            Field::Timestamp => self.timestamp.is_known(),
            Field::ServerName => self.server_name.is_some(),
            Field::ServerIp => self.server_ip.is_some(),
            Field::Username => self.username.is_some(),
            Field::ClientIp => self.client_ip.is_some(),
            Field::Port => self.port.is_some(),
            Field::AuthMethod => self.auth_method.is_some(),
        }
    }

    /// Field value for display, `N/A` when unknown
    pub fn display_field(&self, field: Field) -> String {
        let value = match field {
            Field::Timestamp => return self.timestamp.to_string(),
            Field::Port => return self.port.map_or_else(|| Self::UNKNOWN.to_string(), |p| p.to_string()),
            Field::ServerName => self.server_name.as_deref(),
            Field::ServerIp => self.server_ip.as_deref(),
            Field::Username => self.username.as_deref(),
            Field::ClientIp => self.client_ip.as_deref(),
            Field::AuthMethod => self.auth_method.as_deref(),
        };
        value.unwrap_or(Self::UNKNOWN).to_string()
    }
}
