//! Request and reply messages carried inside frames.

use crate::error::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// Classification of a lookup outcome.
///
/// This is the complete set of reply types understood by Postfix; any other
/// token is rejected when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyType {
    /// The key was found; the value is the lookup result.
    Ok,
    /// Temporary failure; the client should retry later.
    Temp,
    /// The key does not exist in the map.
    NotFound,
    /// The lookup timed out.
    Timeout,
    /// Permanent failure; retrying will not help.
    Perm,
}

impl ReplyType {
    /// All reply types, in wire-name order.
    pub const ALL: [ReplyType; 5] = [
        ReplyType::Ok,
        ReplyType::Temp,
        ReplyType::NotFound,
        ReplyType::Timeout,
        ReplyType::Perm,
    ];

    /// Returns the token used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyType::Ok => "OK",
            ReplyType::Temp => "TEMP",
            ReplyType::NotFound => "NOTFOUND",
            ReplyType::Timeout => "TIMEOUT",
            ReplyType::Perm => "PERM",
        }
    }

    /// Returns whether the reply settles the lookup (no retry expected).
    pub fn is_definitive(&self) -> bool {
        matches!(self, ReplyType::Ok | ReplyType::NotFound | ReplyType::Perm)
    }
}

impl fmt::Display for ReplyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReplyType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownReplyType(s.to_string()))
    }
}

/// A lookup request: `<map-name> <key>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Map name (Postfix table name).
    pub name: String,
    /// Lookup key. May be empty or contain spaces.
    pub key: String,
}

impl Request {
    /// Creates a new request.
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }

    /// Parses a decoded frame payload, splitting on the first space.
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
        let (name, key) = text
            .split_once(' ')
            .ok_or(ProtocolError::MissingSeparator)?;
        Ok(Self::new(name, key))
    }

    /// Returns the frame payload for this request.
    pub fn to_payload(&self) -> String {
        format!("{} {}", self.name, self.key)
    }
}

/// A typed lookup reply: `<TYPE> <value>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub reply_type: ReplyType,
    pub value: String,
}

impl Reply {
    pub fn new(reply_type: ReplyType, value: impl Into<String>) -> Self {
        Self {
            reply_type,
            value: value.into(),
        }
    }

    pub fn ok(value: impl Into<String>) -> Self {
        Self::new(ReplyType::Ok, value)
    }

    pub fn temp(reason: impl Into<String>) -> Self {
        Self::new(ReplyType::Temp, reason)
    }

    pub fn not_found() -> Self {
        Self::new(ReplyType::NotFound, "")
    }

    pub fn timeout(reason: impl Into<String>) -> Self {
        Self::new(ReplyType::Timeout, reason)
    }

    pub fn perm(reason: impl Into<String>) -> Self {
        Self::new(ReplyType::Perm, reason)
    }

    /// Returns the frame payload for this reply.
    ///
    /// The separating space is always present, even for an empty value.
    pub fn to_payload(&self) -> String {
        format!("{} {}", self.reply_type, self.value)
    }

    /// Parses a reply payload received from a server.
    ///
    /// A bare type token without a value is accepted as an empty value.
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
        let (token, value) = text.split_once(' ').unwrap_or((text, ""));
        Ok(Self::new(token.parse()?, value))
    }

    /// Returns whether this is an `OK` reply.
    pub fn is_ok(&self) -> bool {
        self.reply_type == ReplyType::Ok
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.reply_type, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_type_wire_names() {
        assert_eq!(ReplyType::Ok.to_string(), "OK");
        assert_eq!(ReplyType::Temp.to_string(), "TEMP");
        assert_eq!(ReplyType::NotFound.to_string(), "NOTFOUND");
        assert_eq!(ReplyType::Timeout.to_string(), "TIMEOUT");
        assert_eq!(ReplyType::Perm.to_string(), "PERM");
    }

    #[test]
    fn test_reply_type_from_str() {
        for t in ReplyType::ALL {
            assert_eq!(t.as_str().parse::<ReplyType>().unwrap(), t);
        }

        // Case-sensitive, closed set
        assert!(matches!(
            "ok".parse::<ReplyType>(),
            Err(ProtocolError::UnknownReplyType(_))
        ));
        assert!(matches!(
            "MAYBE".parse::<ReplyType>(),
            Err(ProtocolError::UnknownReplyType(_))
        ));
    }

    #[test]
    fn test_reply_type_definitive() {
        assert!(ReplyType::Ok.is_definitive());
        assert!(ReplyType::NotFound.is_definitive());
        assert!(ReplyType::Perm.is_definitive());
        assert!(!ReplyType::Temp.is_definitive());
        assert!(!ReplyType::Timeout.is_definitive());
    }

    #[test]
    fn test_request_parse() {
        let request = Request::parse(b"aliases bob").unwrap();
        assert_eq!(request.name, "aliases");
        assert_eq!(request.key, "bob");
    }

    #[test]
    fn test_request_parse_splits_on_first_space() {
        let request = Request::parse(b"senders Bob Smith <bob@example.com>").unwrap();
        assert_eq!(request.name, "senders");
        assert_eq!(request.key, "Bob Smith <bob@example.com>");
    }

    #[test]
    fn test_request_parse_empty_parts() {
        let request = Request::parse(b"aliases ").unwrap();
        assert_eq!(request.name, "aliases");
        assert_eq!(request.key, "");

        let request = Request::parse(b" bob").unwrap();
        assert_eq!(request.name, "");
        assert_eq!(request.key, "bob");
    }

    #[test]
    fn test_request_parse_single_token() {
        assert!(matches!(
            Request::parse(b"aliases"),
            Err(ProtocolError::MissingSeparator)
        ));
        assert!(matches!(
            Request::parse(b""),
            Err(ProtocolError::MissingSeparator)
        ));
    }

    #[test]
    fn test_request_parse_invalid_utf8() {
        assert!(matches!(
            Request::parse(b"aliases \xff\xfe"),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_request_payload() {
        let request = Request::new("aliases", "bob");
        assert_eq!(request.to_payload(), "aliases bob");
    }

    #[test]
    fn test_reply_payload() {
        assert_eq!(Reply::ok("bob@example.com").to_payload(), "OK bob@example.com");
        assert_eq!(Reply::temp("db unavailable").to_payload(), "TEMP db unavailable");
        assert_eq!(Reply::not_found().to_payload(), "NOTFOUND ");
        assert_eq!(Reply::timeout("slow").to_payload(), "TIMEOUT slow");
        assert_eq!(Reply::perm("no such map").to_payload(), "PERM no such map");
    }

    #[test]
    fn test_reply_parse() {
        let reply = Reply::parse(b"OK bob@example.com").unwrap();
        assert_eq!(reply, Reply::ok("bob@example.com"));
        assert!(reply.is_ok());

        let reply = Reply::parse(b"NOTFOUND ").unwrap();
        assert_eq!(reply, Reply::not_found());

        let reply = Reply::parse(b"NOTFOUND").unwrap();
        assert_eq!(reply, Reply::not_found());

        let reply = Reply::parse(b"TEMP db unavailable").unwrap();
        assert_eq!(reply.reply_type, ReplyType::Temp);
        assert_eq!(reply.value, "db unavailable");
    }

    #[test]
    fn test_reply_parse_unknown_type() {
        assert!(matches!(
            Reply::parse(b"FOUND bob"),
            Err(ProtocolError::UnknownReplyType(t)) if t == "FOUND"
        ));
    }

    #[test]
    fn test_reply_display() {
        assert_eq!(Reply::perm("denied").to_string(), "PERM denied");
    }
}
