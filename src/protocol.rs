// src/protocol.rs - Line-oriented ASCII framing for the servo-bus controller
//
// Request: <TOKEN><arg>,<arg>,...<END>   (bare <TOKEN><END> without args)
// Reply:   <TOKEN><int>,<int>,...<END>   (one item per servo)
use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::trajectory::Position;
use serde::{Deserialize, Serialize};

/// Logical operations understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Handshake; the controller echoes the greeting token.
    Hello,
    /// Read current servo positions.
    Query,
    /// Write goal positions; the controller echoes its state.
    Position,
}

/// Wire constants. All tokens must share one length since replies are
/// matched on their leading characters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Protocol {
    #[serde(default = "default_hello")]
    pub hello: String,
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_end_marker")]
    pub end_marker: String,
    /// Handshake attempts before giving up; 0 retries forever.
    #[serde(default)]
    pub handshake_attempts: u32,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            hello: default_hello(),
            query: default_query(),
            position: default_position(),
            separator: default_separator(),
            end_marker: default_end_marker(),
            handshake_attempts: 0,
        }
    }
}

fn default_hello() -> String { "HE".to_string() }
fn default_query() -> String { "QU".to_string() }
fn default_position() -> String { "PO".to_string() }
fn default_separator() -> String { ",".to_string() }
fn default_end_marker() -> String { "\r\n".to_string() }

impl Protocol {
    pub fn token(&self, command: Command) -> &str {
        match command {
            Command::Hello => &self.hello,
            Command::Query => &self.query,
            Command::Position => &self.position,
        }
    }

    /// Frame a command and its optional arguments.
    pub fn encode(&self, command: Command, args: Option<&[i32]>) -> String {
        let mut frame = String::from(self.token(command));
        if let Some(args) = args {
            let joined = args
                .iter()
                .map(|arg| arg.to_string())
                .collect::<Vec<_>>()
                .join(&self.separator);
            frame.push_str(&joined);
        }
        frame.push_str(&self.end_marker);
        frame
    }

    /// Parse the reply to `command` and check it carries `expected` items.
    pub fn decode(&self, command: Command, reply: &str, expected: usize) -> Result<Position, ChannelError> {
        let line = self.strip_end(reply);
        let token = self.token(command);

        let Some(payload) = line.strip_prefix(token) else {
            return Err(ChannelError::ProtocolMismatch {
                expected: token.to_string(),
                reply: line.to_string(),
            });
        };

        let items = if payload.is_empty() {
            Vec::new()
        } else {
            payload
                .split(self.separator.as_str())
                .map(|item| item.trim().parse::<i32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ChannelError::MalformedReply {
                    reply: line.to_string(),
                })?
        };

        if items.len() != expected {
            return Err(ChannelError::ArityMismatch {
                expected,
                got: items.len(),
            });
        }
        Ok(items)
    }

    /// Whether `reply` is exactly the handshake greeting.
    pub fn is_greeting(&self, reply: &str) -> bool {
        self.strip_end(reply) == self.hello
    }

    /// Split an incoming request into its command and arguments.
    /// Used by the controller side of the link.
    pub fn parse_request(&self, line: &str) -> Option<(Command, Vec<i32>)> {
        let line = self.strip_end(line);
        for command in [Command::Hello, Command::Query, Command::Position] {
            if let Some(rest) = line.strip_prefix(self.token(command)) {
                if rest.is_empty() {
                    return Some((command, Vec::new()));
                }
                let args = rest
                    .split(self.separator.as_str())
                    .map(|item| item.trim().parse::<i32>().ok())
                    .collect::<Option<Vec<_>>>()?;
                return Some((command, args));
            }
        }
        None
    }

    fn strip_end<'a>(&self, line: &'a str) -> &'a str {
        match line.strip_suffix(self.end_marker.as_str()) {
            Some(stripped) => stripped,
            None => line.trim_end_matches(['\r', '\n']),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tokens = [&self.hello, &self.query, &self.position];
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(ConfigError::Invalid("protocol tokens must not be empty".to_string()));
        }
        if tokens.iter().any(|t| t.len() != self.hello.len()) {
            return Err(ConfigError::Invalid("protocol tokens must all have the same length".to_string()));
        }
        if self.query == self.position || self.hello == self.query || self.hello == self.position {
            return Err(ConfigError::Invalid("protocol tokens must be distinct".to_string()));
        }
        if self.separator.is_empty() {
            return Err(ConfigError::Invalid("protocol separator must not be empty".to_string()));
        }
        if !self.end_marker.ends_with('\n') {
            return Err(ConfigError::Invalid("protocol end marker must end with a newline".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_without_args() {
        let protocol = Protocol::default();
        assert_eq!(protocol.encode(Command::Hello, None), "HE\r\n");
        assert_eq!(protocol.encode(Command::Query, None), "QU\r\n");
    }

    #[test]
    fn test_encode_position() {
        let protocol = Protocol::default();
        let frame = protocol.encode(Command::Position, Some(&[512, 0, 1023]));
        assert_eq!(frame, "PO512,0,1023\r\n");
    }

    #[test]
    fn test_decode_query_reply() {
        let protocol = Protocol::default();
        let position = protocol.decode(Command::Query, "QU1,2,3,4\r\n", 4).unwrap();
        assert_eq!(position, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_wrong_token() {
        let protocol = Protocol::default();
        let result = protocol.decode(Command::Position, "QU1,2\r\n", 2);
        match result {
            Err(ChannelError::ProtocolMismatch { expected, reply }) => {
                assert_eq!(expected, "PO");
                assert_eq!(reply, "QU1,2");
            }
            other => panic!("expected protocol mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_wrong_count() {
        let protocol = Protocol::default();
        let result = protocol.decode(Command::Query, "QU1,2,3\r\n", 4);
        assert!(matches!(
            result,
            Err(ChannelError::ArityMismatch { expected: 4, got: 3 })
        ));
        let empty = protocol.decode(Command::Query, "QU\r\n", 1);
        assert!(matches!(
            empty,
            Err(ChannelError::ArityMismatch { expected: 1, got: 0 })
        ));
    }

    #[test]
    fn test_decode_non_numeric() {
        let protocol = Protocol::default();
        let result = protocol.decode(Command::Query, "QU1,x,3\r\n", 3);
        assert!(matches!(result, Err(ChannelError::MalformedReply { .. })));
    }

    #[test]
    fn test_greeting_match_is_exact() {
        let protocol = Protocol::default();
        assert!(protocol.is_greeting("HE\r\n"));
        assert!(protocol.is_greeting("HE\n"));
        assert!(!protocol.is_greeting("HEX\r\n"));
        assert!(!protocol.is_greeting(""));
    }

    #[test]
    fn test_parse_request() {
        let protocol = Protocol::default();
        assert_eq!(protocol.parse_request("HE\r\n"), Some((Command::Hello, vec![])));
        assert_eq!(
            protocol.parse_request("PO5,6\r\n"),
            Some((Command::Position, vec![5, 6]))
        );
        assert_eq!(protocol.parse_request("ZZ\r\n"), None);
        assert_eq!(protocol.parse_request("PO5,?\r\n"), None);
    }

    #[test]
    fn test_validate_rejects_bad_constants() {
        let mut protocol = Protocol::default();
        assert!(protocol.validate().is_ok());
        protocol.end_marker = ";".to_string();
        assert!(protocol.validate().is_err());

        let mut protocol = Protocol::default();
        protocol.query = "QUERY".to_string();
        assert!(protocol.validate().is_err());
    }
}
