//! Message Envelope
//!
//! The four frame kinds exchanged over a [`PipeChannel`], disambiguated by
//! a textual prefix.

/// Prefix for a pizza job dispatched to a kitchen.
pub const PIZZA_PREFIX: &str = "PIZZA:";
/// Prefix for a kitchen status report.
pub const STATUS_PREFIX: &str = "STATUS:";
/// Prefix for a cooked-pizza completion notice.
pub const COMPLETED_PREFIX: &str = "COMPLETED:";
/// Bare status pull request; carries no payload.
pub const STATUS_REQUEST: &str = "STATUS_REQUEST";

/// One decoded frame. Payloads are the record encodings of the domain
/// types and are not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// `PIZZA:<job>`: parent hands a job to a kitchen.
    Pizza(String),
    /// `STATUS:<status>`: kitchen answers a status request.
    Status(String),
    /// `COMPLETED:<job>`: kitchen reports a cooked pizza.
    Completed(String),
    /// `STATUS_REQUEST`: parent pulls a status report.
    StatusRequest,
}

impl Message {
    /// Decode a raw frame, or `None` if the prefix is not recognized.
    pub fn parse(frame: &str) -> Option<Message> {
        if frame == STATUS_REQUEST {
            return Some(Message::StatusRequest);
        }
        if let Some(payload) = frame.strip_prefix(PIZZA_PREFIX) {
            return Some(Message::Pizza(payload.to_string()));
        }
        if let Some(payload) = frame.strip_prefix(STATUS_PREFIX) {
            return Some(Message::Status(payload.to_string()));
        }
        if let Some(payload) = frame.strip_prefix(COMPLETED_PREFIX) {
            return Some(Message::Completed(payload.to_string()));
        }
        None
    }

    /// Render the frame text to put on the wire.
    pub fn encode(&self) -> String {
        match self {
            Message::Pizza(payload) => format!("{PIZZA_PREFIX}{payload}"),
            Message::Status(payload) => format!("{STATUS_PREFIX}{payload}"),
            Message::Completed(payload) => format!("{COMPLETED_PREFIX}{payload}"),
            Message::StatusRequest => STATUS_REQUEST.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_prefix() {
        assert_eq!(
            Message::parse("PIZZA:2|1|1000|0"),
            Some(Message::Pizza("2|1|1000|0".into()))
        );
        assert_eq!(
            Message::parse("STATUS:1|0|2|0|4|5,5,5,5,5,5,5,5,5"),
            Some(Message::Status("1|0|2|0|4|5,5,5,5,5,5,5,5,5".into()))
        );
        assert_eq!(
            Message::parse("COMPLETED:2|1|1000|1"),
            Some(Message::Completed("2|1|1000|1".into()))
        );
        assert_eq!(Message::parse("STATUS_REQUEST"), Some(Message::StatusRequest));
    }

    #[test]
    fn unknown_prefixes_are_rejected() {
        assert_eq!(Message::parse("PING"), None);
        assert_eq!(Message::parse(""), None);
        // Prefix matching is exact, including case.
        assert_eq!(Message::parse("pizza:2|1|1000|0"), None);
        // A bare request with a payload is not the request frame.
        assert_eq!(Message::parse("STATUS_REQUEST:now"), None);
    }

    #[test]
    fn encode_round_trips() {
        let frames = [
            Message::Pizza("8|16|4000|0".into()),
            Message::Status("3|1|2|1|4|5,4,3,2,1,0,10,9,8".into()),
            Message::Completed("8|16|4000|1".into()),
            Message::StatusRequest,
        ];
        for frame in frames {
            assert_eq!(Message::parse(&frame.encode()), Some(frame));
        }
    }

    #[test]
    fn empty_payloads_survive() {
        assert_eq!(Message::parse("PIZZA:"), Some(Message::Pizza(String::new())));
        assert_eq!(Message::Pizza(String::new()).encode(), "PIZZA:");
    }
}
