//! Request descriptors handed to a [`CommandExecutor`] and the replies they produce.
//!
//! A request carries the command identifier, its ordered arguments and the single
//! [`ReplyShape`] the caller expects. Executors use the shape to turn a raw RESP
//! reply into a [`CommandReply`]; the facade then applies the per-command table in
//! [`CommandName::normalize`] before decoding keys and values.
//!
//! [`CommandExecutor`]: crate::CommandExecutor

use std::{fmt, time::Duration};

use bytes::Bytes;

use crate::{
    error::{Error, ErrorKind},
    net::Frame,
};

/// The fixed set of list commands that can be dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// BLPOP key [key ...] timeout
    BLPop,
    /// BRPOP key [key ...] timeout
    BRPop,
    /// BRPOPLPUSH source destination timeout
    BRPopLPush,
    /// LINDEX key index
    LIndex,
    /// LINSERT key BEFORE|AFTER pivot element
    LInsert,
    /// LLEN key
    LLen,
    /// LPOP key
    LPop,
    /// LPOS key element [RANK rank] [COUNT num-matches] [MAXLEN len]
    LPos,
    /// LPUSH key element [element ...]
    LPush,
    /// LPUSHX key element [element ...]
    LPushX,
    /// LRANGE key start stop
    LRange,
    /// LREM key count element
    LRem,
    /// LSET key index element
    LSet,
    /// LTRIM key start stop
    LTrim,
    /// RPOP key
    RPop,
    /// RPOPLPUSH source destination
    RPopLPush,
    /// RPUSH key element [element ...]
    RPush,
    /// RPUSHX key element [element ...]
    RPushX,
}

impl CommandName {
    const ALL: [CommandName; 18] = [
        Self::BLPop,
        Self::BRPop,
        Self::BRPopLPush,
        Self::LIndex,
        Self::LInsert,
        Self::LLen,
        Self::LPop,
        Self::LPos,
        Self::LPush,
        Self::LPushX,
        Self::LRange,
        Self::LRem,
        Self::LSet,
        Self::LTrim,
        Self::RPop,
        Self::RPopLPush,
        Self::RPush,
        Self::RPushX,
    ];

    /// The command identifier as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::BLPop => "BLPOP",
            Self::BRPop => "BRPOP",
            Self::BRPopLPush => "BRPOPLPUSH",
            Self::LIndex => "LINDEX",
            Self::LInsert => "LINSERT",
            Self::LLen => "LLEN",
            Self::LPop => "LPOP",
            Self::LPos => "LPOS",
            Self::LPush => "LPUSH",
            Self::LPushX => "LPUSHX",
            Self::LRange => "LRANGE",
            Self::LRem => "LREM",
            Self::LSet => "LSET",
            Self::LTrim => "LTRIM",
            Self::RPop => "RPOP",
            Self::RPopLPush => "RPOPLPUSH",
            Self::RPush => "RPUSH",
            Self::RPushX => "RPUSHX",
        }
    }

    /// Look up a command by its case-insensitive identifier
    pub fn from_bytes(name: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.as_str().as_bytes().eq_ignore_ascii_case(name))
    }

    /// Map raw replies whose meaning depends on the command.
    ///
    /// - `LLEN` replies `0` when the key does not exist, since empty lists are never
    ///   stored. That becomes [`CommandReply::Absent`].
    /// - `LINSERT` replies `0` when the key does not exist. An absent key holds no
    ///   pivot, so it becomes the "pivot not found" sentinel `-1`.
    pub fn normalize(&self, reply: CommandReply) -> CommandReply {
        match (*self, reply) {
            (Self::LLen, CommandReply::Integer(0)) => CommandReply::Absent,
            (Self::LInsert, CommandReply::Integer(0)) => CommandReply::Integer(-1),
            (_, reply) => reply,
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single positional argument of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// An encoded key
    Key(Bytes),
    /// An encoded value
    Value(Bytes),
    /// A signed integer (index, count, rank...)
    Integer(i64),
    /// A blocking timeout, zero blocks indefinitely
    Timeout(Duration),
    /// A literal token such as `BEFORE` or `RANK`
    Keyword(&'static str),
}

impl Arg {
    /// Encode the argument as the bulk string sent to the server.
    ///
    /// Timeouts are written as seconds with millisecond precision, e.g. `"1.5"`
    /// for 1500ms and `"2"` for 2s. A non-zero timeout shorter than a millisecond
    /// is sent as `"0.001"`, since `"0"` would block indefinitely.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Arg::Key(b) | Arg::Value(b) => b.clone(),
            Arg::Integer(n) => Bytes::from(n.to_string()),
            Arg::Timeout(d) => {
                let millis = match d.subsec_millis() {
                    0 if d.as_secs() == 0 && !d.is_zero() => 1,
                    millis => millis,
                };
                if millis == 0 {
                    Bytes::from(d.as_secs().to_string())
                } else {
                    let frac = format!("{:03}", millis);
                    Bytes::from(format!("{}.{}", d.as_secs(), frac.trim_end_matches('0')))
                }
            }
            Arg::Keyword(k) => Bytes::from_static(k.as_bytes()),
        }
    }
}

/// The shape a reply is expected to take, fixed by the facade method that built
/// the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// A status line such as `OK`
    Status,
    /// A signed integer
    Integer,
    /// A single value
    Value,
    /// A `[key, value]` pair
    KeyValue,
    /// A sequence of integers
    Integers,
    /// A sequence of values
    Values,
}

impl ReplyShape {
    /// Returns `true` for shapes whose "no result" is an empty sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Integers | Self::Values)
    }

    /// Decode a raw reply frame into this shape.
    ///
    /// A nil reply becomes [`CommandReply::Absent`] for scalar shapes and an empty
    /// sequence for sequence shapes. An error frame becomes an error of kind
    /// [`ErrorKind::CommandFailed`] carrying the server's message.
    pub fn decode(&self, frame: Frame) -> Result<CommandReply, Error> {
        let reply = match (*self, frame) {
            (_, Frame::Error(msg)) => return Err(Error::new(ErrorKind::CommandFailed, msg)),
            (Self::Integers, Frame::Null) => CommandReply::Integers(Vec::new()),
            (Self::Values, Frame::Null) => CommandReply::Values(Vec::new()),
            (_, Frame::Null) => CommandReply::Absent,
            (Self::Status, Frame::SimpleString(s)) => CommandReply::Status(s),
            (Self::Integer, Frame::Integer(n)) => CommandReply::Integer(n),
            (Self::Value, Frame::BulkString(b)) => CommandReply::Value(b),
            (Self::KeyValue, Frame::Array(items)) => {
                let mut items = items.into_iter();
                match (items.next(), items.next(), items.next()) {
                    (Some(Frame::BulkString(k)), Some(Frame::BulkString(v)), None) => {
                        CommandReply::KeyValue(k, v)
                    }
                    _ => return Err(self.unexpected("malformed key-value array")),
                }
            }
            (Self::Integers, Frame::Array(items)) => CommandReply::Integers(
                items
                    .into_iter()
                    .map(|item| match item {
                        Frame::Integer(n) => Ok(n),
                        other => Err(self.unexpected(other)),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (Self::Values, Frame::Array(items)) => CommandReply::Values(
                items
                    .into_iter()
                    .map(|item| match item {
                        Frame::BulkString(b) => Ok(b),
                        other => Err(self.unexpected(other)),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            (_, other) => return Err(self.unexpected(other)),
        };
        Ok(reply)
    }

    fn unexpected<D: fmt::Debug>(&self, got: D) -> Error {
        Error::new(
            ErrorKind::UnexpectedReply,
            format!("expected {:?} reply, got {:?}", self, got),
        )
    }
}

/// A reply decoded according to its request's [`ReplyShape`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// The server replied nil
    Absent,
    /// A status line
    Status(String),
    /// A signed integer
    Integer(i64),
    /// A single value
    Value(Bytes),
    /// A key and the value popped from it
    KeyValue(Bytes, Bytes),
    /// A sequence of integers
    Integers(Vec<i64>),
    /// A sequence of values
    Values(Vec<Bytes>),
}

/// Descriptor of a single command dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    command: CommandName,
    args: Vec<Arg>,
    shape: ReplyShape,
}

impl CommandRequest {
    /// Create a request without arguments
    pub fn new(command: CommandName, shape: ReplyShape) -> Self {
        Self {
            command,
            args: Vec::new(),
            shape,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Append several arguments, keeping their order
    pub fn args<I>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = Arg>,
    {
        self.args.extend(args);
        self
    }

    /// The command identifier
    pub fn command(&self) -> CommandName {
        self.command
    }

    /// The expected reply shape
    pub fn shape(&self) -> ReplyShape {
        self.shape
    }

    /// Iterate over the arguments in order
    pub fn arguments(&self) -> std::slice::Iter<'_, Arg> {
        self.args.iter()
    }

    /// Iterate over the keys named by the request
    pub fn keys(&self) -> impl Iterator<Item = &Bytes> {
        self.args.iter().filter_map(|arg| match arg {
            Arg::Key(k) => Some(k),
            _ => None,
        })
    }
}

impl From<&CommandRequest> for Frame {
    fn from(request: &CommandRequest) -> Self {
        let mut items = Vec::with_capacity(request.args.len() + 1);
        items.push(Frame::BulkString(Bytes::from_static(
            request.command.as_str().as_bytes(),
        )));
        items.extend(request.args.iter().map(|a| Frame::BulkString(a.to_bytes())));
        Frame::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_encodes_as_bulk_array() {
        let request = CommandRequest::new(CommandName::BLPop, ReplyShape::KeyValue)
            .args([Arg::Key("a".into()), Arg::Key("b".into())])
            .arg(Arg::Timeout(Duration::from_millis(1500)));
        assert_eq!(
            Frame::from(&request),
            Frame::Array(vec![
                Frame::BulkString("BLPOP".into()),
                Frame::BulkString("a".into()),
                Frame::BulkString("b".into()),
                Frame::BulkString("1.5".into()),
            ])
        );
        assert_eq!(request.keys().count(), 2);
    }

    #[test]
    fn timeout_encoding() {
        assert_eq!(Arg::Timeout(Duration::ZERO).to_bytes(), "0");
        assert_eq!(Arg::Timeout(Duration::from_secs(3)).to_bytes(), "3");
        assert_eq!(Arg::Timeout(Duration::from_millis(250)).to_bytes(), "0.25");
        assert_eq!(Arg::Timeout(Duration::from_millis(2005)).to_bytes(), "2.005");
        assert_eq!(Arg::Timeout(Duration::from_micros(500)).to_bytes(), "0.001");
        assert_eq!(Arg::Timeout(Duration::from_nanos(1)).to_bytes(), "0.001");
        assert_eq!(Arg::Timeout(Duration::new(1, 500)).to_bytes(), "1");
    }

    #[test]
    fn command_lookup_ignores_case() {
        assert_eq!(CommandName::from_bytes(b"lpush"), Some(CommandName::LPush));
        assert_eq!(
            CommandName::from_bytes(b"BrPopLPush"),
            Some(CommandName::BRPopLPush)
        );
        assert_eq!(CommandName::from_bytes(b"GET"), None);
    }

    #[test]
    fn nil_decodes_by_shape() {
        for shape in [
            ReplyShape::Status,
            ReplyShape::Integer,
            ReplyShape::Value,
            ReplyShape::KeyValue,
        ] {
            assert_eq!(shape.decode(Frame::Null).unwrap(), CommandReply::Absent);
        }
        assert_eq!(
            ReplyShape::Integers.decode(Frame::Null).unwrap(),
            CommandReply::Integers(vec![])
        );
        assert_eq!(
            ReplyShape::Values.decode(Frame::Null).unwrap(),
            CommandReply::Values(vec![])
        );
    }

    #[test]
    fn error_frame_is_command_failure() {
        let err = ReplyShape::Status
            .decode(Frame::Error("ERR no such key".into()))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::CommandFailed));
        assert_eq!(err.to_string(), "command failed: ERR no such key");
    }

    #[test]
    fn mismatched_frame_is_unexpected_reply() {
        let err = ReplyShape::Integer
            .decode(Frame::BulkString("x".into()))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnexpectedReply));

        let err = ReplyShape::KeyValue
            .decode(Frame::Array(vec![Frame::BulkString("k".into())]))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnexpectedReply));

        let err = ReplyShape::Integers
            .decode(Frame::Array(vec![Frame::Integer(1), Frame::Null]))
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnexpectedReply));
    }

    #[test]
    fn key_value_pair_decodes() {
        let reply = ReplyShape::KeyValue
            .decode(Frame::Array(vec![
                Frame::BulkString("list".into()),
                Frame::BulkString("item".into()),
            ]))
            .unwrap();
        assert_eq!(reply, CommandReply::KeyValue("list".into(), "item".into()));
    }

    #[test]
    fn per_command_sentinels() {
        assert_eq!(
            CommandName::LLen.normalize(CommandReply::Integer(0)),
            CommandReply::Absent
        );
        assert_eq!(
            CommandName::LLen.normalize(CommandReply::Integer(4)),
            CommandReply::Integer(4)
        );
        assert_eq!(
            CommandName::LInsert.normalize(CommandReply::Integer(0)),
            CommandReply::Integer(-1)
        );
        assert_eq!(
            CommandName::LInsert.normalize(CommandReply::Integer(-1)),
            CommandReply::Integer(-1)
        );
        // pushes on an absent key report a zero length, not absence
        assert_eq!(
            CommandName::LPushX.normalize(CommandReply::Integer(0)),
            CommandReply::Integer(0)
        );
    }
}
