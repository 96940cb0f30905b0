//! Typed list commands as received by the server and applied to a [`ListStore`].
//!
//! [`ListStore`]: crate::store::ListStore

mod parser;

use std::{convert::TryFrom, time::Duration};

use bytes::Bytes;
use thiserror::Error;

pub use self::parser::Parser;
use self::parser::parse_timeout;
use super::Frame;
use crate::{
    lists::InsertPosition,
    request::{CommandName, CommandRequest},
};

/// Error from parsing a command. The messages follow the ones Redis sends back.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The command is not a supported list command
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Too many or too few arguments
    #[error("wrong number of arguments for '{}' command", .0.as_str().to_lowercase())]
    WrongArity(CommandName),

    /// The request is not an array of bulk strings
    #[error("invalid request frame (got {0:?})")]
    BadFrame(Frame),

    /// An argument that should be an integer is not
    #[error("value is not an integer or out of range")]
    NotInteger,

    /// A timeout that is not a number of seconds
    #[error("timeout is not a float or out of range")]
    BadTimeout,

    /// A timeout below zero
    #[error("timeout is negative")]
    NegativeTimeout,

    /// An option has an unexpected name or value
    #[error("syntax error")]
    Syntax,

    /// LPOS was given a RANK of zero
    #[error("RANK can't be zero: use 1 to start from the first match, 2 from the second ... or use negative to start from the end of the list")]
    ZeroRank,

    /// LPOS was given a negative COUNT or MAXLEN
    #[error("{0} can't be negative")]
    Negative(&'static str),
}

/// One end of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    /// The first element
    Head,
    /// The last element
    Tail,
}

/// Enumeration of all the supported list commands. Each variant holds the parsed
/// arguments of its command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListCommand {
    /// BLPOP / BRPOP
    BlockingPop {
        /// Keys checked in order
        keys: Vec<Bytes>,
        /// Which end to pop from
        end: End,
        /// Zero blocks indefinitely
        timeout: Duration,
    },
    /// BRPOPLPUSH
    BlockingMove {
        /// Popped from the tail
        source: Bytes,
        /// Pushed at the head
        destination: Bytes,
        /// Zero blocks indefinitely
        timeout: Duration,
    },
    /// LINDEX
    Index {
        /// The list
        key: Bytes,
        /// Negative counts from the tail
        index: i64,
    },
    /// LINSERT
    Insert {
        /// The list
        key: Bytes,
        /// Before or after the pivot
        position: InsertPosition,
        /// The element to look for
        pivot: Bytes,
        /// The element to insert
        value: Bytes,
    },
    /// LLEN
    Len {
        /// The list
        key: Bytes,
    },
    /// LPOP / RPOP
    Pop {
        /// The list
        key: Bytes,
        /// Which end to pop from
        end: End,
    },
    /// LPOS
    Pos {
        /// The list
        key: Bytes,
        /// The element to look for
        value: Bytes,
        /// Non-zero, negative searches from the tail
        rank: i64,
        /// `None` replies a single position, `Some(0)` every match
        count: Option<usize>,
        /// Number of elements to scan, zero scans everything
        maxlen: usize,
    },
    /// LPUSH / LPUSHX / RPUSH / RPUSHX
    Push {
        /// The list
        key: Bytes,
        /// Pushed one after the other
        values: Vec<Bytes>,
        /// Which end to push to
        end: End,
        /// Only push when the list already exists
        existing_only: bool,
    },
    /// LRANGE
    Range {
        /// The list
        key: Bytes,
        /// Inclusive start
        start: i64,
        /// Inclusive stop
        stop: i64,
    },
    /// LREM
    Rem {
        /// The list
        key: Bytes,
        /// Sign selects the direction, zero removes all
        count: i64,
        /// The element to remove
        value: Bytes,
    },
    /// LSET
    Set {
        /// The list
        key: Bytes,
        /// Negative counts from the tail
        index: i64,
        /// The new element
        value: Bytes,
    },
    /// LTRIM
    Trim {
        /// The list
        key: Bytes,
        /// Inclusive start
        start: i64,
        /// Inclusive stop
        stop: i64,
    },
    /// RPOPLPUSH
    Move {
        /// Popped from the tail
        source: Bytes,
        /// Pushed at the head
        destination: Bytes,
    },
}

impl ListCommand {
    /// Parse the arguments of `command`.
    pub fn parse(command: CommandName, mut parser: Parser) -> Result<Self, Error> {
        let cmd = match command {
            CommandName::BLPop | CommandName::BRPop => {
                if parser.remaining() < 2 {
                    return Err(Error::WrongArity(command));
                }
                let mut keys = parser.rest();
                let timeout = keys.pop().ok_or(Error::WrongArity(command))?;
                ListCommand::BlockingPop {
                    keys,
                    end: if command == CommandName::BLPop {
                        End::Head
                    } else {
                        End::Tail
                    },
                    timeout: parse_timeout(&timeout)?,
                }
            }
            CommandName::BRPopLPush => ListCommand::BlockingMove {
                source: parser.bytes()?,
                destination: parser.bytes()?,
                timeout: parse_timeout(&parser.bytes()?)?,
            },
            CommandName::LIndex => ListCommand::Index {
                key: parser.bytes()?,
                index: parser.integer()?,
            },
            CommandName::LInsert => {
                let key = parser.bytes()?;
                let position = match parser.keyword(&["BEFORE", "AFTER"])? {
                    0 => InsertPosition::Before,
                    _ => InsertPosition::After,
                };
                ListCommand::Insert {
                    key,
                    position,
                    pivot: parser.bytes()?,
                    value: parser.bytes()?,
                }
            }
            CommandName::LLen => ListCommand::Len {
                key: parser.bytes()?,
            },
            CommandName::LPop | CommandName::RPop => ListCommand::Pop {
                key: parser.bytes()?,
                end: if command == CommandName::LPop {
                    End::Head
                } else {
                    End::Tail
                },
            },
            CommandName::LPos => return parse_lpos(parser),
            CommandName::LPush | CommandName::LPushX | CommandName::RPush | CommandName::RPushX => {
                let key = parser.bytes()?;
                let values = parser.rest();
                if values.is_empty() {
                    return Err(Error::WrongArity(command));
                }
                ListCommand::Push {
                    key,
                    values,
                    end: if matches!(command, CommandName::LPush | CommandName::LPushX) {
                        End::Head
                    } else {
                        End::Tail
                    },
                    existing_only: matches!(command, CommandName::LPushX | CommandName::RPushX),
                }
            }
            CommandName::LRange => ListCommand::Range {
                key: parser.bytes()?,
                start: parser.integer()?,
                stop: parser.integer()?,
            },
            CommandName::LRem => ListCommand::Rem {
                key: parser.bytes()?,
                count: parser.integer()?,
                value: parser.bytes()?,
            },
            CommandName::LSet => ListCommand::Set {
                key: parser.bytes()?,
                index: parser.integer()?,
                value: parser.bytes()?,
            },
            CommandName::LTrim => ListCommand::Trim {
                key: parser.bytes()?,
                start: parser.integer()?,
                stop: parser.integer()?,
            },
            CommandName::RPopLPush => ListCommand::Move {
                source: parser.bytes()?,
                destination: parser.bytes()?,
            },
        };
        parser.finish()?;
        Ok(cmd)
    }
}

/// LPOS key element [RANK rank] [COUNT num-matches] [MAXLEN len]
fn parse_lpos(mut parser: Parser) -> Result<ListCommand, Error> {
    let key = parser.bytes()?;
    let value = parser.bytes()?;
    let (mut rank, mut count, mut maxlen) = (1, None, 0);
    while parser.remaining() > 0 {
        let option = parser.keyword(&["RANK", "COUNT", "MAXLEN"])?;
        if parser.remaining() == 0 {
            return Err(Error::Syntax);
        }
        let n = parser.integer()?;
        match option {
            0 if n == 0 => return Err(Error::ZeroRank),
            0 => rank = n,
            1 => count = Some(usize::try_from(n).map_err(|_| Error::Negative("COUNT"))?),
            _ => maxlen = usize::try_from(n).map_err(|_| Error::Negative("MAXLEN"))?,
        }
    }
    Ok(ListCommand::Pos {
        key,
        value,
        rank,
        count,
        maxlen,
    })
}

impl TryFrom<Frame> for ListCommand {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        let (command, parser) = Parser::from_frame(frame)?;
        Self::parse(command, parser)
    }
}

impl TryFrom<&CommandRequest> for ListCommand {
    type Error = Error;

    fn try_from(request: &CommandRequest) -> Result<Self, Self::Error> {
        let parts = request.arguments().map(|arg| arg.to_bytes()).collect();
        Self::parse(request.command(), Parser::new(request.command(), parts))
    }
}
