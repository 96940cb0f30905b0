//! Errors that occur when dispatching list commands

use std::fmt;

use crate::request::CommandRequest;

/// Error returned by the list command facade and its executors
#[derive(Debug)]
pub struct Error {
    repr: Repr,
}

impl Error {
    /// Create a new error
    pub fn new<E>(kind: ErrorKind, error: E) -> Error
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let error = error.into();
        Self {
            repr: Repr::Custom(Box::new(CustomRepr { kind, error })),
        }
    }

    /// Get the underlying error kind. Returns `None` if the error was propagated from
    /// third party sources
    pub fn kind(&self) -> Option<ErrorKind> {
        match self.repr {
            Repr::Simple(ref kind) => Some(*kind),
            Repr::Custom(ref repr) => Some(repr.kind),
            Repr::Command(ref repr) => repr.error.kind(),
            _ => None,
        }
    }

    /// Returns the underlying I/O error kind if the error came from the transport.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self.repr {
            Repr::IoError(ref e) => Some(e.kind()),
            Repr::Command(ref repr) => repr.error.io_kind(),
            _ => None,
        }
    }

    /// Attach the name and keys of the command that failed.
    ///
    /// The error kind is preserved and the original error stays reachable through
    /// [`source`](std::error::Error::source). Errors that already carry a command
    /// are returned unchanged.
    pub(crate) fn context(self, request: &CommandRequest) -> Self {
        if let Repr::Command(_) = self.repr {
            return self;
        }
        let keys = request
            .keys()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect();
        Self {
            repr: Repr::Command(Box::new(CommandRepr {
                command: request.command().as_str(),
                keys,
                error: self,
            })),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.repr {
            Repr::Simple(_) => None,
            Repr::Custom(ref repr) => Some(repr.error.as_ref()),
            Repr::Command(ref repr) => Some(&repr.error),
            Repr::FromUtf8Error(ref e) => Some(e),
            Repr::IoError(ref e) => Some(e),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::Simple(ref kind) => write!(f, "{}", kind.as_str()),
            Repr::Custom(ref repr) => write!(f, "{}: {}", repr.kind.as_str(), repr.error),
            Repr::Command(ref repr) => {
                write!(f, "{}", repr.command)?;
                for key in &repr.keys {
                    write!(f, " {}", key)?;
                }
                write!(f, ": {}", repr.error)
            }
            Repr::FromUtf8Error(ref e) => write!(f, "{}", e),
            Repr::IoError(ref e) => write!(f, "{}", e),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            repr: Repr::Simple(kind),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self {
            repr: Repr::FromUtf8Error(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self {
            repr: Repr::IoError(err),
        }
    }
}

impl From<crate::net::connection::ConnectionError> for Error {
    fn from(err: crate::net::connection::ConnectionError) -> Self {
        use crate::net::{connection::ConnectionError, frame};
        match err {
            ConnectionError::Io(e) => e.into(),
            ConnectionError::Frame(e @ frame::Error::Incomplete) => {
                Error::new(ErrorKind::IncompleteFrame, e)
            }
            ConnectionError::Frame(e) => Error::new(ErrorKind::InvalidFrame, e),
        }
    }
}

/// Different custom errors returned by the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input was rejected before the command was dispatched
    InvalidArgument,
    /// The server replied with an error
    CommandFailed,
    /// Frame's data has not been fully received
    IncompleteFrame,
    /// Frame bytes are not valid RESP
    InvalidFrame,
    /// Received a reply that does not fit the expected shape
    UnexpectedReply,
}

impl ErrorKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match *self {
            Self::InvalidArgument => "invalid argument",
            Self::CommandFailed => "command failed",
            Self::IncompleteFrame => "incomplete frame",
            Self::InvalidFrame => "invalid frame",
            Self::UnexpectedReply => "unexpected reply",
        }
    }
}

#[derive(Debug)]
enum Repr {
    Simple(ErrorKind),
    Custom(Box<CustomRepr>),
    Command(Box<CommandRepr>),

    /// Reply bytes could not be read as an UTF8 encoded string
    FromUtf8Error(std::string::FromUtf8Error),
    /// Error from I/O operations
    IoError(std::io::Error),
}

#[derive(Debug)]
struct CustomRepr {
    kind: ErrorKind,
    error: Box<dyn std::error::Error + Send + Sync>,
}

#[derive(Debug)]
struct CommandRepr {
    command: &'static str,
    keys: Vec<String>,
    error: Error,
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;
    use crate::request::{Arg, CommandName, ReplyShape};

    #[test]
    fn context_names_command_and_keys() {
        let request = CommandRequest::new(CommandName::LSet, ReplyShape::Status)
            .arg(Arg::Key("mylist".into()))
            .arg(Arg::Integer(10))
            .arg(Arg::Value("x".into()));
        let err = Error::new(ErrorKind::CommandFailed, "ERR index out of range").context(&request);

        assert_eq!(err.kind(), Some(ErrorKind::CommandFailed));
        assert_eq!(
            err.to_string(),
            "LSET mylist: command failed: ERR index out of range"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn context_keeps_io_kind() {
        let request = CommandRequest::new(CommandName::LLen, ReplyShape::Integer)
            .arg(Arg::Key("a".into()));
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = Error::from(io).context(&request);

        assert_eq!(err.kind(), None);
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::ConnectionReset));
    }

    #[test]
    fn context_is_applied_once() {
        let request = CommandRequest::new(CommandName::LLen, ReplyShape::Integer)
            .arg(Arg::Key("a".into()));
        let err = Error::from(ErrorKind::UnexpectedReply)
            .context(&request)
            .context(&request);
        assert_eq!(err.to_string(), "LLEN a: unexpected reply");
    }
}
