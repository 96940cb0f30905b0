use std::time::Duration;

use bytes::Bytes;

use super::Error;
use crate::{net::Frame, request::CommandName};

/// A parser that extracts the arguments of a command, in order
#[derive(Debug)]
pub struct Parser {
    command: CommandName,
    parts: std::vec::IntoIter<Bytes>,
}

impl Parser {
    /// Split a request frame into its command and a parser over the arguments.
    ///
    /// The frame must be a non-empty array of bulk strings.
    pub fn from_frame(frame: Frame) -> Result<(CommandName, Self), Error> {
        let items = match frame {
            Frame::Array(items) => items,
            frame => return Err(Error::BadFrame(frame)),
        };
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Frame::BulkString(b) => parts.push(b),
                frame => return Err(Error::BadFrame(frame)),
            }
        }
        let mut parts = parts.into_iter();
        let name = parts.next().ok_or(Error::UnknownCommand(String::new()))?;
        let command = CommandName::from_bytes(&name)
            .ok_or_else(|| Error::UnknownCommand(String::from_utf8_lossy(&name).into_owned()))?;
        Ok((command, Self { command, parts }))
    }

    /// Create a parser over already separated arguments
    pub fn new(command: CommandName, parts: Vec<Bytes>) -> Self {
        Self {
            command,
            parts: parts.into_iter(),
        }
    }

    /// Number of arguments that have not been consumed
    pub fn remaining(&self) -> usize {
        self.parts.len()
    }

    /// The next argument as raw bytes
    pub fn bytes(&mut self) -> Result<Bytes, Error> {
        self.parts.next().ok_or(Error::WrongArity(self.command))
    }

    /// Every argument that is left, in order
    pub fn rest(&mut self) -> Vec<Bytes> {
        self.parts.by_ref().collect()
    }

    /// The next argument as a signed 64-bit integer
    pub fn integer(&mut self) -> Result<i64, Error> {
        let b = self.bytes()?;
        parse_integer(&b)
    }

    /// The next argument matched case-insensitively against `keywords`.
    ///
    /// Returns the index of the matching keyword.
    pub fn keyword(&mut self, keywords: &[&str]) -> Result<usize, Error> {
        let b = self.bytes()?;
        keywords
            .iter()
            .position(|k| k.as_bytes().eq_ignore_ascii_case(&b))
            .ok_or(Error::Syntax)
    }

    /// Ensure there are no more arguments
    pub fn finish(&mut self) -> Result<(), Error> {
        match self.parts.next() {
            Some(_) => Err(Error::WrongArity(self.command)),
            None => Ok(()),
        }
    }
}

fn parse_integer(b: &[u8]) -> Result<i64, Error> {
    std::str::from_utf8(b)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(Error::NotInteger)
}

/// Parse a blocking timeout given in (possibly fractional) seconds
pub(super) fn parse_timeout(b: &[u8]) -> Result<Duration, Error> {
    let secs = std::str::from_utf8(b)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|secs| secs.is_finite())
        .ok_or(Error::BadTimeout)?;
    if secs < 0.0 {
        return Err(Error::NegativeTimeout);
    }
    Duration::try_from_secs_f64(secs).map_err(|_| Error::BadTimeout)
}
