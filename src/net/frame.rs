//! Data structures and functions for parsing and encoding values of RESP as
//! message frames in a network environment

use std::io::Cursor;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Error from parsing a frame
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// There's not enough bytes to form a frame
    #[error("Incomplete frame")]
    Incomplete,

    /// Unexpected bytes encountered during parse
    #[error("Invalid frame encoding")]
    BadEncoding,

    /// Could not read bytes as integer
    #[error("Could not parse bytes as an integer (got {0})")]
    NotInteger(String),

    /// Could not read bytes as utf8 string
    #[error("Could not parse bytes as an UTF-8 string - {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

/// A frame in [Redis Serialization Protocol (RESP)].
///
/// This is the smallest data unit that is accepted by the client and the server when
/// they communicate over the network.
///
/// [Redis Serialization Protocol (RESP)]: https://redis.io/topics/protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// An UTF-8 string that does not contain carriage-return nor line-feed used for sending
    /// general information.
    SimpleString(String),
    /// An UTF-8 string that does not contain carriage-return nor line-feed used for sending errors
    /// that occured.
    Error(String),
    /// A signed 64-bit number.
    Integer(i64),
    /// A bytes sequence.
    BulkString(Bytes),
    /// A sequence of frames.
    Array(Vec<Frame>),
    /// Nothingness
    Null,
}

impl Frame {
    /// Try to read data of a frame from the given reader.
    ///
    /// Returns the frame if it can be parsed from the reader, otherwise, returns an error.
    /// The error variant [`Error::Incomplete`] indicates that the reader does not have
    /// enough data for the frame; caller should retry later after receiving this error.
    pub fn parse(reader: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        match get_byte(reader)? {
            b'+' => {
                let l = get_line(reader)?;
                Ok(Frame::SimpleString(String::from_utf8(l.to_vec())?))
            }
            b'-' => {
                let l = get_line(reader)?;
                Ok(Frame::Error(String::from_utf8(l.to_vec())?))
            }
            b':' => Ok(Frame::Integer(get_integer(reader)?)),
            b'$' => match get_length(reader)? {
                None => Ok(Frame::Null),
                Some(len) => {
                    if reader.remaining() < len + 2 {
                        return Err(Error::Incomplete);
                    }
                    let b = reader.copy_to_bytes(len);
                    expect_crlf(reader)?;
                    Ok(Frame::BulkString(b))
                }
            },
            b'*' => match get_length(reader)? {
                // Null arrays are sent by some servers for blocking pops that timed out
                None => Ok(Frame::Null),
                Some(len) => {
                    let mut items = Vec::with_capacity(len);
                    for _ in 0..len {
                        items.push(Frame::parse(reader)?);
                    }
                    Ok(Frame::Array(items))
                }
            },
            _ => Err(Error::BadEncoding),
        }
    }

    /// Checks if a message frame can be parsed from the reader without memory allocations.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<(), Error> {
        match get_byte(buf)? {
            b'+' | b'-' => {
                get_line(buf)?;
            }
            b':' => {
                get_integer(buf)?;
            }
            b'$' => {
                if let Some(len) = get_length(buf)? {
                    skip(buf, len + 2)?;
                }
            }
            b'*' => {
                if let Some(len) = get_length(buf)? {
                    for _ in 0..len {
                        Frame::check(buf)?;
                    }
                }
            }
            _ => return Err(Error::BadEncoding),
        }
        Ok(())
    }

    /// Append the RESP encoding of the frame to `dst`.
    ///
    /// `Null` is written using the bulk string representation.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::SimpleString(s) => {
                dst.put_u8(b'+');
                dst.put_slice(s.as_bytes());
                dst.put_slice(b"\r\n");
            }
            Frame::Error(e) => {
                dst.put_u8(b'-');
                dst.put_slice(e.as_bytes());
                dst.put_slice(b"\r\n");
            }
            Frame::Integer(n) => {
                dst.put_u8(b':');
                put_decimal(dst, *n);
            }
            Frame::BulkString(b) => {
                dst.put_u8(b'$');
                put_decimal(dst, b.len() as i64);
                dst.put_slice(b);
                dst.put_slice(b"\r\n");
            }
            Frame::Array(items) => {
                dst.put_u8(b'*');
                put_decimal(dst, items.len() as i64);
                for item in items {
                    item.encode(dst);
                }
            }
            Frame::Null => dst.put_slice(b"$-1\r\n"),
        }
    }
}

fn put_decimal(dst: &mut BytesMut, n: i64) {
    dst.put_slice(n.to_string().as_bytes());
    dst.put_slice(b"\r\n");
}

/// Read until we encounter '\r' then skip 2 bytes for '\r\n'. Fails when there's a '\n'
/// before the '\r'.
fn get_line<'a>(buf: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = buf.position() as usize;
    let data: &'a [u8] = *buf.get_ref();
    for i in start..data.len().saturating_sub(1) {
        match data[i] {
            b'\r' => {
                buf.set_position((i + 2) as u64);
                return Ok(&data[start..i]);
            }
            b'\n' => return Err(Error::BadEncoding),
            _ => {}
        }
    }
    Err(Error::Incomplete)
}

fn get_integer(buf: &mut Cursor<&[u8]>) -> Result<i64, Error> {
    let line = get_line(buf)?;
    let (negative, digits) = match line.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, line),
    };
    let not_integer = || Error::NotInteger(String::from_utf8_lossy(line).into_owned());
    if digits.is_empty() {
        return Err(not_integer());
    }
    // accumulate towards the sign so that i64::MIN can be represented
    let mut num: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(not_integer());
        }
        let d = (b - b'0') as i64;
        num = num
            .checked_mul(10)
            .and_then(|n| {
                if negative {
                    n.checked_sub(d)
                } else {
                    n.checked_add(d)
                }
            })
            .ok_or_else(not_integer)?;
    }
    Ok(num)
}

/// Read the length prefix of a bulk string or an array. `-1` denotes a null value.
fn get_length(buf: &mut Cursor<&[u8]>) -> Result<Option<usize>, Error> {
    match get_integer(buf)? {
        -1 => Ok(None),
        n => usize::try_from(n).map(Some).map_err(|_| Error::BadEncoding),
    }
}

fn expect_crlf(buf: &mut Cursor<&[u8]>) -> Result<(), Error> {
    match (get_byte(buf)?, get_byte(buf)?) {
        (b'\r', b'\n') => Ok(()),
        _ => Err(Error::BadEncoding),
    }
}

fn get_byte(buf: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !buf.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(buf.get_u8())
}

fn skip(src: &mut Cursor<&[u8]>, n: usize) -> Result<(), Error> {
    if src.remaining() < n {
        return Err(Error::Incomplete);
    }
    src.advance(n);
    Ok(())
}
