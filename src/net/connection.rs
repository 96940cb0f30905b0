use std::io::{self, Cursor};

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter},
    net::TcpStream,
};

use super::frame::{self, Frame};

/// Error from reading or writing frames
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The peer sent bytes that do not form a frame
    #[error("Frame error - {0}")]
    Frame(#[from] frame::Error),

    /// The underlying stream failed
    #[error("I/O error - {0}")]
    Io(#[from] io::Error),
}

/// Sends and receives [`Frame`] values from the remote peer.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    // wraps a stream inside a BufWriter to reduce the number of write syscalls
    stream: BufWriter<S>,
    // buffered data from read operation
    buffer: BytesMut,
    // scratch space for encoding outgoing frames
    encoded: BytesMut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection over the given readable and writable stream, then
    /// initializes the inner read/write buffers
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufWriter::new(stream),
            buffer: BytesMut::with_capacity(8 * 1024),
            encoded: BytesMut::with_capacity(1024),
        }
    }

    /// Reads a single frame from the underlying stream
    ///
    /// Returns the received frame if succeeded. When the underlying stream is
    /// closed and there's no data left to be read, returns `None`. Otherwise,
    /// an error is returned.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                if self.buffer.is_empty() {
                    // Peer closed when all data is parsed
                    return Ok(None);
                }
                // The peer closed the socket while sending a frame.
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )
                .into());
            }
        }
    }

    /// Write a frame to the underlying stream and flush it
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), ConnectionError> {
        self.encoded.clear();
        frame.encode(&mut self.encoded);
        self.stream.write_all(&self.encoded).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut buf = Cursor::new(&self.buffer[..]);
        match Frame::check(&mut buf) {
            Ok(()) => {
                // Get the byte length of the frame
                let len = buf.position() as usize;

                // Parse the frame
                buf.set_position(0);
                let frame = Frame::parse(&mut buf)?;

                // Discard the frame from the buffer
                self.buffer.advance(len);

                Ok(Some(frame))
            }
            // Not enough data has been buffered
            Err(frame::Error::Incomplete) => Ok(None),
            // An error was encountered
            Err(e) => Err(e.into()),
        }
    }
}
