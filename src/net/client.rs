use std::io;

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, ToSocketAddrs},
    sync::Mutex,
};
use tracing::debug;

use super::{Connection, Frame};
use crate::{
    error::Error,
    executor::CommandExecutor,
    request::{CommandReply, CommandRequest},
};

/// A [`CommandExecutor`] that sends requests to a Redis server over a single
/// connection.
///
/// Requests are serialized: a blocking pop holds the connection until the server
/// replies, so callers that block concurrently should each use their own client.
/// A request whose future is dropped before completion may leave its reply unread,
/// after which the client must not be reused.
#[derive(Debug)]
pub struct Client<S = TcpStream> {
    conn: Mutex<Connection<S>>,
}

impl Client {
    /// Attempt to connect to the Redis server located at the given address.
    pub async fn connect<A>(addr: A) -> Result<Self, Error>
    where
        A: ToSocketAddrs,
    {
        let tcp = TcpStream::connect(addr).await?;
        Ok(Self::new(tcp))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Use an already established stream
    pub fn new(stream: S) -> Self {
        Self {
            conn: Mutex::new(Connection::new(stream)),
        }
    }
}

#[async_trait]
impl<S> CommandExecutor for Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn execute(&self, request: &CommandRequest) -> Result<CommandReply, Error> {
        let frame = Frame::from(request);
        let mut conn = self.conn.lock().await;
        conn.write_frame(&frame).await?;
        debug!(request = ?frame);

        let response = conn.read_frame().await?.ok_or_else(|| {
            // Server closes socket without sending data
            io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by server")
        })?;
        debug!(?response);

        request.shape().decode(response)
    }
}
