//! Asynchronous RESP server that applies list commands to a [`ListStore`].

use std::{convert::TryFrom, future::Future, io, net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    net::{TcpListener, TcpStream},
    sync::{broadcast, mpsc, Semaphore},
    time,
};
use tracing::{debug, error, info};

use super::{cmd::ListCommand, Config, Connection, Frame};
use crate::{error::Error, shutdown::Shutdown, store::ListStore};

/// Provide methods and hold states for a Redis server. The server will exit when `shutdown`
/// finishes, or when there's an error.
pub struct Server<S> {
    listener: Listener,
    shutdown: S,
}

/// The server's runtime state that is shared across all connections.
/// This is also in charge of listening for new inbound connections.
struct Listener {
    storage: ListStore,

    listener: TcpListener,

    min_backoff_ms: u64,
    max_backoff_ms: u64,

    // Each handler holds one permit and gives it back when dropped.
    limit_connections: Arc<Semaphore>,

    // Dropped to tell every active connection to stop.
    notify_shutdown: broadcast::Sender<()>,

    // The receiver yields `None` once every handler dropped its sender clone,
    // which is when the server can exit.
    shutdown_complete_rx: mpsc::Receiver<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
}

/// Reads client requests and applies those to the storage.
struct Handler {
    storage: ListStore,

    connection: Connection,

    // The semaphore that granted the permit for this handler.
    limit_connections: Arc<Semaphore>,

    shutdown: Shutdown,

    // Signals that the handler finishes executing.
    _shutdown_complete: mpsc::Sender<()>,
}

impl<S> Server<S> {
    /// Binds the listener described by `conf`.
    pub async fn new(storage: ListStore, shutdown: S, conf: Config) -> Result<Self, Error> {
        info!(?conf, "starting server");
        let (notify_shutdown, _) = broadcast::channel(1);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

        let listener = Listener {
            storage,
            listener: TcpListener::bind((conf.host, conf.port)).await?,
            min_backoff_ms: conf.min_backoff_ms,
            max_backoff_ms: conf.max_backoff_ms,
            limit_connections: Arc::new(Semaphore::new(conf.max_connections)),
            notify_shutdown,
            shutdown_complete_rx,
            shutdown_complete_tx,
        };

        Ok(Self { listener, shutdown })
    }

    /// The address the server is listening on
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.listener.local_addr()
    }
}

impl<S> Server<S>
where
    S: Future,
{
    /// Runs the server that exits when `shutdown` finishes, or when there's
    /// an error.
    pub async fn run(mut self) {
        tokio::select! {
            result = self.listener.listen() => {
                if let Err(err) = result {
                    // Accepting kept failing past the max backoff. Errors from
                    // individual connections never get here.
                    error!(cause = %err, "failed to accept");
                }
            }
            _ = self.shutdown => {
                info!("shutting down");
            }
        }

        let Listener {
            notify_shutdown,
            shutdown_complete_tx,
            mut shutdown_complete_rx,
            ..
        } = self.listener;

        // Handlers subscribed to this channel observe the drop and exit.
        drop(notify_shutdown);
        drop(shutdown_complete_tx);

        // Wait for all active connections to finish processing.
        shutdown_complete_rx.recv().await;
    }
}

impl Listener {
    /// Accepts a new connection.
    ///
    /// Retries with an exponential backoff when there's an error. If the backoff
    /// time passes the maximum allowed time, returns the last error.
    async fn accept(&mut self) -> Result<TcpStream, Error> {
        let mut backoff = self.min_backoff_ms.max(1);
        loop {
            match self.listener.accept().await {
                Ok((socket, _)) => return Ok(socket),
                Err(err) => {
                    if backoff > self.max_backoff_ms {
                        return Err(err.into());
                    }
                }
            }
            time::sleep(Duration::from_millis(backoff)).await;
            backoff <<= 1;
        }
    }

    async fn listen(&mut self) -> Result<(), Error> {
        info!("listening for new connections");

        loop {
            // The permit is given back by `Handler::drop` from another task, so it
            // is forgotten here instead of being released at the end of the scope.
            match self.limit_connections.acquire().await {
                Ok(permit) => permit.forget(),
                // the semaphore is never closed
                Err(_) => return Ok(()),
            }

            let socket = self.accept().await?;

            let handler = Handler {
                storage: self.storage.clone(),
                connection: Connection::new(socket),
                limit_connections: Arc::clone(&self.limit_connections),
                shutdown: Shutdown::new(self.notify_shutdown.subscribe()),
                _shutdown_complete: self.shutdown_complete_tx.clone(),
            };

            tokio::spawn(async move {
                if let Err(err) = handler.run().await {
                    error!(cause = ?err, "connection error");
                }
            });
        }
    }
}

impl Handler {
    /// Process a single connection.
    ///
    /// Commands that fail to parse are answered with an error reply and the
    /// connection stays open. Malformed frames close it. When the shutdown signal
    /// is received, pending commands are abandoned and the connection is closed.
    #[tracing::instrument(skip(self))]
    async fn run(mut self) -> Result<(), Error> {
        while !self.shutdown.is_shutdown() {
            let maybe_frame = tokio::select! {
                res = self.connection.read_frame() => res?,
                _ = self.shutdown.recv() => {
                    return Ok(());
                }
            };

            // The client closed the connection
            let frame = match maybe_frame {
                Some(frame) => frame,
                None => return Ok(()),
            };

            let response = match ListCommand::try_from(frame) {
                Ok(cmd) => {
                    debug!(?cmd);
                    tokio::select! {
                        response = self.storage.apply(cmd) => response,
                        _ = self.shutdown.recv() => {
                            return Ok(());
                        }
                    }
                }
                Err(err) => Frame::Error(format!("ERR {}", err)),
            };

            self.connection.write_frame(&response).await?;
        }
        Ok(())
    }
}

impl Drop for Handler {
    fn drop(&mut self) {
        self.limit_connections.add_permits(1);
    }
}
