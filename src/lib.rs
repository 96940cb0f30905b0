//! A typed facade over the Redis list commands.
//!
//! [`ListCommands`] turns each list operation into a [`CommandRequest`] naming the
//! command, its ordered arguments and the reply shape it expects, hands it to a
//! [`CommandExecutor`] and decodes the reply into plain Rust values. Two executors
//! are provided: [`net::Client`], which talks RESP2 to a Redis-compatible server,
//! and [`ListStore`], an in-memory store with Redis list semantics that also backs
//! the bundled [`net::Server`].
//!
//! ```no_run
//! # async fn run() -> Result<(), redlist::Error> {
//! use redlist::{net::Client, ListCommands, Utf8Codec};
//!
//! let client = Client::connect("127.0.0.1:6379").await?;
//! let lists = ListCommands::with_codec(client, Utf8Codec);
//! lists.rpush(&"queue".to_string(), &["a".to_string(), "b".to_string()]).await?;
//! assert_eq!(lists.lpop(&"queue".to_string()).await?, Some("a".to_string()));
//! # Ok(())
//! # }
//! ```

#![deny(rust_2018_idioms)]
#![warn(missing_docs)]

pub mod codec;
pub mod conf;
mod error;
mod executor;
pub mod lists;
pub mod net;
pub mod request;
mod shutdown;
pub mod store;
pub mod telemetry;

/// Default port of the service
pub const DEFAULT_PORT: u16 = 6379;

pub use codec::{BytesCodec, Codec, Utf8Codec};
pub use error::{Error, ErrorKind};
pub use executor::CommandExecutor;
pub use lists::{InsertPosition, KeyValue, LPosArgs, ListCommands};
pub use request::{Arg, CommandName, CommandReply, CommandRequest, ReplyShape};
pub use store::ListStore;
