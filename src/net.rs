//! Redis serialization protocol (RESP2) transport for list commands: the frame
//! codec, a buffered connection, a client executor and a server backed by a
//! [`ListStore`](crate::store::ListStore).

mod client;
pub mod cmd;
mod config;
pub mod connection;
pub mod frame;
mod server;

pub use self::{
    client::Client, config::Config, connection::Connection, frame::Frame, server::Server,
};
