//! Typed facade over the Redis list commands.
//!
//! Every method validates its arguments, builds a [`CommandRequest`] with a fixed
//! [`ReplyShape`], awaits the [`CommandExecutor`] and decodes the reply with the
//! facade's [`Codec`]. Absence is reported as `None` or an empty `Vec`, never as an
//! error.

use std::time::Duration;

use crate::{
    codec::{BytesCodec, Codec},
    error::{Error, ErrorKind},
    executor::CommandExecutor,
    request::{Arg, CommandName, CommandReply, CommandRequest, ReplyShape},
};

/// A key together with the value that was popped from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<K, V> {
    /// The key holding the list
    pub key: K,
    /// The popped value
    pub value: V,
}

/// Where LINSERT places the new element relative to the pivot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Insert before the pivot
    Before,
    /// Insert after the pivot
    After,
}

impl InsertPosition {
    fn keyword(&self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
        }
    }
}

/// Options for LPOS.
///
/// `rank` selects which match to return: `1` is the first match from the head,
/// `2` the second, `-1` the first match from the tail and so on. `maxlen` bounds
/// the number of elements scanned, `0` scans the whole list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LPosArgs {
    rank: Option<i64>,
    maxlen: Option<i64>,
}

impl LPosArgs {
    /// Options that leave the server defaults untouched
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rank of the first match to return
    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Set the maximum number of elements to compare
    pub fn maxlen(mut self, maxlen: i64) -> Self {
        self.maxlen = Some(maxlen);
        self
    }

    fn to_args(self) -> Vec<Arg> {
        let mut args = Vec::new();
        if let Some(rank) = self.rank {
            args.push(Arg::Keyword("RANK"));
            args.push(Arg::Integer(rank));
        }
        if let Some(maxlen) = self.maxlen {
            args.push(Arg::Keyword("MAXLEN"));
            args.push(Arg::Integer(maxlen));
        }
        args
    }
}

/// Provides one asynchronous method per list command.
///
/// The facade holds no mutable state, so a single instance can be shared between
/// tasks. Ordering between concurrent calls is whatever the executor provides.
#[derive(Debug, Clone)]
pub struct ListCommands<E, C = BytesCodec> {
    executor: E,
    codec: C,
}

impl<E> ListCommands<E, BytesCodec>
where
    E: CommandExecutor,
{
    /// Create a facade whose keys and values are raw bytes
    pub fn new(executor: E) -> Self {
        Self::with_codec(executor, BytesCodec)
    }
}

impl<E, C> ListCommands<E, C>
where
    E: CommandExecutor,
    C: Codec,
{
    /// Create a facade that converts keys and values with the given codec
    pub fn with_codec(executor: E, codec: C) -> Self {
        Self { executor, codec }
    }

    /// The executor requests are dispatched to
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Remove and get the first element of the first non-empty list among `keys`,
    /// waiting up to `timeout` for one to become available.
    ///
    /// A zero timeout waits indefinitely. Returns `None` once the timeout elapses.
    #[tracing::instrument(skip(self, keys))]
    pub async fn blpop(
        &self,
        timeout: Duration,
        keys: &[C::Key],
    ) -> Result<Option<KeyValue<C::Key, C::Value>>, Error> {
        self.blocking_pop(CommandName::BLPop, timeout, keys).await
    }

    /// Remove and get the last element of the first non-empty list among `keys`,
    /// waiting up to `timeout` for one to become available.
    ///
    /// A zero timeout waits indefinitely. Returns `None` once the timeout elapses.
    #[tracing::instrument(skip(self, keys))]
    pub async fn brpop(
        &self,
        timeout: Duration,
        keys: &[C::Key],
    ) -> Result<Option<KeyValue<C::Key, C::Value>>, Error> {
        self.blocking_pop(CommandName::BRPop, timeout, keys).await
    }

    /// Pop the last element of `source`, push it to the head of `destination` and
    /// return it, waiting up to `timeout` for `source` to become non-empty.
    #[tracing::instrument(skip(self, source, destination))]
    pub async fn brpoplpush(
        &self,
        timeout: Duration,
        source: &C::Key,
        destination: &C::Key,
    ) -> Result<Option<C::Value>, Error> {
        let request = CommandRequest::new(CommandName::BRPopLPush, ReplyShape::Value)
            .arg(self.key(source))
            .arg(self.key(destination))
            .arg(Arg::Timeout(timeout));
        let reply = self.dispatch(request).await?;
        self.optional_value(reply)
    }

    /// Get the element at `index`, negative indices count from the tail.
    #[tracing::instrument(skip(self, key))]
    pub async fn lindex(&self, key: &C::Key, index: i64) -> Result<Option<C::Value>, Error> {
        let request = CommandRequest::new(CommandName::LIndex, ReplyShape::Value)
            .arg(self.key(key))
            .arg(Arg::Integer(index));
        let reply = self.dispatch(request).await?;
        self.optional_value(reply)
    }

    /// Insert `value` before or after `pivot`.
    ///
    /// Returns the new length, or `-1` when the pivot is not found. A missing key
    /// holds no pivot and also reports `-1`.
    #[tracing::instrument(skip(self, key, pivot, value))]
    pub async fn linsert(
        &self,
        key: &C::Key,
        position: InsertPosition,
        pivot: &C::Value,
        value: &C::Value,
    ) -> Result<Option<i64>, Error> {
        let request = CommandRequest::new(CommandName::LInsert, ReplyShape::Integer)
            .arg(self.key(key))
            .arg(Arg::Keyword(position.keyword()))
            .arg(self.value(pivot))
            .arg(self.value(value));
        let reply = self.dispatch(request).await?;
        optional_integer(reply)
    }

    /// Get the length of a list, `None` if the key does not exist.
    #[tracing::instrument(skip(self, key))]
    pub async fn llen(&self, key: &C::Key) -> Result<Option<i64>, Error> {
        let request =
            CommandRequest::new(CommandName::LLen, ReplyShape::Integer).arg(self.key(key));
        let reply = self.dispatch(request).await?;
        optional_integer(reply)
    }

    /// Remove and get the first element of a list.
    #[tracing::instrument(skip(self, key))]
    pub async fn lpop(&self, key: &C::Key) -> Result<Option<C::Value>, Error> {
        self.pop(CommandName::LPop, key).await
    }

    /// Get the index of the first element matching `value`.
    #[tracing::instrument(skip(self, key, value))]
    pub async fn lpos(
        &self,
        key: &C::Key,
        value: &C::Value,
        args: Option<LPosArgs>,
    ) -> Result<Option<i64>, Error> {
        let request = CommandRequest::new(CommandName::LPos, ReplyShape::Integer)
            .arg(self.key(key))
            .arg(self.value(value))
            .args(args.map(LPosArgs::to_args).unwrap_or_default());
        let reply = self.dispatch(request).await?;
        optional_integer(reply)
    }

    /// Get the indices of up to `count` elements matching `value`, `0` returns
    /// every match within the scanned range.
    ///
    /// Returns an empty `Vec` when nothing matches.
    #[tracing::instrument(skip(self, key, value))]
    pub async fn lpos_count(
        &self,
        key: &C::Key,
        value: &C::Value,
        count: usize,
        args: Option<LPosArgs>,
    ) -> Result<Vec<i64>, Error> {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        let request = CommandRequest::new(CommandName::LPos, ReplyShape::Integers)
            .arg(self.key(key))
            .arg(self.value(value))
            .arg(Arg::Keyword("COUNT"))
            .arg(Arg::Integer(count))
            .args(args.map(LPosArgs::to_args).unwrap_or_default());
        match self.dispatch(request).await? {
            CommandReply::Integers(positions) => Ok(positions),
            reply => Err(unexpected(reply)),
        }
    }

    /// Prepend `values` one after the other, so the last one ends up at the head.
    ///
    /// Returns the length of the list after the push.
    #[tracing::instrument(skip(self, key, values))]
    pub async fn lpush(&self, key: &C::Key, values: &[C::Value]) -> Result<Option<i64>, Error> {
        self.push(CommandName::LPush, key, values).await
    }

    /// Prepend `values` only if the list exists, otherwise returns `Some(0)` and
    /// leaves the key absent.
    #[tracing::instrument(skip(self, key, values))]
    pub async fn lpushx(&self, key: &C::Key, values: &[C::Value]) -> Result<Option<i64>, Error> {
        self.push(CommandName::LPushX, key, values).await
    }

    /// Get the elements between `start` and `stop`, both inclusive. Negative
    /// indices count from the tail.
    #[tracing::instrument(skip(self, key))]
    pub async fn lrange(
        &self,
        key: &C::Key,
        start: i64,
        stop: i64,
    ) -> Result<Vec<C::Value>, Error> {
        let request = CommandRequest::new(CommandName::LRange, ReplyShape::Values)
            .arg(self.key(key))
            .arg(Arg::Integer(start))
            .arg(Arg::Integer(stop));
        match self.dispatch(request).await? {
            CommandReply::Values(values) => values
                .into_iter()
                .map(|v| self.codec.decode_value(v))
                .collect(),
            reply => Err(unexpected(reply)),
        }
    }

    /// Remove elements equal to `value`.
    ///
    /// A positive `count` removes up to `count` matches from head to tail, a
    /// negative one from tail to head and `0` removes every match. Returns the
    /// number of removed elements.
    #[tracing::instrument(skip(self, key, value))]
    pub async fn lrem(
        &self,
        key: &C::Key,
        count: i64,
        value: &C::Value,
    ) -> Result<Option<i64>, Error> {
        let request = CommandRequest::new(CommandName::LRem, ReplyShape::Integer)
            .arg(self.key(key))
            .arg(Arg::Integer(count))
            .arg(self.value(value));
        let reply = self.dispatch(request).await?;
        optional_integer(reply)
    }

    /// Set the element at `index`. The server rejects out of range indices and
    /// missing keys.
    #[tracing::instrument(skip(self, key, value))]
    pub async fn lset(
        &self,
        key: &C::Key,
        index: i64,
        value: &C::Value,
    ) -> Result<Option<String>, Error> {
        let request = CommandRequest::new(CommandName::LSet, ReplyShape::Status)
            .arg(self.key(key))
            .arg(Arg::Integer(index))
            .arg(self.value(value));
        let reply = self.dispatch(request).await?;
        optional_status(reply)
    }

    /// Trim a list to the elements between `start` and `stop`, both inclusive.
    #[tracing::instrument(skip(self, key))]
    pub async fn ltrim(
        &self,
        key: &C::Key,
        start: i64,
        stop: i64,
    ) -> Result<Option<String>, Error> {
        let request = CommandRequest::new(CommandName::LTrim, ReplyShape::Status)
            .arg(self.key(key))
            .arg(Arg::Integer(start))
            .arg(Arg::Integer(stop));
        let reply = self.dispatch(request).await?;
        optional_status(reply)
    }

    /// Remove and get the last element of a list.
    #[tracing::instrument(skip(self, key))]
    pub async fn rpop(&self, key: &C::Key) -> Result<Option<C::Value>, Error> {
        self.pop(CommandName::RPop, key).await
    }

    /// Pop the last element of `source`, push it to the head of `destination` and
    /// return it.
    #[tracing::instrument(skip(self, source, destination))]
    pub async fn rpoplpush(
        &self,
        source: &C::Key,
        destination: &C::Key,
    ) -> Result<Option<C::Value>, Error> {
        let request = CommandRequest::new(CommandName::RPopLPush, ReplyShape::Value)
            .arg(self.key(source))
            .arg(self.key(destination));
        let reply = self.dispatch(request).await?;
        self.optional_value(reply)
    }

    /// Append `values` in the given order.
    ///
    /// Returns the length of the list after the push.
    #[tracing::instrument(skip(self, key, values))]
    pub async fn rpush(&self, key: &C::Key, values: &[C::Value]) -> Result<Option<i64>, Error> {
        self.push(CommandName::RPush, key, values).await
    }

    /// Append `values` only if the list exists, otherwise returns `Some(0)` and
    /// leaves the key absent.
    #[tracing::instrument(skip(self, key, values))]
    pub async fn rpushx(&self, key: &C::Key, values: &[C::Value]) -> Result<Option<i64>, Error> {
        self.push(CommandName::RPushX, key, values).await
    }

    async fn blocking_pop(
        &self,
        command: CommandName,
        timeout: Duration,
        keys: &[C::Key],
    ) -> Result<Option<KeyValue<C::Key, C::Value>>, Error> {
        require_non_empty(command, keys, "key")?;
        let request = CommandRequest::new(command, ReplyShape::KeyValue)
            .args(keys.iter().map(|k| self.key(k)))
            .arg(Arg::Timeout(timeout));
        match self.dispatch(request).await? {
            CommandReply::Absent => Ok(None),
            CommandReply::KeyValue(key, value) => Ok(Some(KeyValue {
                key: self.codec.decode_key(key)?,
                value: self.codec.decode_value(value)?,
            })),
            reply => Err(unexpected(reply)),
        }
    }

    async fn pop(&self, command: CommandName, key: &C::Key) -> Result<Option<C::Value>, Error> {
        let request = CommandRequest::new(command, ReplyShape::Value).arg(self.key(key));
        let reply = self.dispatch(request).await?;
        self.optional_value(reply)
    }

    async fn push(
        &self,
        command: CommandName,
        key: &C::Key,
        values: &[C::Value],
    ) -> Result<Option<i64>, Error> {
        require_non_empty(command, values, "value")?;
        let request = CommandRequest::new(command, ReplyShape::Integer)
            .arg(self.key(key))
            .args(values.iter().map(|v| self.value(v)));
        let reply = self.dispatch(request).await?;
        optional_integer(reply)
    }

    /// Sends the request and applies the per-command reply table. Executor errors
    /// are tagged with the command and its keys.
    async fn dispatch(&self, request: CommandRequest) -> Result<CommandReply, Error> {
        match self.executor.execute(&request).await {
            Ok(reply) => Ok(request.command().normalize(reply)),
            Err(err) => Err(err.context(&request)),
        }
    }

    fn key(&self, key: &C::Key) -> Arg {
        Arg::Key(self.codec.encode_key(key))
    }

    fn value(&self, value: &C::Value) -> Arg {
        Arg::Value(self.codec.encode_value(value))
    }

    fn optional_value(&self, reply: CommandReply) -> Result<Option<C::Value>, Error> {
        match reply {
            CommandReply::Absent => Ok(None),
            CommandReply::Value(v) => self.codec.decode_value(v).map(Some),
            reply => Err(unexpected(reply)),
        }
    }
}

fn optional_integer(reply: CommandReply) -> Result<Option<i64>, Error> {
    match reply {
        CommandReply::Absent => Ok(None),
        CommandReply::Integer(n) => Ok(Some(n)),
        reply => Err(unexpected(reply)),
    }
}

fn optional_status(reply: CommandReply) -> Result<Option<String>, Error> {
    match reply {
        CommandReply::Absent => Ok(None),
        CommandReply::Status(s) => Ok(Some(s)),
        reply => Err(unexpected(reply)),
    }
}

fn require_non_empty<T>(command: CommandName, items: &[T], what: &str) -> Result<(), Error> {
    if items.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("{} requires at least one {}", command, what),
        ));
    }
    Ok(())
}

fn unexpected(reply: CommandReply) -> Error {
    Error::new(
        ErrorKind::UnexpectedReply,
        format!("reply does not match the request shape (got {:?})", reply),
    )
}
