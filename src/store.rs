//! An in-memory list store that applies [`ListCommand`]s with Redis semantics.
//!
//! The store backs the server and also implements [`CommandExecutor`] directly, so
//! the facade can run in-process without a network hop.

use std::{
    collections::{HashMap, VecDeque},
    convert::TryFrom,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::{
    sync::Notify,
    time::{self, Instant},
};
use tracing::debug;

use crate::{
    error::{Error, ErrorKind},
    executor::CommandExecutor,
    lists::InsertPosition,
    net::{
        cmd::{End, ListCommand},
        Frame,
    },
    request::{CommandReply, CommandRequest},
};

type Lists = HashMap<Bytes, VecDeque<Bytes>>;

/// A thread-safe collection of lists keyed by bytes.
///
/// Cloning the store gives another handle to the same lists. Empty lists are never
/// kept: popping or removing the last element deletes the key.
#[derive(Debug, Clone, Default)]
pub struct ListStore {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    lists: Mutex<Lists>,
    // Wakes blocked pops whenever elements are pushed
    pushed: Notify,
}

impl ListStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the command and returns the reply frame.
    ///
    /// Errors that Redis reports to the client, such as `LSET` on a missing key,
    /// are returned as [`Frame::Error`]. Blocking commands wait for their timeout,
    /// a zero timeout waits until an element is available.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn apply(&self, cmd: ListCommand) -> Frame {
        let response = match cmd {
            ListCommand::BlockingPop { keys, end, timeout } => {
                let popped = self
                    .wait_for(timeout, |lists| {
                        keys.iter()
                            .find_map(|key| pop(lists, key, end).map(|v| (key.clone(), v)))
                    })
                    .await;
                match popped {
                    Some((key, value)) => {
                        Frame::Array(vec![Frame::BulkString(key), Frame::BulkString(value)])
                    }
                    None => Frame::Null,
                }
            }
            ListCommand::BlockingMove {
                source,
                destination,
                timeout,
            } => {
                let moved = self
                    .wait_for(timeout, |lists| move_tail_to_head(lists, &source, &destination))
                    .await;
                if moved.is_some() {
                    self.shared.pushed.notify_waiters();
                }
                bulk_or_null(moved)
            }
            cmd => self.apply_now(cmd),
        };
        debug!(?response);
        response
    }

    fn apply_now(&self, cmd: ListCommand) -> Frame {
        let mut lists = self.shared.lists.lock();
        match cmd {
            ListCommand::Index { key, index } => {
                let value = lists.get(&key).and_then(|list| {
                    let i = normalize_index(list.len(), index)?;
                    list.get(i).cloned()
                });
                bulk_or_null(value)
            }
            ListCommand::Insert {
                key,
                position,
                pivot,
                value,
            } => {
                let list = match lists.get_mut(&key) {
                    Some(list) => list,
                    None => return Frame::Integer(0),
                };
                match list.iter().position(|v| *v == pivot) {
                    Some(i) => {
                        let at = match position {
                            InsertPosition::Before => i,
                            InsertPosition::After => i + 1,
                        };
                        list.insert(at, value);
                        Frame::Integer(list.len() as i64)
                    }
                    None => Frame::Integer(-1),
                }
            }
            ListCommand::Len { key } => {
                Frame::Integer(lists.get(&key).map_or(0, |list| list.len() as i64))
            }
            ListCommand::Pop { key, end } => bulk_or_null(pop(&mut lists, &key, end)),
            ListCommand::Pos {
                key,
                value,
                rank,
                count,
                maxlen,
            } => {
                let positions = lists
                    .get(&key)
                    .map(|list| positions(list, &value, rank, count.unwrap_or(1), maxlen))
                    .unwrap_or_default();
                match count {
                    Some(_) => Frame::Array(positions.into_iter().map(Frame::Integer).collect()),
                    None => positions
                        .first()
                        .map_or(Frame::Null, |&pos| Frame::Integer(pos)),
                }
            }
            ListCommand::Push {
                key,
                values,
                end,
                existing_only,
            } => {
                if existing_only && !lists.contains_key(&key) {
                    return Frame::Integer(0);
                }
                let list = lists.entry(key).or_default();
                for value in values {
                    match end {
                        End::Head => list.push_front(value),
                        End::Tail => list.push_back(value),
                    }
                }
                let len = list.len();
                drop(lists);
                self.shared.pushed.notify_waiters();
                Frame::Integer(len as i64)
            }
            ListCommand::Range { key, start, stop } => {
                let items = lists
                    .get(&key)
                    .and_then(|list| {
                        let (start, stop) = range_bounds(list.len(), start, stop)?;
                        Some(
                            list.range(start..=stop)
                                .cloned()
                                .map(Frame::BulkString)
                                .collect(),
                        )
                    })
                    .unwrap_or_default();
                Frame::Array(items)
            }
            ListCommand::Rem { key, count, value } => {
                let removed = match lists.get_mut(&key) {
                    Some(list) => remove_matching(list, count, &value),
                    None => 0,
                };
                remove_if_empty(&mut lists, &key);
                Frame::Integer(removed)
            }
            ListCommand::Set { key, index, value } => {
                let list = match lists.get_mut(&key) {
                    Some(list) => list,
                    None => return Frame::Error("ERR no such key".into()),
                };
                match normalize_index(list.len(), index) {
                    Some(i) => {
                        list[i] = value;
                        Frame::SimpleString("OK".into())
                    }
                    None => Frame::Error("ERR index out of range".into()),
                }
            }
            ListCommand::Trim { key, start, stop } => {
                if let Some(list) = lists.get_mut(&key) {
                    match range_bounds(list.len(), start, stop) {
                        Some((start, stop)) => {
                            list.truncate(stop + 1);
                            list.drain(..start);
                        }
                        None => list.clear(),
                    }
                }
                remove_if_empty(&mut lists, &key);
                Frame::SimpleString("OK".into())
            }
            ListCommand::Move {
                source,
                destination,
            } => {
                let moved = move_tail_to_head(&mut lists, &source, &destination);
                drop(lists);
                if moved.is_some() {
                    self.shared.pushed.notify_waiters();
                }
                bulk_or_null(moved)
            }
            ListCommand::BlockingPop { .. } | ListCommand::BlockingMove { .. } => {
                unreachable!("blocking commands are applied by `apply`")
            }
        }
    }

    /// Runs `attempt` against the lists until it yields a value or the timeout
    /// elapses. A zero timeout, or one too large to represent as a deadline, never
    /// elapses.
    async fn wait_for<T, F>(&self, timeout: Duration, mut attempt: F) -> Option<T>
    where
        F: FnMut(&mut Lists) -> Option<T>,
    {
        let deadline = match timeout.is_zero() {
            true => None,
            false => Instant::now().checked_add(timeout),
        };
        loop {
            // Register interest before looking at the lists so that a push
            // happening in between is not missed.
            let notified = self.shared.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let found = {
                let mut lists = self.shared.lists.lock();
                attempt(&mut *lists)
            };
            if found.is_some() {
                return found;
            }

            match deadline {
                Some(deadline) => {
                    if time::timeout_at(deadline, notified).await.is_err() {
                        return None;
                    }
                }
                None => notified.await,
            }
        }
    }
}

#[async_trait]
impl CommandExecutor for ListStore {
    async fn execute(&self, request: &CommandRequest) -> Result<CommandReply, Error> {
        let cmd = ListCommand::try_from(request)
            .map_err(|e| Error::new(ErrorKind::CommandFailed, format!("ERR {}", e)))?;
        let frame = self.apply(cmd).await;
        request.shape().decode(frame)
    }
}

fn bulk_or_null(value: Option<Bytes>) -> Frame {
    value.map_or(Frame::Null, Frame::BulkString)
}

fn pop(lists: &mut Lists, key: &Bytes, end: End) -> Option<Bytes> {
    let list = lists.get_mut(key)?;
    let value = match end {
        End::Head => list.pop_front(),
        End::Tail => list.pop_back(),
    };
    remove_if_empty(lists, key);
    value
}

fn move_tail_to_head(lists: &mut Lists, source: &Bytes, destination: &Bytes) -> Option<Bytes> {
    let value = pop(lists, source, End::Tail)?;
    lists
        .entry(destination.clone())
        .or_default()
        .push_front(value.clone());
    Some(value)
}

fn remove_if_empty(lists: &mut Lists, key: &Bytes) {
    if lists.get(key).map_or(false, VecDeque::is_empty) {
        lists.remove(key);
    }
}

/// Resolve a possibly negative index into a position within `len` elements
fn normalize_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Clamp an inclusive `[start, stop]` range the way LRANGE and LTRIM do.
///
/// Returns `None` when the range selects nothing.
fn range_bounds(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    let stop = if stop < 0 { stop + len } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Positions of the elements equal to `value`, always counted from the head.
///
/// `rank` skips `|rank| - 1` matches and its sign picks the direction of the scan,
/// `count` of zero collects every match, `maxlen` of zero scans the whole list.
fn positions(list: &VecDeque<Bytes>, value: &Bytes, rank: i64, count: usize, maxlen: usize) -> Vec<i64> {
    let scan = if maxlen == 0 { list.len() } else { maxlen };
    let skip = (rank.unsigned_abs() - 1) as usize;
    let limit = if count == 0 { usize::MAX } else { count };
    let matches = |(i, v): (usize, &Bytes)| (v == value).then_some(i as i64);
    if rank > 0 {
        list.iter()
            .enumerate()
            .take(scan)
            .filter_map(matches)
            .skip(skip)
            .take(limit)
            .collect()
    } else {
        list.iter()
            .enumerate()
            .rev()
            .take(scan)
            .filter_map(matches)
            .skip(skip)
            .take(limit)
            .collect()
    }
}

/// Remove up to `|count|` elements equal to `value`, scanning from the head when
/// `count` is positive and from the tail when negative. Zero removes all matches.
fn remove_matching(list: &mut VecDeque<Bytes>, count: i64, value: &Bytes) -> i64 {
    let limit = if count == 0 {
        usize::MAX
    } else {
        count.unsigned_abs() as usize
    };
    let mut removed = 0;
    if count >= 0 {
        let mut i = 0;
        while i < list.len() && removed < limit {
            if list[i] == *value {
                list.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
    } else {
        let mut i = list.len();
        while i > 0 && removed < limit {
            i -= 1;
            if list[i] == *value {
                list.remove(i);
                removed += 1;
            }
        }
    }
    removed as i64
}
