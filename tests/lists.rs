use std::time::{Duration, Instant};

use bytes::Bytes;
use proptest::prelude::*;
use redlist::{ErrorKind, InsertPosition, KeyValue, LPosArgs, ListCommands, ListStore};

fn lists() -> ListCommands<ListStore> {
    ListCommands::new(ListStore::new())
}

fn bytes(items: &[&'static str]) -> Vec<Bytes> {
    items.iter().map(|s| Bytes::from_static(s.as_bytes())).collect()
}

fn key(k: &'static str) -> Bytes {
    Bytes::from_static(k.as_bytes())
}

#[tokio::test]
async fn llen_of_absent_key_is_none() {
    let lists = lists();
    assert_eq!(lists.llen(&key("missing")).await.unwrap(), None);

    lists.rpush(&key("k"), &bytes(&["a", "b"])).await.unwrap();
    assert_eq!(lists.llen(&key("k")).await.unwrap(), Some(2));
}

#[tokio::test]
async fn lpush_reverses_order() {
    let lists = lists();
    let pushed = lists.lpush(&key("k"), &bytes(&["a", "b", "c"])).await.unwrap();
    assert_eq!(pushed, Some(3));
    assert_eq!(
        lists.lrange(&key("k"), 0, -1).await.unwrap(),
        bytes(&["c", "b", "a"])
    );
}

#[tokio::test]
async fn rpush_keeps_order() {
    let lists = lists();
    lists.rpush(&key("k"), &bytes(&["a", "b", "c"])).await.unwrap();
    assert_eq!(
        lists.lrange(&key("k"), 0, -1).await.unwrap(),
        bytes(&["a", "b", "c"])
    );
}

#[tokio::test]
async fn lpos_without_match() {
    let lists = lists();
    assert_eq!(lists.lpos(&key("k"), &key("v"), None).await.unwrap(), None);
    assert!(lists
        .lpos_count(&key("k"), &key("v"), 0, None)
        .await
        .unwrap()
        .is_empty());

    lists.rpush(&key("k"), &bytes(&["a", "v", "b", "v"])).await.unwrap();
    assert_eq!(lists.lpos(&key("k"), &key("x"), None).await.unwrap(), None);
    assert_eq!(lists.lpos(&key("k"), &key("v"), None).await.unwrap(), Some(1));
    assert_eq!(
        lists
            .lpos(&key("k"), &key("v"), Some(LPosArgs::new().rank(-1)))
            .await
            .unwrap(),
        Some(3)
    );
    assert_eq!(
        lists
            .lpos_count(&key("k"), &key("v"), 0, Some(LPosArgs::new().maxlen(2)))
            .await
            .unwrap(),
        vec![1]
    );
}

#[tokio::test]
async fn linsert_missing_pivot_is_minus_one() {
    let lists = lists();
    let inserted = lists
        .linsert(&key("k"), InsertPosition::Before, &key("p"), &key("v"))
        .await
        .unwrap();
    assert_eq!(inserted, Some(-1));

    lists.rpush(&key("k"), &bytes(&["a"])).await.unwrap();
    let inserted = lists
        .linsert(&key("k"), InsertPosition::After, &key("p"), &key("v"))
        .await
        .unwrap();
    assert_eq!(inserted, Some(-1));

    let inserted = lists
        .linsert(&key("k"), InsertPosition::After, &key("a"), &key("v"))
        .await
        .unwrap();
    assert_eq!(inserted, Some(2));
}

#[tokio::test]
async fn pushx_on_absent_key() {
    let lists = lists();
    assert_eq!(lists.lpushx(&key("k"), &bytes(&["a"])).await.unwrap(), Some(0));
    assert_eq!(lists.rpushx(&key("k"), &bytes(&["a"])).await.unwrap(), Some(0));
    assert_eq!(lists.llen(&key("k")).await.unwrap(), None);
}

#[tokio::test]
async fn one_push_wakes_one_of_two_blocked_pops() {
    let lists = lists();
    let timeout = Duration::from_millis(300);
    let started = Instant::now();
    let waiter = || {
        let lists = lists.clone();
        tokio::spawn(async move {
            let popped = lists.blpop(timeout, &[key("q")]).await;
            (popped, started.elapsed())
        })
    };
    let (first, second) = (waiter(), waiter());

    tokio::time::sleep(Duration::from_millis(50)).await;
    lists.rpush(&key("q"), &bytes(&["job"])).await.unwrap();

    let mut results = Vec::new();
    for waiter in [first, second] {
        let (popped, elapsed) = waiter.await.unwrap();
        let popped = popped.unwrap();
        // the pop that missed the element waits out its whole timeout
        if popped.is_none() {
            assert!(elapsed >= timeout, "gave up after {:?}", elapsed);
        }
        results.push(popped);
    }
    let received: Vec<_> = results.iter().flatten().collect();
    assert_eq!(
        received,
        vec![&KeyValue {
            key: key("q"),
            value: key("job"),
        }]
    );
    assert_eq!(lists.llen(&key("q")).await.unwrap(), None);
}

#[tokio::test]
async fn sub_millisecond_timeout_still_expires() {
    let lists = lists();
    let popped = tokio::time::timeout(
        Duration::from_secs(2),
        lists.blpop(Duration::from_micros(500), &[key("k")]),
    )
    .await
    .expect("blpop kept blocking past its timeout");
    assert_eq!(popped.unwrap(), None);
}

#[tokio::test]
async fn brpoplpush_times_out_with_none() {
    let lists = lists();
    let moved = lists
        .brpoplpush(Duration::from_millis(20), &key("src"), &key("dst"))
        .await
        .unwrap();
    assert_eq!(moved, None);
}

#[tokio::test]
async fn lset_on_missing_key_names_the_command() {
    let lists = lists();
    let err = lists.lset(&key("mylist"), 0, &key("v")).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::CommandFailed));
    assert_eq!(err.to_string(), "LSET mylist: command failed: ERR no such key");
}

#[tokio::test]
async fn ltrim_then_lrem() {
    let lists = lists();
    lists
        .rpush(&key("k"), &bytes(&["x", "a", "x", "b", "x"]))
        .await
        .unwrap();
    assert_eq!(lists.ltrim(&key("k"), 1, -1).await.unwrap(), Some("OK".into()));
    assert_eq!(lists.lrem(&key("k"), 0, &key("x")).await.unwrap(), Some(2));
    assert_eq!(lists.lrange(&key("k"), 0, -1).await.unwrap(), bytes(&["a", "b"]));
    assert_eq!(lists.lindex(&key("k"), -1).await.unwrap(), Some(key("b")));
    assert_eq!(lists.rpoplpush(&key("k"), &key("k")).await.unwrap(), Some(key("b")));
    assert_eq!(lists.lpop(&key("k")).await.unwrap(), Some(key("b")));
    assert_eq!(lists.rpop(&key("k")).await.unwrap(), Some(key("a")));
    assert_eq!(lists.rpop(&key("k")).await.unwrap(), None);
}

fn values() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 1..16), 1..32)
}

proptest! {
    #[test]
    fn lpush_then_lrange_is_reversed(values in values()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let values: Vec<Bytes> = values.into_iter().map(Bytes::from).collect();
        let stored = rt.block_on(async {
            let lists = lists();
            lists.lpush(&key("k"), &values).await.unwrap();
            lists.lrange(&key("k"), 0, -1).await.unwrap()
        });
        let mut expected = values;
        expected.reverse();
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn rpush_then_lrange_keeps_order(values in values()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let values: Vec<Bytes> = values.into_iter().map(Bytes::from).collect();
        let stored = rt.block_on(async {
            let lists = lists();
            lists.rpush(&key("k"), &values).await.unwrap();
            lists.lrange(&key("k"), 0, -1).await.unwrap()
        });
        prop_assert_eq!(stored, values);
    }
}
