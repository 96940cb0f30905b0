use std::{
    net::SocketAddr,
    time::{Duration, Instant},
};

use redlist::{
    net::{Client, Config, Connection, Frame, Server},
    ErrorKind, ListCommands, ListStore, Utf8Codec,
};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};

async fn start_server() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let conf = Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        ..Config::default()
    };
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = Server::new(ListStore::new(), shutdown_rx, conf)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(server.run());
    (addr, shutdown_tx, handle)
}

async fn connect(addr: SocketAddr) -> ListCommands<Client, Utf8Codec> {
    ListCommands::with_codec(Client::connect(addr).await.unwrap(), Utf8Codec)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn list_commands_over_tcp() {
    let (addr, shutdown, handle) = start_server().await;
    let lists = connect(addr).await;
    let key = "mylist".to_string();

    assert_eq!(lists.llen(&key).await.unwrap(), None);
    assert_eq!(lists.rpush(&key, &strings(&["a", "b", "c"])).await.unwrap(), Some(3));
    assert_eq!(lists.lpush(&key, &strings(&["z"])).await.unwrap(), Some(4));
    assert_eq!(
        lists.lrange(&key, 0, -1).await.unwrap(),
        strings(&["z", "a", "b", "c"])
    );
    assert_eq!(lists.lindex(&key, -2).await.unwrap(), Some("b".to_string()));
    assert_eq!(lists.lset(&key, 0, &"y".to_string()).await.unwrap(), Some("OK".to_string()));
    assert_eq!(lists.lpos(&key, &"q".to_string(), None).await.unwrap(), None);
    assert!(lists
        .lpos_count(&key, &"q".to_string(), 1, None)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        lists
            .blpop(Duration::from_millis(100), &["empty".to_string(), key.clone()])
            .await
            .unwrap()
            .map(|kv| (kv.key, kv.value)),
        Some((key.clone(), "y".to_string()))
    );
    assert_eq!(lists.lpushx(&"other".to_string(), &strings(&["a"])).await.unwrap(), Some(0));

    drop(shutdown);
    handle.await.unwrap();
}

#[tokio::test]
async fn server_error_keeps_connection_open() {
    let (addr, shutdown, handle) = start_server().await;
    let lists = connect(addr).await;
    let key = "missing".to_string();

    let err = lists.lset(&key, 3, &"v".to_string()).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::CommandFailed));
    assert_eq!(err.to_string(), "LSET missing: command failed: ERR no such key");

    // the same connection still serves requests
    assert_eq!(lists.rpush(&key, &strings(&["v"])).await.unwrap(), Some(1));

    drop(shutdown);
    handle.await.unwrap();
}

#[tokio::test]
async fn unknown_command_is_answered_with_error() {
    let (addr, shutdown, handle) = start_server().await;
    let mut conn = Connection::new(TcpStream::connect(addr).await.unwrap());

    let request = Frame::Array(vec![
        Frame::BulkString("GET".into()),
        Frame::BulkString("k".into()),
    ]);
    conn.write_frame(&request).await.unwrap();
    assert_eq!(
        conn.read_frame().await.unwrap(),
        Some(Frame::Error("ERR unknown command 'GET'".into()))
    );

    let request = Frame::Array(vec![Frame::BulkString("LLEN".into())]);
    conn.write_frame(&request).await.unwrap();
    assert_eq!(
        conn.read_frame().await.unwrap(),
        Some(Frame::Error(
            "ERR wrong number of arguments for 'llen' command".into()
        ))
    );

    drop(conn);
    drop(shutdown);
    handle.await.unwrap();
}

#[tokio::test]
async fn concurrent_blocking_pops_over_tcp() {
    let (addr, shutdown, handle) = start_server().await;
    let timeout = Duration::from_millis(300);
    let queue = "queue".to_string();
    let started = Instant::now();

    let mut waiters = Vec::new();
    for _ in 0..2 {
        let lists = connect(addr).await;
        let queue = queue.clone();
        waiters.push(tokio::spawn(async move {
            let popped = lists.blpop(timeout, &[queue]).await.unwrap();
            (popped, started.elapsed())
        }));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    let producer = connect(addr).await;
    producer.rpush(&queue, &strings(&["job"])).await.unwrap();

    let mut received = Vec::new();
    for waiter in waiters {
        match waiter.await.unwrap() {
            (Some(kv), _) => received.push(kv.value),
            (None, elapsed) => assert!(elapsed >= timeout, "gave up after {:?}", elapsed),
        }
    }
    assert_eq!(received, strings(&["job"]));

    drop(shutdown);
    handle.await.unwrap();
}

#[tokio::test]
async fn shutdown_interrupts_blocked_clients() {
    let (addr, shutdown, handle) = start_server().await;
    let lists = connect(addr).await;
    let blocked = tokio::spawn(async move {
        lists
            .brpoplpush(Duration::ZERO, &"src".to_string(), &"dst".to_string())
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(shutdown);
    handle.await.unwrap();

    let err = blocked.await.unwrap().unwrap_err();
    assert!(err.io_kind().is_some());
}
