use std::{fmt::Display, net::IpAddr, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};

use redlist::{
    net::Client,
    telemetry::{get_subscriber, init_subscriber},
    InsertPosition, LPosArgs, ListCommands, Utf8Codec,
};

/// A minimal client for Redis list commands.
#[derive(Parser)]
#[clap(name = "redlist", version, author, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    cmd: Commands,

    /// The host address of the server.
    #[clap(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// The port number of the server.
    #[clap(long, default_value_t = redlist::DEFAULT_PORT)]
    port: u16,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove and get the first element of the first non-empty list, blocking
    /// until one is available.
    Blpop {
        /// Seconds to wait for, zero waits forever.
        #[clap(long, default_value_t = 0.0)]
        timeout: f64,
        #[clap(name = "KEY", required = true)]
        keys: Vec<String>,
    },

    /// Remove and get the last element of the first non-empty list, blocking
    /// until one is available.
    Brpop {
        /// Seconds to wait for, zero waits forever.
        #[clap(long, default_value_t = 0.0)]
        timeout: f64,
        #[clap(name = "KEY", required = true)]
        keys: Vec<String>,
    },

    /// Move the last element of a list to the head of another, blocking until
    /// one is available.
    Brpoplpush {
        /// Seconds to wait for, zero waits forever.
        #[clap(long, default_value_t = 0.0)]
        timeout: f64,
        #[clap(name = "SOURCE")]
        source: String,
        #[clap(name = "DESTINATION")]
        destination: String,
    },

    /// Get an element by its index.
    Lindex {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "INDEX", allow_hyphen_values = true)]
        index: i64,
    },

    /// Insert an element before or after another.
    Linsert {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "WHERE", value_enum)]
        position: Where,
        #[clap(name = "PIVOT")]
        pivot: String,
        #[clap(name = "ELEMENT")]
        value: String,
    },

    /// Get the length of a list.
    Llen {
        #[clap(name = "KEY")]
        key: String,
    },

    /// Remove and get the first element.
    Lpop {
        #[clap(name = "KEY")]
        key: String,
    },

    /// Get the indices of matching elements.
    Lpos {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "ELEMENT")]
        value: String,
        #[clap(long, allow_hyphen_values = true)]
        rank: Option<i64>,
        /// Reply every match up to this many, zero for all.
        #[clap(long)]
        count: Option<usize>,
        #[clap(long)]
        maxlen: Option<i64>,
    },

    /// Prepend elements.
    Lpush {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "ELEMENT", required = true)]
        values: Vec<String>,
    },

    /// Prepend elements only if the list exists.
    Lpushx {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "ELEMENT", required = true)]
        values: Vec<String>,
    },

    /// Get a range of elements.
    Lrange {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "START", allow_hyphen_values = true)]
        start: i64,
        #[clap(name = "STOP", allow_hyphen_values = true)]
        stop: i64,
    },

    /// Remove matching elements.
    Lrem {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "COUNT", allow_hyphen_values = true)]
        count: i64,
        #[clap(name = "ELEMENT")]
        value: String,
    },

    /// Set an element by its index.
    Lset {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "INDEX", allow_hyphen_values = true)]
        index: i64,
        #[clap(name = "ELEMENT")]
        value: String,
    },

    /// Keep only a range of elements.
    Ltrim {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "START", allow_hyphen_values = true)]
        start: i64,
        #[clap(name = "STOP", allow_hyphen_values = true)]
        stop: i64,
    },

    /// Remove and get the last element.
    Rpop {
        #[clap(name = "KEY")]
        key: String,
    },

    /// Move the last element of a list to the head of another.
    Rpoplpush {
        #[clap(name = "SOURCE")]
        source: String,
        #[clap(name = "DESTINATION")]
        destination: String,
    },

    /// Append elements.
    Rpush {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "ELEMENT", required = true)]
        values: Vec<String>,
    },

    /// Append elements only if the list exists.
    Rpushx {
        #[clap(name = "KEY")]
        key: String,
        #[clap(name = "ELEMENT", required = true)]
        values: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Where {
    Before,
    After,
}

impl From<Where> for InsertPosition {
    fn from(w: Where) -> Self {
        match w {
            Where::Before => InsertPosition::Before,
            Where::After => InsertPosition::After,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("redlist".into(), "warn".into(), std::io::stderr);
    init_subscriber(subscriber)?;

    let cli = Cli::parse();

    let client = Client::connect((cli.host, cli.port)).await?;
    let lists = ListCommands::with_codec(client, Utf8Codec);
    match cli.cmd {
        Commands::Blpop { timeout, keys } => {
            let popped = lists.blpop(seconds(timeout)?, &keys).await?;
            print_pair(popped.map(|kv| (kv.key, kv.value)));
        }
        Commands::Brpop { timeout, keys } => {
            let popped = lists.brpop(seconds(timeout)?, &keys).await?;
            print_pair(popped.map(|kv| (kv.key, kv.value)));
        }
        Commands::Brpoplpush {
            timeout,
            source,
            destination,
        } => print_value(
            lists
                .brpoplpush(seconds(timeout)?, &source, &destination)
                .await?,
        ),
        Commands::Lindex { key, index } => print_value(lists.lindex(&key, index).await?),
        Commands::Linsert {
            key,
            position,
            pivot,
            value,
        } => print_integer(lists.linsert(&key, position.into(), &pivot, &value).await?),
        Commands::Llen { key } => print_integer(lists.llen(&key).await?),
        Commands::Lpop { key } => print_value(lists.lpop(&key).await?),
        Commands::Lpos {
            key,
            value,
            rank,
            count,
            maxlen,
        } => {
            let mut args = LPosArgs::new();
            if let Some(rank) = rank {
                args = args.rank(rank);
            }
            if let Some(maxlen) = maxlen {
                args = args.maxlen(maxlen);
            }
            match count {
                Some(count) => {
                    print_list(lists.lpos_count(&key, &value, count, Some(args)).await?)
                }
                None => print_integer(lists.lpos(&key, &value, Some(args)).await?),
            }
        }
        Commands::Lpush { key, values } => print_integer(lists.lpush(&key, &values).await?),
        Commands::Lpushx { key, values } => print_integer(lists.lpushx(&key, &values).await?),
        Commands::Lrange { key, start, stop } => {
            let values = lists.lrange(&key, start, stop).await?;
            print_list(values.into_iter().map(|v| format!("\"{}\"", v)).collect());
        }
        Commands::Lrem { key, count, value } => {
            print_integer(lists.lrem(&key, count, &value).await?)
        }
        Commands::Lset { key, index, value } => print_status(lists.lset(&key, index, &value).await?),
        Commands::Ltrim { key, start, stop } => print_status(lists.ltrim(&key, start, stop).await?),
        Commands::Rpop { key } => print_value(lists.rpop(&key).await?),
        Commands::Rpoplpush {
            source,
            destination,
        } => print_value(lists.rpoplpush(&source, &destination).await?),
        Commands::Rpush { key, values } => print_integer(lists.rpush(&key, &values).await?),
        Commands::Rpushx { key, values } => print_integer(lists.rpushx(&key, &values).await?),
    }

    Ok(())
}

fn seconds(timeout: f64) -> Result<Duration, anyhow::Error> {
    Ok(Duration::try_from_secs_f64(timeout)?)
}

fn print_value(value: Option<String>) {
    match value {
        Some(v) => println!("\"{}\"", v),
        None => println!("(nil)"),
    }
}

fn print_integer(n: Option<i64>) {
    match n {
        Some(n) => println!("(integer) {}", n),
        None => println!("(nil)"),
    }
}

fn print_status(status: Option<String>) {
    match status {
        Some(s) => println!("{}", s),
        None => println!("(nil)"),
    }
}

fn print_pair(pair: Option<(String, String)>) {
    match pair {
        Some((key, value)) => print_list(vec![format!("\"{}\"", key), format!("\"{}\"", value)]),
        None => println!("(nil)"),
    }
}

fn print_list<T: Display>(items: Vec<T>) {
    if items.is_empty() {
        println!("(empty array)");
    }
    for (i, item) in items.iter().enumerate() {
        println!("{}) {}", i + 1, item);
    }
}
