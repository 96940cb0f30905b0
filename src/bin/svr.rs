use clap::Parser;
use redlist::{
    conf::Configuration,
    net::Server,
    telemetry::{get_subscriber, init_subscriber},
    ListStore,
};
use tokio::signal;

/// An in-memory server for Redis list commands.
#[derive(Parser)]
#[clap(name = "redlist-svr", version, author, long_about = None)]
struct Cli {
    /// Configuration file, its extension may be omitted.
    #[clap(long, default_value = "redlist")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("redlist-svr".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;

    let cli = Cli::parse();
    let conf = Configuration::get(&cli.config)?;

    let server = Server::new(ListStore::new(), signal::ctrl_c(), conf.server).await?;
    server.run().await;
    Ok(())
}
