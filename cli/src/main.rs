use std::io::IsTerminal;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use posts_core::{Backend, Dispatcher, PostsClient};
use tracing::debug;

use commands::{Create, Delete, List};

mod commands;

#[derive(Parser)]
#[command(name = "posts", about = "List, create and delete posts on a remote collection", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Service root; the collection lives at `<base-url>/posts`.
    #[arg(long, global = true, env = "POSTS_BASE_URL", default_value = "https://jsonplaceholder.typicode.com")]
    base_url: String,

    /// Transport backend used for every request.
    #[arg(long, global = true, env = "POSTS_BACKEND", value_enum, default_value_t = BackendArg::Future)]
    backend: BackendArg,

    /// Backend-level timeout in seconds. No timeout when omitted.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and print every post
    List(List),
    /// Create a post from JSON or multipart form data
    Create(Create),
    /// Delete a post by id
    Delete(Delete),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    /// reqwest, future-based
    Future,
    /// ureq on a worker thread, callback-based
    Callback,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Future => Backend::Future,
            BackendArg::Callback => Backend::Callback,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    debug!(base_url = %cli.base_url, backend = ?cli.backend, "starting");

    let timeout = cli.timeout_secs.map(Duration::from_secs);
    let dispatcher = Dispatcher::with_backend(cli.backend.into(), timeout);
    let client = PostsClient::new(&cli.base_url, dispatcher);

    match cli.command {
        Command::List(list) => list.run(&client).await,
        Command::Create(create) => create.run(&client).await,
        Command::Delete(delete) => delete.run(&client).await,
    }
}
