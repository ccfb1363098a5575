//! Cast Server - Entry Point
//!
//! Clients join numbered channels over TCP and fan real-time payloads out
//! to their channel over UDP.

use log::{LevelFilter, info};
use tokio::io::BufReader;

use cast_server::Server;
use cast_server::config::ServerConfig;
use cast_server::console::{ConsoleExit, run_console};
use cast_server::error::{CastServerError, handle_error};
use cast_server::utils::logging::setup_logging;

#[tokio::main]
async fn main() {
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", CastServerError::from(e));
            std::process::exit(1);
        }
    };

    let (startup, runtime) = config.split();
    let default_level = runtime
        .read()
        .await
        .level_filter()
        .unwrap_or(LevelFilter::Info);
    setup_logging(default_level);

    info!(
        "Launching cast server with {} cores online...",
        std::thread::available_parallelism().map_or(1, |n| n.get())
    );

    let server = match Server::bind(startup).await {
        Ok(server) => server,
        Err(e) => {
            handle_error(&e);
            std::process::exit(1);
        }
    };
    let registry = server.registry();
    tokio::spawn(server.start());

    let stdin = BufReader::new(tokio::io::stdin());
    match run_console(stdin, registry, runtime, default_level).await {
        ConsoleExit::Quit => {}
        // Keep serving without a console, e.g. when stdin is /dev/null.
        ConsoleExit::InputClosed => std::future::pending::<()>().await,
    }
}
