use clap::Parser;
use floos::args::{Args, Command};
use floos::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().floos_home().path();

    if let Command::Init = args.command() {
        commands::init(home).await?.print();
        return Ok(());
    }

    let config = Config::load(home).await?;
    let db = config.db().clone();

    // Route to appropriate command handler
    let result = match args.command().clone() {
        Command::Init => Ok(()),
        Command::Add(a) => commands::add(config, a).await.map(|o| o.print()),
        Command::Get(a) => commands::get(config, a).await.map(|o| o.print_structure()),
        Command::List(a) => commands::list(config, a).await.map(|o| o.print_structure()),
        Command::Update(a) => commands::update(config, a).await.map(|o| o.print()),
        Command::Delete(a) => commands::delete(config, a).await.map(|o| o.print()),
        Command::Clear(a) => commands::clear(config, a).await.map(|o| o.print()),
        Command::Summary(a) => commands::summary(config, a).await.map(|o| o.print()),
        Command::Breakdown(a) => commands::breakdown(config, a)
            .await
            .map(|o| o.print_structure()),
        Command::Export(a) => commands::export(config, a).await.map(|o| o.print()),
        Command::Import(a) => commands::import(config, a).await.map(|o| o.print()),
        Command::Report(a) => commands::report(config, a).await.map(|o| o.print()),
    };

    db.close().await;
    result
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
