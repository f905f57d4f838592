use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

mod ai;
mod app;
mod cli;
mod config;
mod error;
mod models;
mod notify;
mod services;
mod store;

use app::{App, Output};
use cli::{parse_line, render, render_notice, Command, Invocation};
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Only warnings and errors unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let invocation = Invocation::parse();

    let config = if invocation.memory {
        Config::in_memory()
    } else {
        Config::load().context("failed to load configuration")?
    };
    config.validate().context("invalid configuration")?;

    let mut app = App::new(&config)
        .await
        .context("failed to open the record store")?;

    match invocation.command {
        Some(command) => run_once(&mut app, command, invocation.json).await,
        None => run_shell(&mut app, invocation.json).await,
    }
}

async fn run_once(app: &mut App, command: Command, json: bool) -> anyhow::Result<()> {
    let result = app.handle_command(command).await;
    print_notices(app);
    let output = result?;
    print!("{}", render(&output, json)?);
    Ok(())
}

/// Read commands from stdin until EOF or `quit`. Errors are reported and the loop goes on.
async fn run_shell(app: &mut App, json: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                // Help goes to stdout, usage errors to stderr
                e.print()?;
                continue;
            }
        };

        let result = app.handle_command(command).await;
        print_notices(app);
        match result {
            Ok(Output::Quit) => break,
            Ok(output) => print!("{}", render(&output, json)?),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

fn print_notices(app: &mut App) {
    for notice in app.drain_notices() {
        eprintln!("{}", render_notice(&notice));
    }
}
