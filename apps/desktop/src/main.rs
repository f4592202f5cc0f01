use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{AppView, AuthSession, HttpAuthApi};
use shared::{domain::User, protocol::Credentials};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_url};

#[derive(Parser, Debug)]
#[command(about = "Bootstrap the client session and show the resulting view")]
struct Cli {
    /// Config file; defaults to ./client.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    auth_url: Option<String>,
    /// Print views as JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the current user and print the view (default).
    Status,
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(v) = &cli.api_url {
        settings.api_url = normalize_url(v)?;
    }
    if let Some(v) = &cli.auth_url {
        settings.auth_url = normalize_url(v)?;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let api = Arc::new(HttpAuthApi::new(&settings.api_url, &settings.auth_url));
    api.set_token(settings.session_token.clone()).await;
    let session = AuthSession::new(api);
    let _dispose = session.controller().dispose_guard();

    if let Some(bootstrap) = session.bootstrap() {
        bootstrap.await?;
    }
    info!(status = session.controller().status().as_str(), "session bootstrapped");

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {}
        Command::Login { username, password } => {
            let user = session
                .login(&Credentials::new(username, password))
                .await?;
            print_token(&user, cli.json);
        }
        Command::Register { username, password } => {
            let user = session
                .register(&Credentials::new(username, password))
                .await?;
            print_token(&user, cli.json);
        }
        Command::Logout => session.logout().await,
    }

    render(&session.view(), cli.json)
}

fn render(view: &AppView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(view)?);
    } else {
        println!("{view}");
    }
    Ok(())
}

fn print_token(user: &User, json: bool) {
    // JSON output already carries the token inside the user.
    if json {
        return;
    }
    if let Some(token) = &user.token {
        println!("session token: {token} (set APP__SESSION_TOKEN to reuse it)");
    }
}
