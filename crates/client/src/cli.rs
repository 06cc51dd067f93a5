//! Command-line driver for the dashboard client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::config::{ClientConfig, default_state_db_path};
use crate::navigation::{HistoryNavigator, Navigator};
use crate::pipeline::{ApiRequest, Method};
use crate::session::{LoginRequest, RegisterRequest, VerifyRequest};
use crate::storage::SqliteStore;

#[derive(Parser, Debug)]
#[command(name = "merchantdesk")]
#[command(about = "Merchant dashboard client - session and authenticated API access")]
#[command(version)]
pub struct Cli {
    /// Session state database (overrides MERCHANTDESK_STATE_DB)
    #[arg(long, global = true, value_name = "FILE")]
    pub state_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore the persisted session and print it
    Status,

    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Keep the session across restarts
        #[arg(long)]
        remember: bool,
    },

    /// Confirm a pending login with a one-time code
    Verify {
        #[arg(long)]
        token: String,
        #[arg(long)]
        otp: String,
        #[arg(long)]
        remember: bool,
    },

    /// Create an account and log in
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        mobile_num: Option<String>,
        #[arg(long)]
        business_name: Option<String>,
        #[arg(long)]
        remember: bool,
    },

    /// End the session and forget stored credentials
    Logout,

    /// Send an authenticated request and print the response body
    #[command(alias = "req")]
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Path relative to the API base URL
        path: String,
        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },
}

impl Commands {
    /// The auth commands start from the login surface.
    fn starts_on_login(&self) -> bool {
        matches!(
            self,
            Commands::Login { .. } | Commands::Verify { .. } | Commands::Register { .. }
        )
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env().context("invalid client configuration")?;
    if let Some(path) = cli.state_db {
        config.state_db_path = Some(path);
    }

    let db_path = config
        .state_db_path
        .clone()
        .or_else(default_state_db_path)
        .context("no data directory available; set MERCHANTDESK_STATE_DB")?;

    let start = if cli.command.starts_on_login() {
        config.surfaces.login.clone()
    } else {
        config.surfaces.home.clone()
    };
    let navigator = Arc::new(HistoryNavigator::at(start));

    let app = AppState::new(&config, Arc::new(SqliteStore::open(db_path)), navigator.clone())
        .context("failed to initialize client")?;

    let session = app.session.bootstrap().await;

    match cli.command {
        Commands::Status => print_json(&session.summary()),

        Commands::Login {
            email,
            password,
            remember,
        } => {
            let request = LoginRequest::new(email, password).remember(remember);
            let profile = app.session.login(request).await?;
            print_json(&json!({ "profile": profile, "redirect": navigator.current_path() }))
        }

        Commands::Verify {
            token,
            otp,
            remember,
        } => {
            let request = VerifyRequest {
                token,
                otp,
                remember_me: remember,
            };
            let profile = app.session.verify(request).await?;
            print_json(&json!({ "profile": profile, "redirect": navigator.current_path() }))
        }

        Commands::Register {
            full_name,
            email,
            password,
            mobile_num,
            business_name,
            remember,
        } => {
            let request = RegisterRequest {
                full_name,
                email,
                password,
                mobile_num,
                business_name,
                remember_me: remember,
            };
            let profile = app.session.register(request).await?;
            print_json(&json!({ "profile": profile, "redirect": navigator.current_path() }))
        }

        Commands::Logout => {
            app.session.logout().await;
            print_json(&app.session.snapshot().summary())
        }

        Commands::Request { method, path, body } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method '{method}'"))?;

            let mut request = ApiRequest::new(method, path);
            if let Some(raw) = body {
                let body: Value = serde_json::from_str(&raw).context("--body is not valid JSON")?;
                request = request.json(&body)?;
            }

            let response = app.pipeline.dispatch(request).await?;
            print_json(&response.body)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
