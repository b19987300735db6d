//! `sphere-cli`: terminal front end for the ClientSphere CRM client.
//!
//! The persisted credential lives in `--state-dir` (one file named `token`),
//! so a login in one invocation is picked up by the next.
//!
//! # Configuration
//!
//! - `SPHERE_API_URL` / `--base-url`: backend address (default `http://localhost:8080`)
//! - `SPHERE_BACKEND_URL`: fallback backend address
//! - `SPHERE_STATE_DIR` / `--state-dir`: credential directory
//! - `SPHERE_REQUEST_TIMEOUT_SECS`, `SPHERE_CONNECT_TIMEOUT_SECS`
//! - `RUST_LOG`: log filter (default `warn`), written to stderr


use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use sphere_client::app::{App, NavAction, Navigation, nav_links};
use sphere_client::config::{ClientConfig, ConfigError};
use sphere_client::net::api::{CrmApi, HttpApi};
use sphere_client::net::error::ApiError;
use sphere_client::pages::PageOutcome;
use sphere_client::pages::dashboard::{DashboardPage, DashboardSummary, format_amount, status_badge, welcome};
use sphere_client::pages::login::LoginPage;
use sphere_client::pages::signup::SignupPage;
use sphere_client::state::session::SessionStore;
use sphere_client::state::storage::{FileStore, KeyValueStore};
use sphere_client::state::ui::Notices;
use tracing_subscriber::EnvFilter;

const STATE_DIR_NAME: &str = "clientsphere";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Rejected(String),
    #[error("not signed in; run `sphere-cli login` first")]
    NotSignedIn,
    #[error("no state directory; pass --state-dir or set SPHERE_STATE_DIR")]
    MissingStateDir,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "sphere-cli", about = "ClientSphere CRM client")]
struct Cli {
    #[arg(long, env = "SPHERE_API_URL")]
    base_url: Option<String>,

    #[arg(long, env = "SPHERE_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange email and password for a session.
    Login(LoginArgs),
    /// Create an account and sign in to it.
    Signup(SignupArgs),
    /// Forget the stored session.
    Logout,
    /// Print the signed-in profile.
    Whoami,
    /// Print the CRM summary.
    Dashboard,
    /// Resolve a client route the way the navigation gate would.
    Open { path: String },
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "SPHERE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long)]
    confirm_password: String,
    #[arg(long)]
    role: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    init_tracing();
    let cli = Cli::parse();

    let config = resolve_config(cli.base_url.as_deref())?;
    let state_dir = resolve_state_dir(cli.state_dir)?;
    tracing::debug!(base_url = %config.base_url, state_dir = %state_dir.display(), "starting");

    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(state_dir));
    let api: Arc<dyn CrmApi> = Arc::new(HttpApi::new(&config, storage.clone())?);
    let session = SessionStore::new(api, storage);

    let mut notices = Notices::new();
    let result = run(&session, cli.command, &mut notices).await;
    for notice in notices.drain() {
        eprintln!("[{}] {}", notice.level.label(), notice.message);
    }
    result
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(base_url: Option<&str>) -> Result<ClientConfig, CliError> {
    let config = ClientConfig::from_env()?;
    match base_url {
        Some(url) if !url.trim().is_empty() => Ok(config.with_base_url(url)?),
        _ => Ok(config),
    }
}

fn resolve_state_dir(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    explicit
        .or_else(|| dirs::config_dir().map(|dir| dir.join(STATE_DIR_NAME)))
        .ok_or(CliError::MissingStateDir)
}

async fn run(session: &SessionStore, command: Command, notices: &mut Notices) -> Result<(), CliError> {
    match command {
        Command::Login(args) => {
            let mut page = LoginPage { email: args.email, password: args.password, ..LoginPage::new() };
            let outcome = page.submit(session, notices).await;
            finish_auth(session, outcome, page.error)
        }
        Command::Signup(args) => {
            let mut page = SignupPage {
                first_name: args.first_name,
                last_name: args.last_name,
                email: args.email,
                password: args.password,
                confirm_password: args.confirm_password,
                role: args.role,
                ..SignupPage::new()
            };
            let outcome = page.submit(session, notices).await;
            finish_auth(session, outcome, page.error)
        }
        Command::Logout => {
            session.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let snapshot = session.bootstrap().await;
            let profile = snapshot.profile.ok_or(CliError::NotSignedIn)?;
            print_json(&serde_json::to_value(&profile)?)
        }
        Command::Dashboard => {
            match App::new(session).open("/dashboard").await {
                Navigation::Render(_) => {}
                _ => return Err(CliError::NotSignedIn),
            }
            let mut page = DashboardPage::new();
            page.load(session, notices).await;
            let summary = page.summary.unwrap_or_default();
            println!("{}", welcome(&session.snapshot()));
            print_json(&summary_json(&summary))
        }
        Command::Open { path } => {
            let navigation = App::new(session).open(&path).await;
            let links: Vec<Value> = nav_links(&session.snapshot())
                .into_iter()
                .map(|link| match link.action {
                    NavAction::Open(route) => json!({ "label": link.label, "path": route.path() }),
                    NavAction::Logout => json!({ "label": link.label, "action": "logout" }),
                })
                .collect();
            print_json(&json!({ "navigation": navigation_json(navigation), "links": links }))
        }
    }
}

fn finish_auth(session: &SessionStore, outcome: PageOutcome, error: Option<String>) -> Result<(), CliError> {
    match outcome {
        PageOutcome::Navigate(_) => {
            let profile = session.snapshot().profile.ok_or(CliError::NotSignedIn)?;
            print_json(&serde_json::to_value(&profile)?)
        }
        PageOutcome::Stay => Err(CliError::Rejected(error.unwrap_or_else(|| "request was not completed".to_owned()))),
    }
}

fn navigation_json(navigation: Navigation) -> Value {
    match navigation {
        Navigation::Render(route) => json!({ "render": route.path() }),
        Navigation::Loading(route) => json!({ "loading": route.path() }),
        Navigation::Redirect { from, to, replace } => {
            json!({ "redirect": { "from": from.path(), "to": to.path(), "replace": replace } })
        }
    }
}

fn summary_json(summary: &DashboardSummary) -> Value {
    let leads: Vec<Value> = summary
        .recent_leads
        .iter()
        .map(|lead| {
            let name = format!(
                "{} {}",
                lead.first_name.as_deref().unwrap_or_default(),
                lead.last_name.as_deref().unwrap_or_default()
            );
            json!({
                "id": lead.id,
                "name": name.trim(),
                "company": lead.company,
                "status": lead.status,
                "badge": format!("{:?}", status_badge(lead.status.as_deref())).to_lowercase(),
            })
        })
        .collect();
    let deals: Vec<Value> = summary
        .recent_deals
        .iter()
        .map(|deal| json!({ "id": deal.id, "name": deal.name, "stage": deal.stage, "value": format_amount(deal.value) }))
        .collect();
    let failed: Vec<&str> = summary.failed_sections.iter().map(|s| s.label()).collect();

    json!({
        "totals": {
            "leads": summary.total_leads,
            "contacts": summary.total_contacts,
            "deals": summary.total_deals,
            "activities": summary.total_activities,
        },
        "pipeline_value": format_amount(Some(summary.pipeline_value)),
        "recent_leads": leads,
        "recent_deals": deals,
        "upcoming_activities": summary.upcoming_activities,
        "overdue_activities": summary.overdue_activities,
        "deals_closing_soon": summary.deals_closing_soon,
        "failed_sections": failed,
    })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
