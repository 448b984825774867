//! `member-editor`: opens one member profile against a directory, applies
//! edits and optionally submits them, then prints the resulting view as JSON.
//!
//! ```text
//! member-editor new --set firstName=Ada --set lastName=Lovelace --submit
//! member-editor 64f1c2 --set age=37 --submit
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use memberdir_client::{layered, ClientConfig, HttpMemberApi, ProfileSession, SubmitOutcome};
use memberdir_core::{MemberRoute, Principal};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "member-editor", about = "Edit a member profile from the command line")]
struct Args {
    /// Base URL of the directory API.
    #[arg(long, env = "MEMBERDIR_BASE_URL", default_value = "http://localhost:9000/api")]
    base_url: String,

    /// Per-call timeout in milliseconds.
    #[arg(long, env = "MEMBERDIR_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    request_timeout_ms: u64,

    /// Attributes that must be filled before submitting.
    #[arg(
        long,
        env = "MEMBERDIR_REQUIRED_FIELDS",
        value_delimiter = ',',
        default_value = "firstName,lastName"
    )]
    required_fields: Vec<String>,

    /// Acting user, forwarded in log lines.
    #[arg(long, env = "MEMBERDIR_USER")]
    user: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "MEMBERDIR_JSON_LOGS")]
    json_logs: bool,

    /// Member id, or `new` to create one.
    member: MemberRoute,

    /// Attribute edit, `ATTRIBUTE=VALUE`; repeatable.
    #[arg(long = "set", value_name = "ATTRIBUTE=VALUE", value_parser = parse_assignment)]
    set: Vec<(String, String)>,

    /// Submit the edits after applying them.
    #[arg(long)]
    submit: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (attribute, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ATTRIBUTE=VALUE, got {raw:?}"))?;
    if attribute.is_empty() {
        return Err("attribute name must not be empty".to_string());
    }
    Ok((attribute.to_string(), value.to_string()))
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,memberdir=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = ClientConfig {
        base_url: args.base_url,
        request_timeout_ms: args.request_timeout_ms,
        required_fields: args.required_fields,
        ..ClientConfig::default()
    };
    let api = HttpMemberApi::new(&config).context("failed to build HTTP client")?;
    let principal = args.user.map(|id| Principal {
        id,
        roles: Vec::new(),
    });
    let ctx = config.session_context(principal, uuid::Uuid::new_v4().to_string());
    let session = ProfileSession::new(ctx, layered(api, &config));

    session
        .open(args.member)
        .await
        .context("failed to open member profile")?;

    for (attribute, value) in &args.set {
        session
            .set_input(attribute, value)
            .with_context(|| format!("invalid value for {attribute}"))?;
    }

    if args.submit {
        match session.submit().await {
            Ok(SubmitOutcome::Created { id, location }) => {
                tracing::info!(%id, %location, "member created");
                if let Some(location) = session.take_navigation() {
                    tracing::debug!(%location, "following navigation");
                }
                session
                    .open(MemberRoute::Existing(id))
                    .await
                    .context("failed to reopen created member")?;
            }
            Ok(SubmitOutcome::Updated) => tracing::info!("member updated"),
            Err(error) => tracing::error!(%error, "submission failed"),
        }
    }

    let view = session.view();
    println!("{}", serde_json::to_string_pretty(&view)?);
    session.close();
    Ok(())
}
