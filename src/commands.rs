//! Command dispatch
//!
//! Each command resolves configuration first, so missing credentials or a
//! missing tailnet are reported before any request reaches the service.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use crate::api::{build_http_client, DeviceApi, TailscaleClient};
use crate::auth::{request_token, unix_now, TokenStore};
use crate::cli::{Cli, Commands, TagsCommand};
use crate::config::Settings;
use crate::directory::DeviceDirectory;
use crate::engine::TagEngine;
use crate::error::AdminError;
use crate::report;
use crate::retry::RetryConfig;

/// Runs the parsed command line
pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_cli(&cli);

    match cli.command {
        Commands::Auth => auth(&settings, &TokenStore::default_location()?).await,
        Commands::Status => status(&TokenStore::default_location()?).await,
        Commands::Logout => logout(&TokenStore::default_location()?).await,
        Commands::TestAuth => {
            let client = connect(&settings).await?;
            let devices = client
                .list_devices()
                .await
                .map_err(AdminError::DirectoryUnavailable)?;
            println!(
                "{} {} ({} devices visible)",
                "Connected to tailnet".bold(),
                client.tailnet().green(),
                devices.len()
            );
            Ok(())
        }
        Commands::Devices => {
            let client = connect(&settings).await?;
            let directory = DeviceDirectory::load(&client).await?;
            report::print_devices(directory.devices(), settings.json)
        }
        Commands::Keys => {
            let client = connect(&settings).await?;
            let keys = client.list_keys().await.context("Failed to list API keys")?;
            report::print_keys(&keys, settings.json)
        }
        Commands::Tags(cmd) => tags(&settings, cmd).await,
    }
}

/// Builds an authenticated client
///
/// The token store is only located when no API key is configured.
async fn connect(settings: &Settings) -> Result<TailscaleClient> {
    let http = build_http_client(settings.timeout)?;
    let (tailnet, credential) = match settings.api_key_connection()? {
        Some(found) => found,
        None => {
            settings
                .connection(&TokenStore::default_location()?, &http)
                .await?
        }
    };
    info!("Authenticating to {} with {}", tailnet, credential.kind());

    TailscaleClient::new(&settings.api_url, &tailnet, credential.bearer(), settings.timeout)
}

async fn tags(settings: &Settings, cmd: TagsCommand) -> Result<()> {
    // Validate tag names before touching the network
    let operation = cmd.operation()?;
    let client = connect(settings).await?;

    let Some((operation, apply)) = operation else {
        let directory = DeviceDirectory::load(&client).await?;
        return match cmd {
            TagsCommand::Devices { name, tag } => {
                let tag = tag.as_deref().map(crate::tag::strip_prefix);
                let devices = directory.filter(name.as_deref(), tag);
                report::print_device_tags(&devices, settings.json)
            }
            _ => report::print_tag_inventory(&directory, settings.json),
        };
    };

    let run = TagEngine::new(&client).run(operation, apply).await?;
    report::print_run(&run, settings.json)?;
    run.check()?;
    Ok(())
}

async fn auth(settings: &Settings, store: &TokenStore) -> Result<()> {
    let (client_id, client_secret) = settings.client_credentials().ok_or_else(|| {
        AdminError::Configuration(
            "client ID and secret are required; use --client-id/--client-secret or set \
             TAILSCALE_CLIENT_ID and TAILSCALE_CLIENT_SECRET"
                .to_string(),
        )
    })?;
    let tailnet = settings.require_tailnet(None)?;

    let http = build_http_client(settings.timeout)?;
    let token = request_token(
        &http,
        &settings.api_url,
        client_id,
        client_secret,
        &tailnet,
        &RetryConfig::default(),
    )
    .await?;
    store.save(&token).await?;

    println!("{} {}", "Authenticated to tailnet".green(), tailnet.bold());
    println!("Token stored at {}", store.path().display());
    Ok(())
}

async fn status(store: &TokenStore) -> Result<()> {
    let Some(token) = store.load().await? else {
        println!("{}", "Not authenticated.".yellow());
        println!("Run 'tailnet-admin auth' or set TAILSCALE_API_KEY.");
        return Ok(());
    };

    println!("{}", "Authentication status".bold());
    println!("  Tailnet: {}", token.tailnet.green());

    let now = unix_now();
    let state = report::token_state(&token, now);
    if token.is_expired_at(now) {
        println!("  Token:   {}", state.red());
        println!("Run 'tailnet-admin auth' to authenticate again.");
    } else {
        println!("  Token:   {}", state.green());
    }
    Ok(())
}

async fn logout(store: &TokenStore) -> Result<()> {
    if store.clear().await? {
        println!("{}", "Logged out and removed the stored token.".green());
    } else {
        println!("{}", "No stored authentication found.".yellow());
    }
    Ok(())
}
