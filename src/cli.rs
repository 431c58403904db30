//! Command-line interface for tailnet-admin
//!
//! Global options carry the tailnet and credentials; each can also come from
//! the environment (or a `.env` file loaded at startup):
//!
//! - `TAILSCALE_TAILNET`
//! - `TAILSCALE_API_KEY`
//! - `TAILSCALE_CLIENT_ID` / `TAILSCALE_CLIENT_SECRET`
//! - `TAILSCALE_API_URL`
//!
//! Tag commands never modify anything unless `--apply` is given.

use clap::{Args, Parser, Subcommand};

use crate::api::DEFAULT_API_URL;
use crate::error::AdminError;
use crate::planner::TagOperation;
use crate::tag::{normalize_tag, parse_tag_list};

/// Main command-line interface structure
///
/// # Examples
///
/// ```
/// use clap::Parser;
/// use tailnet_admin::cli::{Cli, Commands};
///
/// let cli = Cli::try_parse_from(["tailnet-admin", "--tailnet", "example.com", "devices"]).unwrap();
/// assert!(matches!(cli.command, Commands::Devices));
/// assert_eq!(cli.tailnet.as_deref(), Some("example.com"));
/// ```
#[derive(Parser, Debug)]
#[command(
    name = "tailnet-admin",
    about = "Tailscale tailnet administration tool",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Tailnet name (e.g. example.com)
    #[arg(long, env = "TAILSCALE_TAILNET", global = true)]
    pub tailnet: Option<String>,

    /// API key, used instead of OAuth client credentials
    #[arg(long, env = "TAILSCALE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// OAuth client ID
    #[arg(long, env = "TAILSCALE_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "TAILSCALE_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub client_secret: Option<String>,

    /// Base URL of the Tailscale API
    #[arg(long, env = "TAILSCALE_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value = "10000", global = true)]
    pub timeout_ms: u64,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Exchange OAuth client credentials for a token and store it
    Auth,
    /// Show the stored token's state
    Status,
    /// Delete the stored token
    Logout,
    /// Check that the configured credential can list devices
    TestAuth,
    /// List devices in the tailnet
    Devices,
    /// List API keys
    Keys,
    /// Inspect and edit device tags
    #[command(subcommand)]
    Tags(TagsCommand),
}

/// Dry-run is the default; writes need an explicit opt-in
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ApplyArgs {
    /// Write the changes instead of only previewing them
    #[arg(long)]
    pub apply: bool,
}

#[derive(Subcommand, Debug)]
pub enum TagsCommand {
    /// List every tag in use and the devices carrying it
    List,
    /// List devices with their tags
    Devices {
        /// Only devices whose name contains this text (case-insensitive)
        #[arg(short, long)]
        name: Option<String>,
        /// Only devices carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
    },
    /// Rename a tag on every device carrying it
    Rename {
        old_tag: String,
        new_tag: String,
        #[command(flatten)]
        mode: ApplyArgs,
    },
    /// Add a tag to every device carrying another tag
    AddIfHas {
        existing_tag: String,
        new_tag: String,
        #[command(flatten)]
        mode: ApplyArgs,
    },
    /// Add a tag to every device lacking another tag
    AddIfMissing {
        missing_tag: String,
        new_tag: String,
        #[command(flatten)]
        mode: ApplyArgs,
    },
    /// Remove a tag from all devices, or only from the given ones
    Remove {
        tag: String,
        /// Device ID or name (repeatable, comma-separated)
        #[arg(short, long = "device")]
        devices: Vec<String>,
        #[command(flatten)]
        mode: ApplyArgs,
    },
    /// Add tags to specific devices
    Add {
        /// Device IDs or names
        #[arg(required = true)]
        devices: Vec<String>,
        /// Tag to add (repeatable, comma-separated)
        #[arg(short, long = "tag", required = true)]
        tags: Vec<String>,
        #[command(flatten)]
        mode: ApplyArgs,
    },
    /// Replace the tags of specific devices
    Set {
        /// Device IDs or names
        #[arg(required = true)]
        devices: Vec<String>,
        /// Tag to set (repeatable, comma-separated); none clears all tags
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        #[command(flatten)]
        mode: ApplyArgs,
    },
}

/// Splits comma-separated identifiers, dropping blanks
pub fn split_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|item| item.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl TagsCommand {
    /// The mutation this command requests, with normalized tags, and whether
    /// to apply it. `None` for read-only commands.
    pub fn operation(&self) -> Result<Option<(TagOperation, bool)>, AdminError> {
        let op = match self {
            TagsCommand::List | TagsCommand::Devices { .. } => return Ok(None),
            TagsCommand::Rename {
                old_tag,
                new_tag,
                mode,
            } => (
                TagOperation::Rename {
                    old: normalize_tag(old_tag)?,
                    new: normalize_tag(new_tag)?,
                },
                mode.apply,
            ),
            TagsCommand::AddIfHas {
                existing_tag,
                new_tag,
                mode,
            } => (
                TagOperation::AddIfHas {
                    trigger: normalize_tag(existing_tag)?,
                    tag: normalize_tag(new_tag)?,
                },
                mode.apply,
            ),
            TagsCommand::AddIfMissing {
                missing_tag,
                new_tag,
                mode,
            } => (
                TagOperation::AddIfMissing {
                    missing: normalize_tag(missing_tag)?,
                    tag: normalize_tag(new_tag)?,
                },
                mode.apply,
            ),
            TagsCommand::Remove { tag, devices, mode } => (
                TagOperation::Remove {
                    tag: normalize_tag(tag)?,
                    devices: split_list(devices),
                },
                mode.apply,
            ),
            TagsCommand::Add {
                devices,
                tags,
                mode,
            } => {
                let tags = parse_tag_list(tags)?;
                if tags.is_empty() {
                    return Err(AdminError::Configuration(
                        "at least one tag is required".to_string(),
                    ));
                }
                (
                    TagOperation::Add {
                        devices: split_list(devices),
                        tags,
                    },
                    mode.apply,
                )
            }
            TagsCommand::Set {
                devices,
                tags,
                mode,
            } => (
                TagOperation::Set {
                    devices: split_list(devices),
                    tags: parse_tag_list(tags)?,
                },
                mode.apply,
            ),
        };

        Ok(Some(op))
    }
}
