use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fileflows_core::{FolderPath, DEFAULT_QUEUE_KEY};
use fileflows_engine::DuplicatePolicy;
use fileflows_queue::FileQueue;

use crate::token_manager::TokenManager;

/// Configuration for the fileflows command-line tool.
#[derive(Parser, Debug, Clone)]
#[command(name = "fileflows")]
#[command(about = "Queue-backed folder sync to Google Drive with concurrent workers")]
pub struct Config {
    /// Name of the work queue to use
    #[arg(long, default_value = DEFAULT_QUEUE_KEY, env = "FILEFLOWS_QUEUE_KEY", global = true)]
    pub queue_key: String,

    /// Directory holding the work queue files
    #[arg(long, env = "FILEFLOWS_QUEUE_DIR", global = true)]
    pub queue_dir: Option<PathBuf>,

    #[command(flatten)]
    pub auth: AuthArgs,

    #[command(subcommand)]
    pub command: Command,
}

impl Config {
    /// Queue directory, falling back to the per-user data directory.
    pub fn queue_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.queue_dir {
            Some(dir) => Ok(dir.clone()),
            None => FileQueue::default_dir().ok_or_else(|| {
                anyhow::anyhow!("no local data directory found, pass --queue-dir")
            }),
        }
    }
}

/// Google credentials.
#[derive(Args, Debug, Clone)]
pub struct AuthArgs {
    /// OAuth access token used as-is
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub access_token: Option<String>,

    /// Google OAuth2 Client ID (for token refresh)
    #[arg(long, env = "GOOGLE_CLIENT_ID", global = true)]
    pub google_client_id: Option<String>,

    /// Google OAuth2 Client Secret (for token refresh)
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub google_client_secret: Option<String>,

    /// Google OAuth2 refresh token
    #[arg(long, env = "GOOGLE_REFRESH_TOKEN", hide_env_values = true, global = true)]
    pub google_refresh_token: Option<String>,
}

impl AuthArgs {
    /// Build a token manager from whichever credentials were supplied.
    ///
    /// An access token wins over refresh credentials.
    pub fn token_manager(&self) -> anyhow::Result<TokenManager> {
        if let Some(token) = &self.access_token {
            return Ok(TokenManager::static_token(token.clone()));
        }
        match (
            &self.google_client_id,
            &self.google_client_secret,
            &self.google_refresh_token,
        ) {
            (Some(id), Some(secret), Some(refresh)) => Ok(TokenManager::refreshing(
                id.clone(),
                secret.clone(),
                refresh.clone(),
            )),
            _ => anyhow::bail!(
                "no Google credentials: set GOOGLE_ACCESS_TOKEN, or GOOGLE_CLIENT_ID, \
                 GOOGLE_CLIENT_SECRET and GOOGLE_REFRESH_TOKEN"
            ),
        }
    }
}

/// Local files to add to the queue.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Directory to enumerate (repeatable)
    #[arg(long = "source")]
    pub sources: Vec<PathBuf>,

    /// Glob pattern matched against names in each source directory
    #[arg(long)]
    pub glob: Option<String>,

    /// Regular expression matched against each full path
    #[arg(long)]
    pub regex: Option<String>,
}

/// Destination folder and worker settings.
#[derive(Args, Debug, Clone)]
pub struct DestinationArgs {
    /// Destination folder path, e.g. Reports/2024/Q1
    #[arg(long)]
    pub folder: FolderPath,

    /// Number of concurrent workers
    #[arg(
        long,
        default_value_t = 4,
        env = "FILEFLOWS_WORKERS",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub workers: u16,

    /// Fail instead of picking the first when several folders share a name
    #[arg(long)]
    pub strict_folders: bool,
}

impl DestinationArgs {
    pub fn policy(&self) -> DuplicatePolicy {
        if self.strict_folders {
            DuplicatePolicy::Reject
        } else {
            DuplicatePolicy::FirstMatch
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add local files (or raw items) to the queue
    Enqueue {
        #[command(flatten)]
        source: SourceArgs,

        /// Item to add verbatim (repeatable)
        #[arg(long = "item")]
        items: Vec<String>,
    },

    /// Upload every queued file to the destination folder
    Upload {
        #[command(flatten)]
        destination: DestinationArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Replace the content of files that already exist remotely
        #[arg(long)]
        overwrite: bool,

        /// Convert spreadsheets and documents to Google formats
        #[arg(long)]
        convert: bool,
    },

    /// Trash every remote file named by a queued item
    Delete {
        #[command(flatten)]
        destination: DestinationArgs,

        #[command(flatten)]
        source: SourceArgs,

        /// Remote title to delete (repeatable)
        #[arg(long = "title")]
        titles: Vec<String>,
    },

    /// Rename one file in the destination folder
    Rename {
        /// Folder containing the file
        #[arg(long)]
        folder: FolderPath,

        /// Current title
        #[arg(long)]
        from: String,

        /// New title
        #[arg(long)]
        to: String,

        /// Fail instead of picking the first when several folders share a name
        #[arg(long)]
        strict_folders: bool,
    },

    /// Print the number of queued items
    Status,
}
