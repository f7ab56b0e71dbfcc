use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::UploadConfig;

#[derive(Debug, Parser)]
#[command(name = "story-uploader", version)]
#[command(about = "Upload a rendered story bundle to the story service", long_about = None)]
pub struct Cli {
    /// JSON config file. Defaults to <config dir>/story-uploader/config.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// error, warn, info, debug or trace. RUST_LOG takes precedence
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Upload every file under the story folder in batches
    Upload(UploadArgs),
    /// Upload the given files in a single request
    UploadFiles(UploadFilesArgs),
    /// Register a new story and print its id
    CreateStory(CreateStoryArgs),
    /// Print the effective configuration
    PrintConfig(ServiceArgs),
    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Upload(_) => "upload",
            Commands::UploadFiles(_) => "upload-files",
            Commands::CreateStory(_) => "create-story",
            Commands::PrintConfig(_) => "print-config",
            Commands::InitConfig { .. } => "init-config",
        }
    }
}

/// Where the story service lives and how to authenticate.
#[derive(Debug, Clone, Default, Args)]
pub struct ServiceArgs {
    /// Service host as name[:port]
    #[arg(long)]
    pub host: Option<String>,

    /// Team token
    #[arg(long, env = "STORY_UPLOADER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Path prefix in front of the story id
    #[arg(long)]
    pub path: Option<String>,

    /// Story id
    #[arg(long, visible_alias = "story-id")]
    pub resource_id: Option<String>,
}

impl ServiceArgs {
    pub fn apply(&self, config: &mut UploadConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(token) = &self.token {
            config.token = token.clone();
        }
        if let Some(path) = &self.path {
            config.path = path.clone();
        }
        if let Some(resource_id) = &self.resource_id {
            config.resource_id = resource_id.clone();
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct UploadArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Root of the story bundle
    #[arg(long)]
    pub folder: Option<PathBuf>,

    /// Files per request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Attempts per request before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// List the planned batches without sending anything
    #[arg(long)]
    pub dry_run: bool,
}

impl UploadArgs {
    pub fn apply(&self, config: &mut UploadConfig) {
        self.service.apply(config);
        if let Some(folder) = &self.folder {
            config.folder = folder.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.retry.max_attempts = max_attempts;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = Some(timeout);
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct UploadFilesArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Files to upload; each path is sent as its own field name
    #[arg(required = true)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct CreateStoryArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[arg(long)]
    pub name: String,

    /// Defaults to the name
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub slug: String,

    /// Owning group, usually a team e-mail address
    #[arg(long)]
    pub group: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_upload_flags_override_config() {
        let cli = Cli::parse_from([
            "story-uploader",
            "upload",
            "--folder",
            "site",
            "--batch-size",
            "3",
            "--host",
            "127.0.0.1:9000",
            "--token",
            "abc",
            "--story-id",
            "7f1c1f0e-8d5c-4a43-9f4e-0d7a1b2c3d4e",
            "--dry-run",
        ]);

        let Commands::Upload(args) = cli.command else {
            panic!("expected upload command");
        };
        assert!(args.dry_run);

        let mut config = UploadConfig::default();
        args.apply(&mut config);
        assert_eq!(config.folder, PathBuf::from("site"));
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.host, "127.0.0.1:9000");
        assert_eq!(config.token, "abc");
        assert_eq!(config.resource_id, "7f1c1f0e-8d5c-4a43-9f4e-0d7a1b2c3d4e");
        assert_eq!(config.path, "quarto/update");
    }

    #[test]
    fn test_upload_files_requires_files() {
        assert!(Cli::try_parse_from(["story-uploader", "upload-files"]).is_err());
    }
}
