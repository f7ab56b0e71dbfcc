use std::path::Path;

use crate::cli::{Commands, CreateStoryArgs, ServiceArgs, UploadArgs, UploadFilesArgs};
use crate::config::{self, UploadConfig};
use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;
use crate::uploader::{self, NewStory, StoryClient, UploadReport};

pub async fn run(
    command: Commands,
    config: UploadConfig,
    config_path: Option<&Path>,
) -> AppResult<()> {
    match command {
        Commands::Upload(args) => {
            let report = upload(&args, config).await?;
            log::debug!("Upload report: {}", serde_json::to_string(&report)?);
        }
        Commands::UploadFiles(args) => {
            let report = upload_files(&args, config).await?;
            log::debug!("Upload report: {}", serde_json::to_string(&report)?);
        }
        Commands::CreateStory(args) => {
            let id = create_story(&args, config).await?;
            println!("{}", id);
        }
        Commands::PrintConfig(args) => {
            println!("{}", print_config(&args, config)?);
        }
        Commands::InitConfig { force } => {
            init_config(config_path, force)?;
        }
    }

    Ok(())
}

fn client_for(config: &UploadConfig) -> AppResult<StoryClient> {
    StoryClient::new(
        &config.host,
        &config.token,
        config.retry.clone(),
        config.request_timeout(),
    )
}

pub async fn upload(args: &UploadArgs, mut config: UploadConfig) -> AppResult<UploadReport> {
    args.apply(&mut config);
    config::validate_config(&config)?;
    InputValidator::validate_folder(&config.folder)?;

    let client = client_for(&config)?;
    uploader::process_upload_queue(&config, &client, args.dry_run).await
}

pub async fn upload_files(
    args: &UploadFilesArgs,
    mut config: UploadConfig,
) -> AppResult<UploadReport> {
    args.service.apply(&mut config);
    config::validate_config(&config)?;

    let client = client_for(&config)?;
    uploader::upload_file_list(&config, &client, &args.files).await
}

pub async fn create_story(args: &CreateStoryArgs, mut config: UploadConfig) -> AppResult<String> {
    args.service.apply(&mut config);
    InputValidator::validate_token(&config.token)?;
    InputValidator::validate_host(&config.host)?;

    if args.slug.trim().is_empty() {
        return Err(AppError::validation("slug", "Slug cannot be empty"));
    }

    let story = NewStory {
        name: args.name.clone(),
        title: args.title.clone().unwrap_or_else(|| args.name.clone()),
        slug: args.slug.clone(),
        group: args.group.clone(),
    };

    let id = client_for(&config)?.create_story(&story).await?;
    log::info!("Created story '{}' with id {}", story.slug, id);
    Ok(id)
}

pub fn print_config(args: &ServiceArgs, mut config: UploadConfig) -> AppResult<String> {
    args.apply(&mut config);
    Ok(serde_json::to_string_pretty(&config.redacted())?)
}

pub fn init_config(config_path: Option<&Path>, force: bool) -> AppResult<()> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => config::get_config_path()?,
    };

    if path.exists() && !force {
        return Err(AppError::Config(format!(
            "{} already exists, pass --force to overwrite",
            path.display()
        )));
    }

    config::save_config(&UploadConfig::default(), &path)
}
