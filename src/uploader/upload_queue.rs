use crate::config::UploadConfig;
use crate::errors::AppResult;

use super::batch::{plan_batches, UploadVerb};
use super::discovery::discover_files;
use super::progress_tracker::{UploadProgress, UploadReport};
use super::story_client::{StoryClient, UploadPayload};

/// Upload the whole story folder in batches.
///
/// The first batch is sent with `PUT`, which replaces the story contents;
/// later batches are sent with `PATCH` and add to it. Batches go out one at a
/// time and the first failure ends the run. A rerun starts again from the
/// first batch.
pub async fn process_upload_queue(
    config: &UploadConfig,
    client: &StoryClient,
    dry_run: bool,
) -> AppResult<UploadReport> {
    let files = discover_files(&config.folder)?;
    let batches = plan_batches(files.len(), config.batch_size)?;
    let url = client.story_url(&config.path, &config.resource_id);

    log::info!(
        "Uploading {} files in batches of {} to {}",
        files.len(),
        config.batch_size,
        url
    );

    let mut progress = UploadProgress::new(files.len(), dry_run);

    for batch in &batches {
        let verb = batch.verb();

        if dry_run {
            progress.record_planned(batch, verb);
            continue;
        }

        log::debug!(
            "Processing batch {} of {} ({} files)",
            batch.index + 1,
            batches.len(),
            batch.len()
        );

        let payload = UploadPayload::from_entries(batch.slice(&files)).await?;
        let status = client.send_batch(verb, &url, &payload).await?;

        progress.record_batch(batch, verb, status.as_u16());
    }

    Ok(progress.finish())
}

/// Upload an explicit list of files in a single create request. Each file's
/// path, as given, becomes its field name.
pub async fn upload_file_list(
    config: &UploadConfig,
    client: &StoryClient,
    file_paths: &[String],
) -> AppResult<UploadReport> {
    let mut progress = UploadProgress::new(file_paths.len(), false);
    let batches = plan_batches(file_paths.len(), file_paths.len().max(1))?;

    if let Some(batch) = batches.first() {
        let mut payload = UploadPayload::new();
        for file_path in file_paths {
            payload.add_file(file_path, file_path.clone()).await?;
        }

        let url = client.story_url(&config.path, &config.resource_id);
        log::info!(
            "Uploading {} files ({} bytes) to {}",
            payload.len(),
            payload.total_bytes(),
            url
        );

        let status = client
            .send_batch(UploadVerb::Create, &url, &payload)
            .await?;
        progress.record_batch(batch, UploadVerb::Create, status.as_u16());
    }

    Ok(progress.finish())
}
