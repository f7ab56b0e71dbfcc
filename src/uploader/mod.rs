// Batch uploader - discovers the story files, splits them into batches and
// sends each batch to the story service.

pub mod batch;
pub mod discovery;
pub mod progress_tracker;
pub mod retry;
pub mod story_client;
pub mod upload_queue;

pub use batch::{plan_batches, Batch, UploadVerb};
pub use discovery::{discover_files, FileEntry};
pub use progress_tracker::{BatchOutcome, UploadReport};
pub use retry::RetryConfig;
pub use story_client::{NewStory, StoryClient, UploadPayload};
pub use upload_queue::{process_upload_queue, upload_file_list};
