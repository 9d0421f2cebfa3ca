//! Ingest command - adds documents to a group

use clap::Args;
use tracing::info;

use crate::build_pipeline;
use crate::domain::document::GroupId;

/// Arguments for the ingest command
#[derive(Args, Clone, Debug)]
pub struct IngestArgs {
    /// Group receiving the documents
    #[arg(long)]
    pub group: String,

    /// Uploaded files, relative to the configured source root
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Recorded as the uploader of every version
    #[arg(long, default_value = "cli")]
    pub actor: String,

    /// Content type of the files; guessed from the extension when omitted
    #[arg(long)]
    pub mime_type: Option<String>,
}

/// Submit a group upload and wait for its summary
pub async fn run(args: IngestArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let pipeline = build_pipeline(&config).await?;

    let files = args
        .files
        .iter()
        .map(|path| super::source_file(path, args.mime_type.as_deref()))
        .collect();

    let ack = pipeline
        .queue
        .submit_group_upload(GroupId::new(args.group), files, &args.actor)
        .await?;
    info!(job_id = %ack.job_id, documents = ack.document_ids.len(), "Group upload submitted");

    let record = pipeline.queue.wait(&ack.job_id).await?;
    pipeline.queue.shutdown().await;

    super::report(&record)
}
