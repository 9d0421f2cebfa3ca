//! Reupload command - adds a new version to an existing document

use clap::Args;
use tracing::info;

use crate::build_pipeline;
use crate::domain::document::DocumentId;

/// Arguments for the reupload command
#[derive(Args, Clone, Debug)]
pub struct ReuploadArgs {
    /// Document receiving the new version
    #[arg(long)]
    pub document: String,

    /// Uploaded file, relative to the configured source root
    pub file: String,

    /// Audit comment; defaults to "New version uploaded v<N>"
    #[arg(long)]
    pub comment: Option<String>,

    #[arg(long, default_value = "cli")]
    pub actor: String,

    #[arg(long)]
    pub mime_type: Option<String>,
}

/// Submit a new version and wait for its summary
pub async fn run(args: ReuploadArgs) -> anyhow::Result<()> {
    let config = super::bootstrap()?;
    let pipeline = build_pipeline(&config).await?;

    let file = super::source_file(&args.file, args.mime_type.as_deref());
    let ack = pipeline
        .queue
        .submit_new_version(DocumentId::new(args.document), file, args.comment, &args.actor)
        .await?;
    info!(job_id = %ack.job_id, "New version submitted");

    let record = pipeline.queue.wait(&ack.job_id).await?;
    pipeline.queue.shutdown().await;

    super::report(&record)
}
