use clap::Args;

/// Parameters naming the queue collection.
#[derive(Debug, Clone, Default, Args)]
pub struct QueueCliArgs {
    /// Name of the collection backing the queue. Defaults to `queue`.
    #[arg(env = "DOCQUEUE_QUEUE", long)]
    pub queue: Option<String>,
}
