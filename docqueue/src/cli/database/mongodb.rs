use clap::Args;

/// Parameters used to reach the MongoDB deployment holding the queue.
#[derive(Debug, Clone, Default, Args)]
pub struct MongoDBCliArgs {
    /// The connection string to the MongoDB server.
    #[arg(env = "DOCQUEUE_MONGODB_CONNECTION_URL", long = "mongodb-connection-url")]
    pub connection_url: Option<String>,

    /// The name of the database.
    #[arg(env = "DOCQUEUE_MONGODB_DATABASE_NAME", long = "mongodb-database-name")]
    pub database_name: Option<String>,
}
