use clap::Parser;
use mongo_panache::{DEFAULT_URI, MongoConfig};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Parser)]
#[command(name = "bookshelf", version, about = "Serves books stored in MongoDB")]
pub struct CliArgs {
    #[arg(
        long,
        env = "BOOKSHELF_BIND",
        value_name = "ADDR",
        default_value = "127.0.0.1:8080",
        help = "Address the HTTP server listens on"
    )]
    pub bind: SocketAddr,

    #[arg(
        long,
        env = "MONGODB_URI",
        value_name = "URI",
        default_value = DEFAULT_URI,
        help = "MongoDB connection string"
    )]
    pub mongodb_uri: String,

    #[arg(
        long,
        env = "MONGODB_DATABASE",
        value_name = "NAME",
        default_value = "bookshelf",
        help = "Database holding the books collection"
    )]
    pub database: String,

    #[arg(
        long,
        env = "MONGODB_MAX_POOL_SIZE",
        value_name = "N",
        help = "Maximum number of pooled connections"
    )]
    pub max_pool_size: Option<u32>,

    #[arg(
        long,
        env = "MONGODB_SERVER_SELECTION_TIMEOUT_MS",
        value_name = "MS",
        help = "How long to wait for a usable server, in milliseconds"
    )]
    pub server_selection_timeout_ms: Option<u64>,
}

impl CliArgs {
    pub fn mongo_config(&self) -> mongo_panache::Result<MongoConfig> {
        let mut builder = MongoConfig::builder()
            .uri(&self.mongodb_uri)
            .database(&self.database)
            .app_name(env!("CARGO_PKG_NAME"));

        if let Some(size) = self.max_pool_size {
            builder = builder.max_pool_size(size);
        }

        if let Some(timeout) = self.server_selection_timeout_ms {
            builder = builder.server_selection_timeout(Duration::from_millis(timeout));
        }

        builder.build()
    }
}
