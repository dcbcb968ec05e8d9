use crate::{
    config::MongoConfig,
    entity::Entity,
    error::Result,
    repository::PanacheRepository,
};
use mongodb::{Client, Database, bson::doc};
use std::sync::Arc;
use tracing::info;

/// Owns the driver client and its connection pool.
///
/// Create one at startup, hand out clones (or repositories), and call
/// [`shutdown`](Self::shutdown) before exiting.
#[derive(Clone, Debug)]
pub struct PanacheClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
}

impl PanacheClient {
    /// Builds a client from `config`. No request is sent until the first
    /// operation, so an unreachable store surfaces as
    /// [`StoreUnavailable`](crate::PanacheError::StoreUnavailable) later on.
    pub async fn connect(config: MongoConfig) -> Result<Self> {
        let options = config.to_client_options().await?;
        let client = Client::with_options(options)?;

        info!(database = %config.database, "mongodb client created");

        Ok(Self::with_config(client, config))
    }

    /// Wraps an existing driver client.
    pub fn from_client(client: Client, database: impl Into<String>) -> Self {
        let config = MongoConfig::new(String::new(), database);
        Self::with_config(client, config)
    }

    fn with_config(client: Client, config: MongoConfig) -> Self {
        Self {
            database: client.database(&config.database),
            client,
            config: Arc::new(config),
        }
    }

    pub fn repository<E: Entity>(&self) -> PanacheRepository<E> {
        PanacheRepository::new(self.database_for::<E>())
    }

    /// The database holding `E`'s collection.
    pub fn database_for<E: Entity>(&self) -> Database {
        match E::DATABASE_NAME {
            Some(name) => self.client.database(name),
            None => self.database.clone(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    pub async fn ping(&self) -> Result<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;

        Ok(())
    }

    /// Waits for in-flight operations and closes every pooled connection.
    pub async fn shutdown(self) {
        info!(database = %self.config.database, "mongodb client shutting down");
        self.client.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Audit {
        #[serde(rename = "_id")]
        id: Option<i32>,
    }

    impl Entity for Audit {
        type Id = i32;

        const COLLECTION_NAME: &'static str = "audit";
        const DATABASE_NAME: Option<&'static str> = Some("logs");

        fn id(&self) -> Option<i32> {
            self.id
        }

        fn set_id(&mut self, id: i32) {
            self.id = Some(id);
        }
    }

    #[tokio::test]
    async fn entities_may_override_database() {
        let client = PanacheClient::connect(MongoConfig::new("mongodb://127.0.0.1:1", "books"))
            .await
            .unwrap();

        assert_eq!(client.database().name(), "books");
        assert_eq!(client.database_for::<Audit>().name(), "logs");
        assert_eq!(
            client.repository::<Audit>().mongo_collection().namespace().to_string(),
            "logs.audit"
        );
    }
}
