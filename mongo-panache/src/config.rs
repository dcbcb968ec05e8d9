//! Connection configuration.

use crate::error::{PanacheError, Result};
use mongodb::options::ClientOptions;
use std::{env, time::Duration};

pub const DEFAULT_URI: &str = "mongodb://localhost:27017";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MongoConfig {
    pub uri: String,
    /// Default database for entities that do not name their own.
    pub database: String,
    pub app_name: Option<String>,
    pub min_pool_size: Option<u32>,
    pub max_pool_size: Option<u32>,
    pub connect_timeout: Option<Duration>,
    pub server_selection_timeout: Option<Duration>,
    pub retry_writes: Option<bool>,
    pub retry_reads: Option<bool>,
    pub direct_connection: Option<bool>,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            app_name: None,
            min_pool_size: None,
            max_pool_size: None,
            connect_timeout: None,
            server_selection_timeout: None,
            retry_writes: None,
            retry_reads: None,
            direct_connection: None,
        }
    }

    pub fn builder() -> MongoConfigBuilder {
        MongoConfigBuilder::default()
    }

    /// Reads `MONGODB_URI` (defaulting to [`DEFAULT_URI`]) and
    /// `MONGODB_DATABASE` (required).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database = lookup("MONGODB_DATABASE")
            .filter(|database| !database.is_empty())
            .ok_or_else(|| PanacheError::config("MONGODB_DATABASE is not set"))?;

        let uri = lookup("MONGODB_URI").unwrap_or_else(|| DEFAULT_URI.to_owned());

        Ok(Self::new(uri, database))
    }

    pub async fn to_client_options(&self) -> Result<ClientOptions> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|err| PanacheError::config(format!("invalid uri `{}`: {err}", self.uri)))?;

        if self.app_name.is_some() {
            options.app_name.clone_from(&self.app_name);
        }

        if self.min_pool_size.is_some() {
            options.min_pool_size = self.min_pool_size;
        }

        if self.max_pool_size.is_some() {
            options.max_pool_size = self.max_pool_size;
        }

        if self.connect_timeout.is_some() {
            options.connect_timeout = self.connect_timeout;
        }

        if self.server_selection_timeout.is_some() {
            options.server_selection_timeout = self.server_selection_timeout;
        }

        if self.retry_writes.is_some() {
            options.retry_writes = self.retry_writes;
        }

        if self.retry_reads.is_some() {
            options.retry_reads = self.retry_reads;
        }

        if self.direct_connection.is_some() {
            options.direct_connection = self.direct_connection;
        }

        Ok(options)
    }
}

#[derive(Debug, Default)]
pub struct MongoConfigBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    min_pool_size: Option<u32>,
    max_pool_size: Option<u32>,
    connect_timeout: Option<Duration>,
    server_selection_timeout: Option<Duration>,
    retry_writes: Option<bool>,
    retry_reads: Option<bool>,
    direct_connection: Option<bool>,
}

impl MongoConfigBuilder {
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = Some(timeout);
        self
    }

    pub fn retry_writes(mut self, enabled: bool) -> Self {
        self.retry_writes = Some(enabled);
        self
    }

    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = Some(enabled);
        self
    }

    /// Connect to the given host only, skipping replica set discovery.
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    pub fn build(self) -> Result<MongoConfig> {
        let database = self
            .database
            .filter(|database| !database.is_empty())
            .ok_or_else(|| PanacheError::config("database name is required"))?;

        Ok(MongoConfig {
            uri: self.uri.unwrap_or_else(|| DEFAULT_URI.to_owned()),
            database,
            app_name: self.app_name,
            min_pool_size: self.min_pool_size,
            max_pool_size: self.max_pool_size,
            connect_timeout: self.connect_timeout,
            server_selection_timeout: self.server_selection_timeout,
            retry_writes: self.retry_writes,
            retry_reads: self.retry_reads,
            direct_connection: self.direct_connection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn builder_requires_database() {
        let err = MongoConfig::builder().uri(DEFAULT_URI).build().unwrap_err();
        assert_eq!(err.to_string(), "configuration error: database name is required");
    }

    #[test]
    fn builder_defaults_uri() {
        let config = MongoConfig::builder()
            .database("books")
            .max_pool_size(20)
            .build()
            .unwrap();

        assert_eq!(config.uri, DEFAULT_URI);
        assert_eq!(config.database, "books");
        assert_eq!(config.max_pool_size, Some(20));
        assert_eq!(config.app_name, None);
    }

    #[test]
    fn env_lookup() {
        let vars = HashMap::from([
            ("MONGODB_URI", "mongodb://db:27017"),
            ("MONGODB_DATABASE", "books"),
        ]);
        let config = MongoConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned())).unwrap();
        assert_eq!(config, MongoConfig::new("mongodb://db:27017", "books"));

        let err = MongoConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, PanacheError::Config(_)));
    }

    #[tokio::test]
    async fn client_options_carry_overrides() {
        let config = MongoConfig::builder()
            .uri("mongodb://localhost:27017/?appName=uri")
            .database("books")
            .app_name("bookshelf")
            .server_selection_timeout(Duration::from_secs(2))
            .direct_connection(true)
            .build()
            .unwrap();

        let options = config.to_client_options().await.unwrap();
        assert_eq!(options.app_name.as_deref(), Some("bookshelf"));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(2)));
        assert_eq!(options.direct_connection, Some(true));
        assert_eq!(options.max_pool_size, None);
    }

    #[tokio::test]
    async fn invalid_uri_is_config_error() {
        let err = MongoConfig::new("postgres://nope", "books")
            .to_client_options()
            .await
            .unwrap_err();
        assert!(matches!(err, PanacheError::Config(_)));
    }
}
