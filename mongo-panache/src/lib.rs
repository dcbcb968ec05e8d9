//! Mongo Panache is a repository and active-record layer over the `MongoDB` driver.
//!
//! ## Example
//!
//! ```no_run
//! use mongo_panache::prelude::*;
//! use mongo_panache::bson::oid::ObjectId;
//! use serde::{Deserialize, Serialize};
//!
//! // Define an entity
//! #[derive(Serialize, Deserialize, Entity)]
//! #[entity(collection = "books", projections(Summary(title)))]
//! struct Book {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     id: Option<ObjectId>,
//!     title: String,
//!     author: String,
//! }
//!
//! # async fn run() -> mongo_panache::Result<()> {
//! let client = PanacheClient::connect(MongoConfig::from_env()?).await?;
//!
//! // Insert an entity; the generated id is written back
//! let mut book = Book { id: None, title: "Les Misérables".into(), author: "Victor Hugo".into() };
//! book.persist(&client).await?;
//!
//! // Query with PanacheQL, positional or named parameters
//! let by_hugo = Book::list(&client, "author", params!["Victor Hugo"]).await?;
//! let same = Book::list(&client, "author = :author", Parameters::with("author", "Victor Hugo")).await?;
//!
//! // Native queries, sorting and paging
//! let first = Book::find_sorted(&client, "{'author': ?1}", Sort::by(book::Fields::Title), params!["Victor Hugo"])?
//!     .page(Page::of_size(10))
//!     .first_result()
//!     .await?;
//!
//! // Load only some fields
//! let titles: Vec<book::Summary> = Book::find_all(&client).project().list().await?;
//!
//! // Update every matching document
//! let modified = Book::update_many(&client, "author = ?1", params!["V. Hugo"])?
//!     .filter("author = ?1", params!["Victor Hugo"])
//!     .await?;
//!
//! // Delete by id; absence is `false`, not an error
//! let removed = Book::delete_by_id(&client, book.id.unwrap()).await?;
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! # fn main() {}
//! ```
//!
//! See [`guides`] module to learn more!

#![warn(clippy::pedantic)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_errors_doc
)]

extern crate self as mongo_panache;

pub use mongodb::{self, bson};

pub use mongo_panache_macros::Entity;

mod client;
mod config;
mod entity;
mod error;
mod params;
mod query;
mod repository;
mod sort;
mod update;

pub mod guides;
pub mod ql;

pub use client::PanacheClient;
pub use config::{DEFAULT_URI, MongoConfig, MongoConfigBuilder};
pub use entity::{ActiveRecord, Entity, Projection};
pub use error::{PanacheError, Result};
pub use params::{Parameters, Params};
pub use ql::Query;
pub use query::{Page, PanacheQuery};
pub use repository::PanacheRepository;
pub use sort::{Direction, Sort};
pub use update::PanacheUpdate;

pub mod prelude {
    pub use crate::{
        ActiveRecord, Direction, Entity, MongoConfig, Page, PanacheClient, PanacheQuery,
        PanacheRepository, Parameters, Params, Projection, Sort, params,
    };
}
