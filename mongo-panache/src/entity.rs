use crate::{
    client::PanacheClient,
    error::Result,
    params::Params,
    query::PanacheQuery,
    ql::Query,
    update::PanacheUpdate,
};
use futures_util::{future::BoxFuture, stream::BoxStream};
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
};
use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Debug, sync::LazyLock};

/// A record stored in its own collection.
///
/// Usually implemented with `#[derive(Entity)]`. The identifier is stored
/// under the `_id` key.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    type Id: Serialize + DeserializeOwned + Clone + Send + Sync + Debug + 'static;

    const COLLECTION_NAME: &'static str;

    /// Database holding the collection, when it differs from the client's
    /// default database.
    const DATABASE_NAME: Option<&'static str> = None;

    /// The identifier, or `None` when the entity has not been persisted yet.
    fn id(&self) -> Option<Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    fn collection(db: &Database) -> Collection<Self> {
        db.collection(Self::COLLECTION_NAME)
    }
}

/// A subset of an entity's fields, loaded with a projection.
///
/// Every entity is a projection of itself.
pub trait Projection<E: Entity>: DeserializeOwned + Send + Sync + Unpin + 'static {
    /// Stored field names to load, or `None` for the whole document.
    const FIELDS: Option<&'static [&'static str]>;

    fn projection_document() -> Option<Document> {
        static DOCUMENTS: LazyLock<dashmap::DashMap<&'static [&'static str], Document>> =
            LazyLock::new(dashmap::DashMap::new);

        Self::FIELDS.map(|fields| {
            if let Some(document) = DOCUMENTS.get(fields) {
                return document.clone();
            }

            let mut has_id = false;
            let mut document = doc! {};

            for field in fields {
                if matches!(*field, "id" | "_id") {
                    has_id = true;
                    document.insert("_id", 1);
                } else {
                    document.insert(*field, 1);
                }
            }

            if !has_id {
                document.insert("_id", 0);
            }

            DOCUMENTS.insert(fields, document.clone());
            document
        })
    }
}

impl<E: Entity> Projection<E> for E {
    const FIELDS: Option<&'static [&'static str]> = None;
}

/// The repository operations reached through the entity type itself.
///
/// ```no_run
/// # use mongo_panache::{ActiveRecord, Entity, PanacheClient, Result, bson::oid::ObjectId, params};
/// # use serde::{Deserialize, Serialize};
/// #[derive(Serialize, Deserialize, Entity)]
/// struct Book {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     title: String,
///     author: String,
/// }
///
/// # async fn run(client: &PanacheClient) -> Result<()> {
/// let mut book = Book { id: None, title: "Les Misérables".into(), author: "Victor Hugo".into() };
/// book.persist(client).await?;
///
/// let books = Book::list(client, "author", params!["Victor Hugo"]).await?;
/// assert_eq!(books.len(), 1);
/// # Ok(())
/// # }
/// ```
pub trait ActiveRecord: Entity {
    fn persist<'a>(&'a mut self, client: &PanacheClient) -> BoxFuture<'a, Result<()>> {
        client.repository::<Self>().persist(self)
    }

    fn update<'a>(&'a self, client: &PanacheClient) -> BoxFuture<'a, Result<bool>> {
        client.repository::<Self>().update(self)
    }

    fn persist_or_update<'a>(&'a mut self, client: &PanacheClient) -> BoxFuture<'a, Result<()>> {
        client.repository::<Self>().persist_or_update(self)
    }

    fn delete<'a>(&'a self, client: &PanacheClient) -> BoxFuture<'a, Result<bool>> {
        client.repository::<Self>().delete(self)
    }

    fn persist_all<'a, I>(client: &PanacheClient, entities: I) -> BoxFuture<'a, Result<()>>
    where
        I: IntoIterator<Item = &'a mut Self>,
    {
        client.repository::<Self>().persist_all(entities)
    }

    fn update_all<'a, I>(client: &PanacheClient, entities: I) -> BoxFuture<'a, Result<u64>>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        client.repository::<Self>().update_all(entities)
    }

    fn persist_or_update_all<'a, I>(
        client: &PanacheClient,
        entities: I,
    ) -> BoxFuture<'a, Result<()>>
    where
        I: IntoIterator<Item = &'a mut Self>,
    {
        client.repository::<Self>().persist_or_update_all(entities)
    }

    fn find_by_id(client: &PanacheClient, id: Self::Id) -> BoxFuture<'static, Result<Option<Self>>> {
        client.repository::<Self>().find_by_id(id)
    }

    fn find(
        client: &PanacheClient,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> Result<PanacheQuery<Self>> {
        client.repository::<Self>().find(query, params)
    }

    fn find_sorted(
        client: &PanacheClient,
        query: impl Into<Query>,
        sort: impl Into<Document>,
        params: impl Into<Params>,
    ) -> Result<PanacheQuery<Self>> {
        client.repository::<Self>().find_sorted(query, sort, params)
    }

    fn find_all(client: &PanacheClient) -> PanacheQuery<Self> {
        client.repository::<Self>().find_all()
    }

    fn find_all_sorted(client: &PanacheClient, sort: impl Into<Document>) -> PanacheQuery<Self> {
        client.repository::<Self>().find_all_sorted(sort)
    }

    fn list(
        client: &PanacheClient,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<Vec<Self>>> {
        client.repository::<Self>().list(query, params)
    }

    fn list_sorted(
        client: &PanacheClient,
        query: impl Into<Query>,
        sort: impl Into<Document>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<Vec<Self>>> {
        client.repository::<Self>().list_sorted(query, sort, params)
    }

    fn list_all(client: &PanacheClient) -> BoxFuture<'static, Result<Vec<Self>>> {
        client.repository::<Self>().list_all()
    }

    fn list_all_sorted(
        client: &PanacheClient,
        sort: impl Into<Document>,
    ) -> BoxFuture<'static, Result<Vec<Self>>> {
        client.repository::<Self>().list_all_sorted(sort)
    }

    fn stream(
        client: &PanacheClient,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxStream<'static, Result<Self>> {
        client.repository::<Self>().stream(query, params)
    }

    fn stream_sorted(
        client: &PanacheClient,
        query: impl Into<Query>,
        sort: impl Into<Document>,
        params: impl Into<Params>,
    ) -> BoxStream<'static, Result<Self>> {
        client.repository::<Self>().stream_sorted(query, sort, params)
    }

    fn stream_all(client: &PanacheClient) -> BoxStream<'static, Result<Self>> {
        client.repository::<Self>().stream_all()
    }

    fn stream_all_sorted(
        client: &PanacheClient,
        sort: impl Into<Document>,
    ) -> BoxStream<'static, Result<Self>> {
        client.repository::<Self>().stream_all_sorted(sort)
    }

    fn count(
        client: &PanacheClient,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<u64>> {
        client.repository::<Self>().count(query, params)
    }

    fn count_all(client: &PanacheClient) -> BoxFuture<'static, Result<u64>> {
        client.repository::<Self>().count_all()
    }

    fn delete_by_id(client: &PanacheClient, id: Self::Id) -> BoxFuture<'static, Result<bool>> {
        client.repository::<Self>().delete_by_id(id)
    }

    fn delete_all(client: &PanacheClient) -> BoxFuture<'static, Result<u64>> {
        client.repository::<Self>().delete_all()
    }

    fn delete_where(
        client: &PanacheClient,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<u64>> {
        client.repository::<Self>().delete_where(query, params)
    }

    fn update_many(
        client: &PanacheClient,
        update: impl Into<Query>,
        params: impl Into<Params>,
    ) -> Result<PanacheUpdate<Self>> {
        client.repository::<Self>().update_many(update, params)
    }

    fn mongo_collection(client: &PanacheClient) -> Collection<Self> {
        client.repository::<Self>().mongo_collection()
    }

    fn mongo_database(client: &PanacheClient) -> Database {
        client.database_for::<Self>()
    }
}

impl<E: Entity> ActiveRecord for E {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize)]
    struct Book {
        #[serde(rename = "_id")]
        id: Option<i64>,
        title: String,
        author: String,
    }

    impl Entity for Book {
        type Id = i64;

        const COLLECTION_NAME: &'static str = "books";

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
    }

    #[derive(Deserialize)]
    struct Title {
        #[allow(dead_code)]
        title: String,
    }

    impl Projection<Book> for Title {
        const FIELDS: Option<&'static [&'static str]> = Some(&["title"]);
    }

    #[derive(Deserialize)]
    struct TitleWithId {
        #[allow(dead_code)]
        #[serde(rename = "_id")]
        id: i64,
    }

    impl Projection<Book> for TitleWithId {
        const FIELDS: Option<&'static [&'static str]> = Some(&["_id", "title"]);
    }

    #[test]
    fn entity_is_its_own_projection() {
        assert_eq!(<Book as Projection<Book>>::projection_document(), None);
    }

    #[test]
    fn projection_excludes_id_unless_listed() {
        assert_eq!(
            Title::projection_document(),
            Some(doc! { "title": 1, "_id": 0 })
        );
        assert_eq!(
            TitleWithId::projection_document(),
            Some(doc! { "_id": 1, "title": 1 })
        );
    }

    #[test]
    fn projection_document_is_cached() {
        let first = Title::projection_document();
        let second = Title::projection_document();
        assert_eq!(first, second);
    }
}
