use crate::{
    entity::Entity,
    error::Result,
    params::Params,
    ql::{self, Query},
    query::PanacheQuery,
    update::PanacheUpdate,
};
use futures_util::{
    FutureExt, StreamExt,
    future::{self, BoxFuture},
    stream::{self, BoxStream},
};
use mongodb::{
    Collection, Database,
    bson::{self, Bson, Document, doc},
};
use std::{fmt, marker::PhantomData};
use tracing::debug;

/// Entity-scoped operations over one collection.
///
/// Obtained from [`PanacheClient::repository`](crate::PanacheClient::repository).
/// Repositories are cheap to clone. The futures and streams they return own
/// their state and only borrow the entity they were given, if any.
pub struct PanacheRepository<E: Entity> {
    database: Database,
    entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for PanacheRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.database.clone())
    }
}

impl<E: Entity> fmt::Debug for PanacheRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanacheRepository")
            .field("database", &self.database.name())
            .field("collection", &self.mongo_collection().name())
            .finish()
    }
}

impl<E: Entity> PanacheRepository<E> {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            entity: PhantomData,
        }
    }

    pub fn mongo_collection(&self) -> Collection<E> {
        E::collection(&self.database)
    }

    pub fn mongo_database(&self) -> &Database {
        &self.database
    }

    /// The entity's collection, read as raw documents.
    fn documents(&self) -> Collection<Document> {
        self.mongo_collection().clone_with_type()
    }

    /// Inserts `entity`, assigning the identifier generated by the store when
    /// it had none.
    pub fn persist<'a>(&self, entity: &'a mut E) -> BoxFuture<'a, Result<()>> {
        let collection = self.documents();
        async move { insert(&collection, entity).await }.boxed()
    }

    /// Replaces the stored document having the entity's identifier.
    ///
    /// Resolves to `false` when the entity has no identifier or no stored
    /// document has it; nothing is inserted in that case.
    pub fn update<'a>(&self, entity: &'a E) -> BoxFuture<'a, Result<bool>> {
        let collection = self.documents();
        async move { replace(&collection, entity, false).await }.boxed()
    }

    /// Inserts `entity` when it has no identifier, otherwise replaces or
    /// inserts the document having its identifier.
    pub fn persist_or_update<'a>(&self, entity: &'a mut E) -> BoxFuture<'a, Result<()>> {
        let collection = self.documents();
        async move { upsert(&collection, entity).await }.boxed()
    }

    /// Inserts every entity with a single ordered `insert_many`.
    ///
    /// The store stops at the first failing document; entities before it are
    /// stored, but no identifiers are written back on failure.
    pub fn persist_all<'a, I>(&self, entities: I) -> BoxFuture<'a, Result<()>>
    where
        I: IntoIterator<Item = &'a mut E>,
    {
        let collection = self.documents();
        let mut entities = entities.into_iter().collect::<Vec<_>>();

        async move {
            if entities.is_empty() {
                return Ok(());
            }

            let documents = entities
                .iter()
                .map(|entity| to_document(&**entity))
                .collect::<Result<Vec<_>>>()?;

            let result = collection.insert_many(documents).await?;

            debug!(
                collection = collection.name(),
                inserted = result.inserted_ids.len(),
                "persist all"
            );

            for (index, entity) in entities.iter_mut().enumerate() {
                if entity.id().is_some() {
                    continue;
                }

                if let Some(id) = result.inserted_ids.get(&index) {
                    entity.set_id(bson::from_bson(id.clone())?);
                }
            }

            Ok(())
        }
        .boxed()
    }

    /// Updates each entity in turn, stopping at the first error. Resolves to
    /// the number of entities that matched a stored document.
    pub fn update_all<'a, I>(&self, entities: I) -> BoxFuture<'a, Result<u64>>
    where
        I: IntoIterator<Item = &'a E>,
    {
        let collection = self.documents();
        let entities = entities.into_iter().collect::<Vec<_>>();

        async move {
            let mut matched = 0;

            for entity in entities {
                if replace(&collection, entity, false).await? {
                    matched += 1;
                }
            }

            Ok(matched)
        }
        .boxed()
    }

    /// Persists or updates each entity in turn, stopping at the first error.
    pub fn persist_or_update_all<'a, I>(&self, entities: I) -> BoxFuture<'a, Result<()>>
    where
        I: IntoIterator<Item = &'a mut E>,
    {
        let collection = self.documents();
        let entities = entities.into_iter().collect::<Vec<_>>();

        async move {
            for entity in entities {
                upsert(&collection, entity).await?;
            }

            Ok(())
        }
        .boxed()
    }

    pub fn delete<'a>(&self, entity: &'a E) -> BoxFuture<'a, Result<bool>> {
        match entity.id() {
            Some(id) => self.delete_by_id(id),
            None => future::ready(Ok(false)).boxed(),
        }
    }

    /// Resolves to whether a document was removed.
    pub fn delete_by_id(&self, id: E::Id) -> BoxFuture<'static, Result<bool>> {
        let collection = self.documents();

        async move {
            let filter = doc! { "_id": bson::to_bson(&id)? };
            let result = collection.delete_one(filter).await?;

            debug!(
                collection = collection.name(),
                ?id,
                deleted = result.deleted_count,
                "delete by id"
            );

            Ok(result.deleted_count > 0)
        }
        .boxed()
    }

    pub fn delete_all(&self) -> BoxFuture<'static, Result<u64>> {
        self.delete_matching(doc! {})
    }

    pub fn delete_where(
        &self,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<u64>> {
        match ql::bind_filter(&query.into(), &params.into()) {
            Ok(filter) => self.delete_matching(filter),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }

    fn delete_matching(&self, filter: Document) -> BoxFuture<'static, Result<u64>> {
        let collection = self.documents();

        async move {
            let result = collection.delete_many(filter).await?;

            debug!(
                collection = collection.name(),
                deleted = result.deleted_count,
                "delete many"
            );

            Ok(result.deleted_count)
        }
        .boxed()
    }

    pub fn find_by_id(&self, id: E::Id) -> BoxFuture<'static, Result<Option<E>>> {
        let collection = self.mongo_collection();

        async move {
            let entity = collection
                .find_one(doc! { "_id": bson::to_bson(&id)? })
                .await?;

            Ok(entity)
        }
        .boxed()
    }

    /// Binds `params` into `query` and returns an unexecuted query handle.
    pub fn find(
        &self,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> Result<PanacheQuery<E>> {
        let filter = ql::bind_filter(&query.into(), &params.into())?;

        Ok(PanacheQuery::new(self.mongo_collection(), filter, None))
    }

    pub fn find_sorted(
        &self,
        query: impl Into<Query>,
        sort: impl Into<Document>,
        params: impl Into<Params>,
    ) -> Result<PanacheQuery<E>> {
        let filter = ql::bind_filter(&query.into(), &params.into())?;

        Ok(PanacheQuery::new(
            self.mongo_collection(),
            filter,
            Some(sort.into()),
        ))
    }

    pub fn find_all(&self) -> PanacheQuery<E> {
        PanacheQuery::new(self.mongo_collection(), doc! {}, None)
    }

    pub fn find_all_sorted(&self, sort: impl Into<Document>) -> PanacheQuery<E> {
        PanacheQuery::new(self.mongo_collection(), doc! {}, Some(sort.into()))
    }

    pub fn list(
        &self,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<Vec<E>>> {
        with_query(self.find(query, params), |query| query.list())
    }

    pub fn list_sorted(
        &self,
        query: impl Into<Query>,
        sort: impl Into<Document>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<Vec<E>>> {
        with_query(self.find_sorted(query, sort, params), |query| query.list())
    }

    pub fn list_all(&self) -> BoxFuture<'static, Result<Vec<E>>> {
        self.find_all().list()
    }

    pub fn list_all_sorted(&self, sort: impl Into<Document>) -> BoxFuture<'static, Result<Vec<E>>> {
        self.find_all_sorted(sort).list()
    }

    pub fn stream(
        &self,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxStream<'static, Result<E>> {
        stream_query(self.find(query, params))
    }

    pub fn stream_sorted(
        &self,
        query: impl Into<Query>,
        sort: impl Into<Document>,
        params: impl Into<Params>,
    ) -> BoxStream<'static, Result<E>> {
        stream_query(self.find_sorted(query, sort, params))
    }

    pub fn stream_all(&self) -> BoxStream<'static, Result<E>> {
        self.find_all().stream()
    }

    pub fn stream_all_sorted(&self, sort: impl Into<Document>) -> BoxStream<'static, Result<E>> {
        self.find_all_sorted(sort).stream()
    }

    pub fn count(
        &self,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<u64>> {
        with_query(self.find(query, params), |query| query.count())
    }

    pub fn count_all(&self) -> BoxFuture<'static, Result<u64>> {
        self.find_all().count()
    }

    /// Validates `update` and returns a builder awaiting its filter.
    pub fn update_many(
        &self,
        update: impl Into<Query>,
        params: impl Into<Params>,
    ) -> Result<PanacheUpdate<E>> {
        let update = ql::bind_update(&update.into(), &params.into())?;

        Ok(PanacheUpdate::new(self.mongo_collection(), update))
    }
}

fn with_query<E: Entity, T: Send + 'static>(
    query: Result<PanacheQuery<E>>,
    terminal: impl FnOnce(PanacheQuery<E>) -> BoxFuture<'static, Result<T>>,
) -> BoxFuture<'static, Result<T>> {
    match query {
        Ok(query) => terminal(query),
        Err(err) => future::ready(Err(err)).boxed(),
    }
}

fn stream_query<E: Entity>(query: Result<PanacheQuery<E>>) -> BoxStream<'static, Result<E>> {
    match query {
        Ok(query) => query.stream(),
        Err(err) => stream::once(future::ready(Err(err))).boxed(),
    }
}

/// Serializes an entity, dropping a null `_id` so the store generates one.
fn to_document<E: Entity>(entity: &E) -> Result<Document> {
    let mut document = bson::to_document(entity)?;

    if matches!(document.get("_id"), Some(Bson::Null)) {
        document.remove("_id");
    }

    Ok(document)
}

fn id_filter<E: Entity>(entity: &E) -> Result<Option<Document>> {
    let Some(id) = entity.id() else {
        return Ok(None);
    };

    Ok(Some(doc! { "_id": bson::to_bson(&id)? }))
}

async fn insert<E: Entity>(collection: &Collection<Document>, entity: &mut E) -> Result<()> {
    let result = collection.insert_one(to_document(entity)?).await?;

    debug!(collection = collection.name(), id = %result.inserted_id, "persist");

    if entity.id().is_none() {
        entity.set_id(bson::from_bson(result.inserted_id)?);
    }

    Ok(())
}

async fn replace<E: Entity>(
    collection: &Collection<Document>,
    entity: &E,
    upsert: bool,
) -> Result<bool> {
    let Some(filter) = id_filter(entity)? else {
        return Ok(false);
    };

    let result = collection
        .replace_one(filter, to_document(entity)?)
        .upsert(upsert)
        .await?;

    debug!(
        collection = collection.name(),
        matched = result.matched_count,
        upserted = result.upserted_id.is_some(),
        "replace"
    );

    Ok(result.matched_count > 0 || result.upserted_id.is_some())
}

async fn upsert<E: Entity>(collection: &Collection<Document>, entity: &mut E) -> Result<()> {
    if entity.id().is_none() {
        return insert(collection, entity).await;
    }

    replace(collection, entity, true).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Parameters, PanacheError, params};
    use mongodb::Client;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<i32>,
        title: String,
        author: String,
    }

    impl Entity for Book {
        type Id = i32;

        const COLLECTION_NAME: &'static str = "books";

        fn id(&self) -> Option<i32> {
            self.id
        }

        fn set_id(&mut self, id: i32) {
            self.id = Some(id);
        }
    }

    fn book(id: Option<i32>) -> Book {
        Book {
            id,
            title: "Les Misérables".into(),
            author: "Victor Hugo".into(),
        }
    }

    // Nothing listens on port 1; every test here must fail before reaching it.
    async fn repository() -> PanacheRepository<Book> {
        let client = Client::with_uri_str("mongodb://127.0.0.1:1").await.unwrap();
        PanacheRepository::new(client.database("panache_repository_tests"))
    }

    #[test]
    fn null_id_is_dropped_from_documents() {
        #[derive(Serialize)]
        struct Raw {
            #[serde(rename = "_id")]
            id: Option<i32>,
        }

        let document = bson::to_document(&Raw { id: None }).unwrap();
        assert_eq!(document, doc! { "_id": Bson::Null });

        let stripped = to_document(&book(None)).unwrap();
        assert!(!stripped.contains_key("_id"));

        let kept = to_document(&book(Some(7))).unwrap();
        assert_eq!(kept.get_i32("_id").unwrap(), 7);
    }

    #[tokio::test]
    async fn writes_and_reads_share_an_overridden_collection() {
        #[derive(Serialize, Deserialize)]
        struct Archived {
            #[serde(rename = "_id")]
            id: Option<i32>,
        }

        impl Entity for Archived {
            type Id = i32;

            const COLLECTION_NAME: &'static str = "archived";

            fn collection(db: &Database) -> Collection<Self> {
                db.collection("archived_v2")
            }

            fn id(&self) -> Option<i32> {
                self.id
            }

            fn set_id(&mut self, id: i32) {
                self.id = Some(id);
            }
        }

        let client = Client::with_uri_str("mongodb://127.0.0.1:1").await.unwrap();
        let repository = PanacheRepository::<Archived>::new(client.database("db"));

        assert_eq!(repository.mongo_collection().name(), "archived_v2");
        assert_eq!(repository.documents().name(), "archived_v2");
        assert!(format!("{:?}", repository.find_all()).contains("\"archived_v2\""));
        assert!(format!("{repository:?}").contains("\"archived_v2\""));
    }

    #[test]
    fn id_filter_uses_underscore_id() {
        assert_eq!(id_filter(&book(Some(3))).unwrap(), Some(doc! { "_id": 3 }));
        assert_eq!(id_filter(&book(None)).unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_queries_fail_before_store_access() {
        let repository = repository().await;

        let err = repository.find("author = ?2", params!["X"]).unwrap_err();
        assert!(err.is_validation(), "{err}");

        let err = repository.list("author = :a", params!["X"]).await.unwrap_err();
        assert!(err.is_validation(), "{err}");

        let err = repository.count("author = ?1", ()).await.unwrap_err();
        assert!(err.is_validation(), "{err}");

        let err = repository
            .delete_where("author", Parameters::with("a", "X").and("b", "Y"))
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{err}");
    }

    #[tokio::test]
    async fn malformed_stream_yields_one_error() {
        let repository = repository().await;

        let results = repository
            .stream_sorted("author = ?1 or", doc! { "title": 1 }, params!["X"])
            .collect::<Vec<_>>()
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(PanacheError::MalformedQuery { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_update_fails_before_store_access() {
        let repository = repository().await;

        let err = repository.update_many("{$set: 1}", ()).unwrap_err();
        assert!(matches!(err, PanacheError::MalformedUpdate { .. }));

        let update = repository.update_many("title = ?1", params!["T"]).unwrap();
        assert_eq!(update.update_document(), &doc! { "$set": { "title": "T" } });

        let err = update.filter("author = ?1", ()).await.unwrap_err();
        assert!(err.is_validation(), "{err}");
    }

    #[tokio::test]
    async fn entities_without_id_are_not_updated_or_deleted() {
        let repository = repository().await;
        let book = book(None);

        assert!(!repository.update(&book).await.unwrap());
        assert!(!repository.delete(&book).await.unwrap());
        assert_eq!(repository.update_all([&book, &book]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_bulk_operations_are_no_ops() {
        let repository = repository().await;

        repository.persist_all(Vec::<&mut Book>::new()).await.unwrap();
        repository.persist_or_update_all([]).await.unwrap();
        assert_eq!(repository.update_all(&[] as &[Book]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sorted_queries_keep_their_sort() {
        let repository = repository().await;
        let query = repository
            .find_sorted("author", crate::Sort::by("title"), params!["X"])
            .unwrap();

        assert_eq!(query.filter_document(), &doc! { "author": "X" });
        assert_eq!(query.sort_document(), Some(&doc! { "title": 1 }));

        let all = repository.find_all_sorted(doc! { "_id": -1 });
        assert_eq!(all.filter_document(), &doc! {});
        assert_eq!(all.sort_document(), Some(&doc! { "_id": -1 }));
    }
}
