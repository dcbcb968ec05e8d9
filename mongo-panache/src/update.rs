use crate::{
    entity::Entity,
    error::Result,
    params::Params,
    ql::{self, Query},
};
use futures_util::{FutureExt, future::BoxFuture};
use mongodb::{
    Collection,
    bson::{Document, doc},
};
use std::fmt;
use tracing::debug;

/// A validated update waiting for the filter selecting the documents it
/// applies to.
///
/// Obtained from [`PanacheRepository::update_many`](crate::PanacheRepository::update_many).
/// Nothing is sent to the store until [`filter`](Self::filter) or
/// [`all`](Self::all) is awaited.
pub struct PanacheUpdate<E: Entity> {
    collection: Collection<E>,
    update: Document,
}

impl<E: Entity> Clone for PanacheUpdate<E> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            update: self.update.clone(),
        }
    }
}

impl<E: Entity> fmt::Debug for PanacheUpdate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanacheUpdate")
            .field("collection", &self.collection.name())
            .field("update", &self.update)
            .finish()
    }
}

impl<E: Entity> PanacheUpdate<E> {
    pub(crate) fn new(collection: Collection<E>, update: Document) -> Self {
        Self { collection, update }
    }

    pub fn update_document(&self) -> &Document {
        &self.update
    }

    /// Applies the update to every document matching `query`, returning the
    /// number of modified documents.
    pub fn filter(
        &self,
        query: impl Into<Query>,
        params: impl Into<Params>,
    ) -> BoxFuture<'static, Result<u64>> {
        match ql::bind_filter(&query.into(), &params.into()) {
            Ok(filter) => self.execute(filter),
            Err(err) => async move { Err(err) }.boxed(),
        }
    }

    /// Applies the update to every document in the collection.
    pub fn all(&self) -> BoxFuture<'static, Result<u64>> {
        self.execute(doc! {})
    }

    fn execute(&self, filter: Document) -> BoxFuture<'static, Result<u64>> {
        let collection = self.collection.clone();
        let update = self.update.clone();

        async move {
            let result = collection.update_many(filter, update).await?;

            debug!(
                collection = collection.name(),
                matched = result.matched_count,
                modified = result.modified_count,
                "update many"
            );

            Ok(result.modified_count)
        }
        .boxed()
    }
}
