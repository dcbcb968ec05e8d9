//! Lazily evaluated query handles.

use crate::{
    entity::{Entity, Projection},
    error::{PanacheError, Result},
};
use futures_util::{
    FutureExt, StreamExt, TryStreamExt,
    future::BoxFuture,
    stream::{self, BoxStream},
};
use mongodb::{
    Collection, Cursor,
    bson::Document,
    options::{FindOneOptions, FindOptions},
};
use std::{fmt, marker::PhantomData};
use tracing::debug;

/// A page of results: zero-based `index`, `size` documents per page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Page {
    index: u64,
    size: u64,
}

impl Page {
    pub const DEFAULT_SIZE: u64 = 20;

    /// A page size of zero is raised to one.
    pub fn new(index: u64, size: u64) -> Self {
        Self {
            index,
            size: size.max(1),
        }
    }

    pub fn of_size(size: u64) -> Self {
        Self::new(0, size)
    }

    pub fn first(self) -> Self {
        Self::new(0, self.size)
    }

    pub fn next(self) -> Self {
        Self::new(self.index.saturating_add(1), self.size)
    }

    /// The previous page, or this page when it is already the first one.
    pub fn previous(self) -> Self {
        Self::new(self.index.saturating_sub(1), self.size)
    }

    pub fn with_index(self, index: u64) -> Self {
        Self::new(index, self.size)
    }

    pub fn index(self) -> u64 {
        self.index
    }

    /// Never zero.
    pub fn size(self) -> u64 {
        self.size
    }

    /// Pages of this size needed to hold `total` documents.
    fn count_for(self, total: u64) -> u64 {
        total.div_ceil(self.size.max(1))
    }

    fn has_next(self, page_count: u64) -> bool {
        self.index.saturating_add(1) < page_count
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::of_size(Self::DEFAULT_SIZE)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Window {
    #[default]
    All,
    Page(Page),
    /// Inclusive bounds.
    Range { first: u64, last: u64 },
}

impl Window {
    fn skip(self) -> Option<u64> {
        match self {
            Self::All => None,
            Self::Page(page) => Some(page.index.saturating_mul(page.size)),
            Self::Range { first, .. } => Some(first),
        }
    }

    fn limit(self) -> Option<u64> {
        match self {
            Self::All => None,
            Self::Page(page) => Some(page.size),
            Self::Range { first, last } => Some(last.saturating_add(1).saturating_sub(first)),
        }
    }

    fn is_empty(self) -> bool {
        self.limit() == Some(0)
    }
}

/// A filter, an optional sort, and an optional page or range, evaluated
/// against the store each time a terminal operation is awaited.
///
/// `P` selects the type results are loaded as; see [`project`](Self::project).
pub struct PanacheQuery<E: Entity, P: Projection<E> = E> {
    collection: Collection<E>,
    filter: Document,
    sort: Option<Document>,
    window: Window,
    projection: PhantomData<fn() -> P>,
}

impl<E: Entity, P: Projection<E>> Clone for PanacheQuery<E, P> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            filter: self.filter.clone(),
            sort: self.sort.clone(),
            window: self.window,
            projection: PhantomData,
        }
    }
}

impl<E: Entity, P: Projection<E>> fmt::Debug for PanacheQuery<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanacheQuery")
            .field("collection", &self.collection.name())
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("window", &self.window)
            .finish()
    }
}

impl<E: Entity> PanacheQuery<E> {
    pub(crate) fn new(collection: Collection<E>, filter: Document, sort: Option<Document>) -> Self {
        Self {
            collection,
            filter,
            sort: sort.filter(|sort| !sort.is_empty()),
            window: Window::All,
            projection: PhantomData,
        }
    }
}

impl<E: Entity, P: Projection<E>> PanacheQuery<E, P> {
    pub fn filter_document(&self) -> &Document {
        &self.filter
    }

    pub fn sort_document(&self) -> Option<&Document> {
        self.sort.as_ref()
    }

    /// Loads results as `Q` instead, fetching only the fields it declares.
    pub fn project<Q: Projection<E>>(self) -> PanacheQuery<E, Q> {
        PanacheQuery {
            collection: self.collection,
            filter: self.filter,
            sort: self.sort,
            window: self.window,
            projection: PhantomData,
        }
    }

    /// Restricts results to `page`, replacing any range.
    pub fn page(mut self, page: Page) -> Self {
        self.window = Window::Page(page);
        self
    }

    pub fn page_index(self, index: u64, size: u64) -> Self {
        self.page(Page::new(index, size))
    }

    /// Restricts results to the documents at positions `first..=last`,
    /// replacing any page.
    pub fn range(mut self, first: u64, last: u64) -> Self {
        self.window = Window::Range { first, last };
        self
    }

    /// The current page; [`Page::default`] when no page was set.
    pub fn current_page(&self) -> Page {
        match self.window {
            Window::Page(page) => page,
            Window::All | Window::Range { .. } => Page::default(),
        }
    }

    pub fn next_page(self) -> Self {
        let page = self.current_page().next();
        self.page(page)
    }

    pub fn previous_page(self) -> Self {
        let page = self.current_page().previous();
        self.page(page)
    }

    pub fn first_page(self) -> Self {
        let page = self.current_page().first();
        self.page(page)
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page().index() > 0
    }

    /// Number of pages of the current size needed to hold every match.
    pub fn page_count(&self) -> BoxFuture<'static, Result<u64>> {
        let page = self.current_page();
        let count = self.count();

        async move { Ok(page.count_for(count.await?)) }.boxed()
    }

    pub fn has_next_page(&self) -> BoxFuture<'static, Result<bool>> {
        let page = self.current_page();
        let page_count = self.page_count();

        async move { Ok(page.has_next(page_count.await?)) }.boxed()
    }

    pub fn last_page(self) -> BoxFuture<'static, Result<Self>> {
        async move {
            let page_count = self.page_count().await?;
            let page = self.current_page().with_index(page_count.saturating_sub(1));

            Ok(self.page(page))
        }
        .boxed()
    }

    /// Number of matching documents, ignoring any page or range.
    pub fn count(&self) -> BoxFuture<'static, Result<u64>> {
        let collection = self.collection.clone();
        let filter = self.filter.clone();

        async move {
            let count = collection.count_documents(filter).await?;

            Ok(count)
        }
        .boxed()
    }

    /// The first match in sort order, or `None`.
    pub fn first_result(&self) -> BoxFuture<'static, Result<Option<P>>> {
        if self.window.is_empty() {
            return async { Ok(None) }.boxed();
        }

        let collection = self.collection.clone_with_type::<P>();
        let filter = self.filter.clone();

        let mut options = FindOneOptions::default();
        options.sort = self.sort.clone();
        options.skip = self.window.skip();
        options.projection = P::projection_document();

        async move {
            let result = collection.find_one(filter).with_options(options).await?;

            Ok(result)
        }
        .boxed()
    }

    /// The only match, or `None`. Fails with
    /// [`NonUniqueResult`](PanacheError::NonUniqueResult) when more than one
    /// document matches.
    pub fn single_result(&self) -> BoxFuture<'static, Result<Option<P>>> {
        if self.window.is_empty() {
            return async { Ok(None) }.boxed();
        }

        let mut options = self.find_options();
        options.limit = Some(options.limit.map_or(2, |limit| limit.min(2)));
        let cursor = self.cursor(options);

        async move {
            let mut results: Vec<P> = cursor.await?.try_collect().await?;

            if results.len() > 1 {
                return Err(PanacheError::NonUniqueResult);
            }

            Ok(results.pop())
        }
        .boxed()
    }

    /// Every match, in sort order.
    pub fn list(&self) -> BoxFuture<'static, Result<Vec<P>>> {
        if self.window.is_empty() {
            return async { Ok(Vec::new()) }.boxed();
        }

        let cursor = self.cursor(self.find_options());

        async move {
            let results = cursor.await?.try_collect().await?;

            Ok(results)
        }
        .boxed()
    }

    /// Every match, in sort order, as they arrive from the store.
    ///
    /// The query is sent when the stream is first polled. Dropping the stream
    /// closes the cursor.
    pub fn stream(&self) -> BoxStream<'static, Result<P>> {
        if self.window.is_empty() {
            return stream::empty().boxed();
        }

        stream::once(self.cursor(self.find_options()))
            .map_ok(|cursor| cursor.map_err(PanacheError::from))
            .try_flatten()
            .boxed()
    }

    fn find_options(&self) -> FindOptions {
        let mut options = FindOptions::default();
        options.sort = self.sort.clone();
        options.skip = self.window.skip();
        options.limit = self
            .window
            .limit()
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        options.projection = P::projection_document();
        options
    }

    fn cursor(&self, options: FindOptions) -> BoxFuture<'static, Result<Cursor<P>>> {
        let collection = self.collection.clone_with_type::<P>();
        let filter = self.filter.clone();

        async move {
            debug!(
                collection = collection.name(),
                %filter,
                sort = ?options.sort,
                skip = ?options.skip,
                limit = ?options.limit,
                "find"
            );

            let cursor = collection.find(filter).with_options(options).await?;

            Ok(cursor)
        }
        .boxed()
    }
}
