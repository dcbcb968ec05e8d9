/// ## Getting started
///
/// A type that derives [`Entity`](crate::Entity) must:
/// - be a struct with named fields
/// - implement [`Serialize`](serde::Serialize) and [`Deserialize`](serde::Deserialize)
/// - have a field named `id`, annotated with `#[serde(rename = "_id")]`
///
/// The `id` field is usually an `Option<ObjectId>` so that new entities can be
/// persisted without one and receive the identifier generated by the store.
///
/// ```ignore
/// use mongo_panache::{Entity, bson::oid::ObjectId};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Entity)]
/// struct Book {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<ObjectId>,
///     title: String,
///     author: String,
/// }
/// ```
///
/// The collection name defaults to the `snake_case` struct name, without an
/// `_entity` suffix (`BookEntity` → `book`). Override it, or the database, with
/// `#[entity(collection = "books", database = "library")]`.
///
/// ### Creating a client
///
/// [`PanacheClient`](crate::PanacheClient) owns the connection pool. Create it once,
/// clone it freely, and shut it down on exit:
///
/// ```ignore
/// let client = PanacheClient::connect(MongoConfig::from_env()?).await?;
/// // ...
/// client.shutdown().await;
/// ```
///
/// ### Repositories and active records
///
/// Every operation is available two ways, with identical behavior:
///
/// ```ignore
/// // Through a repository
/// let books = client.repository::<Book>();
/// books.persist(&mut book).await?;
/// let found = books.find_by_id(id).await?;
///
/// // Through the entity type
/// book.persist(&client).await?;
/// let found = Book::find_by_id(&client, id).await?;
/// ```
///
/// | Method                    | Result                | Corresponding `MongoDB` call                    |
/// |---------------------------|-----------------------|-------------------------------------------------|
/// | `persist`                 | `()`, sets the id     | `insertOne(doc)`                                |
/// | `persist_all`             | `()`, sets the ids    | `insertMany([docs], { ordered: true })`         |
/// | `update`                  | `bool` (matched)      | `replaceOne({ _id }, doc)`                      |
/// | `update_all`              | `u64` (matched)       | `replaceOne` per entity                         |
/// | `persist_or_update`       | `()`                  | `insertOne` or `replaceOne(.., { upsert })`     |
/// | `delete`, `delete_by_id`  | `bool` (removed)      | `deleteOne({ _id })`                            |
/// | `delete_all`              | `u64`                 | `deleteMany({})`                                |
/// | `delete_where`            | `u64`                 | `deleteMany(filter)`                            |
/// | `find_by_id`              | `Option<E>`           | `findOne({ _id })`                              |
/// | `find`, `find_all`        | query handle          | none until a terminal operation                 |
/// | `list`, `stream`, `count` | `Vec<E>`, stream, u64 | `find(filter)`, `countDocuments(filter)`        |
/// | `update_many`             | update builder        | none until `filter` or `all`                    |
///
/// Absence is never an error: `find_by_id` resolves to `None`, and `delete_by_id`
/// on a missing id resolves to `false`.
mod getting_started {}

/// Queries are written either in PanacheQL or as native `MongoDB` filters.
///
/// ### PanacheQL
///
/// | PanacheQL                              | Filter                                      |
/// |----------------------------------------|---------------------------------------------|
/// | `author` with one parameter            | `{ author: ?1 }`                            |
/// | `author = ?1`                          | `{ author: ?1 }`                            |
/// | `author != ?1`, `author <> ?1`         | `{ author: { $ne: ?1 } }`                   |
/// | `year > ?1`, `>=`, `<`, `<=`           | `{ year: { $gt: ?1 } }`, ...                |
/// | `title like ?1`                        | `{ title: { $regex: ?1 } }`                 |
/// | `title like '/^les/i'`                 | `{ title: { $regex: '^les', $options: 'i' } }` |
/// | `tag in ?1`, `tag not in (1, 2)`       | `{ tag: { $in: ?1 } }`, `$nin`              |
/// | `summary is null`, `is not null`       | `{ summary: null }`, `{ $ne: null }`        |
/// | `a = ?1 and b = ?2`                    | `{ a: ?1, b: ?2 }`                          |
/// | `a = ?1 or (b = ?2 and c = ?3)`        | `{ $or: [{ a: ?1 }, { b: ?2, c: ?3 }] }`    |
///
/// Keywords are case-insensitive and the field `id` means `_id`.
///
/// ### Native queries
///
/// Text starting with `{` is a native filter. Strings may use single quotes and
/// keys may be left bare:
///
/// ```ignore
/// Book::list(&client, "{'author': ?1, 'bookTitle': ?2}", params![author, title]).await?;
/// Book::list(
///     &client,
///     "{'creationDate': {$gte: :from}, 'creationDate': {$lte: :to}}",
///     Parameters::with("from", from).and("to", to),
/// )
/// .await?;
/// ```
///
/// A plain [`Document`](mongodb::bson::Document) is accepted anywhere text is.
///
/// ### Parameters
///
/// Placeholders are either positional (`?1`, `?2`, ... bound from
/// [`params!`](crate::params)) or named (`:name`, bound from
/// [`Parameters`](crate::Parameters)). Values are bound as BSON and never spliced
/// into the text. A query fails with
/// [`MalformedQuery`](crate::PanacheError::MalformedQuery), before anything is sent
/// to the store, when a placeholder has no value or a value is never used.
mod queries {}

/// [`PanacheQuery`](crate::PanacheQuery) handles are lazy: nothing runs until a
/// terminal operation is awaited, and every terminal operation runs the query
/// again.
///
/// ```ignore
/// let query = Book::find_sorted(&client, "author", Sort::by("title"), params!["Victor Hugo"])?;
///
/// let first = query.first_result().await?;
/// let page = query.clone().page(Page::of_size(10)).list().await?;
/// let next = query.clone().page(Page::of_size(10)).next_page().list().await?;
/// let count = query.count().await?; // ignores the page
///
/// let mut stream = query.stream();
/// while let Some(book) = stream.try_next().await? {
///     // dropping the stream closes the cursor
/// }
/// ```
///
/// ### Projections
///
/// `#[entity(projections(Summary(title, author)))]` generates a `Summary` struct in
/// the entity's helper module, holding only those fields. Load it with
/// [`project`](crate::PanacheQuery::project):
///
/// ```ignore
/// let summaries: Vec<book::Summary> = Book::find_all(&client).project::<book::Summary>().list().await?;
/// ```
mod paging_and_projections {}

/// [`update_many`](crate::PanacheRepository::update_many) validates an update and
/// waits for the filter selecting the documents to change:
///
/// ```ignore
/// let modified = Book::update_many(&client, "title = ?1", params!["Les Misérables"])?
///     .filter("author = ?1", params!["Victor Hugo"])
///     .await?;
/// ```
///
/// Updates accept PanacheQL assignments (`a = ?1, b = ?2`), native text, or a
/// [`Document`](mongodb::bson::Document). A document without update operators is
/// wrapped in `$set`; one made only of operators is used as-is. Anything else fails
/// with [`MalformedUpdate`](crate::PanacheError::MalformedUpdate).
mod updates {}
