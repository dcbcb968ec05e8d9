//! The `/reactive/books/entity` resource.

use crate::{
    entity::{Book, book},
    error::{ApiError, ApiResult},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::get,
};
use chrono::NaiveDate;
use futures_util::{Stream, StreamExt};
use mongo_panache::{
    ActiveRecord, PanacheClient, PanacheQuery, Parameters, Sort, bson::oid::ObjectId, params,
};
use serde::Deserialize;
use tracing::{debug, info};

pub const BASE_PATH: &str = "/reactive/books/entity";

pub fn routes(client: &PanacheClient) -> Router<PanacheClient> {
    info!(
        database = Book::mongo_database(client).name(),
        collection = Book::mongo_collection(client).name(),
        "using book entity"
    );

    Router::new()
        .route(
            "/",
            get(list_books)
                .post(add_book)
                .put(update_book)
                .patch(upsert_book)
                .delete(delete_all),
        )
        .route("/stream", get(stream_books))
        .route("/titles", get(list_titles))
        .route("/search", get(search))
        .route("/search2", get(search_named))
        .route("/search/{author}", get(books_by_author))
        .route("/{id}", get(get_book).delete(delete_book))
}

#[derive(Debug, Deserialize)]
pub struct SortParams {
    sort: Option<String>,
}

impl SortParams {
    fn sort(self) -> Sort {
        self.sort.map(Sort::ascending).unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    author: Option<String>,
    title: Option<String>,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
}

enum Search {
    ByAuthor { author: String, title: String },
    Between { from: NaiveDate, to: NaiveDate },
}

impl TryFrom<SearchParams> for Search {
    type Error = ApiError;

    fn try_from(params: SearchParams) -> ApiResult<Self> {
        match params {
            SearchParams {
                author: Some(author),
                title: Some(title),
                ..
            } => Ok(Self::ByAuthor { author, title }),
            SearchParams {
                author: Some(_), ..
            } => Err(ApiError::BadRequest("`title` is required with `author`".into())),
            SearchParams {
                date_from: Some(from),
                date_to: Some(to),
                ..
            } => Ok(Self::Between { from, to }),
            SearchParams { .. } => Err(ApiError::BadRequest(
                "expected `author` and `title`, or `dateFrom` and `dateTo`".into(),
            )),
        }
    }
}

fn parse_id(id: &str) -> ApiResult<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| ApiError::MalformedId(id.to_owned()))
}

fn optional(book: Option<Book>) -> Response {
    match book {
        Some(book) => Json(book).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn list_books(
    State(client): State<PanacheClient>,
    Query(params): Query<SortParams>,
) -> ApiResult<Json<Vec<Book>>> {
    let books = Book::list_all_sorted(&client, params.sort()).await?;
    Ok(Json(books))
}

/// Identifiers and titles only, in title order.
async fn list_titles(State(client): State<PanacheClient>) -> ApiResult<Json<Vec<book::Title>>> {
    let titles = Book::find_all_sorted(&client, Sort::by(book::Fields::Title))
        .project::<book::Title>()
        .list()
        .await?;
    Ok(Json(titles))
}

async fn stream_books(
    State(client): State<PanacheClient>,
    Query(params): Query<SortParams>,
) -> Sse<impl Stream<Item = ApiResult<Event>>> {
    let events = Book::stream_all_sorted(&client, params.sort())
        .map(|book| -> ApiResult<Event> { Ok(Event::default().json_data(book?)?) });

    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn add_book(
    State(client): State<PanacheClient>,
    Json(mut book): Json<Book>,
) -> ApiResult<impl IntoResponse> {
    book.persist(&client).await?;

    let id = book.id.map(|id| id.to_hex()).unwrap_or_default();
    debug!(%id, "book created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/books/entity{id}"))],
    ))
}

async fn update_book(
    State(client): State<PanacheClient>,
    Json(book): Json<Book>,
) -> ApiResult<StatusCode> {
    if book.update(&client).await? {
        Ok(StatusCode::ACCEPTED)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn upsert_book(
    State(client): State<PanacheClient>,
    Json(mut book): Json<Book>,
) -> ApiResult<StatusCode> {
    book.persist_or_update(&client).await?;
    Ok(StatusCode::ACCEPTED)
}

async fn delete_book(
    State(client): State<PanacheClient>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;

    if Book::delete_by_id(&client, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn get_book(
    State(client): State<PanacheClient>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    Ok(optional(Book::find_by_id(&client, id).await?))
}

async fn books_by_author(
    State(client): State<PanacheClient>,
    Path(author): Path<String>,
) -> ApiResult<Json<Vec<Book>>> {
    let books = Book::list(&client, "author", params![author]).await?;
    Ok(Json(books))
}

async fn search(
    State(client): State<PanacheClient>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let query: PanacheQuery<Book> = match Search::try_from(params)? {
        Search::ByAuthor { author, title } => Book::find(
            &client,
            "{'author': ?1, 'bookTitle': ?2}",
            params![author, title],
        )?,
        Search::Between { from, to } => Book::find(
            &client,
            "{'creationDate': {'$gte': ?1, '$lte': ?2}}",
            params![from.to_string(), to.to_string()],
        )?,
    };

    Ok(optional(query.first_result().await?))
}

async fn search_named(
    State(client): State<PanacheClient>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Response> {
    let query: PanacheQuery<Book> = match Search::try_from(params)? {
        Search::ByAuthor { author, title } => Book::find(
            &client,
            "{'author': :author, 'bookTitle': :title}",
            Parameters::with("author", author).and("title", title),
        )?,
        Search::Between { from, to } => Book::find(
            &client,
            "{'creationDate': {'$gte': :dateFrom, '$lte': :dateTo}}",
            Parameters::with("dateFrom", from.to_string()).and("dateTo", to.to_string()),
        )?,
    };

    Ok(optional(query.first_result().await?))
}

async fn delete_all(State(client): State<PanacheClient>) -> ApiResult<StatusCode> {
    let deleted = Book::delete_all(&client).await?;
    debug!(deleted, "books deleted");
    Ok(StatusCode::NO_CONTENT)
}
