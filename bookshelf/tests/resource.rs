use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use bookshelf::{BASE_PATH, router};
use mongo_panache::{PanacheClient, mongodb::Client};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

/// A router over a client that is never reachable. Requests rejected before
/// touching the store still succeed.
async fn offline() -> Router {
    let client = Client::with_uri_str("mongodb://127.0.0.1:1").await.unwrap();
    router(PanacheClient::from_client(client, "bookshelf"))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let request = Request::builder().method(method).uri(format!("{BASE_PATH}{uri}"));

    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    };

    app.oneshot(request.unwrap()).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn malformed_id_is_bad_request() {
    for method in [Method::GET, Method::DELETE] {
        let response = send(offline().await, method, "/not-an-id", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "malformed book id `not-an-id`" })
        );
    }
}

#[tokio::test]
async fn search_without_title_is_bad_request() {
    let response = send(
        offline().await,
        Method::GET,
        "/search?author=Victor%20Hugo",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(offline().await, Method::GET, "/search2", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_with_malformed_date_is_bad_request() {
    let response = send(
        offline().await,
        Method::GET,
        "/search?dateFrom=yesterday&dateTo=2020-01-01",
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn incomplete_book_is_rejected() {
    let response = send(
        offline().await,
        Method::POST,
        "",
        Some(json!({ "bookTitle": "Les Misérables" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

/// Runs against the live server named by `MONGODB_URI`.
#[tokio::test]
#[ignore = "requires MONGODB_URI"]
async fn book_lifecycle() {
    let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI is not set");

    let database = format!("bookshelf_test_{}", std::process::id());
    let client = Client::with_uri_str(uri).await.unwrap();
    let app = router(PanacheClient::from_client(client.clone(), database.clone()));

    let book = json!({
        "bookTitle": "Les Misérables",
        "author": "Victor Hugo",
        "creationDate": "1862-04-03",
        "categories": ["novel"],
        "details": { "summary": "A convict's redemption", "rating": 5 },
    });

    let response = send(app.clone(), Method::POST, "", Some(book)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    let id = location.strip_prefix("/books/entity").unwrap().to_owned();

    let response = send(app.clone(), Method::GET, &format!("/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["author"], "Victor Hugo");

    let response = send(app.clone(), Method::GET, "/titles", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let titles = json_body(response).await;
    assert_eq!(titles[0]["bookTitle"], "Les Misérables");
    assert_eq!(titles[0]["_id"]["$oid"], id.as_str());
    assert_eq!(titles[0].get("author"), None);

    let response = send(app.clone(), Method::GET, "/search/Victor%20Hugo", None).await;
    assert_eq!(json_body(response).await.as_array().map(Vec::len), Some(1));

    let response = send(
        app.clone(),
        Method::GET,
        "/search?author=Victor%20Hugo&title=Les%20Mis%C3%A9rables",
        None,
    )
    .await;
    assert_eq!(json_body(response).await["bookTitle"], "Les Misérables");

    let response = send(
        app.clone(),
        Method::GET,
        "/search2?dateFrom=1862-01-01&dateTo=1862-12-31",
        None,
    )
    .await;
    assert_eq!(json_body(response).await["creationDate"], "1862-04-03");

    let response = send(app.clone(), Method::DELETE, &format!("/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(app.clone(), Method::DELETE, &format!("/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(app.clone(), Method::GET, &format!("/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(app, Method::DELETE, "", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    client.database(&database).drop().await.unwrap();
}
