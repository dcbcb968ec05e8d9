use mongo_panache::{
    Entity, Projection, Sort,
    bson::{self, doc, oid::ObjectId},
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Entity)]
#[entity(projections(Summary(id, title), Cover(title, details)))]
struct BookEntity {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    #[serde(rename = "bookTitle")]
    title: String,
    author: String,
    details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Entity)]
#[entity(collection = "audit_log", database = "logs")]
#[serde(rename_all = "camelCase")]
struct AuditEntry {
    #[serde(rename = "_id")]
    id: i64,
    event_kind: String,
    r#type: String,
}

fn book() -> BookEntity {
    BookEntity {
        id: Some(ObjectId::new()),
        title: "Notre-Dame de Paris".into(),
        author: "Victor Hugo".into(),
        details: Some("1831".into()),
    }
}

#[test]
fn collection_name_defaults_to_snake_case_without_entity_suffix() {
    assert_eq!(BookEntity::COLLECTION_NAME, "book");
    assert_eq!(BookEntity::DATABASE_NAME, None);
}

#[test]
fn collection_and_database_can_be_overridden() {
    assert_eq!(AuditEntry::COLLECTION_NAME, "audit_log");
    assert_eq!(AuditEntry::DATABASE_NAME, Some("logs"));
}

#[test]
fn optional_id_accessors() {
    let mut book = book();
    let id = book.id.unwrap();
    assert_eq!(book.id(), Some(id));

    book.id = None;
    assert_eq!(book.id(), None);

    book.set_id(id);
    assert_eq!(book.id, Some(id));
}

#[test]
fn required_id_accessors() {
    let mut entry = AuditEntry {
        id: 1,
        event_kind: "created".into(),
        r#type: "book".into(),
    };

    assert_eq!(entry.id(), Some(1));
    entry.set_id(2);
    assert_eq!(entry.id, 2);
}

#[test]
fn fields_display_stored_names() {
    assert_eq!(book_entity::Fields::Id.to_string(), "_id");
    assert_eq!(book_entity::Fields::Title.to_string(), "bookTitle");
    assert_eq!(book_entity::Fields::Author.as_str(), "author");

    assert_eq!(audit_entry::Fields::EventKind.as_str(), "eventKind");
    assert_eq!(audit_entry::Fields::Type.as_str(), "type");
}

#[test]
fn fields_work_as_sort_columns() {
    let sort = Sort::by(book_entity::Fields::Title).and(book_entity::Fields::Id);
    assert_eq!(sort.to_document(), doc! { "bookTitle": 1, "_id": 1 });
}

#[test]
fn projections_load_only_declared_fields() {
    assert_eq!(
        book_entity::Summary::projection_document(),
        Some(doc! { "_id": 1, "bookTitle": 1 })
    );
    assert_eq!(
        book_entity::Cover::projection_document(),
        Some(doc! { "bookTitle": 1, "details": 1, "_id": 0 })
    );
    assert_eq!(
        <BookEntity as Projection<BookEntity>>::projection_document(),
        None
    );
}

#[test]
fn projections_use_stored_names() {
    let book = book();
    let document = doc! {
        "_id": book.id.unwrap(),
        "bookTitle": "Notre-Dame de Paris",
    };

    let summary: book_entity::Summary = bson::from_document(document).unwrap();
    assert_eq!(summary.id, book.id);
    assert_eq!(summary.title, book.title);
}

#[test]
fn projections_convert_from_entity() {
    let book = book();
    let cover = book_entity::Cover::from(book.clone());

    assert_eq!(cover.title, book.title);
    assert_eq!(cover.details, book.details);
}

#[test]
fn entity_document_uses_renamed_fields() {
    let mut book = book();
    book.id = None;

    assert_eq!(
        bson::to_document(&book).unwrap(),
        doc! {
            "bookTitle": "Notre-Dame de Paris",
            "author": "Victor Hugo",
            "details": "1831",
        }
    );
}
