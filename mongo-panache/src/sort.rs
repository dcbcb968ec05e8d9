//! Sort orders.

use mongodb::bson::{Document, doc};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    fn as_i32(self) -> i32 {
        match self {
            Self::Ascending => 1,
            Self::Descending => -1,
        }
    }
}

/// An ordered list of sort columns.
///
/// Columns accept anything convertible to `String`, including the `Fields`
/// enums generated by `#[derive(Entity)]`. The column `id` refers to `_id`.
///
/// ```
/// use mongo_panache::{Direction, Sort, bson::doc};
///
/// let sort = Sort::by("author").and_with("title", Direction::Descending);
/// assert_eq!(sort.to_document(), doc! { "author": 1, "title": -1 });
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sort {
    columns: Vec<(String, Direction)>,
}

impl Sort {
    pub fn by(column: impl Into<String>) -> Self {
        Self::by_with(column, Direction::Ascending)
    }

    pub fn by_with(column: impl Into<String>, direction: Direction) -> Self {
        Self::default().and_with(column, direction)
    }

    pub fn ascending(column: impl Into<String>) -> Self {
        Self::by_with(column, Direction::Ascending)
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self::by_with(column, Direction::Descending)
    }

    pub fn and(self, column: impl Into<String>) -> Self {
        self.and_with(column, Direction::Ascending)
    }

    pub fn and_with(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.columns.push((column.into(), direction));
        self
    }

    /// Sets every column to the given direction.
    pub fn direction(mut self, direction: Direction) -> Self {
        for (_, column_direction) in &mut self.columns {
            *column_direction = direction;
        }
        self
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, Direction)> {
        self.columns
            .iter()
            .map(|(column, direction)| (column.as_str(), *direction))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut document = doc! {};

        for (column, direction) in &self.columns {
            let key = if column == "id" { "_id" } else { column.as_str() };
            document.insert(key, direction.as_i32());
        }

        document
    }
}

impl From<Sort> for Document {
    fn from(sort: Sort) -> Self {
        sort.to_document()
    }
}

impl From<&Sort> for Document {
    fn from(sort: &Sort) -> Self {
        sort.to_document()
    }
}
