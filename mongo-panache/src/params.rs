//! Parameters bound into textual queries.

use mongodb::bson::Bson;
use std::collections::{BTreeMap, HashMap};

/// Values bound to the placeholders of a textual query.
///
/// A query uses either positional (`?1`, `?2`, ...) or named (`:name`)
/// placeholders, never both. Holding a single variant enforces that.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Bson>),
    Named(BTreeMap<String, Bson>),
}

impl Params {
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Positional(values) => values.len(),
            Self::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The only value, when exactly one parameter was supplied.
    pub(crate) fn single(&self) -> Option<&Bson> {
        match self {
            Self::Positional(values) if values.len() == 1 => values.first(),
            Self::Named(values) if values.len() == 1 => values.values().next(),
            _ => None,
        }
    }
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Self::None
    }
}

impl From<Vec<Bson>> for Params {
    fn from(values: Vec<Bson>) -> Self {
        Self::Positional(values)
    }
}

impl From<BTreeMap<String, Bson>> for Params {
    fn from(values: BTreeMap<String, Bson>) -> Self {
        Self::Named(values)
    }
}

impl From<HashMap<String, Bson>> for Params {
    fn from(values: HashMap<String, Bson>) -> Self {
        Self::Named(values.into_iter().collect())
    }
}

impl From<Parameters> for Params {
    fn from(parameters: Parameters) -> Self {
        Self::Named(parameters.0)
    }
}

/// Builder for named parameters.
///
/// ```
/// use mongo_panache::Parameters;
///
/// let params = Parameters::with("author", "Victor Hugo").and("title", "Les Misérables");
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parameters(BTreeMap<String, Bson>);

impl Parameters {
    pub fn with(name: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::default().and(name, value)
    }

    pub fn and(mut self, name: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn map(self) -> BTreeMap<String, Bson> {
        self.0
    }
}

/// Builds positional [`Params`](crate::Params) from a list of values.
///
/// ```
/// use mongo_panache::{Params, params};
///
/// let params = params!["Victor Hugo", 1862];
/// assert_eq!(params.len(), 2);
/// assert_eq!(params![], Params::None);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::None
    };
    ($( $value: expr ),+ $(,)?) => {
        $crate::Params::Positional(::std::vec![
            $( ::std::convert::Into::<$crate::bson::Bson>::into($value) ),+
        ])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::bson;

    #[test]
    fn parameters_builder_collects_named_values() {
        let params: Params = Parameters::with("author", "X").and("year", 1862).into();

        let Params::Named(values) = &params else {
            panic!("expected named params, got {params:?}");
        };

        assert_eq!(values.get("author"), Some(&bson!("X")));
        assert_eq!(values.get("year"), Some(&bson!(1862)));
    }

    #[test]
    fn later_named_value_wins() {
        let params = Parameters::with("author", "X").and("author", "Y");
        assert_eq!(params.len(), 1);
        assert_eq!(params.map().get("author"), Some(&bson!("Y")));
    }

    #[test]
    fn macro_builds_positional_params() {
        assert_eq!(
            crate::params!["X", 2, true],
            Params::Positional(vec![bson!("X"), bson!(2), bson!(true)])
        );
    }

    #[test]
    fn single_returns_only_value() {
        assert_eq!(crate::params!["X"].single(), Some(&bson!("X")));
        assert_eq!(crate::params!["X", "Y"].single(), None);
        assert_eq!(Params::None.single(), None);
    }

    #[test]
    fn hash_map_converts_to_named() {
        let map = HashMap::from([("name".to_owned(), bson!("v"))]);
        assert_eq!(Params::from(map).len(), 1);
    }
}
