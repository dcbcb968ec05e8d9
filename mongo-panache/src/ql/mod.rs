//! Translation of textual queries into filter and update documents.
//!
//! Two textual forms are understood:
//!
//! * native queries, any text starting with `{`: relaxed JSON where strings
//!   may be single-quoted and keys may be bare (`{'author': ?1, year: {$gt: :y}}`);
//! * PanacheQL, everything else: `field op operand` comparisons joined with
//!   `and`/`or`, or a lone field name bound to the single parameter
//!   (`"author"` with `["Victor Hugo"]`).
//!
//! Placeholders are `?1`, `?2`, ... for positional parameters and `:name` for
//! named ones. They are bound as typed BSON values, never spliced in as text.
//! Every supplied parameter must be referenced, and every placeholder must
//! have a parameter.

mod grammar;

use crate::{
    error::{PanacheError, Result},
    params::Params,
};
use grammar::{QueryParser, Rule};
use mongodb::bson::{Bson, Document, doc};
use pest::{
    Parser,
    error::{Error as PestError, LineColLocation},
    iterators::{Pair, Pairs},
};
use std::{collections::BTreeSet, fmt};
use tracing::debug;

/// A query or update, either as text or as an already built document.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    Text(String),
    Document(Document),
}

impl From<&str> for Query {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Query {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for Query {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<Document> for Query {
    fn from(document: Document) -> Self {
        Self::Document(document)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Document(document) => write!(f, "{document}"),
        }
    }
}

/// Binds `params` into `query` and returns the filter document.
pub fn bind_filter(query: &Query, params: &Params) -> Result<Document> {
    let filter = match query {
        Query::Document(document) if params.is_empty() => document.clone(),
        Query::Document(document) => {
            return Err(PanacheError::malformed_query(
                document.to_string(),
                "parameters cannot be bound into a document filter",
            ));
        }
        Query::Text(text) => bind_text_filter(text, params)?,
    };

    debug!(%query, %filter, "bound filter");

    Ok(filter)
}

/// Binds `params` into `update` and returns an update document.
///
/// The result always consists of update operators; plain field lists are
/// wrapped in `$set`.
pub fn bind_update(update: &Query, params: &Params) -> Result<Document> {
    let document = match update {
        Query::Document(document) if params.is_empty() => {
            normalize_update(document.clone(), &document.to_string())?
        }
        Query::Document(document) => {
            return Err(PanacheError::malformed_update(
                document.to_string(),
                "parameters cannot be bound into a document update",
            ));
        }
        Query::Text(text) => bind_text_update(text, params)?,
    };

    debug!(%update, %document, "bound update");

    Ok(document)
}

fn bind_text_filter(text: &str, params: &Params) -> Result<Document> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(PanacheError::malformed_query(text, "query is empty"));
    }

    if trimmed.starts_with('{') {
        return bind_native(trimmed, params, PanacheError::malformed_query);
    }

    if let Some(value) = shorthand(trimmed, params) {
        return Ok(doc! { field_name(trimmed): value.clone() });
    }

    let mut pairs = QueryParser::parse(Rule::filter, trimmed)
        .map_err(|err| PanacheError::malformed_query(text, syntax_reason(&err)))?;

    let mut binder = Binder::new(text, params);
    let filter = child(&mut pairs, &binder)?;
    let disjunction = child(&mut filter.into_inner(), &binder)?;
    let document = disjunction_document(disjunction, &mut binder)?;
    binder.finish()?;

    Ok(document)
}

fn bind_text_update(text: &str, params: &Params) -> Result<Document> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return Err(PanacheError::malformed_update(text, "update is empty"));
    }

    if trimmed.starts_with('{') {
        let document = bind_native(trimmed, params, PanacheError::malformed_update)?;
        return normalize_update(document, text);
    }

    if let Some(value) = shorthand(trimmed, params) {
        return Ok(doc! { "$set": { field_name(trimmed): value.clone() } });
    }

    let mut pairs = QueryParser::parse(Rule::update, trimmed)
        .map_err(|err| PanacheError::malformed_update(text, syntax_reason(&err)))?;

    let mut binder = Binder::new(text, params);
    let mut set = Document::new();

    for assignment in child(&mut pairs, &binder)?.into_inner() {
        if assignment.as_rule() != Rule::assignment {
            continue;
        }

        let mut inner = assignment.into_inner();
        let field = child(&mut inner, &binder)?;
        let value = value(child(&mut inner, &binder)?, &mut binder)?;
        set.insert(field_name(field.as_str()), value);
    }

    binder.finish()?;

    Ok(doc! { "$set": set })
}

/// A lone field name with exactly one parameter: `"author"` + `["X"]`.
fn shorthand<'p>(text: &str, params: &'p Params) -> Option<&'p Bson> {
    let value = params.single()?;
    QueryParser::parse(Rule::field_only, text).ok()?;
    Some(value)
}

fn bind_native(
    text: &str,
    params: &Params,
    syntax_error: fn(String, String) -> PanacheError,
) -> Result<Document> {
    let mut pairs = QueryParser::parse(Rule::native, text)
        .map_err(|err| syntax_error(text.to_owned(), syntax_reason(&err)))?;

    let mut binder = Binder::new(text, params);
    let native = child(&mut pairs, &binder)?;
    let object = child(&mut native.into_inner(), &binder)?;
    let document = object_document(object, &mut binder)?;
    binder.finish()?;

    Ok(document)
}

fn normalize_update(document: Document, source: &str) -> Result<Document> {
    if document.is_empty() {
        return Err(PanacheError::malformed_update(source, "update is empty"));
    }

    let operators = document.keys().filter(|key| key.starts_with('$')).count();

    if operators == 0 {
        return Ok(doc! { "$set": document });
    }

    if operators != document.len() {
        return Err(PanacheError::malformed_update(
            source,
            "update mixes operators and plain fields",
        ));
    }

    if let Some((operator, _)) = document
        .iter()
        .find(|(_, value)| !matches!(value, Bson::Document(_)))
    {
        return Err(PanacheError::malformed_update(
            source,
            format!("operator `{operator}` expects a document"),
        ));
    }

    Ok(document)
}

struct Binder<'q> {
    query: &'q str,
    params: &'q Params,
    used_positions: BTreeSet<usize>,
    used_names: BTreeSet<String>,
}

impl<'q> Binder<'q> {
    fn new(query: &'q str, params: &'q Params) -> Self {
        Self {
            query,
            params,
            used_positions: BTreeSet::new(),
            used_names: BTreeSet::new(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> PanacheError {
        PanacheError::malformed_query(self.query, reason)
    }

    fn positional(&mut self, placeholder: &str) -> Result<Bson> {
        let Params::Positional(values) = self.params else {
            return Err(self.error(format!(
                "placeholder {placeholder} requires positional parameters"
            )));
        };

        let position = placeholder[1..]
            .parse::<usize>()
            .ok()
            .filter(|position| (1..=values.len()).contains(position))
            .ok_or_else(|| self.error(format!("no positional parameter for {placeholder}")))?;

        let value = values[position - 1].clone();
        self.used_positions.insert(position);

        Ok(value)
    }

    fn named(&mut self, placeholder: &str) -> Result<Bson> {
        let Params::Named(values) = self.params else {
            return Err(self.error(format!(
                "placeholder {placeholder} requires named parameters"
            )));
        };

        let name = &placeholder[1..];
        let value = values
            .get(name)
            .cloned()
            .ok_or_else(|| self.error(format!("no named parameter for {placeholder}")))?;

        self.used_names.insert(name.to_owned());

        Ok(value)
    }

    fn finish(self) -> Result<()> {
        match self.params {
            Params::None => Ok(()),
            Params::Positional(values) => match (1..=values.len())
                .find(|position| !self.used_positions.contains(position))
            {
                Some(position) => Err(self.error(format!("parameter ?{position} is never used"))),
                None => Ok(()),
            },
            Params::Named(values) => match values
                .keys()
                .find(|name| !self.used_names.contains(*name))
            {
                Some(name) => Err(self.error(format!("parameter :{name} is never used"))),
                None => Ok(()),
            },
        }
    }
}

fn child<'i>(pairs: &mut Pairs<'i, Rule>, binder: &Binder<'_>) -> Result<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| binder.error("unexpected end of input"))
}

fn syntax_reason(err: &PestError<Rule>) -> String {
    let column = match err.line_col {
        LineColLocation::Pos((_, column)) | LineColLocation::Span((_, column), _) => column,
    };

    format!("syntax error at column {column}: {}", err.variant.message())
}

fn field_name(field: &str) -> &str {
    if field == "id" { "_id" } else { field }
}

fn disjunction_document(pair: Pair<'_, Rule>, binder: &mut Binder<'_>) -> Result<Document> {
    let mut branches = pair
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::conjunction)
        .map(|pair| conjunction_document(pair, binder))
        .collect::<Result<Vec<_>>>()?;

    if branches.len() == 1 {
        return Ok(branches.remove(0));
    }

    Ok(doc! { "$or": branches })
}

fn conjunction_document(pair: Pair<'_, Rule>, binder: &mut Binder<'_>) -> Result<Document> {
    let clauses = pair
        .into_inner()
        .filter(|pair| pair.as_rule() != Rule::and_kw)
        .map(|pair| match pair.as_rule() {
            Rule::disjunction => disjunction_document(pair, binder),
            _ => comparison_document(pair, binder),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(and_all(clauses))
}

/// Folds clauses into a single document, or into `$and` when two clauses
/// constrain the same key in ways that cannot be combined.
fn and_all(mut clauses: Vec<Document>) -> Document {
    if clauses.len() == 1 {
        return clauses.remove(0);
    }

    let mut merged = Document::new();
    let clash = clauses
        .iter()
        .flat_map(Document::iter)
        .any(|(key, value)| merge_operators(&mut merged, key, value.clone()).is_some());

    if clash {
        return doc! { "$and": clauses };
    }

    merged
}

/// Inserts `value` under `key`, combining operator documents such as
/// `{$gte: a}` and `{$lte: b}`. Hands the value back when `key` is already
/// taken by something it cannot be combined with.
fn merge_operators(document: &mut Document, key: &str, value: Bson) -> Option<Bson> {
    let existing = match document.get_mut(key) {
        Some(existing) => existing,
        None => {
            document.insert(key, value);
            return None;
        }
    };

    match (existing, value) {
        (Bson::Document(existing), Bson::Document(incoming))
            if is_operator_document(existing)
                && is_operator_document(&incoming)
                && incoming.keys().all(|operator| !existing.contains_key(operator)) =>
        {
            for (operator, operand) in incoming {
                existing.insert(operator, operand);
            }
            None
        }
        (_, value) => Some(value),
    }
}

fn is_operator_document(document: &Document) -> bool {
    !document.is_empty() && document.keys().all(|key| key.starts_with('$'))
}

fn comparison_document(pair: Pair<'_, Rule>, binder: &mut Binder<'_>) -> Result<Document> {
    let mut inner = pair.into_inner();
    let field = field_name(child(&mut inner, binder)?.as_str()).to_owned();
    let operation = child(&mut inner, binder)?;

    let condition = match operation.as_rule() {
        Rule::is_null => Bson::Null,
        Rule::is_not_null => Bson::Document(doc! { "$ne": Bson::Null }),
        Rule::in_list => Bson::Document(doc! { "$in": into_array(last_value(operation, binder)?) }),
        Rule::not_in => Bson::Document(doc! { "$nin": into_array(last_value(operation, binder)?) }),
        Rule::like => regex_condition(last_value(operation, binder)?),
        _ => {
            let mut parts = operation.into_inner();
            let comparator = child(&mut parts, binder)?;
            let operand = value(child(&mut parts, binder)?, binder)?;

            let operator = match comparator.as_str() {
                "=" => return Ok(doc! { field: operand }),
                "!=" | "<>" => "$ne",
                ">" => "$gt",
                ">=" => "$gte",
                "<" => "$lt",
                "<=" => "$lte",
                other => return Err(binder.error(format!("unknown operator `{other}`"))),
            };

            Bson::Document(doc! { operator: operand })
        }
    };

    Ok(doc! { field: condition })
}

fn last_value(operation: Pair<'_, Rule>, binder: &mut Binder<'_>) -> Result<Bson> {
    let operand = operation
        .into_inner()
        .last()
        .ok_or_else(|| binder.error("missing operand"))?;

    value(operand, binder)
}

fn into_array(value: Bson) -> Bson {
    match value {
        Bson::Array(_) => value,
        other => Bson::Array(vec![other]),
    }
}

/// `like` operands written as `/pattern/flags` carry their regex options.
fn regex_condition(value: Bson) -> Bson {
    if let Bson::String(text) = &value {
        let literal = text.strip_prefix('/').and_then(|rest| {
            let end = rest.rfind('/')?;
            let (pattern, options) = (&rest[..end], &rest[end + 1..]);
            options
                .chars()
                .all(|c| c.is_ascii_alphabetic())
                .then_some((pattern, options))
        });

        if let Some((pattern, options)) = literal {
            return Bson::Document(doc! { "$regex": pattern, "$options": options });
        }
    }

    Bson::Document(doc! { "$regex": value })
}

fn object_document(pair: Pair<'_, Rule>, binder: &mut Binder<'_>) -> Result<Document> {
    let mut document = Document::new();

    for member in pair.into_inner() {
        let mut inner = member.into_inner();
        let key = child(&mut inner, binder)?;
        let key = match key.as_rule() {
            Rule::string => string_literal(key),
            _ => key.as_str().to_owned(),
        };
        let value = value(child(&mut inner, binder)?, binder)?;

        if let Some(value) = merge_operators(&mut document, &key, value) {
            document.insert(key, value);
        }
    }

    Ok(document)
}

/// Single-key wrappers read as typed values: `{'$oid': '...'}` is an object
/// id, `{$numberLong: '7'}` a 64-bit integer.
const EXTENDED_TYPES: &[&str] = &[
    "$oid",
    "$date",
    "$numberInt",
    "$numberLong",
    "$numberDouble",
    "$numberDecimal",
    "$binary",
    "$timestamp",
    "$regularExpression",
    "$minKey",
    "$maxKey",
];

fn extended(document: Document, binder: &Binder<'_>) -> Result<Bson> {
    let wrapped = match document.keys().next() {
        Some(key) if document.len() == 1 => key.clone(),
        _ => return Ok(Bson::Document(document)),
    };

    if !EXTENDED_TYPES.contains(&wrapped.as_str()) {
        return Ok(Bson::Document(document));
    }

    Bson::try_from(Bson::Document(document).into_relaxed_extjson())
        .map_err(|err| binder.error(format!("invalid `{wrapped}` value: {err}")))
}

fn value(pair: Pair<'_, Rule>, binder: &mut Binder<'_>) -> Result<Bson> {
    match pair.as_rule() {
        Rule::positional => binder.positional(pair.as_str()),
        Rule::named => binder.named(pair.as_str()),
        Rule::string => Ok(Bson::String(string_literal(pair))),
        Rule::number => number(pair.as_str(), binder),
        Rule::boolean => Ok(Bson::Boolean(pair.as_str().eq_ignore_ascii_case("true"))),
        Rule::null_literal => Ok(Bson::Null),
        Rule::object => {
            object_document(pair, binder).and_then(|document| extended(document, binder))
        }
        Rule::array | Rule::list => pair
            .into_inner()
            .map(|item| value(item, binder))
            .collect::<Result<Vec<_>>>()
            .map(Bson::Array),
        rule => Err(binder.error(format!("unexpected {rule:?}"))),
    }
}

fn number(text: &str, binder: &Binder<'_>) -> Result<Bson> {
    if text.contains(['.', 'e', 'E']) {
        return text
            .parse::<f64>()
            .map(Bson::Double)
            .map_err(|_| binder.error(format!("invalid number `{text}`")));
    }

    let value = text
        .parse::<i64>()
        .map_err(|_| binder.error(format!("invalid number `{text}`")))?;

    Ok(i32::try_from(value).map_or(Bson::Int64(value), Bson::Int32))
}

fn string_literal(pair: Pair<'_, Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|quoted| unescape(quoted.as_str()))
        .unwrap_or_default()
}

fn unescape(raw: &str) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some('t') => unescaped.push('\t'),
            Some('u') => {
                let hex = chars.by_ref().take(4).collect::<String>();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => unescaped.push(decoded),
                    None => {
                        unescaped.push_str("\\u");
                        unescaped.push_str(&hex);
                    }
                }
            }
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }

    unescaped
}
