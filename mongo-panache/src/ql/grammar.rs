use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "ql/panache.pest"]
pub(crate) struct QueryParser;
