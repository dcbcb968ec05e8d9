pub(crate) use crate::utils::{extract, krate};
pub use darling::{FromAttributes, util::PathList};
pub use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
pub use itertools::Itertools;
pub use proc_macro2::{Span, TokenStream};
pub use quote::quote;
pub use std::collections::HashMap;
pub use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprLit, Field, Fields, FieldsNamed,
    GenericArgument, Ident, Lit, LitStr, Meta, MetaNameValue, PathArguments, Result, Token, Type,
    Visibility,
    ext::IdentExt,
    parse2,
    punctuated::Punctuated,
    spanned::Spanned,
};
