#[warn(clippy::pedantic)]
#[allow(clippy::too_many_lines)]
mod derive_entity;
mod prelude;
mod utils;

fn expand<F: FnOnce(proc_macro2::TokenStream) -> syn::Result<proc_macro2::TokenStream>>(
    fun: F,
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    fun(input.into())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `Entity` for a struct with an `id` field stored as `_id`, and
/// generates a `snake_case` helper module holding a `Fields` enum and the
/// declared projections.
///
/// Attributes: `#[entity(collection = "..", database = "..", projections(Name(field, ..)))]`.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn entity(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    expand(derive_entity::derive_entity, input)
}
