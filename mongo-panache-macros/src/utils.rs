use crate::prelude::*;
use proc_macro_crate::{FoundCrate, crate_name};

macro_rules! extract {
    ($val:expr, $pat:pat, $error_message: expr) => {
        let $pat = $val else {
            return Err(Error::new_spanned($val, $error_message));
        };
    };
}

pub(crate) use extract;

pub fn extract_named_fields(span: Span, data: Data) -> Result<FieldsNamed> {
    let Data::Struct(data_struct) = data else {
        return Err(Error::new(span, "expected struct"));
    };

    extract!(
        data_struct.fields,
        Fields::Named(named_fields),
        "expected named fields"
    );

    Ok(named_fields)
}

/// Name-value pairs of every `#[serde(...)]` attribute, ignoring the ones
/// that do not parse as such.
fn serde_name_values(attrs: &[Attribute]) -> impl Iterator<Item = MetaNameValue> + '_ {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("serde"))
        .filter_map(|attr| {
            attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
                .ok()
        })
        .flatten()
        .filter_map(|meta| match meta {
            Meta::NameValue(name_value) => Some(name_value),
            Meta::Path(_) | Meta::List(_) => None,
        })
}

fn serde_string(attrs: &[Attribute], key: &str) -> Option<String> {
    serde_name_values(attrs).find_map(|name_value| {
        if !name_value.path.is_ident(key) {
            return None;
        }

        extract_lit_str(&name_value.value).map(|lit| lit.value())
    })
}

fn extract_lit_str(expr: &Expr) -> Option<&LitStr> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(lit), ..
        }) => Some(lit),
        _ => None,
    }
}

pub fn extract_serde_rename(field: &Field) -> Option<String> {
    serde_string(&field.attrs, "rename")
}

pub fn extract_serde_rename_all(input: &DeriveInput) -> Result<Option<RenameRule>> {
    let Some(rule) = serde_string(&input.attrs, "rename_all") else {
        return Ok(None);
    };

    RenameRule::parse(&rule)
        .map(Some)
        .ok_or_else(|| Error::new(input.ident.span(), format!("unsupported rename_all rule `{rule}`")))
}

#[derive(Clone, Copy)]
pub enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    pub fn apply(self, field: &str) -> String {
        match self {
            Self::Lower => field.to_ascii_lowercase(),
            Self::Upper => field.to_ascii_uppercase(),
            Self::Pascal => field.to_upper_camel_case(),
            Self::Camel => field.to_lower_camel_case(),
            Self::Snake => field.to_owned(),
            Self::ScreamingSnake => field.to_shouty_snake_case(),
            Self::Kebab => field.to_kebab_case(),
            Self::ScreamingKebab => field.to_shouty_kebab_case(),
        }
    }
}

/// The inner type of `Option<T>`.
pub fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };

    if type_path.qself.is_some() {
        return None;
    }

    let segment = type_path.path.segments.last()?;

    if segment.ident != "Option" {
        return None;
    }

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    match arguments.args.first() {
        Some(GenericArgument::Type(inner)) if arguments.args.len() == 1 => Some(inner),
        _ => None,
    }
}

pub fn build_fields_enum<'a>(
    field_idents: impl Iterator<Item = &'a Ident>,
    field_lits: impl Iterator<Item = &'a LitStr>,
) -> TokenStream {
    let variants = field_idents
        .map(|ident| {
            Ident::new(
                &ident.unraw().to_string().to_upper_camel_case(),
                ident.span(),
            )
        })
        .collect_vec();

    let field_lits = field_lits.collect_vec();

    quote! {
        /// Stored field names, usable as sort columns.
        #[derive(
            ::std::fmt::Debug,
            ::std::clone::Clone,
            ::std::marker::Copy,
            ::std::cmp::PartialEq,
            ::std::cmp::Eq,
            ::std::hash::Hash,
        )]
        pub enum Fields {
            #( #variants ),*
        }

        impl Fields {
            pub const fn as_str(self) -> &'static str {
                match self {
                    #(
                        Self::#variants => #field_lits
                    ),*
                }
            }
        }

        impl ::std::fmt::Display for Fields {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::convert::From<Fields> for ::std::string::String {
            fn from(value: Fields) -> Self {
                ::std::borrow::ToOwned::to_owned(value.as_str())
            }
        }
    }
}

pub fn krate() -> Result<TokenStream> {
    let found = crate_name("mongo-panache").map_err(|err| Error::new(Span::call_site(), err))?;

    Ok(match found {
        FoundCrate::Itself => quote! { ::mongo_panache },
        FoundCrate::Name(name) => {
            let ident = Ident::new(&name, Span::call_site());
            quote! { ::#ident }
        }
    })
}
