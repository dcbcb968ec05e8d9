use crate::{
    prelude::*,
    utils::{
        RenameRule, build_fields_enum, extract_named_fields, extract_serde_rename,
        extract_serde_rename_all, option_inner,
    },
};

#[derive(FromAttributes)]
#[darling(attributes(entity))]
struct Attributes {
    #[darling(default)]
    collection: Option<String>,
    #[darling(default)]
    database: Option<String>,
    #[darling(default)]
    projections: HashMap<Ident, PathList>,
}

pub fn derive_entity(item: TokenStream) -> Result<TokenStream> {
    let input = parse2::<DeriveInput>(item)?;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "generic entities are not supported",
        ));
    }

    let attributes = Attributes::from_attributes(&input.attrs)?;
    let rename_all = extract_serde_rename_all(&input)?;

    let (id, fields) = {
        let fields_named = extract_named_fields(input.span(), input.data)?;

        let fields_span = fields_named.span();

        let mut id = None;
        let mut fields = vec![];

        for field in fields_named.named {
            extract!(&field.ident, Some(ident), "expected named field");
            let ident = ident.clone();
            let stored_name = stored_name(&field, &ident, rename_all);

            if ident == "id" {
                if stored_name != "_id" {
                    return Err(Error::new_spanned(
                        &field,
                        "id field must have `#[serde(rename = \"_id\")]`",
                    ));
                }

                id = Some(IdConfig::new(&field.ty));
            }

            fields.push(FieldConfig {
                lit: LitStr::new(&stored_name, ident.span()),
                has_rename: extract_serde_rename(&field).is_some(),
                serde_attrs: field
                    .attrs
                    .into_iter()
                    .filter(|attr| attr.path().is_ident("serde"))
                    .collect(),
                ident,
                ty: field.ty,
            });
        }

        let Some(id) = id else {
            return Err(Error::new(fields_span, "an entity must have an `id` field"));
        };

        (id, fields)
    };

    let projections = attributes
        .projections
        .into_iter()
        .sorted_by_key(|(ident, _)| ident.to_string())
        .map(|(ident, projected_fields)| {
            let mut projected = vec![];

            for projected_field in projected_fields.iter() {
                let projected_field_ident = projected_field
                    .get_ident()
                    .ok_or_else(|| Error::new_spanned(projected_field, "expected ident"))?;

                let index = fields
                    .iter()
                    .position(|field| field.ident == *projected_field_ident)
                    .ok_or_else(|| Error::new_spanned(projected_field_ident, "unknown field"))?;

                projected.push(index);
            }

            Ok(ProjectionConfig {
                ident,
                fields: projected,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let entity = EntityConfig {
        vis: &input.vis,
        ident: &input.ident,
        collection: attributes.collection,
        database: attributes.database,
        id,
        fields,
        projections,
    };

    build(&entity)
}

fn stored_name(field: &Field, ident: &Ident, rename_all: Option<RenameRule>) -> String {
    if let Some(rename) = extract_serde_rename(field) {
        return rename;
    }

    let name = ident.unraw().to_string();

    match rename_all {
        Some(rule) => rule.apply(&name),
        None => name,
    }
}

struct EntityConfig<'a> {
    vis: &'a Visibility,
    ident: &'a Ident,
    collection: Option<String>,
    database: Option<String>,
    id: IdConfig,
    fields: Vec<FieldConfig>,
    projections: Vec<ProjectionConfig>,
}

struct IdConfig {
    ty: Type,
    optional: bool,
}

impl IdConfig {
    fn new(ty: &Type) -> Self {
        match option_inner(ty) {
            Some(inner) => Self {
                ty: inner.clone(),
                optional: true,
            },
            None => Self {
                ty: ty.clone(),
                optional: false,
            },
        }
    }
}

struct FieldConfig {
    ident: Ident,
    ty: Type,
    lit: LitStr,
    has_rename: bool,
    serde_attrs: Vec<Attribute>,
}

struct ProjectionConfig {
    ident: Ident,
    /// Indices into the entity's fields.
    fields: Vec<usize>,
}

fn build(entity: &EntityConfig<'_>) -> Result<TokenStream> {
    let krate = krate()?;

    let EntityConfig {
        vis,
        ident,
        id,
        fields,
        ..
    } = entity;

    let snake_case_entity = ident.unraw().to_string().to_snake_case();

    let mod_ident = Ident::new(&snake_case_entity, ident.span());

    let collection_name = entity.collection.clone().unwrap_or_else(|| {
        snake_case_entity
            .strip_suffix("_entity")
            .unwrap_or(&snake_case_entity)
            .to_owned()
    });

    let database_name = match &entity.database {
        Some(database) => quote! { ::std::option::Option::Some(#database) },
        None => quote! { ::std::option::Option::None },
    };

    let id_ty = &id.ty;

    let (get_id, set_id) = if id.optional {
        (
            quote! { ::std::clone::Clone::clone(&self.id) },
            quote! { self.id = ::std::option::Option::Some(id); },
        )
    } else {
        (
            quote! { ::std::option::Option::Some(::std::clone::Clone::clone(&self.id)) },
            quote! { self.id = id; },
        )
    };

    let projections = entity
        .projections
        .iter()
        .map(|projection| build_projection(&krate, ident, fields, projection));

    let fields_enum = build_fields_enum(
        fields.iter().map(|field| &field.ident),
        fields.iter().map(|field| &field.lit),
    );

    Ok(quote! {
        impl #krate::Entity for #ident {
            type Id = #id_ty;

            const COLLECTION_NAME: &'static str = #collection_name;

            const DATABASE_NAME: ::std::option::Option<&'static str> = #database_name;

            fn id(&self) -> ::std::option::Option<Self::Id> {
                #get_id
            }

            fn set_id(&mut self, id: Self::Id) {
                #set_id
            }
        }

        #[allow(dead_code)]
        #vis mod #mod_ident {
            #[allow(unused_imports)]
            use super::*;

            #fields_enum

            #( #projections )*
        }
    })
}

fn build_projection(
    krate: &TokenStream,
    entity_ident: &Ident,
    fields: &[FieldConfig],
    projection: &ProjectionConfig,
) -> TokenStream {
    let projection_ident = &projection.ident;

    let projected = projection
        .fields
        .iter()
        .map(|index| &fields[*index])
        .collect_vec();

    let idents = projected.iter().map(|field| &field.ident).collect_vec();
    let types = projected.iter().map(|field| &field.ty);
    let lits = projected.iter().map(|field| &field.lit);

    let attrs = projected.iter().map(|field| {
        let serde_attrs = &field.serde_attrs;
        let lit = &field.lit;

        if field.has_rename {
            quote! { #( #serde_attrs )* }
        } else {
            quote! {
                #( #serde_attrs )*
                #[serde(rename = #lit)]
            }
        }
    });

    quote! {
        #[derive(::std::fmt::Debug, ::serde::Serialize, ::serde::Deserialize)]
        pub struct #projection_ident {
            #(
                #attrs
                pub #idents: #types
            ),*
        }

        impl #krate::Projection<#entity_ident> for #projection_ident {
            const FIELDS: ::std::option::Option<&'static [&'static str]> =
                ::std::option::Option::Some(&[ #( #lits ),* ]);
        }

        impl ::std::convert::From<#entity_ident> for #projection_ident {
            fn from(value: #entity_ident) -> Self {
                Self {
                    #(
                        #idents: value.#idents
                    ),*
                }
            }
        }
    }
}
