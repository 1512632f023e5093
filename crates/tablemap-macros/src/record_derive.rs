//! Implementation of the Record derive macro.
//!
//! Field metadata comes from `#[db("...")]` tags, embedded groups from `#[db(embed)]`,
//! and `#[db(hooks)]` on the struct routes [`Record::hooks`] to the type's own `Hooks`
//! implementation.

use std::sync::LazyLock;

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::ParseStream;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result, Type};

static COLUMN_NAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^(-|[A-Za-z_][A-Za-z0-9_$]*)?$").expect("valid column regex")
});

static DIRECTIVE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)^(primarykey|autoincrement|version|nullable|notnull|unique|size:\s*[1-9][0-9]*)?$",
    )
    .expect("valid directive regex")
});

/// Parsed record definition.
#[derive(Debug)]
pub struct RecordDef {
    pub name: Ident,
    pub fields: Vec<RecordFieldDef>,
    /// `#[db(hooks)]` was given on the struct.
    pub hooks: bool,
}

/// How one field participates in the mapping.
#[derive(Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Mapped scalar with its tag text.
    Column(String),
    /// Tagged `-`; never read or written by the engine.
    Transient,
    /// Nested record flattened into the parent.
    Embedded,
}

#[derive(Debug)]
pub struct RecordFieldDef {
    pub ident: Ident,
    pub ty: Type,
    pub kind: FieldKind,
}

impl RecordFieldDef {
    /// Field name without any `r#` prefix.
    fn name(&self) -> String {
        self.ident.unraw().to_string()
    }
}

/// Parse a `DeriveInput` into a `RecordDef`.
pub fn parse_record(input: &DeriveInput) -> Result<RecordDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => parse_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not unions",
            ));
        }
    };

    let mut hooks = false;
    for attr in &input.attrs {
        if !attr.path().is_ident("db") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("hooks") {
                hooks = true;
                Ok(())
            } else {
                Err(meta.error("unknown struct attribute, expected `hooks`"))
            }
        })?;
    }

    Ok(RecordDef {
        name: input.ident.clone(),
        fields,
        hooks,
    })
}

fn parse_fields(fields: &Fields) -> Result<Vec<RecordFieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_field).collect(),
        Fields::Unnamed(_) => Err(Error::new_spanned(
            fields,
            "Record requires a struct with named fields",
        )),
        Fields::Unit => Ok(Vec::new()),
    }
}

fn parse_field(field: &Field) -> Result<RecordFieldDef> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut kind = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("db") {
            continue;
        }
        if kind.is_some() {
            return Err(Error::new_spanned(attr, "duplicate #[db] attribute"));
        }
        kind = Some(attr.parse_args_with(|input: ParseStream| {
            if input.peek(LitStr) {
                let tag: LitStr = input.parse()?;
                check_tag(&tag)?;
                if is_transient(&tag.value()) {
                    Ok(FieldKind::Transient)
                } else {
                    Ok(FieldKind::Column(tag.value()))
                }
            } else {
                let word: Ident = input.parse()?;
                if word == "embed" {
                    Ok(FieldKind::Embedded)
                } else {
                    Err(Error::new_spanned(
                        word,
                        "expected a tag string or `embed`",
                    ))
                }
            }
        })?);
    }

    Ok(RecordFieldDef {
        ident,
        ty: field.ty.clone(),
        kind: kind.unwrap_or(FieldKind::Column(String::new())),
    })
}

fn is_transient(tag: &str) -> bool {
    tag.split(',').next().map(str::trim) == Some("-")
}

/// Reject malformed tags at compile time. The registry parses them again at runtime.
fn check_tag(tag: &LitStr) -> Result<()> {
    let value = tag.value();
    let mut tokens = value.split(',').map(str::trim);
    if let Some(column) = tokens.next() {
        if !COLUMN_NAME.is_match(column) {
            return Err(Error::new_spanned(
                tag,
                format!("invalid column name `{column}` in tag"),
            ));
        }
    }
    for token in tokens {
        if !DIRECTIVE.is_match(token) {
            return Err(Error::new_spanned(
                tag,
                format!(
                    "unknown tag directive `{token}`. Valid directives are: primarykey, \
                     autoincrement, size:<n>, version, nullable, notnull, unique"
                ),
            ));
        }
    }
    Ok(())
}

/// Generate the `Record` impl.
pub fn generate_record_impl(def: &RecordDef) -> TokenStream {
    let name = &def.name;
    let type_name = name.to_string();

    let field_defs = def.fields.iter().map(|f| {
        let field_name = f.name();
        let ty = &f.ty;
        match &f.kind {
            FieldKind::Column(tag) => quote! {
                ::tablemap_core::FieldDef::of::<#ty>(#field_name).tag(#tag)
            },
            FieldKind::Transient => quote! {
                ::tablemap_core::FieldDef::new(#field_name, ::tablemap_core::SqlType::Blob).tag("-")
            },
            FieldKind::Embedded => quote! {
                ::tablemap_core::FieldDef::embedded(
                    #field_name,
                    <#ty as ::tablemap_core::Record>::fields,
                )
            },
        }
    });

    let get_arms = def.fields.iter().filter_map(|f| {
        let field_name = f.name();
        let ident = &f.ident;
        match f.kind {
            FieldKind::Column(_) => Some(quote! {
                [#field_name] => ::std::option::Option::Some(
                    ::tablemap_core::ToValue::to_value(&self.#ident)
                ),
            }),
            FieldKind::Embedded => Some(quote! {
                [#field_name, rest @ ..] => ::tablemap_core::Record::field_value(&self.#ident, rest),
            }),
            FieldKind::Transient => None,
        }
    });

    let set_arms = def.fields.iter().filter_map(|f| {
        let field_name = f.name();
        let ident = &f.ident;
        let ty = &f.ty;
        match f.kind {
            FieldKind::Column(_) => Some(quote! {
                [#field_name] => {
                    self.#ident = <#ty as ::tablemap_core::FromValue>::from_value(value)?;
                    ::std::result::Result::Ok(())
                }
            }),
            FieldKind::Embedded => Some(quote! {
                [#field_name, rest @ ..] => {
                    ::tablemap_core::Record::set_field_value(&mut self.#ident, rest, value)
                }
            }),
            FieldKind::Transient => None,
        }
    });

    let hooks = if def.hooks {
        quote! {
            fn hooks(&mut self) -> ::std::option::Option<&mut dyn ::tablemap_core::Hooks> {
                ::std::option::Option::Some(self)
            }
        }
    } else {
        TokenStream::new()
    };

    quote! {
        impl ::tablemap_core::Record for #name {
            fn fields() -> ::std::vec::Vec<::tablemap_core::FieldDef> {
                ::std::vec![#(#field_defs),*]
            }

            fn record_type(&self) -> ::tablemap_core::RecordType {
                ::tablemap_core::RecordType::of::<Self>()
            }

            fn field_value(&self, path: &[&str]) -> ::std::option::Option<::tablemap_core::Value> {
                match path {
                    #(#get_arms)*
                    _ => ::std::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set_field_value(
                &mut self,
                path: &[&str],
                value: ::tablemap_core::Value,
            ) -> ::tablemap_core::Result<()> {
                match path {
                    #(#set_arms)*
                    _ => ::std::result::Result::Err(::tablemap_core::unknown_field(#type_name, path)),
                }
            }

            #hooks
        }
    }
}
