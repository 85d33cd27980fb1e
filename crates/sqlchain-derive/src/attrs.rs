//! Parsing of `#[sqlchain(...)]` attributes.

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Result};

/// Field-level options: `#[sqlchain(column = "name", id, skip)]`.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub column: Option<String>,
    pub is_id: bool,
    pub skip: bool,
}

impl syn::parse::Parse for FieldAttr {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            if ident == "id" {
                attr.is_id = true;
            } else if ident == "skip" {
                attr.skip = true;
            } else if ident == "column" {
                let _: syn::Token![=] = input.parse()?;
                let value: syn::LitStr = input.parse()?;
                attr.column = Some(value.value());
            } else {
                return Err(syn::Error::new_spanned(
                    &ident,
                    format!("unknown sqlchain attribute `{ident}`"),
                ));
            }

            if input.peek(syn::Token![,]) {
                let _: syn::Token![,] = input.parse()?;
            } else {
                break;
            }
        }

        Ok(attr)
    }
}

/// Struct-level `#[sqlchain(rename_all = "...")]`.
#[derive(Clone, Copy)]
pub(crate) enum RenameRule {
    None,
    Snake,
    Camel,
    Pascal,
    ScreamingSnake,
    Kebab,
}

impl RenameRule {
    fn from_str(value: &syn::LitStr) -> Result<Self> {
        match value.value().as_str() {
            "snake_case" => Ok(Self::Snake),
            "camelCase" => Ok(Self::Camel),
            "PascalCase" => Ok(Self::Pascal),
            "SCREAMING_SNAKE_CASE" => Ok(Self::ScreamingSnake),
            "kebab-case" => Ok(Self::Kebab),
            other => Err(syn::Error::new_spanned(
                value,
                format!("unsupported rename_all rule `{other}`"),
            )),
        }
    }

    pub(crate) fn apply(self, name: &str) -> String {
        match self {
            Self::None => name.to_string(),
            Self::Snake => name.to_snake_case(),
            Self::Camel => name.to_lower_camel_case(),
            Self::Pascal => name.to_upper_camel_case(),
            Self::ScreamingSnake => name.to_shouty_snake_case(),
            Self::Kebab => name.to_kebab_case(),
        }
    }
}

pub(crate) fn rename_rule(input: &DeriveInput) -> Result<RenameRule> {
    let mut rule = RenameRule::None;
    for attr in &input.attrs {
        if !attr.path().is_ident("sqlchain") {
            continue;
        }
        let nested = attr.parse_args::<syn::MetaNameValue>()?;
        if !nested.path.is_ident("rename_all") {
            return Err(syn::Error::new_spanned(
                &nested.path,
                "expected #[sqlchain(rename_all = \"...\")]",
            ));
        }
        match &nested.value {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) => rule = RenameRule::from_str(lit)?,
            other => {
                return Err(syn::Error::new_spanned(other, "rename_all expects a string"));
            }
        }
    }
    Ok(rule)
}

/// A named field together with its resolved column.
pub(crate) struct FieldInfo<'a> {
    pub field: &'a syn::Field,
    pub ident: &'a syn::Ident,
    pub column: String,
    pub attr: FieldAttr,
}

pub(crate) fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<Vec<FieldInfo<'a>>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    format!("{derive} can only be derived for structs with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs"),
            ));
        }
    };

    let rule = rename_rule(input)?;
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };

        let mut attr = FieldAttr::default();
        for a in &field.attrs {
            if a.path().is_ident("sqlchain") {
                let parsed: FieldAttr = a.parse_args()?;
                attr.is_id |= parsed.is_id;
                attr.skip |= parsed.skip;
                if parsed.column.is_some() {
                    attr.column = parsed.column;
                }
            }
        }

        let column = attr
            .column
            .clone()
            .unwrap_or_else(|| rule.apply(&ident.unraw().to_string()));

        out.push(FieldInfo {
            field,
            ident,
            column,
            attr,
        });
    }
    Ok(out)
}

/// `true` for a bare `i64` (or `std::primitive::i64`) type.
pub(crate) fn is_i64(ty: &syn::Type) -> bool {
    let syn::Type::Path(type_path) = ty else {
        return false;
    };
    type_path.qself.is_none()
        && type_path
            .path
            .segments
            .last()
            .is_some_and(|seg| seg.ident == "i64" && seg.arguments.is_none())
}
