//! Derive macros for sqlchain
//!
//! Provides `#[derive(Record)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod from_row;
mod record;

/// Derive `Record` for a struct so it can be passed to `record` / `records`.
///
/// # Example
///
/// ```ignore
/// use sqlchain::Record;
///
/// #[derive(Record)]
/// struct User {
///     id: i64,
///     username: String,
///     #[sqlchain(column = "email_address")]
///     email: Option<String>,
///     #[sqlchain(skip)]
///     cached_score: u32,
/// }
/// ```
///
/// Every mapped field must be `Clone + ToSql + Send + Sync + 'static`.
///
/// # Attributes
///
/// - `#[sqlchain(rename_all = "camelCase")]` - Rename every column (struct level)
/// - `#[sqlchain(column = "name")]` - Map field to a different column name
/// - `#[sqlchain(id)]` - Mark the `i64` field that receives the generated id
///   (defaults to a field named `id` of type `i64`)
/// - `#[sqlchain(skip)]` - Leave the field out of the row
#[proc_macro_derive(Record, attributes(sqlchain))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `FromRow` for a struct.
///
/// # Example
///
/// ```ignore
/// use sqlchain::FromRow;
///
/// #[derive(FromRow)]
/// struct Inserted {
///     id: i64,
///     #[sqlchain(column = "created_at")]
///     created: chrono::DateTime<chrono::Utc>,
/// }
/// ```
///
/// Accepts the same attributes as `Record`; skipped fields use `Default`.
#[proc_macro_derive(FromRow, attributes(sqlchain))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
