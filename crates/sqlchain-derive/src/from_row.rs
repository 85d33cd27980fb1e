//! FromRow derive macro implementation

use crate::attrs::named_fields;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field_extracts: Vec<_> = named_fields(&input, "FromRow")?
        .iter()
        .map(|f| {
            let ident = f.ident;
            let column = &f.column;
            if f.attr.skip {
                quote! { #ident: ::std::default::Default::default() }
            } else {
                quote! { #ident: row.try_get_column(#column)? }
            }
        })
        .collect();

    Ok(quote! {
        impl #impl_generics ::sqlchain::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::sqlchain::tokio_postgres::Row) -> ::sqlchain::SqlResult<Self> {
                use ::sqlchain::RowExt;
                ::std::result::Result::Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    })
}
