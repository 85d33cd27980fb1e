//! Record derive macro implementation

use crate::attrs::{FieldInfo, is_i64, named_fields};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields: Vec<FieldInfo<'_>> = named_fields(&input, "Record")?
        .into_iter()
        .filter(|f| !f.attr.skip)
        .collect();

    let id_field = find_id_field(&fields)?;

    let columns: Vec<&str> = fields.iter().map(|f| f.column.as_str()).collect();

    let value_arms = fields.iter().map(|f| {
        let ident = f.ident;
        let column = &f.column;
        quote! {
            #column => ::std::option::Option::Some(
                ::sqlchain::Param::new(::std::clone::Clone::clone(&self.#ident))
            ),
        }
    });

    let (id_column, record_id_mut) = match id_field {
        Some(f) => {
            let ident = f.ident;
            let column = &f.column;
            (
                quote! {
                    fn id_column() -> ::std::option::Option<&'static str> {
                        ::std::option::Option::Some(#column)
                    }
                },
                quote! {
                    fn record_id_mut(&mut self) -> ::std::option::Option<&mut i64> {
                        ::std::option::Option::Some(&mut self.#ident)
                    }
                },
            )
        }
        None => (quote! {}, quote! {}),
    };

    Ok(quote! {
        impl #impl_generics ::sqlchain::Record for #name #ty_generics #where_clause {
            fn columns() -> &'static [&'static str] {
                &[#(#columns),*]
            }

            #id_column

            fn value(&self, column: &str) -> ::std::option::Option<::sqlchain::Param> {
                match column {
                    #(#value_arms)*
                    _ => ::std::option::Option::None,
                }
            }

            #record_id_mut
        }
    })
}

/// `#[sqlchain(id)]` wins; otherwise a field named `id` of type `i64`.
fn find_id_field<'f, 'a>(fields: &'f [FieldInfo<'a>]) -> Result<Option<&'f FieldInfo<'a>>> {
    let mut marked = fields.iter().filter(|f| f.attr.is_id);
    if let Some(first) = marked.next() {
        if let Some(second) = marked.next() {
            return Err(syn::Error::new_spanned(
                second.ident,
                "only one field can be marked #[sqlchain(id)]",
            ));
        }
        if !is_i64(&first.field.ty) {
            return Err(syn::Error::new_spanned(
                &first.field.ty,
                "#[sqlchain(id)] fields must be i64",
            ));
        }
        return Ok(Some(first));
    }

    Ok(fields
        .iter()
        .find(|f| f.ident.to_string().eq_ignore_ascii_case("id") && is_i64(&f.field.ty)))
}
