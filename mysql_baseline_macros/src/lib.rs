//! Procedural macros for mysql_baseline
//!
//! This crate provides the `BaselineModel` derive macro, which binds a struct
//! to the table named by its `#[baseline(table = "...")]` attribute.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr};

/// Derive macro for `mysql_baseline::models::TableModel`
#[proc_macro_derive(BaselineModel, attributes(baseline))]
pub fn derive_baseline_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let table = table_name(input)?;

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::mysql_baseline::models::TableModel for #name #ty_generics #where_clause {
            fn table_name() -> &'static str {
                #table
            }
        }
    })
}

/// Read `table` from `#[baseline(table = "...")]`
fn table_name(input: &DeriveInput) -> syn::Result<LitStr> {
    let mut table: Option<LitStr> = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("baseline") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().trim().is_empty() {
                    return Err(meta.error("table name must not be empty"));
                }
                table = Some(value);
                Ok(())
            } else {
                Err(meta.error("unsupported baseline attribute, expected `table`"))
            }
        })?;
    }

    table.ok_or_else(|| {
        syn::Error::new_spanned(
            &input.ident,
            "BaselineModel requires #[baseline(table = \"...\")]",
        )
    })
}
