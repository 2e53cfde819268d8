//! Proc-macro crate for `#[derive(FromBytes)]`.
//!
//! Emits `unsafe impl argon_binparse::FromBytes for T {}` after verifying
//! that the struct is `#[repr(C)]` and that every field type implements
//! `FromBytes` (checked through generated where-clause assertions).

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derives `argon_binparse::FromBytes` for a `#[repr(C)]` struct.
///
/// # Requirements
///
/// - The struct must carry `#[repr(C)]` or `#[repr(C, packed)]`.
/// - Every field type must implement `FromBytes`.
///
/// # Example
///
/// ```ignore
/// #[derive(Clone, Copy, FromBytes)]
/// #[repr(C, packed)]
/// pub struct SdtHeader {
///     pub signature: [u8; 4],
///     pub length: u32,
///     // ...
/// }
/// ```
#[proc_macro_derive(FromBytes)]
pub fn derive_from_bytes(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let has_repr_c = input.attrs.iter().any(|attr| {
        if !attr.path().is_ident("repr") {
            return false;
        }
        let mut found = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                found = true;
            }
            Ok(())
        });
        found
    });

    if !has_repr_c {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "FromBytes requires #[repr(C)] or #[repr(C, packed)]",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "FromBytes can only be derived for structs",
            ));
        }
    };

    // One zero-sized assertion per field: the where-clause forces the field
    // type to implement FromBytes, turning a layout mistake into a compile
    // error at the definition site.
    let field_assertions = match fields {
        Fields::Named(named) => named
            .named
            .iter()
            .map(|f| {
                let ty = &f.ty;
                let field_name = f.ident.as_ref().unwrap();
                let assert_name =
                    quote::format_ident!("_AssertFromBytes_{}_{}", name, field_name);
                quote! {
                    #[doc(hidden)]
                    #[allow(non_camel_case_types, dead_code)]
                    struct #assert_name where #ty: argon_binparse::FromBytes;
                }
            })
            .collect::<Vec<_>>(),
        Fields::Unnamed(unnamed) => unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| {
                let ty = &f.ty;
                let assert_name = quote::format_ident!("_AssertFromBytes_{}_{}", name, i);
                quote! {
                    #[doc(hidden)]
                    #[allow(non_camel_case_types, dead_code)]
                    struct #assert_name where #ty: argon_binparse::FromBytes;
                }
            })
            .collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #(#field_assertions)*

        // SAFETY: The derive macro has verified that the struct is #[repr(C)]
        // and that every field type implements FromBytes, so any byte
        // pattern of the struct's size is a valid value.
        unsafe impl #impl_generics argon_binparse::FromBytes for #name #ty_generics #where_clause {}
    })
}
