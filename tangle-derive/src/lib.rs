//! # Tangle Derive Macros
//!
//! This crate provides the procedural macros for `tangle`. `#[derive(Structural)]`
//! implements `tangle::Structural` (field-by-field encoding) and `tangle::Codable`
//! (so the type can be registered with `tangle.register::<T>()`).
//!
//! Attributes:
//!
//! - `#[tangle(cyclic)]` on the struct: read and copy in place. An empty instance is
//!   built from `Default` field values and bound before any field is read, so
//!   fields may refer back to the struct. Every non-skipped field must be a
//!   `RefCell<_>` or `Cell<_>`.
//! - `#[tangle(skip)]` on a field: not written; restored with `Default`.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use quote::{ToTokens, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Index, LitStr, Member, parse_macro_input};

/// Derives `Structural` and `Codable`.
#[proc_macro_derive(Structural, attributes(tangle))]
pub fn derive_structural(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => e.to_compile_error().into(),
    }
}

// --- Internal Data Structures ---
struct StructField {
    member: Member,
    ty: syn::Type,
    label: LitStr,
    skip: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let data_struct = match &input.data {
        Data::Struct(ds) => ds,
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "Structural only supports structs",
            ));
        }
    };

    let cyclic = parse_struct_attributes(&input.attrs)?;
    let fields = collect_fields(&data_struct.fields)?;

    let impl_write = generate_write(&fields);
    let impl_read = generate_read(&fields);
    let impl_copy = generate_copy(&fields);
    let impl_cyclic = if cyclic {
        generate_in_place(&fields)
    } else {
        quote! {}
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics tangle::Structural for #name #ty_generics #where_clause {
            const CYCLIC: bool = #cyclic;

            #impl_write
            #impl_read
            #impl_copy
            #impl_cyclic
        }

        impl #impl_generics tangle::Codable for #name #ty_generics #where_clause {
            fn codec() -> ::std::rc::Rc<dyn tangle::Codec> {
                ::std::rc::Rc::new(tangle::StructuralCodec::<Self>::new())
            }
        }
    })
}

/// Parses struct attributes. Returns `cyclic`.
fn parse_struct_attributes(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut cyclic = false;
    for attr in attrs {
        if attr.path().is_ident("tangle") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("cyclic") {
                    cyclic = true;
                    return Ok(());
                }
                Err(meta.error("Unknown tangle struct attribute. Supported: cyclic"))
            })?;
        }
    }
    Ok(cyclic)
}

/// Parses field attributes. Returns `skip`.
fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skip = false;
    for attr in attrs {
        if attr.path().is_ident("tangle") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                Err(meta.error("Unknown tangle field attribute. Supported: skip"))
            })?;
        }
    }
    Ok(skip)
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<StructField>> {
    let mut collected = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        let skip = parse_field_attributes(&field.attrs)?;
        let (member, display) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (Member::Unnamed(Index::from(index)), index.to_string()),
        };
        // Trace entries read like `next (Option<Rc<Node>>)`.
        let type_name = field.ty.to_token_stream().to_string().replace(' ', "");
        let label = LitStr::new(&format!("{display} ({type_name})"), proc_macro2::Span::call_site());
        collected.push(StructField {
            member,
            ty: field.ty.clone(),
            label,
            skip,
        });
    }
    Ok(collected)
}

// --- Generator: write_fields ---

fn generate_write(fields: &[StructField]) -> proc_macro2::TokenStream {
    let writes = fields.iter().filter(|f| !f.skip).map(|f| {
        let member = &f.member;
        let label = &f.label;
        quote! {
            tangle::rt::Field::write_field(&self.#member, tangle, output)
                .map_err(|e| e.with_trace(#label))?;
        }
    });

    quote! {
        #[allow(unused_variables)]
        fn write_fields(
            &self,
            tangle: &mut tangle::Tangle,
            output: &mut tangle::io::Output,
        ) -> tangle::Result<()> {
            #(#writes)*
            Ok(())
        }
    }
}

// --- Generator: read_fields ---

fn generate_read(fields: &[StructField]) -> proc_macro2::TokenStream {
    let inits = fields.iter().map(|f| {
        let member = &f.member;
        let ty = &f.ty;
        let label = &f.label;
        if f.skip {
            quote! { #member: ::core::default::Default::default() }
        } else {
            quote! {
                #member: <#ty as tangle::rt::Field>::read_field(tangle, input)
                    .map_err(|e| e.with_trace(#label))?
            }
        }
    });

    quote! {
        #[allow(unused_variables)]
        fn read_fields(
            tangle: &mut tangle::Tangle,
            input: &mut tangle::io::Input,
        ) -> tangle::Result<Self> {
            Ok(Self { #(#inits),* })
        }
    }
}

// --- Generator: copy_fields ---

fn generate_copy(fields: &[StructField]) -> proc_macro2::TokenStream {
    let inits = fields.iter().map(|f| {
        let member = &f.member;
        let label = &f.label;
        if f.skip {
            quote! { #member: ::core::default::Default::default() }
        } else {
            quote! {
                #member: tangle::rt::Field::copy_field(&self.#member, tangle)
                    .map_err(|e| e.with_trace(#label))?
            }
        }
    });

    quote! {
        #[allow(unused_variables)]
        fn copy_fields(&self, tangle: &mut tangle::Tangle) -> tangle::Result<Self> {
            Ok(Self { #(#inits),* })
        }
    }
}

// --- Generator: in-place mode ---

fn generate_in_place(fields: &[StructField]) -> proc_macro2::TokenStream {
    let defaults = fields.iter().map(|f| {
        let member = &f.member;
        quote! { #member: ::core::default::Default::default() }
    });

    let reads = fields.iter().filter(|f| !f.skip).map(|f| {
        let member = &f.member;
        let label = &f.label;
        quote! {
            tangle::rt::FieldSlot::read_into(&self.#member, tangle, input)
                .map_err(|e| e.with_trace(#label))?;
        }
    });

    let copies = fields.iter().filter(|f| !f.skip).map(|f| {
        let member = &f.member;
        let label = &f.label;
        quote! {
            tangle::rt::FieldSlot::copy_into(&self.#member, &source.#member, tangle)
                .map_err(|e| e.with_trace(#label))?;
        }
    });

    quote! {
        fn instantiate() -> ::core::option::Option<Self> {
            ::core::option::Option::Some(Self { #(#defaults),* })
        }

        #[allow(unused_variables)]
        fn read_into(
            &self,
            tangle: &mut tangle::Tangle,
            input: &mut tangle::io::Input,
        ) -> tangle::Result<()> {
            #(#reads)*
            Ok(())
        }

        #[allow(unused_variables)]
        fn copy_into(&self, source: &Self, tangle: &mut tangle::Tangle) -> tangle::Result<()> {
            #(#copies)*
            Ok(())
        }
    }
}
