// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, FnArg, ImplItem, ItemImpl, LitStr,
    ReturnType, Type, Visibility,
};

/// Options read from `#[reflect(...)]` on a container, field or method.
#[derive(Default)]
struct ReflectAttrs {
    skip: bool,
    rename: Option<String>,
    name: Option<String>,
    methods: bool,
}

fn parse_attrs(attrs: &[Attribute]) -> syn::Result<ReflectAttrs> {
    let mut out = ReflectAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("methods") {
                out.methods = true;
            } else if meta.path.is_ident("rename") {
                out.rename = Some(meta.value()?.parse::<LitStr>()?.value());
            } else if meta.path.is_ident("name") {
                out.name = Some(meta.value()?.parse::<LitStr>()?.value());
            } else {
                return Err(meta.error("expected `skip`, `rename = \"..\"`, `name = \"..\"` or `methods`"));
            }
            Ok(())
        })?;
    }
    Ok(out)
}

/// `#[derive(Reflect)]`: generates `Describe` plus `Reflect` (structs) or
/// `VariantValue` (enums).
///
/// Structs need named fields; every field type must implement `Describe`.
/// Enums need exactly one unnamed payload per variant. Generic types are not
/// supported. The type must also be `Clone`.
///
/// Attributes:
/// - container `#[reflect(name = "..")]`: registered type name (default: ident)
/// - container `#[reflect(methods)]`: append members from `#[reflect_methods]`
/// - field `#[reflect(skip)]`, `#[reflect(rename = "..")]`
///
/// Example:
/// ```ignore
/// use typebridge::Reflect;
///
/// #[derive(Clone, Default, Reflect)]
/// #[reflect(name = "Point2D")]
/// struct Point {
///     x: f64,
///     y: f64,
///     #[reflect(skip)]
///     cache: Vec<u8>,
/// }
///
/// #[derive(Clone, Reflect)]
/// enum Shape {
///     Circle(f64),
///     Label(String),
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let result = match &input.data {
        Data::Struct(_) => expand_struct(&input),
        Data::Enum(_) => expand_enum(&input),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Reflect cannot be derived for unions",
        )),
    };
    result.unwrap_or_else(syn::Error::into_compile_error).into()
}

fn reject_generics(input: &DeriveInput) -> syn::Result<()> {
    if input.generics.params.is_empty() {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect does not support generic types",
        ))
    }
}

fn expand_struct(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    reject_generics(input)?;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "expected a struct"));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            input,
            "Reflect requires a struct with named fields",
        ));
    };

    let ident = &input.ident;
    let container = parse_attrs(&input.attrs)?;
    let type_name = container.name.unwrap_or_else(|| ident.to_string());

    let mut registrations = Vec::new();
    for field in &fields.named {
        let attrs = parse_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "field must have a name"));
        };
        let member_name = attrs.rename.unwrap_or_else(|| field_ident.to_string());
        registrations.push(quote! {
            let builder = ::typebridge::reflect_field!(builder, #ident, #field_ident, #member_name);
        });
    }

    let tail = if container.methods {
        quote! { <Self as ::typebridge::ReflectMethods>::methods(builder) }
    } else {
        quote! { builder }
    };

    Ok(quote! {
        impl ::typebridge::Describe for #ident {
            fn describe() -> ::typebridge::TypeDescriptor {
                ::typebridge::TypeDescriptor::structure::<Self>()
            }
        }

        impl ::typebridge::Reflect for #ident {
            const TYPE_NAME: &'static str = #type_name;

            fn reflect(
                builder: ::typebridge::StructBuilder<Self>,
            ) -> ::typebridge::StructBuilder<Self> {
                #(#registrations)*
                #tail
            }
        }
    })
}

fn expand_enum(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    reject_generics(input)?;
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "expected an enum"));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "Reflect requires at least one variant",
        ));
    }

    let ident = &input.ident;
    let container = parse_attrs(&input.attrs)?;
    let type_name = container.name.unwrap_or_else(|| ident.to_string());

    let mut variants = Vec::new();
    let mut payload_types = Vec::new();
    for variant in &data.variants {
        let payload = match &variant.fields {
            Fields::Unnamed(f) if f.unnamed.len() == 1 => &f.unnamed[0].ty,
            _ => {
                return Err(syn::Error::new_spanned(
                    variant,
                    "each variant must hold exactly one unnamed payload, e.g. `Text(String)`",
                ))
            }
        };
        variants.push(&variant.ident);
        payload_types.push(payload);
    }
    let indices: Vec<usize> = (0..variants.len()).collect();

    Ok(quote! {
        impl ::typebridge::Describe for #ident {
            fn describe() -> ::typebridge::TypeDescriptor {
                ::typebridge::TypeDescriptor::variant::<Self>(#type_name)
            }
        }

        impl ::typebridge::VariantValue for #ident {
            fn alternatives() -> ::std::vec::Vec<::std::sync::Arc<::typebridge::TypeDescriptor>> {
                ::std::vec![#(::typebridge::descriptor_of::<#payload_types>()),*]
            }

            fn active_index(&self) -> usize {
                match self {
                    #(Self::#variants(_) => #indices,)*
                }
            }

            fn payload_ptr(&self) -> *const u8 {
                match self {
                    #(Self::#variants(v) => (v as *const #payload_types).cast::<u8>(),)*
                }
            }

            fn payload_mut_ptr(&mut self) -> *mut u8 {
                match self {
                    #(Self::#variants(v) => (v as *mut #payload_types).cast::<u8>(),)*
                }
            }

            unsafe fn from_payload(index: usize, payload: *const u8) -> ::std::option::Option<Self> {
                match index {
                    #(#indices => ::std::option::Option::Some(Self::#variants(
                        ::std::clone::Clone::clone(&*payload.cast::<#payload_types>()),
                    )),)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    })
}

/// `#[reflect_methods]` on an inherent `impl` block: generates
/// `ReflectMethods` binding every `pub fn` that takes `&self` or `&mut self`.
///
/// Parameters of type `&T` are marshaled as `<T as ToOwned>::Owned` (so
/// `&str` travels as `String`). Reference returns and `&mut` parameters are
/// rejected. Methods can carry `#[reflect(skip)]` or
/// `#[reflect(rename = "..")]`. Pair with `#[reflect(methods)]` on the
/// derived struct.
///
/// Example:
/// ```ignore
/// #[reflect_methods]
/// impl Calculator {
///     pub fn add(&mut self, x: f64) -> f64 { self.value += x; self.value }
///     #[reflect(rename = "getValue")]
///     pub fn value(&self) -> f64 { self.value }
/// }
/// ```
#[proc_macro_attribute]
pub fn reflect_methods(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[reflect_methods] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let mut item = parse_macro_input!(item as ItemImpl);
    match expand_methods(&mut item) {
        Ok(generated) => quote! { #item #generated }.into(),
        Err(err) => {
            let err = err.to_compile_error();
            quote! { #item #err }.into()
        }
    }
}

fn expand_methods(item: &mut ItemImpl) -> syn::Result<proc_macro2::TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[reflect_methods] must be placed on an inherent impl block",
        ));
    }
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[reflect_methods] does not support generic impl blocks",
        ));
    }
    let self_ty = item.self_ty.clone();

    let mut bindings = Vec::new();
    let mut first_error: Option<syn::Error> = None;
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let attrs = parse_attrs(&method.attrs);
        method.attrs.retain(|a| !a.path().is_ident("reflect"));
        let attrs = match attrs {
            Ok(attrs) => attrs,
            Err(err) => {
                first_error.get_or_insert(err);
                continue;
            }
        };
        if attrs.skip || !matches!(method.vis, Visibility::Public(_)) {
            continue;
        }
        match bind_method(&self_ty, &method.sig, attrs.rename) {
            Ok(Some(binding)) => bindings.push(binding),
            Ok(None) => {}
            Err(err) => {
                first_error.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    Ok(quote! {
        impl ::typebridge::ReflectMethods for #self_ty {
            fn methods(
                builder: ::typebridge::StructBuilder<Self>,
            ) -> ::typebridge::StructBuilder<Self> {
                builder #(#bindings)*
            }
        }
    })
}

/// `.method("name", closure)` for one method, `None` for methods without a
/// reference receiver.
fn bind_method(
    self_ty: &Type,
    sig: &syn::Signature,
    rename: Option<String>,
) -> syn::Result<Option<proc_macro2::TokenStream>> {
    let Some(receiver) = sig.receiver() else {
        return Ok(None);
    };
    if receiver.reference.is_none() {
        return Ok(None);
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, "async methods cannot be reflected"));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "generic methods cannot be reflected",
        ));
    }

    let this_ty = if receiver.mutability.is_some() {
        quote! { &mut #self_ty }
    } else {
        quote! { &#self_ty }
    };

    let mut params = Vec::new();
    let mut args = Vec::new();
    for (i, input) in sig.inputs.iter().skip(1).enumerate() {
        let FnArg::Typed(pat_ty) = input else {
            continue;
        };
        let arg = format_ident!("__tb_arg{}", i);
        match pat_ty.ty.as_ref() {
            Type::Reference(r) if r.mutability.is_some() => {
                return Err(syn::Error::new_spanned(
                    r,
                    "`&mut` parameters cannot be reflected",
                ));
            }
            Type::Reference(r) => {
                let elem = &r.elem;
                params.push(quote! { #arg: <#elem as ::std::borrow::ToOwned>::Owned });
                args.push(quote! {
                    <<#elem as ::std::borrow::ToOwned>::Owned as ::std::borrow::Borrow<#elem>>::borrow(&#arg)
                });
            }
            ty => {
                params.push(quote! { #arg: #ty });
                args.push(quote! { #arg });
            }
        }
    }

    let ret = match &sig.output {
        ReturnType::Default => quote! {},
        ReturnType::Type(_, ty) => {
            if let Type::Reference(r) = ty.as_ref() {
                return Err(syn::Error::new_spanned(
                    r,
                    "methods returning references cannot be reflected",
                ));
            }
            quote! { -> #ty }
        }
    };

    let fn_ident = &sig.ident;
    let member_name = rename.unwrap_or_else(|| fn_ident.to_string());
    Ok(Some(quote! {
        .method(#member_name, |this: #this_ty, #(#params),*| #ret {
            <#self_ty>::#fn_ident(this, #(#args),*)
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs_of(src: &str) -> ReflectAttrs {
        let item: syn::ItemStruct = syn::parse_str(src).expect("parse struct");
        parse_attrs(&item.attrs).expect("attrs")
    }

    #[test]
    fn test_container_attrs() {
        let attrs = attrs_of(r#"#[reflect(name = "Point2D", methods)] struct P { x: f64 }"#);
        assert_eq!(attrs.name.as_deref(), Some("Point2D"));
        assert!(attrs.methods);
        assert!(!attrs.skip);
    }

    #[test]
    fn test_unknown_attr_is_error() {
        let item: syn::ItemStruct =
            syn::parse_str("#[reflect(flatten)] struct P { x: f64 }").expect("parse struct");
        assert!(parse_attrs(&item.attrs).is_err());
    }

    #[test]
    fn test_tuple_struct_rejected() {
        let input: DeriveInput = syn::parse_str("struct P(f64);").expect("parse");
        let err = expand_struct(&input).err().expect("error");
        assert!(err.to_string().contains("named fields"));
    }

    #[test]
    fn test_unit_variant_rejected() {
        let input: DeriveInput = syn::parse_str("enum E { A(i32), B }").expect("parse");
        assert!(expand_enum(&input).is_err());
    }

    #[test]
    fn test_generic_struct_rejected() {
        let input: DeriveInput = syn::parse_str("struct W<T> { t: T }").expect("parse");
        assert!(expand_struct(&input).is_err());
    }

    #[test]
    fn test_methods_binding_shapes() {
        let mut item: ItemImpl = syn::parse_str(
            r#"impl Calc {
                pub fn add(&mut self, x: f64) -> f64 { x }
                pub fn describe(&self) -> String { String::new() }
                #[reflect(rename = "setLabel")]
                pub fn set_label(&mut self, label: &str) {}
                #[reflect(skip)]
                pub fn hidden(&self) {}
                fn private(&self) {}
                pub fn new() -> Self { Calc }
            }"#,
        )
        .expect("parse impl");
        let out = expand_methods(&mut item).expect("expand").to_string();
        assert!(out.contains("\"add\""));
        assert!(out.contains("\"describe\""));
        assert!(out.contains("\"setLabel\""));
        assert!(out.contains("ToOwned"));
        assert!(!out.contains("\"hidden\""));
        assert!(!out.contains("\"private\""));
        assert!(!out.contains("\"new\""));
        // Helper attributes are stripped from the emitted impl.
        let emitted = quote! { #item }.to_string();
        assert!(!emitted.contains("rename"));
    }

    #[test]
    fn test_reference_return_rejected() {
        let mut item: ItemImpl =
            syn::parse_str("impl C { pub fn name(&self) -> &str { \"\" } }").expect("parse impl");
        assert!(expand_methods(&mut item).is_err());
    }
}
