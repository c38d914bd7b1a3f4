use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::punctuated::Punctuated;
use syn::{Attribute, Data, DeriveInput, Fields, FieldsNamed, GenericArgument, Ident, Path, PathArguments, Token, Type, Variant};

/// What the generated impls need to know about one enum variant.
struct ErrorVariant<'a> {
    ident: &'a Ident,
    /// Type and binding of the wrapped upstream error.
    source: Option<(&'a Type, &'a Ident)>,
    has_context: bool,
    cfg: Vec<&'a Attribute>,
}

pub fn expand_derive(input: DeriveInput) -> TokenStream {
    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(&input.ident, "model_error can only be applied to enums"));
    };

    let variants = data.variants.iter().map(ErrorVariant::parse).collect::<syn::Result<Vec<_>>>()?;
    check_sources(&variants)?;

    let name = &input.ident;
    let ext = format_ident!("{name}Ext");
    let derives = missing_derives(input);
    let kind = kind_impl(name, &variants);
    let context = context_trait(name, &ext, &variants);
    let conversions = variants.iter().filter_map(|v| source_impls(name, &ext, v));

    Ok(quote! {
        #[allow(non_shorthand_field_patterns)]
        #derives
        #input

        #kind
        #context
        #(#conversions)*

        #[allow(dead_code)]
        fn format_context(context: &Option<std::borrow::Cow<'static, str>>) -> std::borrow::Cow<'static, str> {
            match context {
                Some(c) => std::borrow::Cow::Owned(format!(" ({c})")),
                None => std::borrow::Cow::Borrowed(""),
            }
        }
    })
}

impl<'a> ErrorVariant<'a> {
    fn parse(variant: &'a Variant) -> syn::Result<Self> {
        let Fields::Named(fields) = &variant.fields else {
            return Err(syn::Error::new_spanned(variant, "model_error variants need named fields"));
        };

        Ok(Self {
            ident: &variant.ident,
            source: source_field(fields),
            has_context: context_field(fields)?,
            cfg: variant.attrs.iter().filter(|a| a.path().is_ident("cfg")).collect(),
        })
    }
}

fn context_field(fields: &FieldsNamed) -> syn::Result<bool> {
    let Some(field) = fields.named.iter().find(|f| f.ident.as_ref().is_some_and(|i| i == "context")) else {
        return Ok(false);
    };
    if is_context_type(&field.ty) {
        Ok(true)
    } else {
        Err(syn::Error::new_spanned(&field.ty, "context field must be Option<Cow<'static, str>>"))
    }
}

/// The field named `source`, or the first one marked `#[source]` or `#[from]`.
fn source_field(fields: &FieldsNamed) -> Option<(&Type, &Ident)> {
    fields
        .named
        .iter()
        .find(|f| {
            f.ident.as_ref().is_some_and(|i| i == "source")
                || f.attrs.iter().any(|a| a.path().is_ident("source") || a.path().is_ident("from"))
        })
        .and_then(|f| f.ident.as_ref().map(|ident| (&f.ty, ident)))
}

/// Every source needs a context slot, and a source type may back one variant only
/// or the `From` impls would overlap.
fn check_sources(variants: &[ErrorVariant<'_>]) -> syn::Result<()> {
    let mut seen = FxHashSet::default();
    for v in variants {
        let Some((ty, _)) = v.source else { continue };
        if !v.has_context {
            return Err(syn::Error::new_spanned(
                v.ident,
                "model_error variants with a source need `context: Option<Cow<'static, str>>`",
            ));
        }
        if !seen.insert(quote!(#ty).to_string()) {
            return Err(syn::Error::new_spanned(ty, "model_error allows each source type in only one variant"));
        }
    }
    Ok(())
}

/// `#[derive(Debug, thiserror::Error)]`, minus whatever the enum already derives.
fn missing_derives(input: &DeriveInput) -> TokenStream {
    let mut derived = FxHashSet::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let Ok(paths) = attr.parse_args_with(Punctuated::<Path, Token![,]>::parse_terminated) else {
            continue;
        };
        derived.extend(paths.iter().filter_map(|p| p.segments.last()).map(|s| s.ident.to_string()));
    }

    let mut missing = Vec::new();
    if !derived.contains("Debug") {
        missing.push(quote!(Debug));
    }
    if !derived.contains("Error") {
        missing.push(quote!(::thiserror::Error));
    }
    if missing.is_empty() { quote!() } else { quote!(#[derive(#(#missing),*)]) }
}

fn kind_impl(name: &Ident, variants: &[ErrorVariant<'_>]) -> TokenStream {
    let arms = variants.iter().map(|v| {
        let (cfg, ident) = (&v.cfg, v.ident);
        let label = ident.to_string();
        quote! { #(#cfg)* Self::#ident { .. } => #label, }
    });

    quote! {
        #[automatically_derived]
        impl #name {
            /// Variant name, for the `kind` field of log events.
            #[must_use]
            pub const fn kind(&self) -> &'static str {
                match self {
                    #(#arms)*
                }
            }
        }
    }
}

fn context_trait(name: &Ident, ext: &Ident, variants: &[ErrorVariant<'_>]) -> TokenStream {
    let arms = variants.iter().filter(|v| v.has_context).map(|v| {
        let (cfg, ident) = (&v.cfg, v.ident);
        quote! { #(#cfg)* #name::#ident { context: slot, .. } => *slot = Some(context.into()), }
    });

    quote! {
        pub trait #ext<T> {
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
        }

        #[automatically_derived]
        impl<T> #ext<T> for Result<T, #name> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                self.map_err(|mut err| {
                    match &mut err {
                        #(#arms)*
                        _ => {}
                    }
                    err
                })
            }
        }
    }
}

/// `From<Source>` plus `.context()` on `Result<T, Source>` for a variant wrapping an
/// upstream error. Variants without a source get no conversions.
fn source_impls(name: &Ident, ext: &Ident, v: &ErrorVariant<'_>) -> Option<TokenStream> {
    let (ty, field) = v.source?;
    let (cfg, ident) = (&v.cfg, v.ident);

    Some(quote! {
        #(#cfg)*
        #[automatically_derived]
        impl From<#ty> for #name {
            #[inline]
            fn from(#field: #ty) -> Self {
                Self::#ident { #field, context: None }
            }
        }

        #(#cfg)*
        impl<T> #ext<T> for std::result::Result<T, #ty> {
            #[inline]
            fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> std::result::Result<T, #name> {
                self.map_err(|#field| #name::#ident { #field, context: Some(context.into()) })
            }
        }
    })
}

/// Generic arguments of `ty` when its last path segment is `name`.
fn generic_args<'a>(ty: &'a Type, name: &str) -> Option<Vec<&'a GenericArgument>> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last().filter(|s| s.ident == name)?;
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => Some(args.args.iter().collect()),
        _ => None,
    }
}

/// `Option<Cow<'static, str>>`, with or without path prefixes.
fn is_context_type(ty: &Type) -> bool {
    let Some(outer) = generic_args(ty, "Option") else { return false };
    let [GenericArgument::Type(cow)] = outer.as_slice() else { return false };
    let Some(inner) = generic_args(cow, "Cow") else { return false };
    matches!(
        inner.as_slice(),
        [GenericArgument::Lifetime(lt), GenericArgument::Type(Type::Path(text))]
            if lt.ident == "static" && text.path.is_ident("str")
    )
}
