//! Implementation of `#[handler]`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Error, Expr, FnArg, GenericArgument, Ident, ImplItem, ItemImpl, LitStr, Pat,
    PathArguments, Signature, Token, Type,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments for the `#[handler]` macro.
pub(crate) struct HandlerArgs {
    pub name: Option<String>,
    pub register: bool,
}

impl Parse for HandlerArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;
        let mut register = false;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;

            match ident.to_string().as_str() {
                "name" => {
                    input.parse::<Token![=]>()?;
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
                }
                "register" => register = true,
                other => {
                    return Err(Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(HandlerArgs { name, register })
    }
}

#[derive(Default)]
struct MethodOptions {
    name: Option<String>,
    skip: bool,
}

struct Param {
    ty: Type,
    descriptor: TokenStream2,
}

struct Callable {
    ident: Ident,
    params: Vec<Param>,
}

/// Implementation of the `#[handler]` macro.
pub fn handler_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as HandlerArgs);
    let input = parse_macro_input!(item as ItemImpl);

    expand(args, input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand(args: HandlerArgs, mut input: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(Error::new_spanned(
            path,
            "#[handler] must be placed on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "generic handlers are not supported",
        ));
    }

    let self_ty = (*input.self_ty).clone();
    let type_name = match &self_ty {
        Type::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
    .ok_or_else(|| Error::new_spanned(&self_ty, "expected a named type"))?;
    let handler_name = args.name.unwrap_or(type_name);

    let mut constructor: Option<Callable> = None;
    let mut methods: Vec<(String, Callable)> = Vec::new();

    for item in &mut input.items {
        let ImplItem::Fn(function) = item else {
            continue;
        };

        let is_constructor = take_marker(&mut function.attrs, "constructor");
        let options = take_method_options(&mut function.attrs)?;
        let params = take_params(&mut function.sig)?;
        let callable = Callable {
            ident: function.sig.ident.clone(),
            params,
        };

        if is_constructor {
            if function.sig.receiver().is_some() {
                return Err(Error::new_spanned(
                    &function.sig,
                    "a #[constructor] must not take self",
                ));
            }
            if constructor.is_some() {
                return Err(Error::new_spanned(
                    &function.sig,
                    "only one #[constructor] is allowed",
                ));
            }
            constructor = Some(callable);
            continue;
        }

        if options.skip {
            continue;
        }

        match function.sig.receiver() {
            Some(receiver) if receiver.reference.is_some() => {}
            Some(receiver) => {
                return Err(Error::new_spanned(
                    receiver,
                    "handler methods must take &self or &mut self",
                ));
            }
            None => continue,
        }

        let name = options
            .name
            .unwrap_or_else(|| callable.ident.to_string());
        methods.push((name, callable));
    }

    let base = match &constructor {
        Some(callable) => {
            let descriptors = callable.params.iter().map(|p| &p.descriptor);
            let args = arg_idents(callable.params.len());
            let tys = callable.params.iter().map(|p| &p.ty);
            let ident = &callable.ident;
            quote! {
                ::rivet::HandlerDefinition::new(
                    #handler_name,
                    ::std::vec![#(#descriptors),*],
                    |#(#args: #tys),*| Self::#ident(#(#args),*),
                )
            }
        }
        None => quote! {
            ::rivet::HandlerDefinition::from_default(#handler_name)
        },
    };

    let method_calls = methods.iter().map(|(name, callable)| {
        let descriptors = callable.params.iter().map(|p| &p.descriptor);
        let args = arg_idents(callable.params.len());
        let tys = callable.params.iter().map(|p| &p.ty);
        let ident = &callable.ident;
        quote! {
            .method(
                #name,
                ::std::vec![#(#descriptors),*],
                |__this: &mut Self, #(#args: #tys),*| Self::#ident(__this, #(#args),*),
            )
        }
    });

    let registration = args.register.then(|| {
        quote! {
            const _: () = {
                fn __rivet_definition() -> ::std::sync::Arc<dyn ::rivet::DynHandler> {
                    <#self_ty as ::rivet::Injectable>::definition().into_dyn()
                }

                ::rivet::inventory::submit! {
                    ::rivet::HandlerRegistration::new(#handler_name, __rivet_definition)
                }
            };
        }
    });

    Ok(quote! {
        #input

        impl ::rivet::Injectable for #self_ty {
            fn definition() -> ::rivet::HandlerDefinition<Self> {
                #base
                #(#method_calls)*
            }
        }

        #registration
    })
}

fn arg_idents(count: usize) -> Vec<Ident> {
    (0..count).map(|i| format_ident!("__arg{}", i)).collect()
}

/// Remove a bare marker attribute such as `#[constructor]`.
fn take_marker(attrs: &mut Vec<Attribute>, marker: &str) -> bool {
    let before = attrs.len();
    attrs.retain(|attr| !attr.path().is_ident(marker));
    attrs.len() != before
}

fn take_method_options(attrs: &mut Vec<Attribute>) -> syn::Result<MethodOptions> {
    let mut options = MethodOptions::default();
    let (ours, others): (Vec<_>, Vec<_>) = attrs
        .drain(..)
        .partition(|attr| attr.path().is_ident("method"));
    *attrs = others;

    for attr in ours {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
                Ok(())
            } else if meta.path.is_ident("name") {
                options.name = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("expected `skip` or `name = \"...\"`"))
            }
        })?;
    }
    Ok(options)
}

/// Strip `#[param(...)]` attributes and build a descriptor per parameter.
fn take_params(sig: &mut Signature) -> syn::Result<Vec<Param>> {
    let mut params = Vec::new();

    for input in sig.inputs.iter_mut() {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };

        let (ours, others): (Vec<_>, Vec<_>) = pat_type
            .attrs
            .drain(..)
            .partition(|attr| attr.path().is_ident("param"));
        pat_type.attrs = others;

        let mut rename = None;
        let mut default: Option<Expr> = None;
        for attr in ours {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    rename = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else if meta.path.is_ident("default") {
                    default = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"` or `default = ...`"))
                }
            })?;
        }

        let name = match (rename, &*pat_type.pat) {
            (Some(name), _) => name,
            (None, Pat::Ident(pat)) => pat.ident.unraw().to_string(),
            (None, pat) => {
                return Err(Error::new_spanned(
                    pat,
                    "use #[param(name = \"...\")] to name a destructured parameter",
                ));
            }
        };

        params.push(Param {
            descriptor: descriptor_tokens(&name, &pat_type.ty, default.as_ref()),
            ty: (*pat_type.ty).clone(),
        });
    }

    Ok(params)
}

fn descriptor_tokens(name: &str, ty: &Type, default: Option<&Expr>) -> TokenStream2 {
    let (inner, optional) = match wrapped(ty, "Option") {
        Some(inner) => (inner, true),
        None => (ty, false),
    };

    let mut tokens = match wrapped(inner, "Arc") {
        Some(declared) => quote! { ::rivet::ParameterDescriptor::typed::<#declared>(#name) },
        None => quote! { ::rivet::ParameterDescriptor::named(#name) },
    };

    if let Some(default) = default {
        tokens = quote! { #tokens.with_default(#default) };
    } else if optional {
        tokens = quote! { #tokens.optional() };
    }
    tokens
}

/// The `T` of `Wrapper<T>`, matched on the last path segment.
fn wrapped<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    if path.qself.is_some() {
        return None;
    }
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn render(tokens: TokenStream2) -> String {
        tokens.to_string().split_whitespace().collect()
    }

    #[test]
    fn test_descriptor_classification() {
        let arc: Type = parse_quote!(Arc<Service>);
        assert_eq!(
            render(descriptor_tokens("service", &arc, None)),
            render(quote! { ::rivet::ParameterDescriptor::typed::<Service>("service") })
        );

        let optional_arc: Type = parse_quote!(Option<std::sync::Arc<dyn Greeter>>);
        assert_eq!(
            render(descriptor_tokens("greeter", &optional_arc, None)),
            render(quote! {
                ::rivet::ParameterDescriptor::typed::<dyn Greeter>("greeter").optional()
            })
        );

        let optional: Type = parse_quote!(Option<i64>);
        assert_eq!(
            render(descriptor_tokens("page", &optional, None)),
            render(quote! { ::rivet::ParameterDescriptor::named("page").optional() })
        );

        let scalar: Type = parse_quote!(i64);
        let default: Expr = parse_quote!(317);
        assert_eq!(
            render(descriptor_tokens("id", &scalar, Some(&default))),
            render(quote! { ::rivet::ParameterDescriptor::named("id").with_default(317) })
        );
    }

    #[test]
    fn test_params_are_named_and_stripped() {
        let mut sig: Signature = parse_quote! {
            fn some_action(&self, r#type: String, #[param(name = "baseUrl")] base_url: String)
        };
        let params = take_params(&mut sig).unwrap();

        assert_eq!(params.len(), 2);
        assert!(render(params[0].descriptor.clone()).contains("named(\"type\")"));
        assert!(render(params[1].descriptor.clone()).contains("named(\"baseUrl\")"));
        for input in &sig.inputs {
            if let FnArg::Typed(pat_type) = input {
                assert!(pat_type.attrs.is_empty());
            }
        }
    }

    #[test]
    fn test_trait_impls_rejected() {
        let input: ItemImpl = parse_quote! {
            impl Default for Controller {
                fn default() -> Self { Controller }
            }
        };
        let args = HandlerArgs {
            name: None,
            register: false,
        };
        assert!(expand(args, input).is_err());
    }

    #[test]
    fn test_method_options() {
        let input: ItemImpl = parse_quote! {
            impl Controller {
                #[method(name = "someAction")]
                fn some_action(&self) -> bool { true }

                #[method(skip)]
                fn helper(&self) {}

                fn by_value(self) {}
            }
        };
        let args = HandlerArgs {
            name: Some("App".into()),
            register: false,
        };
        let err = expand(args, input).unwrap_err();
        assert!(err.to_string().contains("&self or &mut self"));
    }
}
