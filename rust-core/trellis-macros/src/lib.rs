//! # Trellis Macros
//!
//! Procedural macros for the Trellis framework.
//!
//! - `#[controller]` turns an inherent `impl` block into a route table
//!   (an implementation of `trellis_core::controller::Controller`)

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, ToTokens};
use syn::{
    parse_macro_input, FnArg, GenericArgument, ImplItem, ImplItemFn, ItemImpl, Pat, PathArguments,
    ReturnType, Type, Visibility,
};

/// Derive a controller route table from an `impl` block
///
/// Every `pub fn` taking `&self` becomes an action, in declaration order.
/// The method name gives the HTTP method and the path words, each argument
/// a path placeholder. `Option<T>` arguments are optional placeholders.
/// Argument types must implement `From<&str>`; all actions must share one
/// return type.
///
/// ```ignore
/// struct Users;
///
/// #[controller]
/// impl Users {
///     pub fn get_index(&self) -> String { "list".into() }
///     pub fn get_show(&self, id: String) -> String { id }
///     pub fn get_page(&self, page: Option<String>) -> String { page.unwrap_or_default() }
/// }
///
/// router.class_name("/users", &Users, None)?;
/// ```
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[controller] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let item = parse_macro_input!(item as ItemImpl);
    expand(item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct ActionSpec {
    name: String,
    ident: syn::Ident,
    args: Vec<ArgSpec>,
    output: Type,
}

struct ArgSpec {
    name: String,
    optional: bool,
}

fn expand(item: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[controller] expects an inherent impl block",
        ));
    }

    let actions = item
        .items
        .iter()
        .filter_map(|i| match i {
            ImplItem::Fn(f) if is_action(f) => Some(action_spec(f)),
            _ => None,
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let output = actions
        .first()
        .map_or_else(|| syn::parse_quote!(()), |a| a.output.clone());

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let list = actions.iter().map(|a| {
        let name = &a.name;
        let params = a.args.iter().map(|arg| {
            let pname = &arg.name;
            if arg.optional {
                quote!(::trellis_core::controller::Param::optional(#pname))
            } else {
                quote!(::trellis_core::controller::Param::required(#pname))
            }
        });
        quote! {
            ::trellis_core::controller::Action::new(#name, ::std::vec![#(#params),*])
        }
    });

    let arms = actions.iter().map(|a| {
        let name = &a.name;
        let ident = &a.ident;
        let values = a.args.iter().enumerate().map(|(i, arg)| {
            if arg.optional {
                quote!(args.get(#i).copied().flatten().map(::core::convert::Into::into))
            } else {
                quote!(::core::convert::Into::into(
                    args.get(#i).copied().flatten().unwrap_or_default()
                ))
            }
        });
        quote! {
            #name => ::core::option::Option::Some(self.#ident(#(#values),*)),
        }
    });

    Ok(quote! {
        #item

        impl #impl_generics ::trellis_core::controller::Controller<#output> for #self_ty #where_clause {
            fn actions(&self) -> ::std::vec::Vec<::trellis_core::controller::Action> {
                ::std::vec![#(#list),*]
            }

            #[allow(unused_variables)]
            fn invoke(
                &self,
                action: &str,
                args: &[::core::option::Option<&str>],
            ) -> ::core::option::Option<#output> {
                match action {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

/// `pub fn` with a `&self` receiver
fn is_action(f: &ImplItemFn) -> bool {
    matches!(f.vis, Visibility::Public(_))
        && matches!(
            f.sig.inputs.first(),
            Some(FnArg::Receiver(r)) if r.reference.is_some() && r.mutability.is_none()
        )
}

fn action_spec(f: &ImplItemFn) -> syn::Result<ActionSpec> {
    let args = f
        .sig
        .inputs
        .iter()
        .skip(1)
        .map(|input| match input {
            FnArg::Typed(pat) => arg_spec(&pat.pat, &pat.ty),
            FnArg::Receiver(r) => Err(syn::Error::new_spanned(r, "unexpected receiver")),
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let output = match &f.sig.output {
        ReturnType::Default => syn::parse_quote!(()),
        ReturnType::Type(_, ty) => (**ty).clone(),
    };

    Ok(ActionSpec {
        name: f.sig.ident.to_string(),
        ident: f.sig.ident.clone(),
        args,
        output,
    })
}

fn arg_spec(pat: &Pat, ty: &Type) -> syn::Result<ArgSpec> {
    let Pat::Ident(ident) = pat else {
        return Err(syn::Error::new_spanned(
            pat.to_token_stream(),
            "controller action arguments must be plain identifiers",
        ));
    };

    Ok(ArgSpec {
        name: ident.ident.to_string().trim_start_matches('_').to_string(),
        optional: is_option(ty),
    })
}

fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    let Some(last) = path.path.segments.last() else {
        return false;
    };

    last.ident == "Option"
        && matches!(
            &last.arguments,
            PathArguments::AngleBracketed(a)
                if matches!(a.args.first(), Some(GenericArgument::Type(_)))
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_collects_public_ref_self_methods() {
        let item: ItemImpl = parse_quote! {
            impl Users {
                pub fn get_index(&self) -> String { String::new() }
                pub fn get_show(&self, id: String) -> String { id }
                fn helper(&self) -> String { String::new() }
                pub fn new() -> Self { Users }
                pub fn post_reset(&mut self) -> String { String::new() }
            }
        };

        let out = expand(item).unwrap().to_string();
        assert!(out.contains("\"get_index\""));
        assert!(out.contains("\"get_show\""));
        assert!(!out.contains("\"helper\""));
        assert!(!out.contains("\"new\""));
        assert!(!out.contains("\"post_reset\""));
        assert!(out.contains("Controller < String > for Users"));
    }

    #[test]
    fn test_optional_and_underscored_arguments() {
        let item: ItemImpl = parse_quote! {
            impl Pages {
                pub fn get_page(&self, _size: String, page: Option<String>) {}
            }
        };

        let out = expand(item).unwrap().to_string();
        assert!(out.contains("Param :: required (\"size\")"));
        assert!(out.contains("Param :: optional (\"page\")"));
        assert!(out.contains("Controller < () > for Pages"));
    }

    #[test]
    fn test_rejects_trait_impls() {
        let item: ItemImpl = parse_quote! {
            impl Default for Users {
                fn default() -> Self { Users }
            }
        };
        assert!(expand(item).is_err());
    }

    #[test]
    fn test_rejects_destructured_arguments() {
        let item: ItemImpl = parse_quote! {
            impl Users {
                pub fn get_pair(&self, (a, b): (String, String)) -> String { a + &b }
            }
        };
        assert!(expand(item).is_err());
    }

    #[test]
    fn test_is_option() {
        assert!(is_option(&parse_quote!(Option<String>)));
        assert!(is_option(&parse_quote!(std::option::Option<String>)));
        assert!(!is_option(&parse_quote!(String)));
        assert!(!is_option(&parse_quote!(Vec<String>)));
    }
}
