//! `#[opjson_testhelpers::test]`: a `#[test]` that installs logging first.

use proc_macro2::{Delimiter, Group, TokenStream, TokenTree};
use quote::quote;

/// Marks a test function and runs `opjson_testhelpers::setup()` before its
/// body.
///
/// An argument replaces the test attribute, e.g.
/// `#[opjson_testhelpers::test(some_runtime::test)]`.
///
/// ```ignore
/// use opjson_testhelpers::test;
///
/// #[test]
/// fn encodes() {}
/// ```
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let attr = TokenStream::from(attr);
    let mut tokens: Vec<TokenTree> = TokenStream::from(item).into_iter().collect();

    let is_fn = tokens
        .iter()
        .any(|tt| matches!(tt, TokenTree::Ident(ident) if ident == "fn"));
    // the body is the last top-level brace group
    let body = tokens.iter().enumerate().rev().find_map(|(index, tt)| match tt {
        TokenTree::Group(group) if group.delimiter() == Delimiter::Brace => {
            Some((index, group.clone()))
        }
        _ => None,
    });
    let (true, Some((body, original))) = (is_fn, body) else {
        return quote! {
            ::core::compile_error!("#[opjson_testhelpers::test] expects a function with a body");
        }
        .into();
    };

    let inner = original.stream();
    let mut wrapped = Group::new(
        Delimiter::Brace,
        quote! {
            ::opjson_testhelpers::setup();

            #inner
        },
    );
    wrapped.set_span(original.span());
    tokens[body] = TokenTree::Group(wrapped);

    let test_attr = if attr.is_empty() {
        quote! { #[::core::prelude::rust_2024::test] }
    } else {
        quote! { #[#attr] }
    };
    let item: TokenStream = tokens.into_iter().collect();

    quote! {
        #test_attr
        #item
    }
    .into()
}
