//! `#[derive(Model)]` for shapewire.
//!
//! The derive emits the `Model`, `Shape`, `ObjectSlot` and `ObjectView` impls for a struct:
//! a `const` field table in declaration order, the key-sorted lookup order, and the
//! decorations parsed from `#[wire(...)]` attributes.
//!
//! Struct attributes: `allow_excess_fields`, `indexes_as_keys`, `as_array`, `skip_nulls`,
//! `matcher = "buffered" | "incremental"`, `required_fields(..)`, `not_required_fields(..)`,
//! `forbidden_fields(..)`, `check = path`.
//!
//! Field attributes: `rename = "..."`, `key = N`, `required`, `not_required`, `skip`,
//! `exclude`, `recursive`, `float_decimals = N`, `items(..)`, `values(..)`, and the validators
//! `range(min, max)`, `min_length`, `max_length`, `min_items`, `max_items`, `min_properties`,
//! `max_properties`, `min_key_length`, `max_key_length`, `constant = lit`, `enum_values(..)`,
//! `allowed_keys(..)`, `forbidden_keys(..)`, `required_keys(..)`, `check = path`.

extern crate proc_macro;

mod attrs;
mod model;
mod types;

use proc_macro::TokenStream;
use syn::{parse_macro_input, Data, DeriveInput};

#[proc_macro_derive(Model, attributes(wire))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let out = match &input.data {
        Data::Struct(data) => {
            model::derive_struct(&input.ident, &input.generics, &input.attrs, data)
                .unwrap_or_else(syn::Error::into_compile_error)
        }
        Data::Enum(e) => model::unsupported(e.enum_token.span, "enums"),
        Data::Union(u) => model::unsupported(u.union_token.span, "unions"),
    };
    TokenStream::from(out)
}
