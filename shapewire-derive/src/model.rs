use std::collections::BTreeSet;

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{parse_quote, spanned::Spanned, DataStruct, Fields, Generics, Ident, Index, Member, Type};

use crate::attrs::{decorations_expr, parse_wire_field_attrs, parse_wire_struct_attrs, WireFieldAttr};
use crate::types::{type_mentions_self, type_name};

struct FieldPlan<'a> {
    member: Member,
    name: String,
    ty: &'a Type,
    attr: WireFieldAttr,
    recursive: bool,
}

enum Key {
    Name(String),
    Index(u64),
}

fn plan_fields<'a>(name: &Ident, data: &'a DataStruct) -> syn::Result<Vec<FieldPlan<'a>>> {
    let mut out = Vec::new();
    let fields: Vec<_> = match &data.fields {
        Fields::Named(f) => f.named.iter().collect(),
        Fields::Unnamed(f) => f.unnamed.iter().collect(),
        Fields::Unit => Vec::new(),
    };
    for (i, field) in fields.into_iter().enumerate() {
        let attr = parse_wire_field_attrs(&field.attrs)?;
        let (member, field_name) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (
                Member::Unnamed(Index {
                    index: u32::try_from(i).unwrap_or(u32::MAX),
                    span: field.span(),
                }),
                i.to_string(),
            ),
        };
        let recursive = attr.recursive || type_mentions_self(&field.ty, name);
        out.push(FieldPlan {
            member,
            name: field_name,
            ty: &field.ty,
            attr,
            recursive,
        });
    }
    Ok(out)
}

/// Resolve wire keys: integer keys auto-increment from the previous one when any field of an
/// index-keyed object leaves its key out.
fn assign_keys(fields: &[FieldPlan<'_>], indexed: bool) -> syn::Result<Vec<Key>> {
    let indexed = indexed || fields.iter().any(|f| f.attr.key.is_some());
    let mut next = 0u64;
    let mut keys = Vec::with_capacity(fields.len());
    let mut seen_names = BTreeSet::new();
    let mut seen_indexes = BTreeSet::new();
    for f in fields {
        let key = if indexed {
            if f.attr.rename.is_some() {
                return Err(syn::Error::new(
                    f.ty.span(),
                    "`wire(rename)` is not allowed on an integer-keyed object",
                ));
            }
            let k = f.attr.key.unwrap_or(next);
            next = k.saturating_add(1);
            Key::Index(k)
        } else {
            Key::Name(
                f.attr
                    .rename
                    .as_ref()
                    .map_or_else(|| f.name.clone(), syn::LitStr::value),
            )
        };
        if !f.attr.exclude {
            let fresh = match &key {
                Key::Name(n) => seen_names.insert(n.clone()),
                Key::Index(k) => seen_indexes.insert(*k),
            };
            if !fresh {
                return Err(syn::Error::new(f.ty.span(), "duplicate wire key"));
            }
        }
        keys.push(key);
    }
    Ok(keys)
}

fn field_decorations(attr: &WireFieldAttr, key: &Key) -> TokenStream {
    let mut list = Vec::new();
    if let Some(rename) = &attr.rename {
        list.push(quote!(::shapewire::Decoration::Rename(#rename)));
    }
    if let (Some(_), Key::Index(k)) = (attr.key, key) {
        list.push(quote!(::shapewire::Decoration::Key(#k)));
    }
    if attr.required {
        list.push(quote!(::shapewire::Decoration::Required));
    }
    if attr.not_required {
        list.push(quote!(::shapewire::Decoration::NotRequired));
    }
    if attr.skip {
        list.push(quote!(::shapewire::Decoration::Skip));
    }
    if attr.exclude {
        list.push(quote!(::shapewire::Decoration::Exclude));
    }
    list.extend(attr.decos.decorations.iter().cloned());
    decorations_expr(&list)
}

pub(crate) fn derive_struct(
    name: &Ident,
    generics: &Generics,
    attrs: &[syn::Attribute],
    data: &DataStruct,
) -> syn::Result<TokenStream> {
    let sattr = parse_wire_struct_attrs(attrs)?;
    let fields = plan_fields(name, data)?;
    let keys = assign_keys(&fields, sattr.indexes_as_keys)?;

    let mut type_list = Vec::new();
    if sattr.allow_excess_fields {
        type_list.push(quote!(::shapewire::Decoration::AllowExcessFields));
    }
    if sattr.indexes_as_keys {
        type_list.push(quote!(::shapewire::Decoration::IndexesAsKeys));
    }
    if sattr.as_array {
        type_list.push(quote!(::shapewire::Decoration::AsArray));
    }
    if sattr.skip_nulls {
        type_list.push(quote!(::shapewire::Decoration::SkipNulls));
    }
    if let Some(m) = &sattr.matcher {
        let kind = if m.value() == "buffered" {
            quote!(Buffered)
        } else {
            quote!(Incremental)
        };
        type_list.push(quote!(::shapewire::Decoration::Matcher(::shapewire::MatcherKind::#kind)));
    }
    type_list.extend(sattr.decos.decorations.iter().cloned());
    let type_decorations = decorations_expr(&type_list);

    let infos = fields.iter().zip(&keys).map(|(f, key)| {
        let ty = f.ty;
        let fname = &f.name;
        let tname = type_name(ty);
        let wire_key = match key {
            Key::Name(n) => quote!(::shapewire::WireKey::Name(#n)),
            Key::Index(k) => quote!(::shapewire::WireKey::Index(#k)),
        };
        let decos = field_decorations(&f.attr, key);
        quote!(::shapewire::FieldInfo::of::<#ty>(#fname, #tname, #wire_key, #decos))
    });

    let depth = if fields.iter().any(|f| f.recursive) {
        quote!(::shapewire::Depth::Unbounded)
    } else {
        let tys = fields.iter().map(|f| f.ty);
        quote!(::shapewire::Depth::SCALAR #(.max(<#tys as ::shapewire::Model>::DEPTH))* .nested())
    };

    let indexes: Vec<usize> = (0..fields.len()).collect();
    let members: Vec<&Member> = fields.iter().map(|f| &f.member).collect();
    let count = fields.len();
    let type_label = name.to_string();

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let mut where_clause = where_clause.cloned();
    if !generics.params.is_empty() {
        let wc = where_clause.get_or_insert_with(|| syn::WhereClause {
            where_token: Default::default(),
            predicates: Default::default(),
        });
        // Recursive fields would make the bound cyclic.
        wc.predicates.extend(
            fields
                .iter()
                .filter(|f| !f.recursive)
                .map(|f| -> syn::WherePredicate {
                    let ty = f.ty;
                    parse_quote!(#ty: ::shapewire::Model)
                }),
        );
    }

    Ok(quote! {
        impl #impl_generics ::shapewire::Model for #name #ty_generics #where_clause {
            const CATEGORY: ::shapewire::Category = ::shapewire::Category::Object;
            const DEPTH: ::shapewire::Depth = #depth;

            fn node_mut(&mut self) -> ::shapewire::NodeMut<'_> {
                ::shapewire::NodeMut::Object(self)
            }

            fn node(&self) -> ::shapewire::NodeRef<'_> {
                ::shapewire::NodeRef::Object(self)
            }
        }

        impl #impl_generics ::shapewire::Shape for #name #ty_generics #where_clause {
            const NAME: &'static str = #type_label;
            const FIELDS: &'static [::shapewire::FieldInfo] = &[#(#infos),*];
            const ORDER: &'static [u16] =
                &::shapewire::introspect::sorted_order::<#count>(<Self as ::shapewire::Shape>::FIELDS);
            const DECORATIONS: ::shapewire::Decorations = #type_decorations;
            const SCHEMA: &'static ::shapewire::ObjectSchema = &::shapewire::ObjectSchema::new(
                <Self as ::shapewire::Shape>::NAME,
                <Self as ::shapewire::Shape>::FIELDS,
                <Self as ::shapewire::Shape>::ORDER,
                <Self as ::shapewire::Shape>::DECORATIONS,
            );
        }

        impl #impl_generics ::shapewire::ObjectSlot for #name #ty_generics #where_clause {
            fn schema(&self) -> &'static ::shapewire::ObjectSchema {
                <Self as ::shapewire::Shape>::SCHEMA
            }

            fn field_mut(&mut self, index: usize) -> Option<::shapewire::NodeMut<'_>> {
                match index {
                    #(#indexes => Some(::shapewire::Model::node_mut(&mut self.#members)),)*
                    _ => None,
                }
            }
        }

        impl #impl_generics ::shapewire::ObjectView for #name #ty_generics #where_clause {
            fn schema(&self) -> &'static ::shapewire::ObjectSchema {
                <Self as ::shapewire::Shape>::SCHEMA
            }

            fn field(&self, index: usize) -> Option<::shapewire::NodeRef<'_>> {
                match index {
                    #(#indexes => Some(::shapewire::Model::node(&self.#members)),)*
                    _ => None,
                }
            }
        }
    })
}

pub(crate) fn unsupported(span: Span, what: &str) -> TokenStream {
    syn::Error::new(span, format!("`Model` cannot be derived for {what}; use a struct"))
        .to_compile_error()
}
