use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::{
    meta::ParseNestedMeta, punctuated::Punctuated, spanned::Spanned, Attribute, Expr, ExprLit,
    ExprUnary, Lit, LitInt, LitStr, Token, UnOp,
};

/// Decorations that may appear on fields, on `items(...)`/`values(...)`, and (for the
/// validators) on the struct itself.
#[derive(Default)]
pub(crate) struct DecoList {
    pub(crate) decorations: Vec<TokenStream>,
    float_decimals: bool,
    items: bool,
    values: bool,
}

#[derive(Default)]
pub(crate) struct WireFieldAttr {
    pub(crate) rename: Option<LitStr>,
    pub(crate) key: Option<u64>,
    pub(crate) required: bool,
    pub(crate) not_required: bool,
    pub(crate) skip: bool,
    pub(crate) exclude: bool,
    pub(crate) recursive: bool,
    pub(crate) decos: DecoList,
}

#[derive(Default)]
pub(crate) struct WireStructAttr {
    pub(crate) allow_excess_fields: bool,
    pub(crate) indexes_as_keys: bool,
    pub(crate) as_array: bool,
    pub(crate) skip_nulls: bool,
    pub(crate) matcher: Option<LitStr>,
    pub(crate) decos: DecoList,
}

fn flag(meta: &ParseNestedMeta<'_>, slot: &mut bool, name: &str) -> syn::Result<()> {
    if *slot {
        return Err(meta.error(format!("duplicate `wire({name})`")));
    }
    *slot = true;
    Ok(())
}

fn str_list(meta: &ParseNestedMeta<'_>) -> syn::Result<Vec<LitStr>> {
    let content;
    syn::parenthesized!(content in meta.input);
    let list = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
    Ok(list.into_iter().collect())
}

fn usize_value(meta: &ParseNestedMeta<'_>) -> syn::Result<usize> {
    let lit: LitInt = meta.value()?.parse()?;
    lit.base10_parse()
}

/// A numeric literal, optionally negated.
enum Number {
    Int(i128),
    Float(f64),
}

fn number(expr: &Expr) -> syn::Result<Number> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Int(lit), ..
        }) => Ok(Number::Int(lit.base10_parse()?)),
        Expr::Lit(ExprLit {
            lit: Lit::Float(lit),
            ..
        }) => {
            let v: f64 = lit.base10_parse()?;
            if !v.is_finite() {
                return Err(syn::Error::new(lit.span(), "NaN and infinite bounds are not allowed"));
            }
            Ok(Number::Float(v))
        }
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => Ok(match number(expr)? {
            Number::Int(v) => Number::Int(-v),
            Number::Float(v) => Number::Float(-v),
        }),
        Expr::Group(g) => number(&g.expr),
        Expr::Paren(p) => number(&p.expr),
        _ => Err(syn::Error::new(expr.span(), "expected a numeric literal")),
    }
}

fn limit(expr: &Expr) -> syn::Result<TokenStream> {
    Ok(match number(expr)? {
        Number::Int(v) => {
            if let Ok(v) = i64::try_from(v) {
                quote!(::shapewire::Limit::Int(#v))
            } else if let Ok(v) = u64::try_from(v) {
                quote!(::shapewire::Limit::Uint(#v))
            } else {
                return Err(syn::Error::new(expr.span(), "bound does not fit in 64 bits"));
            }
        }
        Number::Float(v) => quote!(::shapewire::Limit::Float(#v)),
    })
}

fn constant(expr: &Expr) -> syn::Result<TokenStream> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Bool(b), ..
        }) => {
            let v = b.value;
            Ok(quote!(::shapewire::Constant::Bool(#v)))
        }
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(quote!(::shapewire::Constant::Str(#s))),
        _ => Ok(match number(expr)? {
            Number::Int(v) => {
                if let Ok(v) = i64::try_from(v) {
                    quote!(::shapewire::Constant::Int(#v))
                } else if let Ok(v) = u64::try_from(v) {
                    quote!(::shapewire::Constant::Uint(#v))
                } else {
                    return Err(syn::Error::new(expr.span(), "constant does not fit in 64 bits"));
                }
            }
            Number::Float(v) => quote!(::shapewire::Constant::Float(#v)),
        }),
    }
}

fn validator(v: TokenStream) -> TokenStream {
    quote!(::shapewire::Decoration::Validate(::shapewire::Validator::#v))
}

fn strs(list: &[LitStr]) -> TokenStream {
    quote!(&[#(#list),*])
}

/// `const`-evaluable `Decorations` for a token list.
pub(crate) fn decorations_expr(list: &[TokenStream]) -> TokenStream {
    quote! {{
        const LIST: &[::shapewire::Decoration] = &[#(#list),*];
        ::shapewire::Decorations::new(LIST)
    }}
}

impl DecoList {
    /// Try to consume one value decoration; `Ok(false)` if `meta` is not one.
    pub(crate) fn parse(&mut self, meta: &ParseNestedMeta<'_>) -> syn::Result<bool> {
        let Some(ident) = meta.path.get_ident() else {
            return Ok(false);
        };
        let name = ident.to_string();
        let deco = match name.as_str() {
            "range" => {
                let content;
                syn::parenthesized!(content in meta.input);
                let args = Punctuated::<Expr, Token![,]>::parse_terminated(&content)?;
                if args.len() != 2 {
                    return Err(meta.error("expected `range(min, max)`"));
                }
                let min = limit(&args[0])?;
                let max = limit(&args[1])?;
                validator(quote!(Range { min: #min, max: #max }))
            }
            "min_length" | "max_length" | "min_items" | "max_items" | "min_properties"
            | "max_properties" | "min_key_length" | "max_key_length" => {
                let n = usize_value(meta)?;
                let variant = syn::Ident::new(&camel(&name), ident.span());
                validator(quote!(#variant(#n)))
            }
            "enum_values" | "allowed_keys" | "forbidden_keys" | "required_keys"
            | "required_fields" | "not_required_fields" | "forbidden_fields" => {
                let list = strs(&str_list(meta)?);
                let variant = syn::Ident::new(&camel(&name), ident.span());
                validator(quote!(#variant(#list)))
            }
            "constant" => {
                let expr: Expr = meta.value()?.parse()?;
                let c = constant(&expr)?;
                validator(quote!(Constant(#c)))
            }
            "check" => {
                let path: syn::Path = meta.value()?.parse()?;
                let label = path
                    .segments
                    .last()
                    .map(|s| s.ident.to_string())
                    .unwrap_or_default();
                validator(quote!(Custom {
                    name: #label,
                    check: ::shapewire::UserCheck(#path),
                }))
            }
            "float_decimals" => {
                flag(meta, &mut self.float_decimals, "float_decimals")?;
                let lit: LitInt = meta.value()?.parse()?;
                let n: u8 = lit.base10_parse()?;
                quote!(::shapewire::Decoration::FloatDecimals(#n))
            }
            "items" | "values" => {
                let seen = if name == "items" {
                    &mut self.items
                } else {
                    &mut self.values
                };
                flag(meta, seen, &name)?;
                let mut inner = DecoList::default();
                meta.parse_nested_meta(|m| {
                    if inner.parse(&m)? {
                        Ok(())
                    } else {
                        Err(m.error("unsupported decoration inside `items`/`values`"))
                    }
                })?;
                let list = decorations_expr(&inner.decorations);
                let variant = syn::Ident::new(&camel(&name), ident.span());
                quote!(::shapewire::Decoration::#variant(#list))
            }
            _ => return Ok(false),
        };
        self.decorations.push(deco);
        Ok(true)
    }
}

fn camel(snake: &str) -> String {
    snake
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |c| {
                c.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}

pub(crate) fn parse_wire_field_attrs(attrs: &[Attribute]) -> syn::Result<WireFieldAttr> {
    let mut out = WireFieldAttr::default();
    for attr in attrs {
        if !attr.path().is_ident("wire") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if out.rename.is_some() {
                    return Err(meta.error("duplicate `wire(rename = ...)`"));
                }
                out.rename = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if meta.path.is_ident("key") {
                if out.key.is_some() {
                    return Err(meta.error("duplicate `wire(key = ...)`"));
                }
                let lit: LitInt = meta.value()?.parse()?;
                out.key = Some(lit.base10_parse()?);
                return Ok(());
            }
            if meta.path.is_ident("required") {
                return flag(&meta, &mut out.required, "required");
            }
            if meta.path.is_ident("not_required") {
                return flag(&meta, &mut out.not_required, "not_required");
            }
            if meta.path.is_ident("skip") {
                return flag(&meta, &mut out.skip, "skip");
            }
            if meta.path.is_ident("exclude") {
                return flag(&meta, &mut out.exclude, "exclude");
            }
            if meta.path.is_ident("recursive") {
                return flag(&meta, &mut out.recursive, "recursive");
            }
            if out.decos.parse(&meta)? {
                return Ok(());
            }
            Err(meta.error("unsupported `wire(...)` field attribute"))
        })?;
    }

    if out.rename.is_some() && out.key.is_some() {
        return Err(syn::Error::new(
            Span::call_site(),
            "`wire(rename)` cannot be combined with `wire(key)`",
        ));
    }
    if out.required && out.not_required {
        return Err(syn::Error::new(
            Span::call_site(),
            "`wire(required)` cannot be combined with `wire(not_required)`",
        ));
    }
    if out.skip && out.exclude {
        return Err(syn::Error::new(
            Span::call_site(),
            "`wire(skip)` cannot be combined with `wire(exclude)`",
        ));
    }
    Ok(out)
}

pub(crate) fn parse_wire_struct_attrs(attrs: &[Attribute]) -> syn::Result<WireStructAttr> {
    let mut out = WireStructAttr::default();
    for attr in attrs {
        if !attr.path().is_ident("wire") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("allow_excess_fields") {
                return flag(&meta, &mut out.allow_excess_fields, "allow_excess_fields");
            }
            if meta.path.is_ident("indexes_as_keys") {
                return flag(&meta, &mut out.indexes_as_keys, "indexes_as_keys");
            }
            if meta.path.is_ident("as_array") {
                return flag(&meta, &mut out.as_array, "as_array");
            }
            if meta.path.is_ident("skip_nulls") {
                return flag(&meta, &mut out.skip_nulls, "skip_nulls");
            }
            if meta.path.is_ident("matcher") {
                if out.matcher.is_some() {
                    return Err(meta.error("duplicate `wire(matcher = ...)`"));
                }
                let lit: LitStr = meta.value()?.parse()?;
                if !matches!(lit.value().as_str(), "buffered" | "incremental") {
                    return Err(syn::Error::new(
                        lit.span(),
                        "matcher must be \"buffered\" or \"incremental\"",
                    ));
                }
                out.matcher = Some(lit);
                return Ok(());
            }
            if out.decos.parse(&meta)? {
                return Ok(());
            }
            Err(meta.error("unsupported `wire(...)` struct attribute"))
        })?;
    }
    Ok(out)
}
