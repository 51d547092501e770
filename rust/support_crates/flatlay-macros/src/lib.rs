use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DataEnum, DataStruct, DeriveInput, Field, Fields, Ident, LitStr, Path, Type,
    Visibility, parse_macro_input,
};

/// Derives `flatlay::Flat` and `flatlay::Reflect`.
///
/// # Structs
///
/// Every named field becomes a member, in declaration order. Only `pub` fields
/// are encoded; others are listed but never eligible. Field types must implement
/// `Flat`, unless the field is marked `#[flat(skip)]`.
///
/// Properties are declared on the struct and come after all fields:
///
/// ```rust,ignore
/// #[derive(Default, Flat)]
/// #[flat(property(name = "total", ty = i64, get = total, set = set_total))]
/// pub struct Invoice {
///     pub id: u32,
///     cents: i64,
/// }
/// ```
///
/// `get` names a `fn(&self) -> ty` method and `set` a `fn(&mut self, ty)` method.
/// A property lacking either is never eligible.
///
/// # Enums
///
/// Fieldless enums are encoded as their `#[repr]` integer (`i32` when absent).
/// Decoding a value that is not a discriminant fails.
///
/// # Crate path
///
/// `#[flat(crate = path)]` replaces `::flatlay` in the generated code.
#[proc_macro_derive(Flat, attributes(flat))]
pub fn derive_flat(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let output = match &input.data {
        Data::Struct(data) => expand_struct(&input, data),
        Data::Enum(data) => expand_enum(&input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input.ident,
            "Flat cannot be derived for unions",
        )),
    };
    output.unwrap_or_else(syn::Error::into_compile_error).into()
}

/// Container-level `#[flat(...)]` options.
#[derive(Default)]
struct ContainerAttrs {
    crate_path: Option<Path>,
    properties: Vec<Property>,
}

struct Property {
    name: LitStr,
    ty: Type,
    get: Option<Ident>,
    set: Option<Ident>,
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut container = ContainerAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("flat")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                container.crate_path = Some(meta.value()?.parse()?);
                return Ok(());
            }
            if !meta.path.is_ident("property") {
                return Err(meta.error("expected `crate = ...` or `property(...)`"));
            }

            let mut name = None;
            let mut ty = None;
            let mut get = None;
            let mut set = None;
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("name") {
                    name = Some(inner.value()?.parse::<LitStr>()?);
                } else if inner.path.is_ident("ty") {
                    ty = Some(inner.value()?.parse::<Type>()?);
                } else if inner.path.is_ident("get") {
                    get = Some(inner.value()?.parse::<Ident>()?);
                } else if inner.path.is_ident("set") {
                    set = Some(inner.value()?.parse::<Ident>()?);
                } else {
                    return Err(inner.error("expected `name`, `ty`, `get` or `set`"));
                }
                Ok(())
            })?;

            let Some(name) = name else {
                return Err(meta.error("property is missing `name = \"...\"`"));
            };
            let Some(ty) = ty else {
                return Err(meta.error("property is missing `ty = ...`"));
            };
            container.properties.push(Property { name, ty, get, set });
            Ok(())
        })?;
    }
    Ok(container)
}

fn has_skip(field: &Field) -> syn::Result<bool> {
    let mut skip = false;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("flat")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip`"))
            }
        })?;
    }
    Ok(skip)
}

fn reject_generics(input: &DeriveInput) -> syn::Result<()> {
    if input.generics.params.is_empty() {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.generics,
            "Flat cannot be derived for generic types",
        ))
    }
}

fn type_label(ty: &Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}

fn expand_struct(input: &DeriveInput, data: &DataStruct) -> syn::Result<TokenStream2> {
    reject_generics(input)?;
    let container = parse_container_attrs(&input.attrs)?;
    let krate = match &container.crate_path {
        Some(path) => quote!(#path),
        None => quote!(::flatlay),
    };
    let ident = &input.ident;
    let name = ident.unraw().to_string();

    let fields: Vec<&Field> = match &data.fields {
        Fields::Named(named) => named.named.iter().collect(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                ident,
                "Flat can only be derived for structs with named fields",
            ));
        }
    };

    let mut accessors = Vec::new();
    let mut members = Vec::new();

    for field in fields {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let field_name = field_ident.unraw().to_string();
        let ty = &field.ty;
        let label = type_label(ty);
        let visibility = match field.vis {
            Visibility::Public(_) => quote!(#krate::Visibility::Public),
            _ => quote!(#krate::Visibility::Private),
        };

        if has_skip(field)? {
            members.push(quote! {
                #krate::MemberInfo::<Self>::skipped(#field_name, #label, #visibility)
            });
            continue;
        }

        let get = format_ident!("__flatlay_get_field_{}", field_name);
        let set = format_ident!("__flatlay_set_field_{}", field_name);
        accessors.push(quote! {
            fn #get(
                value: &#ident,
                visit: &mut dyn ::core::ops::FnMut(&dyn #krate::Reflect) -> #krate::Result<()>,
            ) -> #krate::Result<()> {
                visit(&value.#field_ident as &dyn #krate::Reflect)
            }

            fn #set(
                value: &mut #ident,
                visit: &mut dyn ::core::ops::FnMut(&mut dyn #krate::Reflect) -> #krate::Result<()>,
            ) -> #krate::Result<()> {
                visit(&mut value.#field_ident as &mut dyn #krate::Reflect)
            }
        });
        members.push(quote! {
            #krate::MemberInfo::<Self>::field(
                #field_name,
                #label,
                #visibility,
                <#ty as #krate::Flat>::descriptor,
                #get,
                #set,
            )
        });
    }

    for property in &container.properties {
        let Property {
            name: property_name,
            ty,
            get,
            set,
        } = property;
        let label = type_label(ty);
        let key: String = property_name
            .value()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();

        let getter = match get {
            Some(method) => {
                let getter_fn = format_ident!("__flatlay_get_property_{}", key);
                let method_name = method.unraw().to_string();
                accessors.push(quote! {
                    fn #getter_fn(
                        value: &#ident,
                        visit: &mut dyn ::core::ops::FnMut(&dyn #krate::Reflect) -> #krate::Result<()>,
                    ) -> #krate::Result<()> {
                        let current: #ty = value.#method();
                        visit(&current as &dyn #krate::Reflect)
                    }
                });
                quote!(::core::option::Option::Some((#method_name, #getter_fn as #krate::Getter<Self>)))
            }
            None => quote!(::core::option::Option::None),
        };

        let setter = match set {
            Some(method) => {
                let setter_fn = format_ident!("__flatlay_set_property_{}", key);
                let method_name = method.unraw().to_string();
                accessors.push(quote! {
                    fn #setter_fn(
                        value: &mut #ident,
                        visit: &mut dyn ::core::ops::FnMut(&mut dyn #krate::Reflect) -> #krate::Result<()>,
                    ) -> #krate::Result<()> {
                        let mut slot = <#ty as ::core::default::Default>::default();
                        visit(&mut slot as &mut dyn #krate::Reflect)?;
                        value.#method(slot);
                        ::core::result::Result::Ok(())
                    }
                });
                quote!(::core::option::Option::Some((#method_name, #setter_fn as #krate::Setter<Self>)))
            }
            None => quote!(::core::option::Option::None),
        };

        members.push(quote! {
            #krate::MemberInfo::<Self>::property(
                #property_name,
                #label,
                <#ty as #krate::Flat>::descriptor,
                #getter,
                #setter,
            )
        });
    }

    Ok(quote! {
        impl #krate::Reflect for #ident {}

        impl #krate::Flat for #ident {
            fn descriptor() -> #krate::TypeDescriptor {
                #krate::TypeDescriptor::Composite { name: #name }
            }

            fn type_name() -> &'static str {
                #name
            }

            #[allow(non_snake_case)]
            fn members() -> ::std::vec::Vec<#krate::MemberInfo<Self>> {
                #(#accessors)*

                ::std::vec![#(#members),*]
            }
        }
    })
}

const REPRS: [(&str, &str); 8] = [
    ("i8", "I8"),
    ("u8", "U8"),
    ("i16", "I16"),
    ("u16", "U16"),
    ("i32", "I32"),
    ("u32", "U32"),
    ("i64", "I64"),
    ("u64", "U64"),
];

/// Integer type of the enum and its `ScalarKind` variant.
fn enum_repr(attrs: &[Attribute]) -> syn::Result<(Ident, Ident)> {
    let mut repr = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            if meta.input.peek(syn::token::Paren) {
                let _args;
                syn::parenthesized!(_args in meta.input);
                return Ok(());
            }
            if let Some(ident) = meta.path.get_ident() {
                let name = ident.to_string();
                if let Some((_, kind)) = REPRS.iter().find(|(ty, _)| *ty == name) {
                    repr = Some((ident.clone(), Ident::new(kind, ident.span())));
                } else if name == "isize" || name == "usize" || name.ends_with("128") {
                    return Err(meta.error(
                        "Flat enums need a repr of at most 64 bits with a fixed width",
                    ));
                }
            }
            Ok(())
        })?;
    }
    Ok(repr.unwrap_or_else(|| {
        let span = proc_macro2::Span::call_site();
        (Ident::new("i32", span), Ident::new("I32", span))
    }))
}

fn expand_enum(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream2> {
    reject_generics(input)?;
    let container = parse_container_attrs(&input.attrs)?;
    if !container.properties.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "properties are only supported on structs",
        ));
    }
    let krate = match &container.crate_path {
        Some(path) => quote!(#path),
        None => quote!(::flatlay),
    };
    let ident = &input.ident;
    let name = ident.unraw().to_string();

    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            ident,
            "Flat cannot be derived for enums without variants",
        ));
    }
    if let Some(variant) = data
        .variants
        .iter()
        .find(|variant| !matches!(variant.fields, Fields::Unit))
    {
        return Err(syn::Error::new_spanned(
            variant,
            "Flat can only be derived for fieldless enums",
        ));
    }

    let (repr, kind) = enum_repr(&input.attrs)?;
    let variants: Vec<&Ident> = data.variants.iter().map(|variant| &variant.ident).collect();

    Ok(quote! {
        impl #krate::Reflect for #ident {
            fn store_scalar(&self, dst: &mut [u8]) -> #krate::ValueResult<()> {
                let raw: #repr = match self {
                    #(#ident::#variants => #ident::#variants as #repr,)*
                };
                #krate::reflect::store_pod(&raw, dst)
            }

            fn load_scalar(&mut self, src: &[u8]) -> #krate::ValueResult<()> {
                let raw: #repr = #krate::reflect::load_checked(src)?;
                #(
                    if raw == #ident::#variants as #repr {
                        *self = #ident::#variants;
                        return ::core::result::Result::Ok(());
                    }
                )*
                ::core::result::Result::Err(#krate::ValueError::Invalid(::std::format!(
                    "{} is not a discriminant of {}",
                    raw,
                    #name,
                )))
            }
        }

        impl #krate::Flat for #ident {
            fn descriptor() -> #krate::TypeDescriptor {
                #krate::TypeDescriptor::Enum {
                    name: #name,
                    repr: #krate::ScalarKind::#kind,
                }
            }

            fn type_name() -> &'static str {
                #name
            }

            fn store_slice(items: &[Self], dst: &mut [u8]) -> #krate::ValueResult<()> {
                #krate::reflect::store_each(items, dst, ::core::mem::size_of::<#repr>())
            }

            fn load_slice(src: &[u8]) -> #krate::ValueResult<::std::vec::Vec<Self>> {
                #krate::reflect::load_each(src, ::core::mem::size_of::<#repr>())
            }
        }
    })
}
