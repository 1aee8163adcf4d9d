extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields};

/// Container attributes parsed from `#[testwire(...)]` on a struct.
///
/// * `name` - The serialized type name (defaults to the struct name)
/// * `origin` - The origin recorded in the type name (defaults to the
///   deriving crate's package name)
struct ContainerAttributes {
    name: Option<String>,
    origin: Option<String>,
}

/// Field attributes parsed from `#[testwire(...)]` on a named field.
///
/// * `rename` - Store the field under this name instead of its own
/// * `skip` - Leave the field out of serialization; deserialization resets
///   it to its default
struct FieldAttributes {
    rename: Option<String>,
    skip: bool,
}

fn parse_container_attributes(attrs: &[Attribute]) -> syn::Result<ContainerAttributes> {
    let mut name = None;
    let mut origin = None;

    for attr in attrs {
        if !attr.path().is_ident("testwire") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;
                if ident == "name" {
                    input.parse::<syn::Token![=]>()?;
                    name = Some(input.parse::<syn::LitStr>()?.value());
                } else if ident == "origin" {
                    input.parse::<syn::Token![=]>()?;
                    origin = Some(input.parse::<syn::LitStr>()?.value());
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown container attribute: {}", ident),
                    ));
                }
                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }

    Ok(ContainerAttributes { name, origin })
}

fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut rename = None;
    let mut skip = false;

    for attr in attrs {
        if !attr.path().is_ident("testwire") {
            continue;
        }
        attr.parse_args_with(|input: syn::parse::ParseStream| {
            while !input.is_empty() {
                let ident = input.parse::<syn::Ident>()?;
                if ident == "rename" {
                    input.parse::<syn::Token![=]>()?;
                    rename = Some(input.parse::<syn::LitStr>()?.value());
                } else if ident == "skip" {
                    skip = true;
                } else {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("Unknown field attribute: {}", ident),
                    ));
                }
                if input.peek(syn::Token![,]) {
                    input.parse::<syn::Token![,]>()?;
                }
            }
            Ok(())
        })?;
    }

    Ok(FieldAttributes { rename, skip })
}

/// Derives the `testwire::Serializable` field-bag contract for a struct
/// with named fields (or a unit struct), along with the `SerializableType`,
/// `ToValue`, and `FromValue` implementations that let the type flow
/// through the typed serialization API and appear as a bag field itself.
///
/// The deriving type must also implement `Default`, `Clone`, and `Debug`.
#[proc_macro_derive(Serializable, attributes(testwire))]
pub fn derive_serializable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Serializable cannot be derived for generic types",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => Some(&named.named),
            Fields::Unit => None,
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Serializable can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "Serializable can only be derived for structs",
            ));
        }
    };

    let container = parse_container_attributes(&input.attrs)?;
    let type_name = container.name.unwrap_or_else(|| ident.to_string());
    let origin_tokens = match container.origin {
        Some(origin) => quote! { #origin },
        None => quote! { env!("CARGO_PKG_NAME") },
    };

    let mut serialize_fields = Vec::new();
    let mut deserialize_fields = Vec::new();
    let mut wire_field_count = 0usize;

    if let Some(fields) = fields {
        for field in fields {
            let field_ident = field.ident.as_ref().expect("named field");
            let attrs = parse_field_attributes(&field.attrs)?;
            if attrs.skip {
                deserialize_fields.push(quote! {
                    self.#field_ident = ::std::default::Default::default();
                });
                continue;
            }
            wire_field_count += 1;
            let wire_name = attrs.rename.unwrap_or_else(|| field_ident.to_string());
            serialize_fields.push(quote! {
                info.add(#wire_name, &self.#field_ident)?;
            });
            deserialize_fields.push(quote! {
                self.#field_ident = info.get(#wire_name)?;
            });
        }
    }

    let info_binding = if wire_field_count == 0 {
        quote! { _info }
    } else {
        quote! { info }
    };
    let serialize_info = info_binding.clone();
    let deserialize_info = info_binding;

    let expanded = quote! {
        impl ::testwire::Serializable for #ident {
            fn serialize(
                &self,
                #serialize_info: &mut ::testwire::SerializationInfo<'_>,
            ) -> ::testwire::Result<()> {
                #(#serialize_fields)*
                ::testwire::Result::Ok(())
            }

            fn deserialize(
                &mut self,
                #deserialize_info: &::testwire::SerializationInfo<'_>,
            ) -> ::testwire::Result<()> {
                #(#deserialize_fields)*
                ::testwire::Result::Ok(())
            }

            fn type_name(&self) -> ::testwire::TypeName {
                <#ident as ::testwire::SerializableType>::serialized_type_name()
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }

        impl ::testwire::SerializableType for #ident {
            fn serialized_type_name() -> ::testwire::TypeName {
                ::testwire::TypeName::new(#type_name, #origin_tokens)
            }
        }

        impl ::testwire::ToValue for #ident {
            fn to_value(&self) -> ::std::option::Option<::testwire::Value> {
                ::std::option::Option::Some(::testwire::Value::Object(
                    ::std::boxed::Box::new(::std::clone::Clone::clone(self)),
                ))
            }

            fn declared_type() -> ::testwire::TypeName {
                <#ident as ::testwire::SerializableType>::serialized_type_name()
            }

            fn element_kind() -> ::testwire::ElementType {
                ::testwire::ElementType::of(::testwire::TypeIndex::Serializable)
            }
        }

        impl ::testwire::FromValue for #ident {
            fn from_value(value: ::testwire::Value) -> ::testwire::Result<Self> {
                match value {
                    ::testwire::Value::Object(object) => object
                        .into_any()
                        .downcast::<#ident>()
                        .map(|boxed| *boxed)
                        .map_err(|_| ::testwire::Error::Malformed(
                            ::std::format!(
                                "expected an instance of '{}'",
                                ::std::stringify!(#ident)
                            ),
                        )),
                    other => ::testwire::Result::Err(::testwire::Error::Malformed(
                        ::std::format!(
                            "expected a value of kind '{}', got '{}'",
                            ::std::stringify!(#ident),
                            other.kind_name()
                        ),
                    )),
                }
            }

            fn missing() -> ::testwire::Result<Self> {
                ::testwire::Result::Ok(<#ident as ::std::default::Default>::default())
            }
        }
    };

    Ok(expanded)
}
