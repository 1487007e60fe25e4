use crate::attributes::{
    AutowiredAttributes, BeanAttributes, RequestMappingAttributes, RoleAttributes, AUTOWIRED, BEAN,
    COMPONENT, CONTROLLER, REQUEST_MAPPING, SERVICE,
};
use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Attribute, Data, DataStruct, DeriveInput, Error, Field, Fields, Index, Member, Result};

fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes
        .iter()
        .find(|attribute| attribute.path().is_ident(name))
}

fn generate_role_markers(attributes: &[Attribute]) -> Result<Vec<TokenStream>> {
    [
        (CONTROLLER, quote!(Controller)),
        (SERVICE, quote!(Service)),
        (COMPONENT, quote!(Component)),
    ]
    .into_iter()
    .filter_map(|(name, role)| {
        find_attribute(attributes, name).map(|attribute| {
            let name = RoleAttributes::try_from(attribute)?
                .name
                .map(|name| quote!(::std::option::Option::Some(#name)))
                .unwrap_or_else(|| quote!(::std::option::Option::None));

            Ok(quote! {
                ::sprig::descriptor::RoleMarker {
                    role: ::sprig::descriptor::Role::#role,
                    name: #name,
                }
            })
        })
    })
    .try_collect()
}

fn generate_request_mapping(attributes: &[Attribute]) -> Result<TokenStream> {
    Ok(match find_attribute(attributes, REQUEST_MAPPING) {
        Some(attribute) => {
            let path = RequestMappingAttributes::try_from(attribute)?.path;
            quote!(::std::option::Option::Some(#path))
        }
        None => quote!(::std::option::Option::None),
    })
}

fn generate_constructor(ident: &Ident, attributes: &[Attribute]) -> Result<TokenStream> {
    let constructor = find_attribute(attributes, BEAN)
        .map(BeanAttributes::try_from)
        .transpose()?
        .and_then(|attributes| attributes.constructor);

    Ok(match constructor {
        Some(path) => quote! {
            ::sprig::descriptor::internal::construct_with::<#ident, _>(#path)
        },
        None => quote! {
            ::sprig::descriptor::internal::construct_default::<#ident>()
        },
    })
}

struct InjectedField {
    descriptor: TokenStream,
    inject: TokenStream,
}

fn generate_injected_field(
    owner: &Ident,
    index: usize,
    field: &Field,
    attribute: &Attribute,
) -> Result<InjectedField> {
    let qualifier = AutowiredAttributes::try_from(attribute)?
        .name
        .map(|name| quote!(::std::option::Option::Some(#name)))
        .unwrap_or_else(|| quote!(::std::option::Option::None));

    let (member, name) = match &field.ident {
        Some(ident) => (Member::Named(ident.clone()), ident.unraw().to_string()),
        None => (
            Member::Unnamed(Index {
                index: index as u32,
                span: field.span(),
            }),
            index.to_string(),
        ),
    };

    let ty = &field.ty;
    let inject_ident = format_ident!("inject_{}", name);

    Ok(InjectedField {
        descriptor: quote! {
            ::sprig::descriptor::FieldDescriptor {
                name: #name,
                type_name: <#ty as ::sprig::injector::InjectionPoint>::target_type_name(),
                qualifier: #qualifier,
                inject: #inject_ident,
            }
        },
        inject: quote! {
            fn #inject_ident(
                owner: &(dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync),
                dependency: &::sprig::container::Bean,
            ) -> ::std::result::Result<(), ::sprig::error::InjectionError> {
                let owner = owner.downcast_ref::<#owner>().ok_or_else(|| {
                    ::sprig::error::InjectionError::IncompatibleOwner(
                        <#owner as ::sprig::descriptor::Injectable>::type_name().to_string(),
                    )
                })?;

                ::sprig::injector::InjectionPoint::inject(&owner.#member, dependency)
            }
        },
    })
}

fn generate_injected_fields(owner: &Ident, fields: &Fields) -> Result<Vec<InjectedField>> {
    fields
        .iter()
        .enumerate()
        .filter_map(|(index, field)| {
            find_attribute(&field.attrs, AUTOWIRED)
                .map(|attribute| generate_injected_field(owner, index, field, attribute))
        })
        .try_collect()
}

pub fn expand_bean(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(DataStruct { fields, .. }) = &input.data else {
        return Err(Error::new(input.span(), "Can only derive Bean on structs!"));
    };

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Beans cannot have generic parameters!",
        ));
    }

    let ident = &input.ident;
    let simple_name = ident.to_string();
    let roles = generate_role_markers(&input.attrs)?;
    let request_mapping = generate_request_mapping(&input.attrs)?;
    let constructor = generate_constructor(ident, &input.attrs)?;
    let (field_descriptors, injectors): (Vec<_>, Vec<_>) =
        generate_injected_fields(ident, fields)?
            .into_iter()
            .map(|field| (field.descriptor, field.inject))
            .unzip();

    Ok(quote! {
        #[automatically_derived]
        impl ::sprig::descriptor::Injectable for #ident {
            fn type_name() -> &'static str {
                ::std::concat!(::std::module_path!(), "::", #simple_name)
            }
        }

        const _: () = {
            fn construct() -> ::std::result::Result<
                ::sprig::descriptor::BeanAnyPtr,
                ::sprig::descriptor::InstantiationFailure,
            > {
                #constructor
            }

            fn cast(
                instance: ::sprig::descriptor::BeanAnyPtr,
            ) -> ::std::result::Result<
                ::std::boxed::Box<dyn ::std::any::Any>,
                ::sprig::descriptor::BeanAnyPtr,
            > {
                instance.downcast::<#ident>().map(|instance| {
                    ::std::boxed::Box::new(instance) as ::std::boxed::Box<dyn ::std::any::Any>
                })
            }

            #(#injectors)*

            fn describe() -> ::sprig::descriptor::TypeDescriptor {
                ::sprig::descriptor::TypeDescriptor {
                    name: <#ident as ::sprig::descriptor::Injectable>::type_name(),
                    simple_name: #simple_name,
                    type_id: ::std::any::TypeId::of::<#ident>(),
                    roles: ::std::vec![#(#roles),*],
                    request_mapping: #request_mapping,
                    fields: ::std::vec![#(#field_descriptors),*],
                    methods: ::std::vec::Vec::new(),
                    interfaces: ::std::vec::Vec::new(),
                    constructor: construct,
                    cast,
                }
            }

            ::sprig::descriptor::internal::submit! {
                ::sprig::descriptor::internal::TypeRegistration {
                    describe
                }
            }
        };
    })
}
