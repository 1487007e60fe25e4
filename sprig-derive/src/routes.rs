use crate::attributes::{RequestMappingAttributes, REQUEST_MAPPING};
use itertools::Itertools;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    Error, FnArg, GenericArgument, ImplItem, ImplItemFn, Item, ItemImpl, LitStr, PathArguments,
    Result, Type, TypeParamBound, TypePath, Visibility,
};

#[derive(Copy, Clone, Eq, PartialEq)]
enum Parameter {
    Request,
    Response,
    Text,
    BorrowedText,
    OptionalText,
    Other,
}

fn last_segment_is(path: &syn::Path, name: &str) -> bool {
    path.segments
        .last()
        .map_or(false, |segment| segment.ident == name)
}

fn is_trait_object_of(ty: &Type, name: &str) -> bool {
    match ty {
        Type::TraitObject(object) => object.bounds.iter().any(|bound| {
            matches!(bound, TypeParamBound::Trait(bound) if last_segment_is(&bound.path, name))
        }),
        Type::Paren(inner) => is_trait_object_of(&inner.elem, name),
        _ => false,
    }
}

fn is_path_of(ty: &Type, name: &str) -> bool {
    matches!(ty, Type::Path(TypePath { qself: None, path }) if last_segment_is(path, name))
}

fn is_optional_string(ty: &Type) -> bool {
    let Type::Path(TypePath { qself: None, path }) = ty else {
        return false;
    };

    path.segments.last().map_or(false, |segment| {
        segment.ident == "Option"
            && matches!(
                &segment.arguments,
                PathArguments::AngleBracketed(arguments)
                    if matches!(
                        arguments.args.first(),
                        Some(GenericArgument::Type(inner)) if is_path_of(inner, "String")
                    )
            )
    })
}

fn classify(ty: &Type) -> Parameter {
    match ty {
        Type::Reference(reference) if reference.mutability.is_some() => {
            if is_trait_object_of(&reference.elem, "Response") {
                Parameter::Response
            } else {
                Parameter::Other
            }
        }
        Type::Reference(reference) => {
            if is_trait_object_of(&reference.elem, "Request") {
                Parameter::Request
            } else if is_path_of(&reference.elem, "str") {
                Parameter::BorrowedText
            } else {
                Parameter::Other
            }
        }
        _ if is_path_of(ty, "String") => Parameter::Text,
        _ if is_optional_string(ty) => Parameter::OptionalText,
        _ => Parameter::Other,
    }
}

fn extract_request_mapping(method: &mut ImplItemFn) -> Result<Option<LitStr>> {
    let mut path = None;
    let mut result = Ok(());

    method.attrs.retain(|attribute| {
        if !attribute.path().is_ident(REQUEST_MAPPING) {
            return true;
        }

        match RequestMappingAttributes::try_from(attribute) {
            Ok(attributes) => path = Some(attributes.path),
            Err(error) => result = Err(error),
        }

        false
    });

    result.map(|_| path)
}

fn validate_signature(method: &ImplItemFn) -> Result<()> {
    let signature = &method.sig;
    if !signature.generics.params.is_empty() {
        return Err(Error::new(
            signature.generics.span(),
            "Handler methods cannot have generic parameters!",
        ));
    }

    if let Some(asyncness) = &signature.asyncness {
        return Err(Error::new(
            asyncness.span(),
            "Handler methods cannot be async!",
        ));
    }

    match signature.receiver() {
        Some(receiver) if receiver.reference.is_some() && receiver.mutability.is_none() => Ok(()),
        _ => Err(Error::new(
            signature.span(),
            "Handler methods must take `&self`!",
        )),
    }
}

fn parameters_of(method: &ImplItemFn) -> Result<Vec<Parameter>> {
    let parameters = method
        .sig
        .inputs
        .iter()
        .filter_map(|input| match input {
            FnArg::Typed(argument) => Some(classify(&argument.ty)),
            FnArg::Receiver(_) => None,
        })
        .collect_vec();

    if parameters
        .iter()
        .filter(|parameter| **parameter == Parameter::Response)
        .count()
        > 1
    {
        return Err(Error::new(
            method.sig.inputs.span(),
            "Handler methods can take at most one response!",
        ));
    }

    Ok(parameters)
}

fn generate_route(
    self_ty: &Type,
    declaring_type: &str,
    method: &ImplItemFn,
    path: &LitStr,
) -> Result<TokenStream> {
    validate_signature(method)?;

    let parameters = parameters_of(method)?;
    let method_ident = &method.sig.ident;
    let method_name = method_ident.to_string();
    let handler_name = format!("{declaring_type}::{method_name}");
    let arguments = (0..parameters.len())
        .map(|index| format_ident!("argument_{}", index))
        .collect_vec();

    // the response borrows the invocation mutably, so it is bound last
    let bindings = parameters
        .iter()
        .zip(&arguments)
        .enumerate()
        .sorted_by_key(|(_, (parameter, _))| **parameter == Parameter::Response)
        .map(|(index, (parameter, argument))| match parameter {
            Parameter::Request => quote! {
                let #argument = invocation.request_at(#index)?;
            },
            Parameter::Response => quote! {
                let #argument = invocation.response_at(#index)?;
            },
            Parameter::Text | Parameter::BorrowedText => quote! {
                let #argument = invocation.text_at(#index)?.unwrap_or_default();
            },
            Parameter::OptionalText => quote! {
                let #argument = invocation.text_at(#index)?;
            },
            Parameter::Other => quote! {
                invocation.default_at(#index)?;
                let #argument = ::std::default::Default::default();
            },
        })
        .collect_vec();

    let call_arguments = parameters
        .iter()
        .zip(&arguments)
        .map(|(parameter, argument)| match parameter {
            Parameter::BorrowedText => quote!(&#argument),
            _ => quote!(#argument),
        })
        .collect_vec();

    let kinds = parameters
        .iter()
        .map(|parameter| match parameter {
            Parameter::Request => quote!(Request),
            Parameter::Response => quote!(Response),
            Parameter::Text | Parameter::BorrowedText | Parameter::OptionalText => quote!(Text),
            Parameter::Other => quote!(Other),
        })
        .collect_vec();

    let invoker = format_ident!("invoke_{}", method_ident);
    let describe = format_ident!("describe_{}", method_ident);

    Ok(quote! {
        const _: () = {
            fn #invoker(
                bean: &(dyn ::std::any::Any + ::std::marker::Send + ::std::marker::Sync),
                invocation: &mut ::sprig::dispatcher::Invocation<'_>,
            ) -> ::std::result::Result<(), ::sprig::error::DispatchError> {
                let target = bean
                    .downcast_ref::<#self_ty>()
                    .ok_or(::sprig::error::DispatchError::IncompatibleBean(#declaring_type))?;

                #(#bindings)*

                let output = target.#method_ident(#(#call_arguments),*);
                ::sprig::dispatcher::internal::complete(#handler_name, output, invocation.response())
            }

            fn #describe() -> ::sprig::descriptor::internal::MethodDefinition {
                ::sprig::descriptor::internal::MethodDefinition {
                    target: ::std::any::TypeId::of::<#self_ty>(),
                    descriptor: ::sprig::descriptor::MethodDescriptor {
                        name: #method_name,
                        path: #path,
                        declaring_type: #declaring_type,
                        parameters: ::std::vec![
                            #(::sprig::descriptor::ParameterKind::#kinds),*
                        ],
                        invoke: #invoker,
                    },
                }
            }

            ::sprig::descriptor::internal::submit! {
                ::sprig::descriptor::internal::MethodRegistration {
                    describe: #describe
                }
            }
        };
    })
}

fn declaring_type_of(item_impl: &ItemImpl) -> Result<Ident> {
    match item_impl.self_ty.as_ref() {
        Type::Path(TypePath { qself: None, path }) => path
            .segments
            .last()
            .map(|segment| segment.ident.clone())
            .ok_or_else(|| Error::new(path.span(), "Missing type identifier!")),
        other => Err(Error::new(
            other.span(),
            "Routes can only be registered for named types!",
        )),
    }
}

pub fn expand_routes(item: Item) -> Result<TokenStream> {
    let span = item.span();
    let Item::Impl(mut item_impl) = item else {
        return Err(Error::new(
            span,
            "Routes can only be registered on impl blocks!",
        ));
    };

    if item_impl.trait_.is_some() {
        return Err(Error::new(
            item_impl.span(),
            "Routes can only be registered on inherent impl blocks!",
        ));
    }

    if !item_impl.generics.params.is_empty() {
        return Err(Error::new(
            item_impl.generics.span(),
            "Routes cannot be registered for generic types!",
        ));
    }

    let declaring_type = declaring_type_of(&item_impl)?.to_string();
    let self_ty = item_impl.self_ty.clone();
    let mut routes = vec![];

    for impl_item in &mut item_impl.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };

        let Some(path) = extract_request_mapping(method)? else {
            continue;
        };

        // only public methods are exposed
        if let Visibility::Public(_) = method.vis {
            routes.push(generate_route(&self_ty, &declaring_type, method, &path)?);
        }
    }

    Ok(quote! {
        #item_impl

        #(#routes)*
    })
}
