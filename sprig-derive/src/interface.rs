use proc_macro2::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{Error, Item, Result};

pub fn expand_injectable(item: &Item) -> Result<TokenStream> {
    let Item::Trait(item_trait) = item else {
        return Err(Error::new(
            item.span(),
            "Only traits can be made injectable!",
        ));
    };

    if !item_trait.generics.params.is_empty() {
        return Err(Error::new(
            item_trait.generics.span(),
            "Injectable traits cannot have generic parameters!",
        ));
    }

    let ident = &item_trait.ident;
    let simple_name = ident.to_string();

    Ok(quote! {
        #item

        #[automatically_derived]
        impl ::sprig::descriptor::Injectable
            for dyn #ident + ::std::marker::Send + ::std::marker::Sync
        {
            fn type_name() -> &'static str {
                ::std::concat!(::std::module_path!(), "::", #simple_name)
            }
        }
    })
}

pub fn register_bean_interface(item: &Item) -> Result<TokenStream> {
    let Item::Impl(item_impl) = item else {
        return Err(Error::new(
            item.span(),
            "Registering interfaces is possible only on trait implementations!",
        ));
    };

    let trait_type = item_impl
        .trait_
        .as_ref()
        .map(|(_, path, ..)| path)
        .ok_or_else(|| Error::new(item.span(), "Missing trait identifier!"))?;

    if !item_impl.generics.params.is_empty() {
        return Err(Error::new(
            item_impl.generics.span(),
            "Interfaces of generic types cannot be registered!",
        ));
    }

    let target_type = &item_impl.self_ty;

    Ok(quote! {
        #item

        const _: () = {
            type Interface = dyn #trait_type + ::std::marker::Send + ::std::marker::Sync;

            fn cast(
                instance: ::sprig::descriptor::BeanAnyPtr,
            ) -> ::std::result::Result<
                ::std::boxed::Box<dyn ::std::any::Any>,
                ::sprig::descriptor::BeanAnyPtr,
            > {
                instance.downcast::<#target_type>().map(|instance| {
                    ::std::boxed::Box::new(instance as ::sprig::descriptor::BeanPtr<Interface>)
                        as ::std::boxed::Box<dyn ::std::any::Any>
                })
            }

            fn describe() -> ::sprig::descriptor::internal::InterfaceDefinition {
                ::sprig::descriptor::internal::InterfaceDefinition {
                    target: ::std::any::TypeId::of::<#target_type>(),
                    descriptor: ::sprig::descriptor::InterfaceDescriptor {
                        name: <Interface as ::sprig::descriptor::Injectable>::type_name(),
                        cast,
                    },
                }
            }

            ::sprig::descriptor::internal::submit! {
                ::sprig::descriptor::internal::InterfaceRegistration {
                    describe
                }
            }
        };
    })
}
