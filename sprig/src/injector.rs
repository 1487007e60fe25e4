//! Field-level dependency injection. Injection happens once, after all beans are constructed, so
//! beans can freely depend on each other - including circularly.
//!
//! Injected fields are declared as [Autowired] and marked with `#[autowired]`:
//!
//! ```
//! use sprig::injector::Autowired;
//! use sprig::{injectable, Bean};
//!
//! #[injectable]
//! pub trait Greeter {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! #[derive(Bean, Default)]
//! #[component]
//! struct Greeting {
//!     // looked up by the fully-qualified name of the trait
//!     #[autowired]
//!     greeter: Autowired<dyn Greeter + Send + Sync>,
//!     // looked up by explicit name
//!     #[autowired(name = "fallbackGreeter")]
//!     fallback: Autowired<dyn Greeter + Send + Sync>,
//! }
//! ```

use crate::container::{report, Bean, Container};
use crate::descriptor::{BeanPtr, Injectable};
use crate::error::{Diagnostic, InjectionError, InjectionWarning, InjectionWarningReason};
use once_cell::sync::OnceCell;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use tracing::debug;

/// A field populated by the injector. Stays empty when the dependency cannot be resolved.
///
/// Dereferencing an empty field panics, similarly to using an unset reference. Use
/// [Autowired::get] to check for presence.
pub struct Autowired<T: ?Sized> {
    cell: OnceCell<BeanPtr<T>>,
}

impl<T: ?Sized> Autowired<T> {
    /// Returns the injected instance, if any. This is an associated function, so it never hides a
    /// `get` method of the injected type: call it as `Autowired::get(&field)`.
    #[inline]
    pub fn get(this: &Self) -> Option<&BeanPtr<T>> {
        this.cell.get()
    }

    #[inline]
    pub fn is_injected(this: &Self) -> bool {
        this.cell.get().is_some()
    }
}

impl<T: ?Sized> Default for Autowired<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T: Injectable + ?Sized> Deref for Autowired<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self.cell.get() {
            Some(instance) => &**instance,
            None => panic!("Dependency {} has not been injected", T::type_name()),
        }
    }
}

impl<T: ?Sized> Debug for Autowired<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autowired")
            .field("injected", &Self::is_injected(self))
            .finish()
    }
}

/// Field types which can be populated by the injector.
pub trait InjectionPoint {
    /// Fully-qualified name of the injected type, used as the default bean key.
    fn target_type_name() -> &'static str;

    /// Sets the field to given bean.
    fn inject(&self, dependency: &Bean) -> Result<(), InjectionError>;
}

impl<T: Injectable + ?Sized> InjectionPoint for Autowired<T> {
    #[inline]
    fn target_type_name() -> &'static str {
        T::type_name()
    }

    fn inject(&self, dependency: &Bean) -> Result<(), InjectionError> {
        let instance =
            dependency
                .cast::<T>()
                .ok_or_else(|| InjectionError::IncompatibleDependency {
                    key: dependency.descriptor().name.to_string(),
                    target: T::type_name().to_string(),
                })?;

        // a field can only be populated once; repeated injection keeps the first instance
        let _ = self.cell.set(instance);
        Ok(())
    }
}

/// Populates all `#[autowired]` fields of all beans in the container.
pub fn inject(container: &Container) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    for bean in container.beans() {
        let owner = bean.descriptor();
        for field in &owner.fields {
            let key = field
                .qualifier
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(field.type_name);

            let result = match container.bean(key) {
                Some(dependency) => (field.inject)(&**bean.instance(), dependency)
                    .map_err(InjectionWarningReason::Rejected),
                None => Err(InjectionWarningReason::MissingBean(key.to_string())),
            };

            match result {
                Ok(()) => debug!("Injected {key} into {}.{}.", owner.name, field.name),
                Err(reason) => report(
                    &mut diagnostics,
                    InjectionWarning {
                        owner: owner.name.to_string(),
                        field: field.name.to_string(),
                        reason,
                    }
                    .into(),
                ),
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use crate::container::Container;
    use crate::descriptor::{
        BeanAnyPtr, FieldDescriptor, Injectable, InstantiationFailure, Role, RoleMarker,
        TypeCatalog, TypeDescriptor,
    };
    use crate::error::{Diagnostic, InjectionError, InjectionWarningReason};
    use crate::injector::{inject, Autowired, InjectionPoint};
    use crate::test_support::{descriptor, CountingService};
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Default)]
    struct Holder {
        service: Autowired<CountingService>,
    }

    struct Directory;

    impl Directory {
        fn get(&self, key: &str) -> String {
            format!("entry {key}")
        }
    }

    impl Injectable for Directory {
        fn type_name() -> &'static str {
            "app::Directory"
        }
    }

    fn construct_holder() -> Result<BeanAnyPtr, InstantiationFailure> {
        Ok(Arc::new(Holder::default()) as BeanAnyPtr)
    }

    fn construct_service() -> Result<BeanAnyPtr, InstantiationFailure> {
        Ok(Arc::new(CountingService::default()) as BeanAnyPtr)
    }

    fn cast_service(instance: BeanAnyPtr) -> Result<Box<dyn Any>, BeanAnyPtr> {
        instance
            .downcast::<CountingService>()
            .map(|instance| Box::new(instance) as Box<dyn Any>)
    }

    fn cast_holder(instance: BeanAnyPtr) -> Result<Box<dyn Any>, BeanAnyPtr> {
        instance
            .downcast::<Holder>()
            .map(|instance| Box::new(instance) as Box<dyn Any>)
    }

    fn inject_service(
        owner: &(dyn Any + Send + Sync),
        dependency: &crate::container::Bean,
    ) -> Result<(), InjectionError> {
        let owner = owner
            .downcast_ref::<Holder>()
            .ok_or_else(|| InjectionError::IncompatibleOwner("Holder".to_string()))?;
        owner.service.inject(dependency)
    }

    fn holder(qualifier: Option<&'static str>) -> TypeDescriptor {
        let mut holder = descriptor("app::Holder");
        holder.roles = vec![RoleMarker {
            role: Role::Component,
            name: Some("holder"),
        }];
        holder.constructor = construct_holder;
        holder.cast = cast_holder;
        holder.fields = vec![FieldDescriptor {
            name: "service",
            type_name: <Autowired<CountingService> as InjectionPoint>::target_type_name(),
            qualifier,
            inject: inject_service,
        }];
        holder
    }

    fn service(name: &'static str) -> TypeDescriptor {
        let mut service = descriptor(name);
        service.roles = vec![RoleMarker {
            role: Role::Component,
            name: None,
        }];
        service.constructor = construct_service;
        service.cast = cast_service;
        service
    }

    #[test]
    fn should_inject_by_type_name() {
        let catalog = TypeCatalog::new([
            holder(None),
            service("sprig::test_support::CountingService"),
        ]);
        let (container, _) = Container::build(
            &catalog,
            &["app::Holder", "sprig::test_support::CountingService"],
        );

        assert!(inject(&container).is_empty());

        let holder = container.bean_typed::<Holder>("holder").unwrap();
        let service = container
            .bean_typed::<CountingService>("sprig::test_support::CountingService")
            .unwrap();
        assert!(Arc::ptr_eq(Autowired::get(&holder.service).unwrap(), &service));
    }

    #[test]
    fn should_inject_by_trimmed_explicit_name() {
        let catalog = TypeCatalog::new([holder(Some(" app::Other ")), service("app::Other")]);
        let (container, _) = Container::build(&catalog, &["app::Holder", "app::Other"]);

        assert!(inject(&container).is_empty());

        let holder = container.bean_typed::<Holder>("holder").unwrap();
        assert!(Autowired::is_injected(&holder.service));
    }

    #[test]
    fn should_leave_missing_dependency_empty() {
        let catalog = TypeCatalog::new([holder(None)]);
        let (container, _) = Container::build(&catalog, &["app::Holder"]);

        let diagnostics = inject(&container);
        assert!(matches!(
            diagnostics.as_slice(),
            [Diagnostic::Injection(warning)]
                if warning.field == "service"
                    && warning.reason == InjectionWarningReason::MissingBean(
                        "sprig::test_support::CountingService".to_string()
                    )
        ));

        let holder = container.bean_typed::<Holder>("holder").unwrap();
        assert!(!Autowired::is_injected(&holder.service));
    }

    #[test]
    fn should_reject_incompatible_dependency() {
        let catalog = TypeCatalog::new([holder(Some("holder"))]);
        let (container, _) = Container::build(&catalog, &["app::Holder"]);

        let diagnostics = inject(&container);
        assert!(matches!(
            diagnostics.as_slice(),
            [Diagnostic::Injection(warning)]
                if matches!(warning.reason, InjectionWarningReason::Rejected(_))
        ));
    }

    #[test]
    #[should_panic(expected = "has not been injected")]
    fn should_panic_on_empty_dereference() {
        let holder = Holder::default();
        holder.service.increment();
    }

    #[test]
    fn should_not_hide_methods_of_injected_type() {
        let directory = Autowired::<Directory>::default();
        assert!(Autowired::get(&directory).is_none());

        let _ = directory.cell.set(Arc::new(Directory));

        assert_eq!(directory.get("home"), "entry home");
        assert!(Autowired::is_injected(&directory));
    }
}
