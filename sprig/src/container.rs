//! The bean registry. Scanned types carrying a role marker are instantiated exactly once and
//! stored under their bean keys:
//!
//! * controllers - explicit name, or the simple type name with the first character lower-cased,
//! * components - explicit name, or the fully-qualified type name,
//! * services - explicit name, or the fully-qualified name of *each* implemented interface; all
//! such keys point at the same instance.
//!
//! When a type carries multiple role markers, controller takes precedence over service, which takes
//! precedence over component. The first bean registered under a key keeps it.

use crate::descriptor::{
    lower_first, BeanAnyPtr, BeanPtr, InstantiationFailure, Role, TypeCatalog, TypeDescriptor,
};
use crate::error::{Diagnostic, InstantiationError};
use fxhash::FxHashMap;
use itertools::Itertools;
use std::iter;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A live instance of a registered type.
#[derive(Clone, Debug)]
pub struct Bean {
    instance: BeanAnyPtr,
    descriptor: Arc<TypeDescriptor>,
}

impl Bean {
    pub fn new(instance: BeanAnyPtr, descriptor: Arc<TypeDescriptor>) -> Self {
        Self {
            instance,
            descriptor,
        }
    }

    /// The type-erased instance.
    #[inline]
    pub fn instance(&self) -> &BeanAnyPtr {
        &self.instance
    }

    /// Descriptor of the type this bean was created from.
    #[inline]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Returns the instance as `T`, which can be either the concrete type, or any
    /// `dyn Interface + Send + Sync` registered for it.
    pub fn cast<T: ?Sized + 'static>(&self) -> Option<BeanPtr<T>> {
        iter::once(self.descriptor.cast)
            .chain(self.descriptor.interfaces.iter().map(|interface| interface.cast))
            .find_map(|cast| {
                cast(self.instance.clone())
                    .ok()
                    .and_then(|instance| instance.downcast::<BeanPtr<T>>().ok())
                    .map(|instance| *instance)
            })
    }

    /// Checks if both beans point to the same instance.
    #[inline]
    pub fn is_same_instance(&self, other: &Bean) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

/// Returns the role of a type according to marker precedence, together with its explicit name.
pub fn classify(descriptor: &TypeDescriptor) -> Option<(Role, Option<&'static str>)> {
    [Role::Controller, Role::Service, Role::Component]
        .into_iter()
        .find_map(|role| {
            descriptor
                .role_marker(role)
                .map(|marker| (role, marker.name.filter(|name| !name.is_empty())))
        })
}

/// Computes the keys under which an instance of the given type is registered.
pub fn bean_keys(descriptor: &TypeDescriptor) -> Vec<String> {
    match classify(descriptor) {
        Some((_, Some(name))) => vec![name.to_string()],
        Some((Role::Controller, None)) => vec![lower_first(descriptor.simple_name)],
        Some((Role::Component, None)) => vec![descriptor.name.to_string()],
        Some((Role::Service, None)) => descriptor
            .interfaces
            .iter()
            .map(|interface| interface.name.to_string())
            .collect(),
        None => vec![],
    }
}

/// Registry owning all bean instances for the lifetime of the process.
#[derive(Clone, Debug, Default)]
pub struct Container {
    beans: Vec<Bean>,
    keys: FxHashMap<String, usize>,
    // constructed, but not reachable by any key
    orphans: Vec<Bean>,
}

impl Container {
    /// Instantiates all beans among given scanned types. Failures are isolated to the type which
    /// caused them and returned as diagnostics.
    pub fn build(catalog: &TypeCatalog, type_names: &[&str]) -> (Self, Vec<Diagnostic>) {
        let mut container = Self::default();
        let mut diagnostics = vec![];

        for type_name in type_names {
            let Some(descriptor) = catalog.descriptor(type_name) else {
                report(
                    &mut diagnostics,
                    InstantiationError::UnknownType(type_name.to_string()).into(),
                );
                continue;
            };

            if classify(descriptor).is_none() {
                continue;
            }

            match (descriptor.constructor)() {
                Ok(instance) => container.register(
                    Bean::new(instance, Arc::new(descriptor.clone())),
                    &mut diagnostics,
                ),
                Err(failure) => report(
                    &mut diagnostics,
                    instantiation_error(descriptor.name, failure).into(),
                ),
            }
        }

        info!(
            "Registered {} beans under {} keys.",
            container.beans.len(),
            container.keys.len()
        );

        (container, diagnostics)
    }

    fn register(&mut self, bean: Bean, diagnostics: &mut Vec<Diagnostic>) {
        let keys = bean_keys(bean.descriptor());
        if keys.is_empty() {
            report(
                diagnostics,
                Diagnostic::OrphanService(bean.descriptor().name.to_string()),
            );
            self.orphans.push(bean);
            return;
        }

        let index = self.beans.len();
        let mut registered = false;

        for key in keys {
            if self.keys.contains_key(&key) {
                report(
                    diagnostics,
                    Diagnostic::DuplicateBeanKey {
                        key,
                        type_name: bean.descriptor().name.to_string(),
                    },
                );
            } else {
                debug!("Registering {} as {key}.", bean.descriptor().name);
                self.keys.insert(key, index);
                registered = true;
            }
        }

        if registered {
            self.beans.push(bean);
        } else {
            self.orphans.push(bean);
        }
    }

    /// Looks up a bean by key.
    pub fn bean(&self, key: &str) -> Option<&Bean> {
        self.keys.get(key).and_then(|index| self.beans.get(*index))
    }

    /// Looks up a bean by key and casts it to `T`. See [Bean::cast].
    pub fn bean_typed<T: ?Sized + 'static>(&self, key: &str) -> Option<BeanPtr<T>> {
        self.bean(key).and_then(Bean::cast::<T>)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.keys.keys().map(String::as_str).sorted().collect()
    }

    /// Keys pointing at given bean, sorted.
    pub fn keys_of(&self, bean: &Bean) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|(_, index)| self.beans[**index].is_same_instance(bean))
            .map(|(key, _)| key.as_str())
            .sorted()
            .collect()
    }

    /// Distinct reachable beans, in registration order.
    #[inline]
    pub fn beans(&self) -> &[Bean] {
        &self.beans
    }

    /// Beans which were constructed, but cannot be reached by any key.
    #[inline]
    pub fn orphans(&self) -> &[Bean] {
        &self.orphans
    }

    /// Number of registered keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn instantiation_error(type_name: &str, failure: InstantiationFailure) -> InstantiationError {
    match failure {
        InstantiationFailure::Error(source) => InstantiationError::ConstructorError {
            type_name: type_name.to_string(),
            source,
        },
        InstantiationFailure::Panic(message) => InstantiationError::ConstructorPanic {
            type_name: type_name.to_string(),
            message,
        },
    }
}

pub(crate) fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}

#[cfg(test)]
mod tests {
    use crate::container::{bean_keys, classify, Container};
    use crate::descriptor::{
        BeanAnyPtr, InstantiationFailure, InterfaceDescriptor, Role, RoleMarker, TypeCatalog,
    };
    use crate::error::{Diagnostic, InstantiationError};
    use crate::test_support::{descriptor, CountingService, FirstInterface, SecondInterface};
    use std::any::Any;
    use std::sync::Arc;

    fn marker(role: Role, name: Option<&'static str>) -> RoleMarker {
        RoleMarker { role, name }
    }

    fn failing_constructor() -> Result<BeanAnyPtr, InstantiationFailure> {
        Err(InstantiationFailure::Panic("boom".to_string()))
    }

    fn service_constructor() -> Result<BeanAnyPtr, InstantiationFailure> {
        Ok(Arc::new(CountingService::default()) as BeanAnyPtr)
    }

    fn cast_service(instance: BeanAnyPtr) -> Result<Box<dyn Any>, BeanAnyPtr> {
        instance
            .downcast::<CountingService>()
            .map(|instance| Box::new(instance) as Box<dyn Any>)
    }

    fn cast_first(instance: BeanAnyPtr) -> Result<Box<dyn Any>, BeanAnyPtr> {
        instance.downcast::<CountingService>().map(|instance| {
            Box::new(instance as Arc<dyn FirstInterface + Send + Sync>) as Box<dyn Any>
        })
    }

    fn cast_second(instance: BeanAnyPtr) -> Result<Box<dyn Any>, BeanAnyPtr> {
        instance.downcast::<CountingService>().map(|instance| {
            Box::new(instance as Arc<dyn SecondInterface + Send + Sync>) as Box<dyn Any>
        })
    }

    fn two_interface_service() -> crate::descriptor::TypeDescriptor {
        let mut service = descriptor("app::service::CountingService");
        service.roles = vec![marker(Role::Service, None)];
        service.constructor = service_constructor;
        service.cast = cast_service;
        service.interfaces = vec![
            InterfaceDescriptor {
                name: "app::service::FirstInterface",
                cast: cast_first,
            },
            InterfaceDescriptor {
                name: "app::service::SecondInterface",
                cast: cast_second,
            },
        ];
        service
    }

    #[test]
    fn should_classify_by_precedence() {
        let mut descriptor = descriptor("app::Both");
        descriptor.roles = vec![
            marker(Role::Component, Some("component")),
            marker(Role::Controller, Some("")),
            marker(Role::Service, Some("service")),
        ];

        assert_eq!(classify(&descriptor), Some((Role::Controller, None)));
        assert_eq!(bean_keys(&descriptor), vec!["both".to_string()]);
    }

    #[test]
    fn should_derive_default_keys() {
        let mut controller = descriptor("app::web::DemoController");
        controller.roles = vec![marker(Role::Controller, None)];
        assert_eq!(bean_keys(&controller), vec!["demoController".to_string()]);

        let mut component = descriptor("app::model::User");
        component.roles = vec![marker(Role::Component, None)];
        assert_eq!(bean_keys(&component), vec!["app::model::User".to_string()]);

        let mut named = descriptor("app::model::User");
        named.roles = vec![marker(Role::Component, Some("user"))];
        assert_eq!(bean_keys(&named), vec!["user".to_string()]);

        let unmarked = descriptor("app::model::Plain");
        assert!(bean_keys(&unmarked).is_empty());
    }

    #[test]
    fn should_register_service_under_each_interface() {
        let service = two_interface_service();
        let catalog = TypeCatalog::new([service]);

        let (container, diagnostics) =
            Container::build(&catalog, &["app::service::CountingService"]);

        assert!(diagnostics.is_empty());
        assert_eq!(
            container.keys(),
            vec!["app::service::FirstInterface", "app::service::SecondInterface"]
        );

        let first = container.bean("app::service::FirstInterface").unwrap();
        let second = container.bean("app::service::SecondInterface").unwrap();
        assert!(first.is_same_instance(second));

        let first = container
            .bean_typed::<dyn FirstInterface + Send + Sync>("app::service::FirstInterface")
            .unwrap();
        let second = container
            .bean_typed::<dyn SecondInterface + Send + Sync>("app::service::SecondInterface")
            .unwrap();
        first.increment();
        assert_eq!(second.count(), 1);
    }

    #[test]
    fn should_cast_bean_to_any_implemented_interface() {
        let catalog = TypeCatalog::new([two_interface_service()]);
        let (container, _) = Container::build(&catalog, &["app::service::CountingService"]);

        let bean = container.bean("app::service::FirstInterface").unwrap();
        assert!(bean.cast::<CountingService>().is_some());
        assert!(bean.cast::<dyn SecondInterface + Send + Sync>().is_some());
        assert!(bean.cast::<String>().is_none());
    }

    #[test]
    fn should_report_orphan_service() {
        let mut service = descriptor("app::service::Lonely");
        service.roles = vec![marker(Role::Service, None)];
        let catalog = TypeCatalog::new([service]);

        let (container, diagnostics) = Container::build(&catalog, &["app::service::Lonely"]);

        assert!(container.is_empty());
        assert_eq!(container.orphans().len(), 1);
        assert!(matches!(
            diagnostics.as_slice(),
            [Diagnostic::OrphanService(name)] if name == "app::service::Lonely"
        ));
    }

    #[test]
    fn should_skip_failing_beans() {
        let mut failing = descriptor("app::Failing");
        failing.roles = vec![marker(Role::Component, None)];
        failing.constructor = failing_constructor;

        let mut working = descriptor("app::Working");
        working.roles = vec![marker(Role::Component, None)];

        let catalog = TypeCatalog::new([failing, working]);
        let (container, diagnostics) =
            Container::build(&catalog, &["app::Failing", "app::Missing", "app::Working"]);

        assert_eq!(container.keys(), vec!["app::Working"]);
        assert!(matches!(
            diagnostics.as_slice(),
            [
                Diagnostic::Instantiation(InstantiationError::ConstructorPanic { .. }),
                Diagnostic::Instantiation(InstantiationError::UnknownType(_)),
            ]
        ));
    }

    #[test]
    fn should_keep_first_registration_on_key_collision() {
        let mut first = descriptor("app::a::Thing");
        first.roles = vec![marker(Role::Component, Some("thing"))];

        let mut second = descriptor("app::b::Thing");
        second.roles = vec![marker(Role::Component, Some("thing"))];

        let catalog = TypeCatalog::new([first, second]);
        let (container, diagnostics) =
            Container::build(&catalog, &["app::a::Thing", "app::b::Thing"]);

        assert_eq!(container.len(), 1);
        assert_eq!(
            container.bean("thing").unwrap().descriptor().name,
            "app::a::Thing"
        );
        assert!(matches!(
            diagnostics.as_slice(),
            [Diagnostic::DuplicateBeanKey { key, .. }] if key == "thing"
        ));
    }

    #[test]
    fn should_skip_unmarked_types() {
        let catalog = TypeCatalog::new([descriptor("app::Plain")]);
        let (container, diagnostics) = Container::build(&catalog, &["app::Plain"]);

        assert!(container.is_empty());
        assert!(diagnostics.is_empty());
    }
}
