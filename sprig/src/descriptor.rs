//! Static type information about beans. Every marked type contributes a [TypeDescriptor], which
//! is the only thing the container, injector and route builder ever look at - user types are
//! never inspected directly.
//!
//! Descriptors are produced by the `sprig-derive` macros and registered at link time:
//!
//! * `#[derive(Bean)]` registers the type itself, together with its role markers, class-level
//! request mapping and `#[autowired]` fields,
//! * `#[bean_interface]` on a trait implementation registers an implemented interface,
//! * `#[routes]` on an inherent impl block registers public `#[request_mapping]` methods.
//!
//! [TypeCatalog] merges all registrations into complete descriptors.

use crate::container::Bean;
use crate::dispatcher::Invocation;
use crate::error::{DispatchError, ErrorPtr, InjectionError};
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::debug;

/// Pointer to a concrete bean instance.
pub type BeanPtr<T> = Arc<T>;

/// Type-erased pointer to a bean instance.
pub type BeanAnyPtr = BeanPtr<dyn Any + Send + Sync + 'static>;

/// Creates a new instance of a bean using its zero-argument constructor.
pub type ConstructorFunction = fn() -> Result<BeanAnyPtr, InstantiationFailure>;

/// Converts a type-erased instance into a `Box<BeanPtr<T>>` for some `T`, boxed again as
/// [Any]. `T` is either the concrete type, or `dyn Interface + Send + Sync`.
pub type CastFunction = fn(instance: BeanAnyPtr) -> Result<Box<dyn Any>, BeanAnyPtr>;

/// Sets a single injected field of `owner` to the given dependency.
pub type InjectFunction =
    fn(owner: &(dyn Any + Send + Sync), dependency: &Bean) -> Result<(), InjectionError>;

/// Calls a handler method on a bean with arguments taken from an [Invocation].
pub type InvokeFunction =
    fn(bean: &(dyn Any + Send + Sync), invocation: &mut Invocation<'_>) -> Result<(), DispatchError>;

/// Reason for a failed construction, before it gets attributed to a type.
#[derive(Clone, Debug)]
pub enum InstantiationFailure {
    Error(ErrorPtr),
    Panic(String),
}

/// Types which can be looked up by their fully-qualified name - beans and `dyn Interface + Send +
/// Sync` types marked with `#[injectable]`.
pub trait Injectable: 'static {
    /// Fully-qualified name, e.g. `my_app::service::DemoService`.
    fn type_name() -> &'static str;
}

/// Role declared by a type-level marker.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Role {
    Controller,
    Service,
    Component,
}

/// A single role marker, with an optional explicit bean name.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RoleMarker {
    pub role: Role,
    pub name: Option<&'static str>,
}

/// A field carrying the injection marker.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Fully-qualified name of the injected type.
    pub type_name: &'static str,
    /// Explicit bean name given on the marker.
    pub qualifier: Option<&'static str>,
    #[derivative(Debug = "ignore")]
    pub inject: InjectFunction,
}

/// What a handler parameter receives when invoked.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ParameterKind {
    Request,
    Response,
    Text,
    Other,
}

/// A public method carrying the route marker.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub path: &'static str,
    /// Simple name of the type declaring this method.
    pub declaring_type: &'static str,
    pub parameters: Vec<ParameterKind>,
    #[derivative(Debug = "ignore")]
    pub invoke: InvokeFunction,
}

/// An interface (trait) implemented by a bean type.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct InterfaceDescriptor {
    /// Fully-qualified name of the trait.
    pub name: &'static str,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

/// Everything known about a discovered type.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub simple_name: &'static str,
    #[derivative(Debug = "ignore")]
    pub type_id: TypeId,
    pub roles: Vec<RoleMarker>,
    /// Value of the class-level request mapping.
    pub request_mapping: Option<&'static str>,
    pub fields: Vec<FieldDescriptor>,
    pub methods: Vec<MethodDescriptor>,
    pub interfaces: Vec<InterfaceDescriptor>,
    #[derivative(Debug = "ignore")]
    pub constructor: ConstructorFunction,
    #[derivative(Debug = "ignore")]
    pub cast: CastFunction,
}

impl TypeDescriptor {
    /// Returns the marker for given role, if declared.
    pub fn role_marker(&self, role: Role) -> Option<&RoleMarker> {
        self.roles.iter().find(|marker| marker.role == role)
    }

    /// Checks if the type carries the given role marker.
    #[inline]
    pub fn has_role(&self, role: Role) -> bool {
        self.role_marker(role).is_some()
    }

    /// Module path of the type.
    pub fn module_path(&self) -> &'static str {
        self.name
            .rsplit_once("::")
            .map(|(module, _)| module)
            .unwrap_or_default()
    }
}

/// Index of all known type descriptors by fully-qualified name.
#[derive(Clone, Debug, Default)]
pub struct TypeCatalog {
    types: FxHashMap<&'static str, TypeDescriptor>,
}

impl TypeCatalog {
    /// Creates a catalog from given, already complete, descriptors.
    pub fn new<I: IntoIterator<Item = TypeDescriptor>>(descriptors: I) -> Self {
        Self {
            types: descriptors
                .into_iter()
                .map(|descriptor| (descriptor.name, descriptor))
                .collect(),
        }
    }

    /// Creates a catalog from all types, methods and interfaces registered by the derive macros
    /// in the current binary.
    pub fn from_registrations() -> Self {
        let mut methods = inventory::iter::<internal::MethodRegistration>
            .into_iter()
            .map(|registration| (registration.describe)())
            .into_group_map_by(|definition| definition.target);

        let mut interfaces = inventory::iter::<internal::InterfaceRegistration>
            .into_iter()
            .map(|registration| (registration.describe)())
            .into_group_map_by(|definition| definition.target);

        let catalog = Self::new(
            inventory::iter::<internal::TypeRegistration>
                .into_iter()
                .map(|registration| {
                    let mut descriptor = (registration.describe)();
                    descriptor.methods = methods
                        .remove(&descriptor.type_id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|definition| definition.descriptor)
                        .collect();
                    descriptor.interfaces = interfaces
                        .remove(&descriptor.type_id)
                        .unwrap_or_default()
                        .into_iter()
                        .map(|definition| definition.descriptor)
                        .collect();
                    descriptor
                }),
        );

        debug!("Collected {} registered types.", catalog.len());
        catalog
    }

    /// Loads the descriptor of a type with given fully-qualified name.
    #[inline]
    pub fn descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Iterates over the names of all known types.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Lower-cases the first character of a name: `DemoController` becomes `demoController`.
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    chars
        .next()
        .map(|first| first.to_lowercase().chain(chars).collect())
        .unwrap_or_default()
}

#[doc(hidden)]
pub mod internal {
    use crate::descriptor::{
        BeanAnyPtr, InstantiationFailure, InterfaceDescriptor, MethodDescriptor, TypeDescriptor,
    };
    use crate::error::{panic_message, ErrorPtr};
    use std::any::TypeId;
    use std::error::Error;
    use std::panic::catch_unwind;
    use std::sync::Arc;

    pub use inventory::submit;

    pub struct TypeRegistration {
        pub describe: fn() -> TypeDescriptor,
    }

    pub struct MethodDefinition {
        pub target: TypeId,
        pub descriptor: MethodDescriptor,
    }

    pub struct MethodRegistration {
        pub describe: fn() -> MethodDefinition,
    }

    pub struct InterfaceDefinition {
        pub target: TypeId,
        pub descriptor: InterfaceDescriptor,
    }

    pub struct InterfaceRegistration {
        pub describe: fn() -> InterfaceDefinition,
    }

    inventory::collect!(TypeRegistration);
    inventory::collect!(MethodRegistration);
    inventory::collect!(InterfaceRegistration);

    /// Constructs a bean with its [Default] implementation.
    pub fn construct_default<T: Default + Send + Sync + 'static>(
    ) -> Result<BeanAnyPtr, InstantiationFailure> {
        catch_unwind(T::default)
            .map(|instance| Arc::new(instance) as BeanAnyPtr)
            .map_err(|payload| InstantiationFailure::Panic(panic_message(payload.as_ref())))
    }

    /// Constructs a bean with a custom, fallible constructor.
    pub fn construct_with<T, E>(
        constructor: fn() -> Result<T, E>,
    ) -> Result<BeanAnyPtr, InstantiationFailure>
    where
        T: Send + Sync + 'static,
        E: Error + Send + Sync + 'static,
    {
        match catch_unwind(constructor) {
            Ok(Ok(instance)) => Ok(Arc::new(instance) as BeanAnyPtr),
            Ok(Err(error)) => Err(InstantiationFailure::Error(Arc::new(error) as ErrorPtr)),
            Err(payload) => Err(InstantiationFailure::Panic(panic_message(payload.as_ref()))),
        }
    }
}
