//! Declaration of loggable quantities on Rust types.
//!
//! A type opts in by implementing [`Loggable`]. Its [`Loggable::declare`]
//! runs once, inside a fresh scope on a [`DeclarationStack`], and records each
//! quantity together with a typed accessor. When `declare` returns, the scope
//! is popped and turned into the type's [`ExportTable`], which is cached in a
//! [`LoggableRegistry`] for the rest of the process.
//!
//! Bases are pulled in with [`TypeScope::inherit`], which registers the base in
//! its own nested scope first. Declarations therefore never leak between the
//! two types, no matter how deeply registrations nest.

use super::namespace::Namespace;
use super::quantity::{LogFlag, LogValue, LoggerQuantity, QuantityError};
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("Multiple loggable quantities named '{name}' declared on {namespace}")]
    Duplicate { name: String, namespace: Namespace },

    #[error("Quantity '{name}' declared outside of any type scope")]
    NoOpenScope { name: String },

    #[error("Declaration scope for {expected} was closed out of order")]
    UnbalancedScope { expected: Namespace },

    #[error("Type {namespace} inherits from itself")]
    Cycle { namespace: Namespace },

    #[error(transparent)]
    Quantity(#[from] QuantityError),
}

/// Whether a quantity reads like a field or is computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Property,
    Method,
}

pub type Accessor<T> = Arc<dyn Fn(&T) -> LogValue + Send + Sync>;

pub struct ExportEntry<T> {
    quantity: LoggerQuantity,
    access: AccessKind,
    accessor: Accessor<T>,
}

impl<T> ExportEntry<T> {
    pub fn quantity(&self) -> &LoggerQuantity {
        &self.quantity
    }

    pub fn access(&self) -> AccessKind {
        self.access
    }

    pub fn accessor(&self) -> Accessor<T> {
        Arc::clone(&self.accessor)
    }

    pub fn read(&self, object: &T) -> LogValue {
        (self.accessor)(object)
    }
}

impl<T> Clone for ExportEntry<T> {
    fn clone(&self) -> Self {
        Self {
            quantity: self.quantity.clone(),
            access: self.access,
            accessor: Arc::clone(&self.accessor),
        }
    }
}

impl<T> fmt::Debug for ExportEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportEntry")
            .field("quantity", &self.quantity)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// Every quantity a type exports, keyed by quantity name.
pub struct ExportTable<T> {
    entries: BTreeMap<String, ExportEntry<T>>,
}

impl<T> ExportTable<T> {
    pub fn get(&self, name: &str) -> Option<&ExportEntry<T>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExportEntry<T>)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `names`, or every entry when `names` is `None`.
    ///
    /// On failure the error carries all unresolved names, not just the first.
    pub fn resolve(&self, names: Option<&[&str]>) -> Result<Vec<&ExportEntry<T>>, Vec<String>> {
        let Some(names) = names else {
            return Ok(self.entries.values().collect());
        };
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.entries.get(*name) {
                Some(entry) => found.push(entry),
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(found)
        } else {
            Err(missing)
        }
    }
}

impl<T> fmt::Debug for ExportTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// A type whose state can be exported through a
/// [`Logger`](super::logger::Logger).
pub trait Loggable: Sized + 'static {
    /// Module path segments followed by the type name.
    fn namespace() -> Namespace {
        type_namespace::<Self>()
    }

    /// Declares this type's quantities. Runs once per process.
    ///
    /// Bases must be registered through [`TypeScope::inherit`], never through
    /// [`export_table`], which would re-enter the global registry lock.
    fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError>;
}

/// Derives a namespace from the type's path, dropping generic arguments.
pub fn type_namespace<T: ?Sized>() -> Namespace {
    let full = std::any::type_name::<T>();
    let path = full.split('<').next().unwrap_or(full);
    Namespace::new(path.split("::").filter(|segment| !segment.is_empty()))
}

/// Names declared so far by the type currently under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationScope {
    namespace: Namespace,
    declared: Vec<(String, LogFlag)>,
}

impl DeclarationScope {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn declared(&self) -> &[(String, LogFlag)] {
        &self.declared
    }
}

#[derive(Debug, Default)]
pub struct DeclarationStack {
    scopes: Vec<DeclarationScope>,
}

impl DeclarationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, namespace: Namespace) {
        self.scopes.push(DeclarationScope {
            namespace,
            declared: Vec::new(),
        });
    }

    /// Records `name` in the innermost open scope.
    pub fn declare(&mut self, name: &str, flag: LogFlag) -> Result<(), DeclarationError> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| DeclarationError::NoOpenScope {
                name: name.to_string(),
            })?;
        if scope.declared.iter().any(|(declared, _)| declared == name) {
            return Err(DeclarationError::Duplicate {
                name: name.to_string(),
                namespace: scope.namespace.clone(),
            });
        }
        scope.declared.push((name.to_string(), flag));
        Ok(())
    }

    pub fn pop(&mut self) -> Option<DeclarationScope> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

/// Handed to [`Loggable::declare`] while a type's scope is open.
pub struct TypeScope<'r, T> {
    registry: &'r mut LoggableRegistry,
    inherited: BTreeMap<String, ExportEntry<T>>,
    accessors: HashMap<String, (AccessKind, Accessor<T>)>,
}

impl<T: Loggable> TypeScope<'_, T> {
    /// Declares a property-style quantity.
    pub fn quantity<F>(
        &mut self,
        name: &str,
        flag: LogFlag,
        accessor: F,
    ) -> Result<&mut Self, DeclarationError>
    where
        F: Fn(&T) -> LogValue + Send + Sync + 'static,
    {
        self.declare_with(name, flag, AccessKind::Property, Arc::new(accessor))
    }

    pub fn scalar<F>(&mut self, name: &str, accessor: F) -> Result<&mut Self, DeclarationError>
    where
        F: Fn(&T) -> LogValue + Send + Sync + 'static,
    {
        self.quantity(name, LogFlag::Scalar, accessor)
    }

    /// Declares a quantity computed by a method call rather than read as a
    /// property.
    pub fn method<F>(
        &mut self,
        name: &str,
        flag: LogFlag,
        accessor: F,
    ) -> Result<&mut Self, DeclarationError>
    where
        F: Fn(&T) -> LogValue + Send + Sync + 'static,
    {
        self.declare_with(name, flag, AccessKind::Method, Arc::new(accessor))
    }

    /// Copies every quantity of `B` into this type, reading them through
    /// `project`. Quantities declared on this type win over inherited ones.
    pub fn inherit<B: Loggable>(
        &mut self,
        project: fn(&T) -> &B,
    ) -> Result<&mut Self, DeclarationError> {
        let base = self.registry.register::<B>()?;
        for (name, entry) in base.iter() {
            let base_accessor = entry.accessor();
            let lifted: Accessor<T> = Arc::new(move |object: &T| base_accessor(project(object)));
            self.inherited.insert(
                name.to_string(),
                ExportEntry {
                    quantity: entry.quantity.clone(),
                    access: entry.access,
                    accessor: lifted,
                },
            );
        }
        Ok(self)
    }

    fn declare_with(
        &mut self,
        name: &str,
        flag: LogFlag,
        access: AccessKind,
        accessor: Accessor<T>,
    ) -> Result<&mut Self, DeclarationError> {
        self.registry.stack.declare(name, flag)?;
        self.accessors.insert(name.to_string(), (access, accessor));
        Ok(self)
    }
}

/// Builds and caches one [`ExportTable`] per registered type.
#[derive(Default)]
pub struct LoggableRegistry {
    tables: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    in_progress: HashSet<TypeId>,
    stack: DeclarationStack,
}

impl LoggableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_registered<T: Loggable>(&self) -> bool {
        self.tables.contains_key(&TypeId::of::<T>())
    }

    pub fn open_scopes(&self) -> usize {
        self.stack.depth()
    }

    /// Returns the export table of `T`, building it on first use.
    pub fn register<T: Loggable>(&mut self) -> Result<Arc<ExportTable<T>>, DeclarationError> {
        let type_id = TypeId::of::<T>();
        if let Some(table) = self.lookup::<T>() {
            return Ok(table);
        }
        let namespace = T::namespace();
        if !self.in_progress.insert(type_id) {
            return Err(DeclarationError::Cycle { namespace });
        }

        self.stack.push(namespace.clone());
        let outcome = {
            let mut scope = TypeScope {
                registry: &mut *self,
                inherited: BTreeMap::new(),
                accessors: HashMap::new(),
            };
            let result = T::declare(&mut scope);
            let TypeScope {
                inherited,
                accessors,
                ..
            } = scope;
            result.map(|()| (inherited, accessors))
        };
        let closed = self.stack.pop();
        self.in_progress.remove(&type_id);

        let (mut entries, mut accessors) = outcome?;
        let closed = closed
            .filter(|scope| scope.namespace == namespace)
            .ok_or_else(|| DeclarationError::UnbalancedScope {
                expected: namespace.clone(),
            })?;

        for (name, flag) in closed.declared {
            let Some((access, accessor)) = accessors.remove(&name) else {
                continue;
            };
            let quantity = LoggerQuantity::new(name.clone(), namespace.clone(), flag)?;
            entries.insert(
                name,
                ExportEntry {
                    quantity,
                    access,
                    accessor,
                },
            );
        }

        let table = Arc::new(ExportTable { entries });
        debug!(
            %namespace,
            quantities = table.len(),
            "Registered loggable type."
        );
        self.tables.insert(type_id, table.clone());
        Ok(table)
    }

    fn lookup<T: Loggable>(&self) -> Option<Arc<ExportTable<T>>> {
        self.tables
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|table| table.downcast::<ExportTable<T>>().ok())
    }
}

static GLOBAL_REGISTRY: LazyLock<Mutex<LoggableRegistry>> =
    LazyLock::new(|| Mutex::new(LoggableRegistry::new()));

/// The process-wide export table of `T`.
pub fn export_table<T: Loggable>() -> Result<Arc<ExportTable<T>>, DeclarationError> {
    GLOBAL_REGISTRY.lock().register::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thermo {
        kinetic_energy: f64,
        pressure: f64,
    }

    impl Loggable for Thermo {
        fn namespace() -> Namespace {
            Namespace::from(["md", "compute", "Thermo"])
        }

        fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
            scope
                .scalar("kinetic_energy", |t| t.kinetic_energy.into())?
                .scalar("pressure", |t| t.pressure.into())?;
            Ok(())
        }
    }

    struct Barostat {
        thermo: Thermo,
        target: f64,
    }

    impl Loggable for Barostat {
        fn namespace() -> Namespace {
            Namespace::from(["md", "Barostat"])
        }

        fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
            scope
                .inherit::<Thermo>(|b| &b.thermo)?
                .method("pressure", LogFlag::Sequence, |b| {
                    vec![b.thermo.pressure, b.target].into()
                })?
                .scalar("target", |b| b.target.into())?;
            Ok(())
        }
    }

    struct Repeated;

    impl Loggable for Repeated {
        fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
            scope.scalar("value", |_| LogValue::Int(1))?;
            scope.scalar("value", |_| LogValue::Int(2))?;
            Ok(())
        }
    }

    struct First;
    struct Second;

    impl Loggable for First {
        fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
            scope.scalar("value", |_| LogValue::Int(1))?;
            Ok(())
        }
    }

    impl Loggable for Second {
        fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
            scope.scalar("value", |_| LogValue::Int(2))?;
            Ok(())
        }
    }

    struct SelfReferential {
        value: f64,
    }

    impl Loggable for SelfReferential {
        fn declare(scope: &mut TypeScope<'_, Self>) -> Result<(), DeclarationError> {
            scope.inherit::<SelfReferential>(|s| s)?;
            scope.scalar("value", |s| s.value.into())?;
            Ok(())
        }
    }

    #[test]
    fn declared_quantities_carry_the_type_namespace() {
        let mut registry = LoggableRegistry::new();
        let table = registry.register::<Thermo>().unwrap();

        let entry = table.get("kinetic_energy").unwrap();
        assert_eq!(
            entry.quantity().namespace(),
            &Namespace::from(["md", "compute", "Thermo"])
        );
        assert_eq!(entry.quantity().flag(), LogFlag::Scalar);
        assert_eq!(entry.access(), AccessKind::Property);

        let thermo = Thermo {
            kinetic_energy: 2.5,
            pressure: 0.1,
        };
        assert_eq!(entry.read(&thermo), LogValue::Float(2.5));
    }

    #[test]
    fn duplicate_declaration_on_one_type_fails() {
        let mut registry = LoggableRegistry::new();

        let result = registry.register::<Repeated>();

        assert!(matches!(
            result,
            Err(DeclarationError::Duplicate { ref name, .. }) if name == "value"
        ));
        assert!(!registry.is_registered::<Repeated>());
        assert_eq!(registry.open_scopes(), 0);
    }

    #[test]
    fn same_name_on_unrelated_types_is_fine() {
        let mut registry = LoggableRegistry::new();

        let first = registry.register::<First>().unwrap();
        let second = registry.register::<Second>().unwrap();

        assert_eq!(first.get("value").unwrap().read(&First), LogValue::Int(1));
        assert_eq!(second.get("value").unwrap().read(&Second), LogValue::Int(2));
    }

    #[test]
    fn subtype_merges_base_table_and_wins_collisions() {
        let mut registry = LoggableRegistry::new();
        let table = registry.register::<Barostat>().unwrap();

        let mut names: Vec<_> = table.names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["kinetic_energy", "pressure", "target"]);

        let barostat = Barostat {
            thermo: Thermo {
                kinetic_energy: 4.0,
                pressure: 1.0,
            },
            target: 2.0,
        };

        let inherited = table.get("kinetic_energy").unwrap();
        assert_eq!(
            inherited.quantity().namespace(),
            &Namespace::from(["md", "compute", "Thermo"])
        );
        assert_eq!(inherited.read(&barostat), LogValue::Float(4.0));

        let overridden = table.get("pressure").unwrap();
        assert_eq!(overridden.quantity().flag(), LogFlag::Sequence);
        assert_eq!(overridden.access(), AccessKind::Method);
        assert_eq!(
            overridden.quantity().namespace(),
            &Namespace::from(["md", "Barostat"])
        );
        assert_eq!(overridden.read(&barostat), LogValue::from(vec![1.0, 2.0]));
    }

    #[test]
    fn nested_registration_does_not_leak_into_the_base() {
        let mut registry = LoggableRegistry::new();
        registry.register::<Barostat>().unwrap();

        let base = registry.register::<Thermo>().unwrap();

        assert!(registry.is_registered::<Thermo>());
        assert!(!base.contains("target"));
        assert_eq!(base.len(), 2);
        assert_eq!(registry.open_scopes(), 0);
    }

    #[test]
    fn inheriting_from_itself_is_rejected() {
        let mut registry = LoggableRegistry::new();

        assert!(matches!(
            registry.register::<SelfReferential>(),
            Err(DeclarationError::Cycle { .. })
        ));
        assert_eq!(registry.open_scopes(), 0);
    }

    #[test]
    fn resolve_reports_every_missing_name() {
        let mut registry = LoggableRegistry::new();
        let table = registry.register::<Thermo>().unwrap();

        let missing = table
            .resolve(Some(&["pressure", "volume", "energy"][..]))
            .unwrap_err();

        assert_eq!(missing, vec!["volume".to_string(), "energy".to_string()]);
        assert_eq!(table.resolve(None).unwrap().len(), 2);
    }

    #[test]
    fn stack_scopes_are_independent() {
        let mut stack = DeclarationStack::new();
        stack.push(Namespace::from("Outer"));
        stack.declare("value", LogFlag::Scalar).unwrap();

        stack.push(Namespace::from("Inner"));
        stack.declare("value", LogFlag::Dict).unwrap();
        let inner = stack.pop().unwrap();

        assert_eq!(inner.declared(), &[("value".to_string(), LogFlag::Dict)]);
        assert!(matches!(
            stack.declare("value", LogFlag::Scalar),
            Err(DeclarationError::Duplicate { .. })
        ));
        let outer = stack.pop().unwrap();
        assert_eq!(outer.namespace(), &Namespace::from("Outer"));
        assert!(matches!(
            stack.declare("value", LogFlag::Scalar),
            Err(DeclarationError::NoOpenScope { .. })
        ));
    }

    #[test]
    fn default_namespace_follows_the_module_path() {
        let namespace = type_namespace::<Vec<u8>>();
        assert_eq!(namespace.last(), Some("Vec"));
        assert_eq!(type_namespace::<Thermo>().last(), Some("Thermo"));
    }
}
