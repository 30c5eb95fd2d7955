use super::loggable::{DeclarationError, ExportEntry, ExportTable, Loggable, export_table};
use super::namespace::{Namespace, NamespaceDict, NamespaceError};
use super::quantity::{LogFlag, LogValue};
use super::shared::{ObjectId, Shared};
use serde::Serialize;
use std::fmt;
use std::ops::{AddAssign, SubAssign};
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, error, trace};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoggerError {
    #[error(transparent)]
    Namespace(#[from] NamespaceError),

    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error("Log quantities {names:?} do not exist for {type_name} objects")]
    QuantityNotFound {
        names: Vec<String>,
        type_name: &'static str,
    },

    #[error("No free namespace left for quantity '{name}'")]
    NoFreeNamespace { name: String },

    #[error("Object logged at {namespace} no longer exists")]
    ObjectDropped { namespace: Namespace },

    #[error("Object logged at {namespace} is being modified and cannot be read")]
    ObjectBusy { namespace: Namespace },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    Dropped,
    Busy,
}

type EntryAccessor = Box<dyn Fn() -> Result<LogValue, ReadError>>;

/// One registered quantity: which object it belongs to and how to read it.
///
/// The entry holds only a weak reference; the object's lifetime is owned
/// elsewhere.
pub struct LoggerEntry {
    object: ObjectId,
    quantity: String,
    flag: LogFlag,
    accessor: EntryAccessor,
}

impl LoggerEntry {
    pub fn bind<T: 'static>(object: &Shared<T>, export: &ExportEntry<T>) -> Self {
        let weak = Rc::downgrade(object);
        let accessor = export.accessor();
        Self {
            object: ObjectId::of(object),
            quantity: export.quantity().name().to_string(),
            flag: export.quantity().flag(),
            accessor: Box::new(move || {
                let strong = weak.upgrade().ok_or(ReadError::Dropped)?;
                let guard = strong.try_borrow().map_err(|_| ReadError::Busy)?;
                Ok(accessor(&*guard))
            }),
        }
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    pub fn flag(&self) -> LogFlag {
        self.flag
    }

    pub fn read(&self) -> Result<LogValue, ReadError> {
        (self.accessor)()
    }
}

impl fmt::Debug for LoggerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerEntry")
            .field("object", &self.object)
            .field("quantity", &self.quantity)
            .field("flag", &self.flag)
            .finish_non_exhaustive()
    }
}

/// A materialized value in a [`LogTree`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogNode {
    /// A `(value, flag)` pair.
    Tagged(LogValue, LogFlag),
    /// A `dict`-flagged value, passed through as read.
    Raw(LogValue),
}

pub type LogTree = NamespaceDict<LogNode>;

/// Binds live objects' quantities to namespaces and reads them on demand.
#[derive(Debug, Default)]
pub struct Logger {
    entries: NamespaceDict<LoggerEntry>,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_exists(&self, namespace: &Namespace) -> bool {
        self.entries.key_exists(namespace)
    }

    pub fn get(&self, namespace: &Namespace) -> Option<&LoggerEntry> {
        self.entries.get(namespace)
    }

    pub fn namespaces(&self) -> Vec<Namespace> {
        self.entries
            .leaves()
            .into_iter()
            .map(|(namespace, _)| namespace)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn insert(&mut self, namespace: &Namespace, entry: LoggerEntry) -> Result<(), LoggerError> {
        self.entries.set_item(namespace, entry)?;
        Ok(())
    }

    pub fn delete(&mut self, namespace: &Namespace) -> Result<LoggerEntry, LoggerError> {
        Ok(self.entries.delete_item(namespace)?)
    }

    /// Registers `quantities` of `object` (all of them when `None`) and
    /// returns the namespace each one landed on.
    ///
    /// Every requested name is validated before anything is registered.
    pub fn add<T: Loggable>(
        &mut self,
        object: &Shared<T>,
        quantities: Option<&[&str]>,
    ) -> Result<Vec<Namespace>, LoggerError> {
        let table = export_table::<T>()?;
        let exports = resolve::<T>(&table, quantities)?;

        let mut used = Vec::with_capacity(exports.len());
        for export in exports {
            used.push(self.add_single(object, export)?);
        }
        debug!(
            type_name = std::any::type_name::<T>(),
            count = used.len(),
            "Added object quantities to logger."
        );
        Ok(used)
    }

    fn add_single<T: Loggable>(
        &mut self,
        object: &Shared<T>,
        export: &ExportEntry<T>,
    ) -> Result<Namespace, LoggerError> {
        let namespace = export
            .quantity()
            .yield_names()
            .find(|candidate| {
                let free = self.entries.is_free(candidate);
                if !free {
                    trace!(%candidate, "Namespace occupied, trying next candidate.");
                }
                free
            })
            .ok_or_else(|| LoggerError::NoFreeNamespace {
                name: export.quantity().name().to_string(),
            })?;
        self.entries
            .set_item(&namespace, LoggerEntry::bind(object, export))?;
        Ok(namespace)
    }

    /// Removes the entries that belong to `object` itself.
    ///
    /// Entries of other objects sharing the same quantity names are left
    /// alone. Returns the number of entries removed.
    pub fn remove_object<T: Loggable>(
        &mut self,
        object: &Shared<T>,
        quantities: Option<&[&str]>,
    ) -> Result<usize, LoggerError> {
        let table = export_table::<T>()?;
        let exports = resolve::<T>(&table, quantities)?;
        let id = ObjectId::of(object);

        let mut removed = 0;
        for export in exports {
            for candidate in export.quantity().yield_names() {
                match self.entries.get(&candidate).map(LoggerEntry::object) {
                    Some(owner) if owner == id => {
                        self.entries.delete_item(&candidate)?;
                        removed += 1;
                    }
                    Some(_) => {}
                    // Owner namespaces are never pruned, so a missing owner
                    // means no later candidate was ever handed out.
                    None if !self.owner_exists(&candidate) => break,
                    None => {}
                }
            }
        }
        debug!(removed, "Removed object quantities from logger.");
        Ok(removed)
    }

    fn owner_exists(&self, candidate: &Namespace) -> bool {
        candidate
            .parent()
            .is_some_and(|owner| self.entries.branch_exists(&owner))
    }

    /// Deletes whatever is stored at each namespace, regardless of owner.
    pub fn remove_names(&mut self, namespaces: &[Namespace]) -> usize {
        let mut removed = 0;
        for namespace in namespaces {
            if self.entries.key_exists(namespace) && self.entries.delete_item(namespace).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Removes by object identity when `object` is given, otherwise by name.
    /// Does nothing when both are `None`.
    pub fn remove<T: Loggable>(
        &mut self,
        object: Option<&Shared<T>>,
        quantities: Option<&[&str]>,
    ) -> Result<usize, LoggerError> {
        match (object, quantities) {
            (None, None) => Ok(0),
            (None, Some(names)) => {
                let namespaces: Vec<Namespace> =
                    names.iter().map(|name| Namespace::from(*name)).collect();
                Ok(self.remove_names(&namespaces))
            }
            (Some(object), quantities) => self.remove_object(object, quantities),
        }
    }

    /// Reads every registered quantity into a tree of the same shape.
    pub fn log(&self) -> Result<LogTree, LoggerError> {
        self.entries.try_map(|namespace, entry| {
            let value = entry.read().map_err(|error| match error {
                ReadError::Dropped => LoggerError::ObjectDropped {
                    namespace: namespace.clone(),
                },
                ReadError::Busy => LoggerError::ObjectBusy {
                    namespace: namespace.clone(),
                },
            })?;
            Ok(match entry.flag() {
                LogFlag::Dict => LogNode::Raw(value),
                flag => LogNode::Tagged(value, flag),
            })
        })
    }
}

fn resolve<'t, T: Loggable>(
    table: &'t ExportTable<T>,
    quantities: Option<&[&str]>,
) -> Result<Vec<&'t ExportEntry<T>>, LoggerError> {
    table
        .resolve(quantities)
        .map_err(|names| LoggerError::QuantityNotFound {
            names,
            type_name: std::any::type_name::<T>(),
        })
}

impl<T: Loggable> AddAssign<&Shared<T>> for Logger {
    fn add_assign(&mut self, object: &Shared<T>) {
        if let Err(error) = self.add(object, None) {
            error!(%error, "Failed to add object to logger.");
        }
    }
}

impl SubAssign<&str> for Logger {
    fn sub_assign(&mut self, name: &str) {
        self.remove_names(&[Namespace::from(name)]);
    }
}

impl SubAssign<&[&str]> for Logger {
    fn sub_assign(&mut self, names: &[&str]) {
        let namespaces: Vec<Namespace> = names.iter().map(|name| Namespace::from(*name)).collect();
        self.remove_names(&namespaces);
    }
}

impl<T: Loggable> SubAssign<&Shared<T>> for Logger {
    fn sub_assign(&mut self, object: &Shared<T>) {
        if let Err(error) = self.remove_object(object, None) {
            error!(%error, "Failed to remove object from logger.");
        }
    }
}
