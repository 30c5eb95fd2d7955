use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// An ordered path of names identifying one slot in a [`NamespaceDict`].
///
/// Two namespaces are the same key iff they are element-wise equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Namespace(Vec<String>);

impl Namespace {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Splits the path into its final name and the parent path leading to it.
    pub fn split_last(&self) -> Option<(&str, &[String])> {
        self.0
            .split_last()
            .map(|(base, parent)| (base.as_str(), parent))
    }

    /// Returns a new namespace with `name` appended.
    pub fn join(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Namespace> {
        self.split_last().map(|(_, parent)| Self(parent.to_vec()))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for Namespace {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for Namespace {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for Namespace {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<Vec<&str>> for Namespace {
    fn from(segments: Vec<&str>) -> Self {
        Self::new(segments)
    }
}

impl From<&[&str]> for Namespace {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Namespace {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("Namespace {namespace} is being used. Remove before replacing.")]
    InUse { namespace: Namespace },

    #[error("Namespace {namespace} overlaps an existing entry of a different shape")]
    Conflict { namespace: Namespace },

    #[error("Namespace {namespace} does not exist")]
    NotFound { namespace: Namespace },

    #[error("Namespace must contain at least one name")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum Node<V> {
    Branch(BTreeMap<String, Node<V>>),
    Leaf(V),
}

/// A tree of name-keyed mappings whose leaves hold values.
///
/// Insertion never overwrites a live leaf; callers must delete first. Deleting
/// a leaf leaves its (possibly now empty) parent mappings in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NamespaceDict<V> {
    root: BTreeMap<String, Node<V>>,
}

impl<V> Default for NamespaceDict<V> {
    fn default() -> Self {
        Self {
            root: BTreeMap::new(),
        }
    }
}

impl<V> NamespaceDict<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, segments: &[String]) -> Option<&Node<V>> {
        let (first, rest) = segments.split_first()?;
        let mut node = self.root.get(first)?;
        for name in rest {
            node = match node {
                Node::Branch(children) => children.get(name)?,
                Node::Leaf(_) => return None,
            };
        }
        Some(node)
    }

    /// Returns `true` iff `namespace` resolves to a stored leaf.
    ///
    /// Empty paths, missing names and paths that run through a leaf all
    /// report `false` rather than an error.
    pub fn key_exists(&self, namespace: &Namespace) -> bool {
        matches!(self.lookup(namespace.segments()), Some(Node::Leaf(_)))
    }

    /// Returns `true` iff `namespace` resolves to an intermediate mapping.
    pub fn branch_exists(&self, namespace: &Namespace) -> bool {
        matches!(self.lookup(namespace.segments()), Some(Node::Branch(_)))
    }

    /// Returns `true` iff [`NamespaceDict::set_item`] would accept `namespace`:
    /// the path is non-empty, holds neither a leaf nor a mapping, and no
    /// prefix of it is a leaf.
    pub fn is_free(&self, namespace: &Namespace) -> bool {
        let segments = namespace.segments();
        !segments.is_empty()
            && self.lookup(segments).is_none()
            && (1..segments.len())
                .all(|depth| !matches!(self.lookup(&segments[..depth]), Some(Node::Leaf(_))))
    }

    pub fn get(&self, namespace: &Namespace) -> Option<&V> {
        match self.lookup(namespace.segments()) {
            Some(Node::Leaf(value)) => Some(value),
            _ => None,
        }
    }

    pub fn set_item(&mut self, namespace: &Namespace, value: V) -> Result<(), NamespaceError> {
        let Some((base_name, parent)) = namespace.split_last() else {
            return Err(NamespaceError::Empty);
        };
        if self.key_exists(namespace) {
            return Err(NamespaceError::InUse {
                namespace: namespace.clone(),
            });
        }
        let conflict = || NamespaceError::Conflict {
            namespace: namespace.clone(),
        };
        if self.branch_exists(namespace) {
            return Err(conflict());
        }
        // A leaf on the way down would have to be replaced by a mapping.
        for depth in 1..namespace.len() {
            if let Some(Node::Leaf(_)) = self.lookup(&namespace.segments()[..depth]) {
                return Err(conflict());
            }
        }

        let mut children = &mut self.root;
        for name in parent {
            let node = children
                .entry(name.clone())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            children = match node {
                Node::Branch(next) => next,
                Node::Leaf(_) => return Err(conflict()),
            };
        }
        children.insert(base_name.to_string(), Node::Leaf(value));
        debug!(%namespace, "Stored namespace entry.");
        Ok(())
    }

    /// Removes the leaf at `namespace` without a prior existence check.
    ///
    /// Fails with [`NamespaceError::NotFound`] when any prefix is missing or
    /// the path ends on a mapping instead of a leaf.
    pub fn delete_item(&mut self, namespace: &Namespace) -> Result<V, NamespaceError> {
        let not_found = || NamespaceError::NotFound {
            namespace: namespace.clone(),
        };
        let (base_name, parent) = namespace.split_last().ok_or_else(not_found)?;

        let mut children = &mut self.root;
        for name in parent {
            children = match children.get_mut(name) {
                Some(Node::Branch(next)) => next,
                _ => return Err(not_found()),
            };
        }
        match children.remove(base_name) {
            Some(Node::Leaf(value)) => {
                debug!(%namespace, "Removed namespace entry.");
                Ok(value)
            }
            Some(branch) => {
                children.insert(base_name.to_string(), branch);
                Err(not_found())
            }
            None => Err(not_found()),
        }
    }

    /// Every stored leaf with its full namespace, in key order.
    pub fn leaves(&self) -> Vec<(Namespace, &V)> {
        fn collect<'a, V>(
            children: &'a BTreeMap<String, Node<V>>,
            prefix: &mut Vec<String>,
            out: &mut Vec<(Namespace, &'a V)>,
        ) {
            for (name, node) in children {
                prefix.push(name.clone());
                match node {
                    Node::Branch(next) => collect(next, prefix, out),
                    Node::Leaf(value) => out.push((Namespace(prefix.clone()), value)),
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        collect(&self.root, &mut Vec::new(), &mut out);
        out
    }

    pub fn len(&self) -> usize {
        self.leaves().len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Rebuilds the tree with the same shape, transforming every leaf.
    pub fn try_map<U, E, F>(&self, mut f: F) -> Result<NamespaceDict<U>, E>
    where
        F: FnMut(&Namespace, &V) -> Result<U, E>,
    {
        fn map_level<V, U, E, F>(
            children: &BTreeMap<String, Node<V>>,
            prefix: &mut Vec<String>,
            f: &mut F,
        ) -> Result<BTreeMap<String, Node<U>>, E>
        where
            F: FnMut(&Namespace, &V) -> Result<U, E>,
        {
            let mut mapped = BTreeMap::new();
            for (name, node) in children {
                prefix.push(name.clone());
                let new_node = match node {
                    Node::Branch(next) => Node::Branch(map_level(next, prefix, f)?),
                    Node::Leaf(value) => Node::Leaf(f(&Namespace(prefix.clone()), value)?),
                };
                prefix.pop();
                mapped.insert(name.clone(), new_node);
            }
            Ok(mapped)
        }

        Ok(NamespaceDict {
            root: map_level(&self.root, &mut Vec::new(), &mut f)?,
        })
    }
}
