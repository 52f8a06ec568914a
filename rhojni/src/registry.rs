//! Per-class indices of native method descriptors.
//! Symbol names alone can't tell us the descriptor of a native method, so we ask an
//! introspector (something that can read the class's declarations) for the native methods of
//! the class, once, and then keep that around.

use std::{
    collections::HashMap,
    error::Error,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use indexmap::IndexMap;

/// The access flag the jvm uses to mark a method as native
pub const ACC_NATIVE: u16 = 0x0100;

/// A single native method as reported by an introspector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMethodInfo {
    pub access_flags: u16,
    /// The plain method name, `registerNatives`
    pub name: String,
    /// `(ILjava/lang/String;)V`
    pub descriptor: String,
}
impl NativeMethodInfo {
    #[must_use]
    pub fn new(
        access_flags: u16,
        name: impl Into<String>,
        descriptor: impl Into<String>,
    ) -> NativeMethodInfo {
        NativeMethodInfo {
            access_flags,
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        self.access_flags & ACC_NATIVE != 0
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum IntrospectionError {
    /// The class could not be found, holds the internal class name
    NonexistentClass(String),
    OpaqueError(Box<dyn Error + Send + Sync>),
}
impl std::fmt::Display for IntrospectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntrospectionError::NonexistentClass(class_name) => {
                write!(f, "class {} could not be found", class_name)
            }
            IntrospectionError::OpaqueError(err) => {
                write!(f, "failed to enumerate native methods: {}", err)
            }
        }
    }
}
impl Error for IntrospectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            IntrospectionError::NonexistentClass(_) => None,
            IntrospectionError::OpaqueError(err) => Some(&**err),
        }
    }
}

/// Something which can enumerate the native methods declared on a class, typically by reading
/// its class file.
pub trait NativeMethodIntrospector: Send + Sync {
    /// Get every native method declared on the class, in any order.
    /// `internal_class_name` is slash-separated, `java/lang/System`
    fn native_methods(
        &self,
        internal_class_name: &str,
    ) -> Result<Vec<NativeMethodInfo>, IntrospectionError>;
}
impl<'a, T: NativeMethodIntrospector + ?Sized> NativeMethodIntrospector for &'a T {
    fn native_methods(
        &self,
        internal_class_name: &str,
    ) -> Result<Vec<NativeMethodInfo>, IntrospectionError> {
        <T as NativeMethodIntrospector>::native_methods(self, internal_class_name)
    }
}
impl<T: NativeMethodIntrospector + ?Sized> NativeMethodIntrospector for Arc<T> {
    fn native_methods(
        &self,
        internal_class_name: &str,
    ) -> Result<Vec<NativeMethodInfo>, IntrospectionError> {
        <T as NativeMethodIntrospector>::native_methods(self, internal_class_name)
    }
}

/// Adapts a closure into a [`NativeMethodIntrospector`]
pub struct IntrospectorFn<F>(pub F);
impl<F> NativeMethodIntrospector for IntrospectorFn<F>
where
    F: Fn(&str) -> Result<Vec<NativeMethodInfo>, IntrospectionError> + Send + Sync,
{
    fn native_methods(
        &self,
        internal_class_name: &str,
    ) -> Result<Vec<NativeMethodInfo>, IntrospectionError> {
        (self.0)(internal_class_name)
    }
}

/// An introspector over a fixed table of native methods, for when the natives are already known
/// (such as being registered up front, or listed on the command line).
#[derive(Debug, Default, Clone)]
pub struct NativeMethodTable {
    classes: IndexMap<String, Vec<NativeMethodInfo>>,
}
impl NativeMethodTable {
    #[must_use]
    pub fn new() -> NativeMethodTable {
        NativeMethodTable::default()
    }

    pub fn insert(&mut self, internal_class_name: impl Into<String>, method: NativeMethodInfo) {
        self.classes
            .entry(internal_class_name.into())
            .or_default()
            .push(method);
    }

    /// Register a class as existing, even if it has no native methods
    pub fn insert_class(&mut self, internal_class_name: impl Into<String>) {
        self.classes.entry(internal_class_name.into()).or_default();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
impl NativeMethodIntrospector for NativeMethodTable {
    fn native_methods(
        &self,
        internal_class_name: &str,
    ) -> Result<Vec<NativeMethodInfo>, IntrospectionError> {
        self.classes
            .get(internal_class_name)
            .cloned()
            .ok_or_else(|| IntrospectionError::NonexistentClass(internal_class_name.to_owned()))
    }
}

/// The native methods of a single class, keyed by their plain name.
/// Immutable once built.
#[derive(Debug, Clone)]
pub struct ClassMethodIndex {
    class_name: String,
    signatures: IndexMap<String, String>,
}
impl ClassMethodIndex {
    /// Build the index by asking the introspector about the class
    pub fn build(
        internal_class_name: &str,
        introspector: &dyn NativeMethodIntrospector,
    ) -> Result<ClassMethodIndex, IntrospectionError> {
        let methods = introspector.native_methods(internal_class_name)?;
        Ok(ClassMethodIndex::from_methods(internal_class_name, methods))
    }

    /// Note: Native methods can be overloaded, but we only key by name, so the last
    /// method with some name wins.
    pub fn from_methods(
        internal_class_name: impl Into<String>,
        methods: impl IntoIterator<Item = NativeMethodInfo>,
    ) -> ClassMethodIndex {
        let class_name = internal_class_name.into();
        let mut signatures = IndexMap::new();
        for method in methods {
            if !method.is_native() {
                tracing::warn!(
                    "Introspector reported non-native method {}.{} ({:#06x})",
                    class_name,
                    method.name,
                    method.access_flags
                );
            }

            if let Some(previous) = signatures.insert(method.name, method.descriptor) {
                tracing::trace!(
                    "Overloaded native method in {}, replacing descriptor {}",
                    class_name,
                    previous
                );
            }
        }

        ClassMethodIndex {
            class_name,
            signatures,
        }
    }

    /// The internal name of the class this is for
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Get the descriptor of the native method with the given name
    #[must_use]
    pub fn get(&self, method_name: &str) -> Option<&str> {
        self.signatures.get(method_name).map(String::as_str)
    }

    /// The names of every native method, in the order they were first reported
    pub fn names(&self) -> impl Iterator<Item = &str> + Clone {
        self.signatures.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Table of internal class name to the index of its native methods.
/// The indices are built lazily, on the first lookup for that class, and only once even when
/// multiple threads ask for the same class at the same time.
///
/// Entries are reference counted: [`NativeMethodIndexRegistry::evict_unreferenced`] drops the
/// indices that nobody outside of the registry still holds. Nothing requires that to be called,
/// an evicted class is simply rebuilt on the next lookup.
pub struct NativeMethodIndexRegistry {
    introspector: Box<dyn NativeMethodIntrospector>,
    indices: RwLock<HashMap<String, Arc<ClassMethodIndex>>>,
    /// Held while checking for and building a missing index
    build_lock: Mutex<()>,
}
impl NativeMethodIndexRegistry {
    #[must_use]
    pub fn new(introspector: impl NativeMethodIntrospector + 'static) -> NativeMethodIndexRegistry {
        NativeMethodIndexRegistry {
            introspector: Box::new(introspector),
            indices: RwLock::new(HashMap::new()),
            build_lock: Mutex::new(()),
        }
    }

    // The table is only ever modified by single inserts/removals, so a panic while the lock was
    // held can't have left it in a bad state, thus we ignore poisoning.

    fn cached(&self, internal_class_name: &str) -> Option<Arc<ClassMethodIndex>> {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(internal_class_name)
            .cloned()
    }

    /// Get the index for the class, building it if it does not exist yet.
    /// Errors from the introspector are returned and not remembered, so a later call will try
    /// again.
    pub fn index_for(
        &self,
        internal_class_name: &str,
    ) -> Result<Arc<ClassMethodIndex>, IntrospectionError> {
        if let Some(index) = self.cached(internal_class_name) {
            return Ok(index);
        }

        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another thread may have built it while we were waiting on the lock
        if let Some(index) = self.cached(internal_class_name) {
            return Ok(index);
        }

        let index = match ClassMethodIndex::build(internal_class_name, &*self.introspector) {
            Ok(index) => Arc::new(index),
            Err(err) => {
                tracing::warn!(
                    "Failed to enumerate native methods of {}: {}",
                    internal_class_name,
                    err
                );
                return Err(err);
            }
        };
        tracing::info!(
            "Built native method index for {} with {} methods",
            internal_class_name,
            index.len()
        );

        self.indices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(internal_class_name.to_owned(), Arc::clone(&index));

        Ok(index)
    }

    /// Get the descriptor for the native method on the class.
    /// `Ok(None)` if the class does not have a native method with that name.
    pub fn lookup(
        &self,
        internal_class_name: &str,
        method_name: &str,
    ) -> Result<Option<String>, IntrospectionError> {
        let index = self.index_for(internal_class_name)?;
        Ok(index.get(method_name).map(str::to_owned))
    }

    /// Whether there is currently an index for the class
    #[must_use]
    pub fn contains(&self, internal_class_name: &str) -> bool {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(internal_class_name)
    }

    /// Drop the index for a single class, returning whether there was one
    pub fn evict(&self, internal_class_name: &str) -> bool {
        self.indices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(internal_class_name)
            .is_some()
    }

    /// Drop every index that is not held by anything other than the registry.
    /// Returns the number of indices dropped.
    pub fn evict_unreferenced(&self) -> usize {
        let mut indices = self.indices.write().unwrap_or_else(PoisonError::into_inner);
        let before = indices.len();
        indices.retain(|_, index| Arc::strong_count(index) > 1);
        let evicted = before - indices.len();
        if evicted != 0 {
            tracing::info!("Evicted {} native method indices", evicted);
        }

        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl std::fmt::Debug for NativeMethodIndexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMethodIndexRegistry")
            .field("introspector", &"(unprintable)")
            .field("indices", &self.indices)
            .finish()
    }
}
