use std::fmt;

/// A class name stored in its internal form, `java/lang/String`.
/// Nested classes keep their `$`, so `java/util/Map$Entry`.
/// Note: this does no validation that the name refers to a real class.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassName(String);
impl ClassName {
    /// Construct from the internal (slash-separated) form
    #[must_use]
    pub fn from_internal(name: impl Into<String>) -> ClassName {
        let name = name.into();
        debug_assert!(!name.is_empty(), "class names must not be empty");
        ClassName(name)
    }

    /// Construct from an iterator over the access path, `["java", "lang", "String"]`
    pub fn from_access_path<'a>(parts: impl Iterator<Item = &'a str> + Clone) -> ClassName {
        ClassName::from_internal(itertools::intersperse(parts, "/").collect::<String>())
    }

    #[must_use]
    pub fn internal(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn dotted(&self) -> String {
        internal_to_dotted(&self.0)
    }

    /// `Ljava/lang/String;`
    #[must_use]
    pub fn as_object_desc(&self) -> String {
        let mut res = String::with_capacity(2 + self.0.len());
        write_class_as_object_desc(&self.0, &mut res);
        res
    }

    /// The package portion of the name, if there is one
    /// `java/lang/String` -> `java/lang`
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.0.rfind('/').map(|idx| &self.0[..idx])
    }

    /// The name without its package, `String`
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.0.rfind('/').map_or(&self.0, |idx| &self.0[idx + 1..])
    }

    /// Note: This will work fine for path to a package as well
    pub fn access_path_iter(&self) -> impl DoubleEndedIterator<Item = &str> + Clone {
        self.0.split('/')
    }
}
impl fmt::Debug for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}
impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[must_use]
pub fn dotted_to_internal(name: &str) -> String {
    name.replace('.', "/")
}

#[must_use]
pub fn internal_to_dotted(name: &str) -> String {
    name.replace('/', ".")
}

pub(crate) fn write_class_as_object_desc(class_name: &str, out: &mut String) {
    out.push('L');
    out.push_str(class_name);
    out.push(';');
}
