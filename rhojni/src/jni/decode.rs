//! Turning JNI symbol names back into the class and method they were made from.
//! Mangling is lossy: `_` separates package parts, the class, and the method, so we can't know
//! which `_` in `Java_com_foo_Bar_baz` splits class and method without knowing what methods exist.
//! We assume that the method is the part after the last unescaped `_`, and then resolve its
//! descriptor through the [`NativeMethodIndexRegistry`].

use std::borrow::Cow;

use itertools::Itertools;
use rhojni_base::class_name::dotted_to_internal;

use crate::{
    jni::name::JNI_SYMBOL_PREFIX,
    registry::NativeMethodIndexRegistry,
    DecodeError,
};

/// Rewrites the start of a dotted class name, used for mapping classes that live in a
/// version-specific package back onto the canonical package (or the other way around).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRewrite {
    normal_prefix: String,
    replacement_prefix: String,
}
impl PackageRewrite {
    #[must_use]
    pub fn new(
        normal_prefix: impl Into<String>,
        replacement_prefix: impl Into<String>,
    ) -> PackageRewrite {
        PackageRewrite {
            normal_prefix: normal_prefix.into(),
            replacement_prefix: replacement_prefix.into(),
        }
    }

    /// Create the rewrite for a package which may be versioned.
    /// With `base_package = "org.bridj.v0_7"` and `version_sub_package = Some("v0_7")` symbols
    /// decoding into `org.bridj.Foo` become `org.bridj.v0_7.Foo`.
    /// If the base package is not versioned then the rule does nothing.
    #[must_use]
    pub fn versioned(base_package: &str, version_sub_package: Option<&str>) -> PackageRewrite {
        let replacement_prefix = format!("{}.", base_package);
        let normal_prefix = version_sub_package
            .and_then(|sub| base_package.strip_suffix(sub))
            .filter(|rest| rest.ends_with('.'))
            .map_or_else(|| replacement_prefix.clone(), str::to_owned);

        PackageRewrite {
            normal_prefix,
            replacement_prefix,
        }
    }

    #[must_use]
    pub fn normal_prefix(&self) -> &str {
        &self.normal_prefix
    }

    #[must_use]
    pub fn replacement_prefix(&self) -> &str {
        &self.replacement_prefix
    }

    /// Apply the rewrite to a dotted class name.
    /// Names already under the replacement prefix are left alone.
    #[must_use]
    pub fn apply<'a>(&self, class_name: &'a str) -> Cow<'a, str> {
        if class_name.starts_with(&self.replacement_prefix) {
            return Cow::Borrowed(class_name);
        }

        match class_name.strip_prefix(self.normal_prefix.as_str()) {
            Some(rest) => Cow::Owned(format!("{}{}", self.replacement_prefix, rest)),
            None => Cow::Borrowed(class_name),
        }
    }
}

/// The pieces of a symbol name, before resolving the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolParts {
    /// Dotted class name, `com.foo.Bar`
    pub class_name: String,
    /// Unescaped method name
    pub method_name: String,
}
impl SymbolParts {
    #[must_use]
    pub fn internal_class_name(&self) -> String {
        dotted_to_internal(&self.class_name)
    }
}

/// A fully resolved native method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedReference {
    /// `com/foo/Bar`
    pub internal_class_name: String,
    pub method_name: String,
    /// `(ILjava/lang/String;)V`
    pub descriptor: String,
}

/// Find the index of the last `_` which is not the start of an escape.
/// Any `_` followed by a digit is treated as an escape, which is broader than the `_0`..`_3`
/// that the JNI produces.
#[must_use]
pub fn find_last_non_escape_underscore(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    bytes
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, ch)| **ch == b'_')
        .map(|(idx, _)| idx)
        .find(|idx| {
            bytes
                .get(idx + 1)
                .map_or(true, |next| !next.is_ascii_digit())
        })
}

/// Split a symbol into its class name and method name, without resolving anything.
/// Accepts names with or without the leading `_` some platforms add, and tolerates a missing
/// `Java_` prefix.
pub fn split_symbol(
    symbol: &str,
    rewrite: Option<&PackageRewrite>,
) -> Result<SymbolParts, DecodeError> {
    let name = symbol.strip_prefix('_').unwrap_or(symbol);
    let name = name.strip_prefix(JNI_SYMBOL_PREFIX).unwrap_or(name);

    let split = find_last_non_escape_underscore(name).ok_or_else(|| {
        DecodeError::MalformedSymbol {
            symbol: symbol.to_owned(),
        }
    })?;

    let class_name = name[..split].replace('_', ".");
    let class_name = match rewrite {
        Some(rewrite) => rewrite.apply(&class_name).into_owned(),
        None => class_name,
    };
    let method_name = name[split + 1..].replace("_1", "_");

    Ok(SymbolParts {
        class_name,
        method_name,
    })
}

/// Decode a symbol into the native method it implements, looking up its descriptor in the
/// registry.
pub fn decode_symbol(
    symbol: &str,
    rewrite: Option<&PackageRewrite>,
    registry: &NativeMethodIndexRegistry,
) -> Result<DecodedReference, DecodeError> {
    let SymbolParts {
        class_name,
        method_name,
    } = split_symbol(symbol, rewrite)?;
    let internal_class_name = dotted_to_internal(&class_name);

    let index = registry.index_for(&internal_class_name)?;
    let descriptor = match index.get(&method_name) {
        Some(descriptor) => descriptor.to_owned(),
        None => {
            tracing::warn!(
                "Symbol {} names unknown method {} of {}, known: {}",
                symbol,
                method_name,
                class_name,
                index.names().join(", ")
            );
            return Err(DecodeError::MethodNotFound {
                method_name,
                class_name,
                known_names: index.names().map(str::to_owned).collect(),
            });
        }
    };

    tracing::trace!(
        "Decoded {} into {}.{}{}",
        symbol,
        internal_class_name,
        method_name,
        descriptor
    );

    Ok(DecodedReference {
        internal_class_name,
        method_name,
        descriptor,
    })
}

#[cfg(test)]
mod tests {
    use super::{find_last_non_escape_underscore, split_symbol, PackageRewrite, SymbolParts};
    use crate::DecodeError;

    fn parts(class_name: &str, method_name: &str) -> SymbolParts {
        SymbolParts {
            class_name: class_name.to_owned(),
            method_name: method_name.to_owned(),
        }
    }

    #[test]
    fn test_find_last_non_escape_underscore() {
        assert_eq!(find_last_non_escape_underscore("com_foo_Bar_baz"), Some(11));
        assert_eq!(find_last_non_escape_underscore("com_foo_Bar_do_1thing"), Some(11));
        assert_eq!(find_last_non_escape_underscore("Foo_"), Some(3));
        assert_eq!(find_last_non_escape_underscore("Foo_1_2"), None);
        assert_eq!(find_last_non_escape_underscore("_1abc"), None);
        assert_eq!(find_last_non_escape_underscore("nothing"), None);
        assert_eq!(find_last_non_escape_underscore(""), None);
    }

    #[test]
    fn test_split_symbol() {
        assert_eq!(
            split_symbol("Java_com_foo_Bar_baz", None).unwrap(),
            parts("com.foo.Bar", "baz")
        );
        assert_eq!(
            split_symbol("_Java_com_foo_Bar_baz", None).unwrap(),
            parts("com.foo.Bar", "baz")
        );
        // Missing prefix is tolerated
        assert_eq!(
            split_symbol("com_foo_Bar_baz", None).unwrap(),
            parts("com.foo.Bar", "baz")
        );
        assert_eq!(
            split_symbol("Java_com_foo_Bar_do_1thing", None).unwrap(),
            parts("com.foo.Bar", "do_thing")
        );
        assert_eq!(
            split_symbol("Java_com_foo_Bar_a_1b_1c", None).unwrap(),
            parts("com.foo.Bar", "a_b_c")
        );
        assert_eq!(
            split_symbol("Java_com_foo_Bar_baz", None)
                .unwrap()
                .internal_class_name(),
            "com/foo/Bar"
        );
    }

    #[test]
    fn test_split_malformed() {
        for symbol in ["JavaFoo", "Java_Foo", "_Java_", "Java_do_1thing", ""] {
            assert!(
                matches!(
                    split_symbol(symbol, None),
                    Err(DecodeError::MalformedSymbol { symbol: ref s }) if s == symbol
                ),
                "{} should be malformed",
                symbol
            );
        }
    }

    #[test]
    fn test_package_rewrite() {
        let rewrite = PackageRewrite::versioned("org.bridj.v0_7", Some("v0_7"));
        assert_eq!(rewrite.normal_prefix(), "org.bridj.");
        assert_eq!(rewrite.replacement_prefix(), "org.bridj.v0_7.");

        assert_eq!(rewrite.apply("org.bridj.Pointer"), "org.bridj.v0_7.Pointer");
        // Already versioned, applied at most once
        assert_eq!(
            rewrite.apply("org.bridj.v0_7.Pointer"),
            "org.bridj.v0_7.Pointer"
        );
        assert_eq!(rewrite.apply("com.foo.Bar"), "com.foo.Bar");

        assert_eq!(
            split_symbol("Java_org_bridj_Pointer_free", Some(&rewrite)).unwrap(),
            parts("org.bridj.v0_7.Pointer", "free")
        );

        // Not versioned, so it does nothing
        let rewrite = PackageRewrite::versioned("org.bridj", Some("v0_7"));
        assert_eq!(rewrite.normal_prefix(), "org.bridj.");
        assert_eq!(rewrite.apply("org.bridj.Pointer"), "org.bridj.Pointer");
        let rewrite = PackageRewrite::versioned("org.bridj", None);
        assert_eq!(rewrite.apply("org.bridj.Pointer"), "org.bridj.Pointer");
    }
}
