#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
// This would be nice to re-enable eventually, but not while in active dev
#![allow(clippy::missing_errors_doc)]
// Shadowing is nice.
#![allow(clippy::shadow_unrelated)]
// Cool idea but highlights entire function and is too aggressive.
#![allow(clippy::option_if_let_else)]
#![allow(clippy::missing_panics_doc)]

//! Resolves the symbol names of JNI native methods back to the class, method, and descriptor
//! they implement. This is what a native bridge uses when all it has is the name of an exported
//! function.

use itertools::Itertools;

use crate::jni::decode::{self, DecodedReference, PackageRewrite};
use crate::registry::{IntrospectionError, NativeMethodIndexRegistry, NativeMethodIntrospector};

pub mod jni;
pub mod registry;

pub use rhojni_base as base;

pub const ENV_TRACING_LEVEL: &str = "RHOJNI_LOG_LEVEL";
pub const DEFAULT_TRACING_LEVEL: tracing::Level = tracing::Level::WARN;

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub tracing_level: tracing::Level,
    /// Applied by [`SymbolResolver::decode_versioned_symbol`].
    /// `None` means versioned decoding is the same as normal decoding.
    pub package_rewrite: Option<PackageRewrite>,
}
impl ResolverConfig {
    #[must_use]
    pub fn new() -> ResolverConfig {
        let tracing_level = ResolverConfig::compute_tracing_level();
        ResolverConfig {
            tracing_level,
            package_rewrite: None,
        }
    }

    #[must_use]
    pub fn with_package_rewrite(mut self, package_rewrite: PackageRewrite) -> ResolverConfig {
        self.package_rewrite = Some(package_rewrite);
        self
    }

    #[must_use]
    pub fn compute_tracing_level() -> tracing::Level {
        let env_log = std::env::var(ENV_TRACING_LEVEL);
        if let Ok(env_log) = env_log {
            parse_tracing_level(&env_log).unwrap_or(DEFAULT_TRACING_LEVEL)
        } else {
            DEFAULT_TRACING_LEVEL
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_tracing_level(text: &str) -> Option<tracing::Level> {
    if text.eq_ignore_ascii_case("trace") || text == "*" {
        Some(tracing::Level::TRACE)
    } else if text.eq_ignore_ascii_case("debug") {
        Some(tracing::Level::DEBUG)
    } else if text.eq_ignore_ascii_case("info") {
        Some(tracing::Level::INFO)
    } else if text.eq_ignore_ascii_case("warn") {
        Some(tracing::Level::WARN)
    } else if text.eq_ignore_ascii_case("error") {
        Some(tracing::Level::ERROR)
    } else {
        None
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum DecodeError {
    /// There was no `_` separating the class from the method
    MalformedSymbol { symbol: String },
    /// The class was found but it has no native method with that name
    MethodNotFound {
        method_name: String,
        /// Dotted class name
        class_name: String,
        /// The native methods the class does have
        known_names: Vec<String>,
    },
    /// The native methods of the class could not be enumerated
    Introspection(IntrospectionError),
}
impl From<IntrospectionError> for DecodeError {
    fn from(err: IntrospectionError) -> Self {
        Self::Introspection(err)
    }
}
impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::MalformedSymbol { symbol } => {
                write!(f, "Malformed native symbol {}", symbol)
            }
            DecodeError::MethodNotFound {
                method_name,
                class_name,
                known_names,
            } => write!(
                f,
                "Method {} not found in class {} : known method names = {}",
                method_name,
                class_name,
                known_names.iter().join(", ")
            ),
            DecodeError::Introspection(err) => write!(f, "{}", err),
        }
    }
}
impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Introspection(err) => Some(err),
            _ => None,
        }
    }
}

/// The entry point for resolving native symbols.
/// This is `Sync`, and the intent is that a single instance is shared by everything resolving
/// symbols, so that each class's natives are only enumerated once.
#[derive(Debug)]
pub struct SymbolResolver {
    config: ResolverConfig,
    registry: NativeMethodIndexRegistry,
}
impl SymbolResolver {
    #[must_use]
    pub fn new(
        config: ResolverConfig,
        introspector: impl NativeMethodIntrospector + 'static,
    ) -> SymbolResolver {
        SymbolResolver {
            config,
            registry: NativeMethodIndexRegistry::new(introspector),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &NativeMethodIndexRegistry {
        &self.registry
    }

    /// Decode the symbol as-is, without any package rewriting
    pub fn decode_symbol(&self, symbol: &str) -> Result<DecodedReference, DecodeError> {
        decode::decode_symbol(symbol, None, &self.registry)
    }

    /// Decode the symbol, mapping classes into the configured versioned package
    pub fn decode_versioned_symbol(&self, symbol: &str) -> Result<DecodedReference, DecodeError> {
        decode::decode_symbol(
            symbol,
            self.config.package_rewrite.as_ref(),
            &self.registry,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use crate::{
        jni::{
            decode::{DecodedReference, PackageRewrite},
            name::make_native_method_name,
        },
        parse_tracing_level,
        registry::{
            IntrospectionError, IntrospectorFn, NativeMethodInfo, NativeMethodTable, ACC_NATIVE,
        },
        DecodeError, ResolverConfig, SymbolResolver,
    };

    fn config() -> ResolverConfig {
        ResolverConfig {
            tracing_level: tracing::Level::WARN,
            package_rewrite: None,
        }
    }

    fn resolver(entries: &[(&str, &str, &str)]) -> SymbolResolver {
        let mut table = NativeMethodTable::new();
        for (class_name, method_name, descriptor) in entries {
            table.insert(
                *class_name,
                NativeMethodInfo::new(ACC_NATIVE, *method_name, *descriptor),
            );
        }
        SymbolResolver::new(config(), table)
    }

    #[test]
    fn test_decode_round_trip() {
        let names = [
            ("com/foo/Bar", "open", "(Ljava/lang/String;)I"),
            ("com/foo/Bar", "close", "(I)V"),
            ("Toplevel", "run", "()V"),
            ("a/b/c/d/Deep", "x", "()J"),
        ];
        let resolver = resolver(&names);

        for (class_name, method_name, descriptor) in names {
            let symbol = make_native_method_name(class_name, method_name);
            let decoded = resolver.decode_symbol(&symbol).unwrap();
            assert_eq!(
                decoded,
                DecodedReference {
                    internal_class_name: class_name.to_owned(),
                    method_name: method_name.to_owned(),
                    descriptor: descriptor.to_owned(),
                }
            );

            // The leading underscore some platforms add
            let decoded = resolver.decode_symbol(&format!("_{}", symbol)).unwrap();
            assert_eq!(decoded.internal_class_name, class_name);
        }
    }

    #[test]
    fn test_decode_escaped_underscore() {
        let resolver = resolver(&[("com/foo/Bar", "do_thing", "(Z)V")]);
        let decoded = resolver
            .decode_symbol("Java_com_foo_Bar_do_1thing")
            .unwrap();
        assert_eq!(decoded.internal_class_name, "com/foo/Bar");
        assert_eq!(decoded.method_name, "do_thing");
        assert_eq!(decoded.descriptor, "(Z)V");

        let symbol = make_native_method_name("com/foo/Bar", "do_thing");
        assert_eq!(symbol, "Java_com_foo_Bar_do_1thing");
        assert_eq!(resolver.decode_symbol(&symbol).unwrap(), decoded);
    }

    #[test]
    fn test_decode_missing_method() {
        let resolver = resolver(&[("com/foo/Bar", "foo", "()V"), ("com/foo/Bar", "bar", "()V")]);
        let err = resolver
            .decode_symbol("Java_com_foo_Bar_missing")
            .unwrap_err();
        match &err {
            DecodeError::MethodNotFound {
                method_name,
                class_name,
                known_names,
            } => {
                assert_eq!(method_name, "missing");
                assert_eq!(class_name, "com.foo.Bar");
                assert_eq!(known_names, &["foo", "bar"]);
            }
            _ => panic!("expected MethodNotFound, got {:?}", err),
        }
        assert_eq!(
            err.to_string(),
            "Method missing not found in class com.foo.Bar : known method names = foo, bar"
        );
    }

    #[test]
    fn test_decode_malformed() {
        let resolver = resolver(&[]);
        assert!(matches!(
            resolver.decode_symbol("JavaFoo"),
            Err(DecodeError::MalformedSymbol { .. })
        ));
        // Nothing was looked up
        assert!(resolver.registry().is_empty());
    }

    #[test]
    fn test_decode_unknown_class() {
        let resolver = resolver(&[]);
        assert!(matches!(
            resolver.decode_symbol("Java_com_foo_Missing_run"),
            Err(DecodeError::Introspection(IntrospectionError::NonexistentClass(name)))
                if name == "com/foo/Missing"
        ));
    }

    #[test]
    fn test_decode_class_without_natives() {
        let mut table = NativeMethodTable::new();
        table.insert_class("com/foo/Plain");
        let resolver = SymbolResolver::new(config(), table);

        // The class exists, so this is a missing method rather than a missing class
        match resolver.decode_symbol("Java_com_foo_Plain_run") {
            Err(DecodeError::MethodNotFound {
                method_name,
                class_name,
                known_names,
            }) => {
                assert_eq!(method_name, "run");
                assert_eq!(class_name, "com.foo.Plain");
                assert!(known_names.is_empty());
            }
            other => panic!("expected MethodNotFound, got {:?}", other),
        }
        assert!(resolver.registry().contains("com/foo/Plain"));
    }

    #[test]
    fn test_decode_versioned() {
        let names = [("org/bridj/v0_7/Pointer", "free", "(J)V")];
        let mut table = NativeMethodTable::new();
        for (class_name, method_name, descriptor) in names {
            table.insert(
                class_name,
                NativeMethodInfo::new(ACC_NATIVE, method_name, descriptor),
            );
        }
        let config =
            config().with_package_rewrite(PackageRewrite::versioned("org.bridj.v0_7", Some("v0_7")));
        let resolver = SymbolResolver::new(config, table);

        let decoded = resolver
            .decode_versioned_symbol("Java_org_bridj_Pointer_free")
            .unwrap();
        assert_eq!(decoded.internal_class_name, "org/bridj/v0_7/Pointer");
        assert_eq!(decoded.method_name, "free");
        assert_eq!(decoded.descriptor, "(J)V");

        // Without the rewrite the canonical package is looked up, which isn't known
        assert!(matches!(
            resolver.decode_symbol("Java_org_bridj_Pointer_free"),
            Err(DecodeError::Introspection(_))
        ));
    }

    #[test]
    fn test_decode_builds_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let introspector = {
            let calls = Arc::clone(&calls);
            IntrospectorFn(
                move |_class_name: &str| -> Result<Vec<NativeMethodInfo>, IntrospectionError> {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![
                        NativeMethodInfo::new(ACC_NATIVE, "foo", "()V"),
                        NativeMethodInfo::new(ACC_NATIVE, "bar", "(I)I"),
                    ])
                },
            )
        };
        let resolver = SymbolResolver::new(config(), introspector);

        std::thread::scope(|scope| {
            for i in 0..8 {
                let resolver = &resolver;
                scope.spawn(move || {
                    let method = if i % 2 == 0 { "foo" } else { "bar" };
                    for _ in 0..50 {
                        let decoded = resolver
                            .decode_symbol(&format!("Java_com_foo_Bar_{}", method))
                            .unwrap();
                        assert_eq!(decoded.method_name, method);
                    }
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_tracing_level() {
        assert_eq!(parse_tracing_level("TRACE"), Some(tracing::Level::TRACE));
        assert_eq!(parse_tracing_level("*"), Some(tracing::Level::TRACE));
        assert_eq!(parse_tracing_level("info"), Some(tracing::Level::INFO));
        assert_eq!(parse_tracing_level("Error"), Some(tracing::Level::ERROR));
        assert_eq!(parse_tracing_level("loud"), None);
    }
}
