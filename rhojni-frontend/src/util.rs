use indexmap::IndexMap;
use rhojni_base::{
    encode::{encode_return_type, internal_return_name},
    parse_java_type_name, TypeNameError,
};

/// Parse each `key=value` entry, returning the first entry that was malformed on failure.
/// Later duplicate keys replace the value of earlier ones.
pub(crate) fn parse_key_val_properties(text: &[String]) -> Result<IndexMap<String, String>, &str> {
    text.iter()
        .map(String::as_str)
        .map(|entry| parse_key_val(entry).ok_or(entry))
        .collect()
}

/// Parse a key-value pair in the form of `key=value`.
/// Only the first `=` separates, since descriptors never contain one but the value might.
pub(crate) fn parse_key_val(text: &str) -> Option<(String, String)> {
    let (key, value) = text.split_once('=')?;
    if key.is_empty() {
        return None;
    }

    Some((key.to_string(), value.to_string()))
}

/// Split `com/foo/Bar.method` (or `com.foo.Bar.method`) into the internal class name and the
/// method name.
pub(crate) fn split_class_method(text: &str) -> Option<(String, &str)> {
    let (class_name, method_name) = text.rsplit_once('.')?;
    if class_name.is_empty() || method_name.is_empty() {
        return None;
    }

    Some((
        rhojni_base::class_name::dotted_to_internal(class_name),
        method_name,
    ))
}

/// Encode a java type name, such as `int[]`, as its descriptor or as its internal name.
pub(crate) fn encode_type_name(name: &str, as_internal_name: bool) -> Result<String, TypeNameError> {
    let typ = parse_java_type_name(name)?;
    Ok(if as_internal_name {
        internal_return_name(typ.as_ref())
    } else {
        encode_return_type(typ.as_ref())
    })
}
