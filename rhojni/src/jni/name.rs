/// Computes the short native method name for a method, `Java_java_lang_System_registerNatives`.
/// The class name should be in its internal form, `java/lang/System`.
#[must_use]
pub fn make_native_method_name(class_name: &str, method_name: &str) -> String {
    let mut result = String::from(JNI_SYMBOL_PREFIX);

    escape_name(class_name, &mut result);
    result.push('_');
    escape_name(method_name, &mut result);

    result
}

/// Computes the long native method name, which is what the jvm looks for when a native method is
/// overloaded. This is the short name followed by `__` and the mangled parameter descriptor.
/// If the descriptor is not of the form `(...)R` then the whole of it is mangled.
#[must_use]
pub fn make_long_native_method_name(
    class_name: &str,
    method_name: &str,
    descriptor: &str,
) -> String {
    let mut result = make_native_method_name(class_name, method_name);
    result.push_str("__");

    let params = descriptor
        .strip_prefix('(')
        .and_then(|desc| desc.split_once(')'))
        .map_or(descriptor, |(params, _ret)| params);
    escape_name(params, &mut result);

    result
}

pub const JNI_SYMBOL_PREFIX: &str = "Java_";

fn escape_name(name: &str, out: &mut String) {
    for ch in name.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' => out.push(ch),
            '/' => out.push('_'),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            _ => {
                // Encode ch as _0xxxx, for each utf16 unit it occupies
                let mut buf = [0u16; 2];
                for unit in ch.encode_utf16(&mut buf) {
                    out.push_str("_0");
                    out.push_str(&format!("{:04x}", unit));
                }
            }
        }
    }
}
