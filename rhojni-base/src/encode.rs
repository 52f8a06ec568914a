//! Encoding of types into JNI descriptors.
//! These have to match, bit for bit, what the jvm computes for a method, since they are used to
//! look up and register native methods.

use crate::{
    class_name::write_class_as_object_desc,
    types::{DescriptorType, DescriptorTypeBasic},
};

/// The descriptor character for a void return
pub const VOID_DESC: char = 'V';

pub fn write_basic_desc(typ: &DescriptorTypeBasic, out: &mut String) {
    match typ {
        DescriptorTypeBasic::Class(class_name) => {
            write_class_as_object_desc(class_name.internal(), out);
        }
        // Only class types lack a prefix
        prim => out.extend(prim.as_desc_prefix()),
    }
}

pub fn write_type_desc(typ: &DescriptorType, out: &mut String) {
    match typ {
        DescriptorType::Basic(basic) => write_basic_desc(basic, out),
        DescriptorType::Array { level, component } => {
            out.extend(std::iter::repeat('[').take(level.get()));
            write_basic_desc(component, out);
        }
    }
}

pub fn write_return_type_desc(typ: Option<&DescriptorType>, out: &mut String) {
    match typ {
        Some(typ) => write_type_desc(typ, out),
        None => out.push(VOID_DESC),
    }
}

/// `int` -> `I`, `double[][]` -> `[[D`, `com.foo.Bar` -> `Lcom/foo/Bar;`
#[must_use]
pub fn encode_type(typ: &DescriptorType) -> String {
    let mut res = String::new();
    write_type_desc(typ, &mut res);
    res
}

/// Like [`encode_type`] but `None` is treated as `void`
#[must_use]
pub fn encode_return_type(typ: Option<&DescriptorType>) -> String {
    let mut res = String::new();
    write_return_type_desc(typ, &mut res);
    res
}

/// Encode a method shape into a descriptor like `(ILjava/lang/String;)V`.
/// The parameters are encoded in the order given, which must be the declaration order.
#[must_use]
pub fn encode_method<'a>(
    parameters: impl IntoIterator<Item = &'a DescriptorType>,
    return_type: Option<&DescriptorType>,
) -> String {
    let mut res = String::from("(");
    for param in parameters {
        write_type_desc(param, &mut res);
    }
    res.push(')');
    write_return_type_desc(return_type, &mut res);
    res
}

/// The name the jvm reports for the type, with `.` replaced by `/`.
/// Classes are `java/lang/String`, arrays use their descriptor `[Ljava/lang/String;`, and
/// primitives are their keyword `int`.
#[must_use]
pub fn internal_name(typ: &DescriptorType) -> String {
    match typ {
        DescriptorType::Basic(DescriptorTypeBasic::Class(class_name)) => {
            class_name.internal().to_owned()
        }
        DescriptorType::Basic(prim) => prim.name().unwrap_or_default().to_owned(),
        DescriptorType::Array { .. } => encode_type(typ),
    }
}

/// Like [`internal_name`] but `None` is treated as `void`
#[must_use]
pub fn internal_return_name(typ: Option<&DescriptorType>) -> String {
    typ.map_or_else(|| "void".to_owned(), internal_name)
}
