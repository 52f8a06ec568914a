//! The types that can appear in a JNI descriptor.
//! `void` is deliberately not a [`DescriptorTypeBasic`], it can only appear as a return type and
//! so it is represented by `None` there. This makes types like `void[]` unrepresentable.

use std::num::NonZeroUsize;

use smallvec::SmallVec;

use crate::{class_name::ClassName, encode};

const CLASS_NAME_SEPARATORS: &[char] = &['.', '/'];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DescriptorTypeBasic {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Class(ClassName),
    Short,
    Boolean,
}
impl DescriptorTypeBasic {
    /// Get the primitive type from its java keyword
    #[must_use]
    pub fn from_keyword(name: &str) -> Option<DescriptorTypeBasic> {
        Some(match name {
            "byte" => DescriptorTypeBasic::Byte,
            "char" => DescriptorTypeBasic::Char,
            "double" => DescriptorTypeBasic::Double,
            "float" => DescriptorTypeBasic::Float,
            "int" => DescriptorTypeBasic::Int,
            "long" => DescriptorTypeBasic::Long,
            "short" => DescriptorTypeBasic::Short,
            "boolean" => DescriptorTypeBasic::Boolean,
            _ => return None,
        })
    }

    /// The java keyword for primitive types
    #[must_use]
    pub fn name(&self) -> Option<&'static str> {
        Some(match self {
            DescriptorTypeBasic::Byte => "byte",
            DescriptorTypeBasic::Char => "char",
            DescriptorTypeBasic::Double => "double",
            DescriptorTypeBasic::Float => "float",
            DescriptorTypeBasic::Int => "int",
            DescriptorTypeBasic::Long => "long",
            DescriptorTypeBasic::Class(_) => return None,
            DescriptorTypeBasic::Short => "short",
            DescriptorTypeBasic::Boolean => "boolean",
        })
    }

    /// The single character used for primitives in descriptors
    #[must_use]
    pub fn as_desc_prefix(&self) -> Option<char> {
        Some(match self {
            DescriptorTypeBasic::Byte => 'B',
            DescriptorTypeBasic::Char => 'C',
            DescriptorTypeBasic::Double => 'D',
            DescriptorTypeBasic::Float => 'F',
            DescriptorTypeBasic::Int => 'I',
            DescriptorTypeBasic::Long => 'J',
            DescriptorTypeBasic::Class(_) => return None,
            DescriptorTypeBasic::Short => 'S',
            DescriptorTypeBasic::Boolean => 'Z',
        })
    }

    /// A class type from its dotted or slashed name, `java.lang.String` or `java/lang/String`
    #[must_use]
    pub fn class(name: &str) -> DescriptorTypeBasic {
        DescriptorTypeBasic::Class(ClassName::from_access_path(name.split(CLASS_NAME_SEPARATORS)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Basic(DescriptorTypeBasic),
    Array {
        level: NonZeroUsize,
        component: DescriptorTypeBasic,
    },
}
impl DescriptorType {
    #[must_use]
    /// Helper to construct a single level array of the type.
    /// type[]
    pub fn single_array(component: DescriptorTypeBasic) -> Self {
        Self::Array {
            level: NonZeroUsize::new(1).unwrap(),
            component,
        }
    }

    /// Wrap this type in another array level
    /// `int` -> `int[]`, `int[]` -> `int[][]`
    #[must_use]
    pub fn into_array(self) -> Self {
        match self {
            DescriptorType::Basic(component) => DescriptorType::single_array(component),
            DescriptorType::Array { level, component } => DescriptorType::Array {
                level: level.saturating_add(1),
                component,
            },
        }
    }

    /// The element type, one array level removed. `None` if this is not an array.
    #[must_use]
    pub fn component_type(&self) -> Option<DescriptorType> {
        match self {
            DescriptorType::Basic(_) => None,
            DescriptorType::Array { level, component } => Some(
                NonZeroUsize::new(level.get() - 1).map_or_else(
                    || DescriptorType::Basic(component.clone()),
                    |level| DescriptorType::Array {
                        level,
                        component: component.clone(),
                    },
                ),
            ),
        }
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, DescriptorType::Array { .. })
    }
}
impl From<DescriptorTypeBasic> for DescriptorType {
    fn from(v: DescriptorTypeBasic) -> Self {
        Self::Basic(v)
    }
}

// Native methods rarely take more than a handful of parameters
pub type DescriptorParameters = SmallVec<[DescriptorType; 6]>;

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    parameters: DescriptorParameters,
    /// None represents void
    return_type: Option<DescriptorType>,
}
impl MethodDescriptor {
    #[must_use]
    /// Construct a method descriptor that takes in the given parameters and potentially returns
    /// some type
    pub fn new(
        parameters: impl IntoIterator<Item = DescriptorType>,
        return_type: Option<DescriptorType>,
    ) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
            return_type,
        }
    }

    #[must_use]
    /// Construct a [`MethodDescriptor`] that returns void
    pub fn new_void(parameters: impl IntoIterator<Item = DescriptorType>) -> Self {
        Self::new(parameters, None)
    }

    #[must_use]
    pub fn parameters(&self) -> &[DescriptorType] {
        self.parameters.as_slice()
    }

    #[must_use]
    pub fn return_type(&self) -> Option<&DescriptorType> {
        self.return_type.as_ref()
    }

    /// See [`encode::encode_method`]
    #[must_use]
    pub fn to_desc_string(&self) -> String {
        encode::encode_method(self.parameters(), self.return_type())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNameError {
    /// There was no name at all
    Empty,
    /// `void` only makes sense as a return type
    VoidArray,
    /// There was a `[` without a matching `]`, or trailing junk after one
    UnbalancedBrackets,
    /// Something like `java..String` or `.Foo`
    EmptySegment,
}
impl std::fmt::Display for TypeNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeNameError::Empty => f.write_str("empty type name"),
            TypeNameError::VoidArray => f.write_str("void can not be an array component"),
            TypeNameError::UnbalancedBrackets => f.write_str("unbalanced array brackets"),
            TypeNameError::EmptySegment => f.write_str("empty segment in class name"),
        }
    }
}
impl std::error::Error for TypeNameError {}

/// Parse a type as it is written in java source, such as `int`, `java.lang.String[]` or
/// `byte[][]`. Slashes are accepted in place of dots.
/// Returns `Ok(None)` for `void`.
pub fn parse_java_type_name(name: &str) -> Result<Option<DescriptorType>, TypeNameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TypeNameError::Empty);
    }

    let mut base = name;
    let mut level = 0usize;
    while let Some(rest) = base.strip_suffix("[]") {
        base = rest.trim_end();
        level += 1;
    }

    if base.contains('[') || base.contains(']') {
        return Err(TypeNameError::UnbalancedBrackets);
    }

    if base.is_empty() {
        return Err(TypeNameError::Empty);
    }

    if base == "void" {
        return if level == 0 {
            Ok(None)
        } else {
            Err(TypeNameError::VoidArray)
        };
    }

    let component = if let Some(prim) = DescriptorTypeBasic::from_keyword(base) {
        prim
    } else {
        if base.split(CLASS_NAME_SEPARATORS).any(str::is_empty) {
            return Err(TypeNameError::EmptySegment);
        }

        DescriptorTypeBasic::class(base)
    };

    Ok(Some(match NonZeroUsize::new(level) {
        Some(level) => DescriptorType::Array { level, component },
        None => DescriptorType::Basic(component),
    }))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::{parse_java_type_name, DescriptorType, DescriptorTypeBasic, TypeNameError};

    #[test]
    fn test_parse_java_type_name() {
        assert_eq!(parse_java_type_name("void"), Ok(None));
        assert_eq!(
            parse_java_type_name("int"),
            Ok(Some(DescriptorType::Basic(DescriptorTypeBasic::Int)))
        );
        assert_eq!(
            parse_java_type_name("double[][]"),
            Ok(Some(DescriptorType::Array {
                level: NonZeroUsize::new(2).unwrap(),
                component: DescriptorTypeBasic::Double,
            }))
        );
        assert_eq!(
            parse_java_type_name("java.lang.String[]"),
            Ok(Some(DescriptorType::single_array(DescriptorTypeBasic::class(
                "java.lang.String"
            ))))
        );
        assert_eq!(
            parse_java_type_name("java/lang/Object"),
            Ok(Some(DescriptorType::Basic(DescriptorTypeBasic::class(
                "java.lang.Object"
            ))))
        );

        assert_eq!(parse_java_type_name(""), Err(TypeNameError::Empty));
        assert_eq!(parse_java_type_name("[]"), Err(TypeNameError::Empty));
        assert_eq!(parse_java_type_name("void[]"), Err(TypeNameError::VoidArray));
        assert_eq!(
            parse_java_type_name("int[]]"),
            Err(TypeNameError::UnbalancedBrackets)
        );
        assert_eq!(
            parse_java_type_name("int[3]"),
            Err(TypeNameError::UnbalancedBrackets)
        );
        assert_eq!(
            parse_java_type_name("java..String"),
            Err(TypeNameError::EmptySegment)
        );
    }

    #[test]
    fn test_array_levels() {
        let typ = DescriptorType::Basic(DescriptorTypeBasic::Int);
        assert_eq!(typ.component_type(), None);

        let typ = typ.into_array().into_array();
        assert!(typ.is_array());
        assert_eq!(
            typ.component_type(),
            Some(DescriptorType::single_array(DescriptorTypeBasic::Int))
        );
        assert_eq!(
            typ.component_type().and_then(|x| x.component_type()),
            Some(DescriptorType::Basic(DescriptorTypeBasic::Int))
        );
    }
}
