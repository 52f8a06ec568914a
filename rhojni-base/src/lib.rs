#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
// This would be nice to re-enable eventually, but not while in active dev
#![allow(clippy::missing_errors_doc)]
// Shadowing is nice.
#![allow(clippy::shadow_unrelated)]
#![allow(clippy::missing_panics_doc)]

//! Java type model shared by the symbol resolver and the frontend.
//! Everything in here is stateless: class names, descriptor types, and the functions which turn
//! them into the binary descriptors that the JNI expects.

pub mod class_name;
pub mod encode;
pub mod types;

pub use class_name::ClassName;
pub use types::{
    parse_java_type_name, DescriptorType, DescriptorTypeBasic, MethodDescriptor, TypeNameError,
};
