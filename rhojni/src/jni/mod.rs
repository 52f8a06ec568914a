//! The naming conventions the JNI uses for native method symbols.
//! `name` produces symbols from a class and method, `decode` goes the other way.

pub mod decode;
pub mod name;
