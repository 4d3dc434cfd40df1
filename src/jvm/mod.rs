//! Read, edit, and write JVM classes
//!
//! ### Layers
//!
//!   - [`class_file`] maps the binary class file format one-to-one onto Rust structures, keeping
//!     anything it doesn't need to understand as raw bytes so that untouched classes write back
//!     identically
//!   - [`code`] decodes method bodies into label-based instruction lists and lays them back out
//!   - [`verifier`] recomputes the stack map frames that the JVM requires on every method body
//!   - [`model`] ties these together into a view of a class whose methods can be rewritten
//!
//! ### Simple example
//!
//! Inserting a `nop` at the start of every method body:
//!
//! ```
//! use bctransform::jvm::code::{CodeElement, Instruction};
//! use bctransform::jvm::model::ClassModel;
//! use bctransform::jvm::verifier::ClassHierarchy;
//! use bctransform::jvm::Error;
//!
//! fn add_nops(class_bytes: &[u8]) -> Result<Vec<u8>, Error> {
//!     let hierarchy = ClassHierarchy::with_java_library();
//!     let mut class = ClassModel::decode(class_bytes)?;
//!     for method_index in 0..class.methods.len() {
//!         if let Some(mut code) = class.decode_code(method_index)? {
//!             code.elements.insert(0, CodeElement::Instruction(Instruction::Nop));
//!             class.replace_code(method_index, code, &hierarchy)?;
//!         }
//!     }
//!     class.encode()
//! }
//! ```

mod access_flags;
pub mod class_file;
pub mod code;
mod descriptors;
mod errors;
pub mod model;
pub mod verifier;

pub use access_flags::*;
pub use class_file::{
    ClassConstantIndex, Constant, ConstantIndex, ConstantPool, HandleKind, MemberRef,
    NameAndTypeConstantIndex, Utf8ConstantIndex,
};
pub use descriptors::*;
pub use errors::*;
