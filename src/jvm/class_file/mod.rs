//! Binary layout of class files
//!
//! Everything in here maps one-to-one onto structures from [chapter 4 of the JVM
//! specification][0]. Reading goes through [`Deserialize`] and writing through [`Serialize`].
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html

mod annotations;
mod attribute;
mod class;
mod constants;
mod field;
mod method;
mod serialize;
mod version;

pub use annotations::*;
pub use attribute::*;
pub use class::*;
pub use constants::*;
pub use field::*;
pub use method::*;
pub use serialize::*;
pub use version::*;
