//! Editable method bodies
//!
//! ### Structure
//!
//! The bytecode of a method lives in [just another method attribute](crate::jvm::class_file::Code),
//! but raw offsets are a terrible thing to edit: inserting a single instruction shifts every jump,
//! exception range, and debug table entry that comes after it. Decoding a method body therefore
//! turns it into a flat list of [`CodeElement`]s, where every position that anything refers to is
//! marked with a [`Label`]. Jumps refer to labels too, so instructions can be spliced in anywhere
//! and the only place that deals with offsets again is the final layout.
//!
//! ### Layout
//!
//! Turning the elements back into a code array happens in [`jump_encoding`]: instruction widths
//! depend on their position (switch padding) and on jump distances (`goto` versus `goto_w`), so
//! layout is a small fixpoint.
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html#jvms-6.5

mod decode;
mod encode;
mod instruction;
pub mod jump_encoding;
mod label;
mod method_code;

pub use decode::*;
pub use encode::*;
pub use instruction::*;
pub use label::*;
pub use method_code::*;

/// Entry in the body of a method
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum CodeElement {
    /// Marks the position right before the next instruction
    Label(Label),
    Instruction(Instruction),
}

impl CodeElement {
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            CodeElement::Instruction(insn) => Some(insn),
            CodeElement::Label(_) => None,
        }
    }

    pub fn label(&self) -> Option<Label> {
        match self {
            CodeElement::Label(label) => Some(*label),
            CodeElement::Instruction(_) => None,
        }
    }
}
