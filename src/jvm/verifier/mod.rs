//! Bytecode verification utilities
//!
//! For any specific instruction inside a method body, the stack and locals should have the same
//! structure, regardless of which control flow was used to reach that instruction. In other words:
//! although the values on the stack and in the locals may obviously be different, the types and
//! order of the stack and local variables cannot. This information is referred to as the _stack
//! map frame_ (represented using [`Frame`]) and the set of stack map frames for all possible jump
//! targets in a method is the _stack map table_.
//!
//! Knowing the stack map frame at a point in the code makes it possible to verify that the next
//! instruction makes sense (eg. `dadd` only makes sense if the top two elements on the stack are
//! of type `double`). The "types" used in verification (represented using [`VerificationType`])
//! are slightly augmented to take into account initialization and null.
//!
//! Since injecting code into a method invalidates its stack map table, the table is recomputed
//! from scratch after every rewrite. Verifying straight-line instructions is pretty simple (see
//! [`VerifierFrame::verify_instruction`]), but when an instruction can be reached from multiple
//! locations the frames from the different source locations need to be unified. That is a
//! fix-point computation (see [`compute_frames`]) which needs to know how classes relate to each
//! other (see [`ClassHierarchy`]).
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.10.1

mod analysis;
mod frame;
mod hierarchy;
mod types;

pub use analysis::*;
pub use frame::*;
pub use hierarchy::*;
pub use types::*;
