use super::code::Label;
use super::verifier::VerificationType;
use super::{Constant, ConstantIndex};
use std::fmt;
use std::io::ErrorKind;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),

    /// Bytes do not have the structure of a class file (or of some part of one)
    Malformed(String),

    /// No room left in the constant pool for another entry
    ConstantPoolOverflow {
        offset: u16,
    },

    /// A string whose modified UTF-8 encoding does not fit in a `CONSTANT_Utf8` entry
    Utf8ConstantTooLong(usize),

    MethodCodeMaxStackOverflow(usize),
    MethodCodeMaxLocalsOverflow(usize),
    MethodCodeOverflow(usize),

    /// A label is used as a jump target or range bound but is never placed (indicates a bug)
    UnplacedLabel(Label),

    /// A 16-bit jump was laid out with a distance that does not fit (indicates a bug)
    JumpOutOfRange { offset: usize, target: usize },

    /// Error trying to compute frames for a method body
    VerifierError {
        offset: usize,
        kind: VerifierErrorKind,
    },
}

#[derive(Debug)]
pub enum VerifierErrorKind {
    EmptyStack,
    InvalidWidth(usize),
    NotArrayType,
    InvalidIndex(u16),
    InvalidType,
    MissingConstant(ConstantIndex),
    NotLoadableConstant(Constant),
    IncompatibleTypes(
        VerificationType<String, Label>,
        VerificationType<String, Label>,
    ),
    StackHeightMismatch(usize, usize),
    BadDescriptor(String),

    /// Execution can run past the last instruction
    FallsOffEnd,

    /// `jsr`/`ret` cannot be described with stack map frames
    Subroutine,
}

impl Error {
    pub fn malformed<S: Into<String>>(message: S) -> Error {
        Error::Malformed(message.into())
    }

    /// Whether the error is a problem with the input, as opposed to one we caused
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::Malformed(_))
    }
}

/// Decoding happens over in-memory buffers, so running out of bytes or reading invalid data means
/// the input is malformed rather than that some I/O went wrong.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        match err.kind() {
            ErrorKind::UnexpectedEof => Error::malformed("unexpected end of input"),
            ErrorKind::InvalidData | ErrorKind::InvalidInput => Error::Malformed(err.to_string()),
            _ => Error::IoError(err),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "{}", err),
            Error::Malformed(message) => write!(f, "{}", message),
            Error::ConstantPoolOverflow { offset } => {
                write!(f, "constant pool overflow at index {}", offset)
            }
            Error::Utf8ConstantTooLong(len) => {
                write!(f, "string constant of {} bytes exceeds the JVM limit", len)
            }
            Error::MethodCodeMaxStackOverflow(size) => {
                write!(f, "operand stack of {} slots exceeds the JVM limit", size)
            }
            Error::MethodCodeMaxLocalsOverflow(size) => {
                write!(f, "{} local variable slots exceeds the JVM limit", size)
            }
            Error::MethodCodeOverflow(size) => {
                write!(f, "method code of {} bytes exceeds the JVM limit", size)
            }
            Error::UnplacedLabel(label) => write!(f, "label {:?} was never placed", label),
            Error::JumpOutOfRange { offset, target } => {
                write!(f, "jump at offset {} cannot reach offset {}", offset, target)
            }
            Error::VerifierError { offset, kind } => {
                write!(f, "at offset {}: {:?}", offset, kind)
            }
        }
    }
}

impl std::error::Error for Error {}
