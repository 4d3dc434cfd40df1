use crate::jvm;
use std::fmt;
use std::io;

/// Reasons a run can fail
///
/// Every variant is fatal: the pipeline stops at the first error and leaves no output behind.
#[derive(Debug)]
pub enum Error {
    /// Bad regex, unreadable or invalid configuration file, unknown logger
    Config(String),

    /// The archive or one of the class files in it could not be parsed
    MalformedInput(String),

    Io(io::Error),

    /// Frames or limits of an instrumented method could not be rebuilt
    VerificationRepair(String),
}

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Error {
        Error::Config(message.into())
    }

    /// Prefix the message with where the error happened (eg. the archive entry name)
    pub fn context<C: fmt::Display>(self, context: C) -> Error {
        match self {
            Error::Config(message) => Error::Config(format!("{}: {}", context, message)),
            Error::MalformedInput(message) => {
                Error::MalformedInput(format!("{}: {}", context, message))
            }
            Error::Io(err) => {
                Error::Io(io::Error::new(err.kind(), format!("{}: {}", context, err)))
            }
            Error::VerificationRepair(message) => {
                Error::VerificationRepair(format!("{}: {}", context, message))
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(message) => write!(f, "invalid configuration: {}", message),
            Error::MalformedInput(message) => write!(f, "malformed input: {}", message),
            Error::Io(err) => write!(f, "{}", err),
            Error::VerificationRepair(message) => {
                write!(f, "cannot repair verification data: {}", message)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        match err {
            jvm::Error::IoError(err) => Error::Io(err),
            jvm::Error::Malformed(message) => Error::MalformedInput(message),
            other => Error::VerificationRepair(other.to_string()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

/// Anything other than an I/O failure means the archive itself is broken
impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Error {
        match err {
            zip::result::ZipError::Io(err) => Error::Io(err),
            other => Error::MalformedInput(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Io(err.into())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Error {
        Error::Config(err.to_string())
    }
}
