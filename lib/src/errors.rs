use std::fmt;

/// Things that can go wrong while populating the symbol graph, the stores, or the platform
/// surface
///
/// Note that reference checking itself never fails: an unresolvable symbol is just invalid.
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    JsonError(serde_json::Error),

    /// A class or member name is not well-formed
    MalformedName(String),

    /// A type, method, or member descriptor could not be parsed
    BadDescriptor {
        descriptor: String,
        message: String,
    },

    /// A line in an API levels listing could not be understood
    BadApiLevels {
        line: usize,
        message: String,
    },

    /// Access flag keywords that don't exist
    BadAccessFlags(String),

    /// The same class was declared twice
    DuplicateClass(String),

    /// These classes (in this order) form a loop through super type edges
    CyclicHierarchy(Vec<String>),

    /// No store with this name exists
    UnknownStore(String),

    /// A class that is expected to be in the program is not
    MissingClass(String),

    /// A class which isn't defined in the program was put in a store
    ClassNotInStore(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::JsonError(err) => write!(f, "JSON error: {}", err),
            Error::MalformedName(msg) => write!(f, "malformed name: {}", msg),
            Error::BadDescriptor {
                descriptor,
                message,
            } => write!(f, "bad descriptor '{}': {}", descriptor, message),
            Error::BadApiLevels { line, message } => {
                write!(f, "bad API levels entry on line {}: {}", line, message)
            }
            Error::BadAccessFlags(msg) => write!(f, "bad access flags: {}", msg),
            Error::DuplicateClass(name) => write!(f, "class {} is declared twice", name),
            Error::CyclicHierarchy(names) => {
                write!(f, "cyclic class hierarchy: {}", names.join(" -> "))
            }
            Error::UnknownStore(name) => write!(f, "no store named '{}'", name),
            Error::MissingClass(name) => write!(f, "class {} is not in the program", name),
            Error::ClassNotInStore(name) => {
                write!(f, "class {} is not defined so it cannot be in a store", name)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::JsonError(err)
    }
}

impl Error {
    /// Wrap a descriptor parse failure, remembering what was being parsed
    pub fn bad_descriptor(descriptor: impl Into<String>, err: std::io::Error) -> Error {
        Error::BadDescriptor {
            descriptor: descriptor.into(),
            message: err.to_string(),
        }
    }
}
