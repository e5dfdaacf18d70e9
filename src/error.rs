use std::path::PathBuf;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The low-level parsing error, covering everything that can go wrong while reading the
/// PE image, the CLR header, the metadata streams and the tables.
///
/// These errors never reach the caller of [`crate::extract`] directly; they are wrapped
/// in [`ExtractionError::InvalidModule`] (or [`ExtractionError::NotFound`] for I/O
/// failures while opening the file). Lower level entry points such as
/// [`crate::metadata::moduleview::ModuleView`] return them as-is.
///
/// # Examples
///
/// ```rust,no_run
/// use dotinfo::{Error, metadata::moduleview::ModuleView};
///
/// match ModuleView::from_mem(std::fs::read("library.dll")?) {
///     Ok(view) => println!("runtime {}", view.runtime_version()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// Includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported (e.g. a native PE without a CLR header).
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The input exceeds the configured size limit.
    #[error("File size {size} exceeds the configured limit of {limit} bytes")]
    FileTooLarge {
        /// Actual size of the input
        size: u64,
        /// Configured maximum
        limit: u64,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),
}

/// The error returned by [`crate::extract`] and friends.
///
/// Structural failures ([`ExtractionError::NotFound`], [`ExtractionError::InvalidModule`])
/// abort the extraction and no partial record is produced. [`ExtractionError::AttributeDecode`]
/// is the only recoverable kind: the extractor records it as a
/// [`crate::metadata::diagnostics::Diagnostic`] on the returned record and moves on to the next
/// attribute.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The path does not exist, is not a regular file, or could not be read.
    #[error("Module '{}' not found or not accessible: {source}", path.display())]
    NotFound {
        /// The path that was requested
        path: PathBuf,
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a loadable .NET module, or lacks the mandatory identity metadata.
    #[error("'{}' is not a valid .NET module: {source}", path.display())]
    InvalidModule {
        /// The path that was requested
        path: PathBuf,
        /// The parsing failure
        #[source]
        source: Error,
    },

    /// A recognized attribute carried an argument of an unexpected type.
    #[error("Failed to decode {attribute}: {message}")]
    AttributeDecode {
        /// Fully qualified name of the attribute type
        attribute: String,
        /// What went wrong
        message: String,
    },
}

impl ExtractionError {
    /// Classifies a low level [`Error`] raised while loading `path`.
    ///
    /// I/O failures become [`ExtractionError::NotFound`], everything else is an
    /// [`ExtractionError::InvalidModule`].
    pub(crate) fn from_load(path: PathBuf, error: Error) -> Self {
        match error {
            Error::FileError(source) => ExtractionError::NotFound { path, source },
            source => ExtractionError::InvalidModule { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_load_classifies_io_errors_as_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = ExtractionError::from_load(PathBuf::from("a.dll"), Error::FileError(io));
        assert!(matches!(error, ExtractionError::NotFound { .. }));
    }

    #[test]
    fn from_load_classifies_parse_errors_as_invalid() {
        let error = ExtractionError::from_load(PathBuf::from("a.dll"), malformed_error!("bad"));
        assert!(matches!(error, ExtractionError::InvalidModule { .. }));

        let error = ExtractionError::from_load(PathBuf::from("a.dll"), Error::Empty);
        assert!(matches!(
            error,
            ExtractionError::InvalidModule {
                source: Error::Empty,
                ..
            }
        ));
    }

    #[test]
    fn malformed_error_captures_location() {
        let error = malformed_error!("Invalid value - {}", 42);
        match error {
            Error::Malformed { message, file, .. } => {
                assert_eq!(message, "Invalid value - 42");
                assert!(file.ends_with("error.rs"));
            }
            _ => panic!("Expected Malformed"),
        }
    }
}
