//! Export of reconstructed interface polygons.

mod obj;
pub use obj::{to_obj_string, write_obj};

#[cfg(feature = "stl-io")]
mod stl;
#[cfg(feature = "stl-io")]
pub use stl::{to_stl_ascii, to_stl_binary};

/// Generic I/O and format-conversion errors.
///
/// STL output is behind the `stl-io` feature flag; OBJ output is always
/// available.
#[derive(Debug)]
pub enum IoError {
    StdIo(std::io::Error),

    MalformedInput(String),
    MalformedPath(String),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use IoError::*;

        match self {
            StdIo(error) => write!(f, "std::io::Error: {error}"),

            MalformedInput(msg) => write!(f, "Input is malformed: {msg}"),
            MalformedPath(msg) => write!(f, "The path is malformed: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}

impl From<std::io::Error> for IoError {
    fn from(value: std::io::Error) -> Self {
        Self::StdIo(value)
    }
}
