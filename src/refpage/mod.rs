//! Parsing and indexing of OpenGL reference pages.
//!
//! One reference page is a DocBook document covering one or more related
//! functions. Parsing reduces it to an [`Entry`]: the page name, a
//! one-line summary, the function prototypes, a parameter table, related
//! page names, and the error constants the functions may raise. A
//! [`Spec`] loads every page of one API subset (such as `gl4`) and
//! indexes the entries under every name they answer to.

mod entry;
mod spec;
mod text;

pub use entry::{Entry, Function, KNOWN_ERRORS};
pub use spec::{find_entry, Spec};
pub use text::sanitize;

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while loading reference pages.
///
/// Any of these aborts the load of the whole subset; a [`Spec`] is never
/// partially populated.
#[derive(Error, Debug)]
pub enum RefError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed reference page: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("reference page has no root element")]
    NoRoot,
    #[error("failed to scan reference pages: {0}")]
    Scan(#[from] walkdir::Error),
}
