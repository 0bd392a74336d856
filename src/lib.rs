//! glref - simplified OpenGL reference documentation, served locally.
//!
//! glref turns the Khronos OpenGL reference pages (DocBook XML, one file
//! per page) into flat, queryable records and serves them as JSON from a
//! local HTTP endpoint. A record is addressable by the page's own name or
//! by any of the functions it documents, so `glUniform3fv` resolves to
//! the `glUniform` page.
//!
//! # Architecture
//!
//! - `refpage`: the core - page parsing, text flattening, and the
//!   per-subset alias index
//! - `corpus`: the on-disk cache of the Khronos sources and the
//!   API/version to subset mapping
//! - `server`: the HTTP routes over the loaded subsets
//! - `cli`: flag parsing and command orchestration

pub mod cli;
pub mod corpus;
pub mod refpage;
pub mod server;

pub use corpus::Api;
pub use refpage::{find_entry, Entry, Function, RefError, Spec};
