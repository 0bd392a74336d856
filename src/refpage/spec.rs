//! Per-subset loading and alias indexing.

use std::collections::HashMap;
use std::path::Path;

use globset::Glob;
use walkdir::WalkDir;

use super::{Entry, RefError};

/// A named set of reference pages indexed by every name they answer to.
///
/// Pages live in an append-only arena owned by the Spec; aliases (the
/// page's own name plus each function name it documents) map into the
/// arena, so one page is reachable under many names without being
/// duplicated and without shared ownership.
#[derive(Debug, Default)]
pub struct Spec {
    /// Subset name, e.g. "gl4" or "es3.0".
    pub name: String,
    pages: Vec<Entry>,
    aliases: HashMap<String, usize>,
}

impl Spec {
    /// Load every `gl*.xml` page under `base/name`.
    ///
    /// Any unreadable or malformed page aborts the whole load; a Spec is
    /// all-or-nothing. Pages register in file-name order, so when two
    /// files claim the same alias the lexicographically later file wins,
    /// independent of how the directory happens to be traversed.
    pub fn load(base: &Path, name: &str) -> Result<Spec, RefError> {
        let matcher = Glob::new("gl*.xml").expect("valid glob").compile_matcher();

        let mut paths = Vec::new();
        for file in WalkDir::new(base.join(name)).min_depth(1).max_depth(1) {
            let file = file?;
            if file.file_type().is_file() && matcher.is_match(file.file_name()) {
                paths.push(file.into_path());
            }
        }
        paths.sort();

        let mut spec = Spec {
            name: name.to_string(),
            ..Spec::default()
        };
        for path in paths {
            let page = Entry::load(&path)?;
            spec.insert(page);
        }
        Ok(spec)
    }

    /// Register a page under its own name and each of its function
    /// names. A colliding alias is repointed at the new page.
    pub(crate) fn insert(&mut self, page: Entry) {
        let index = self.pages.len();
        self.aliases.insert(page.name.clone(), index);
        for func in &page.funcs {
            self.aliases.insert(func.name.clone(), index);
        }
        self.pages.push(page);
    }

    /// Look a page up by any of its aliases.
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.aliases.get(name).map(|&i| &self.pages[i])
    }

    /// Number of distinct pages loaded.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Number of names the pages answer to.
    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

/// Search several specs in load order; the first subset wins, which
/// keeps lookups preferring the newest documentation.
pub fn find_entry<'a>(specs: &'a [Spec], name: &str) -> Option<&'a Entry> {
    specs.iter().find_map(|spec| spec.get(name))
}
