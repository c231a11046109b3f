//! Page registry.
//!
//! Pages are kept in creation order; the route table iterates them in that
//! order. Each path holds at most one page.
//!
//! # Page lifecycle
//!
//! ```text
//! create_page ──► (update_page)* ──► remove_*
//! ```
//!
//! Managed pages are re-created on every run of their plugin's
//! `create_managed_pages` hook: an unchanged digest is a no-op, a changed one
//! replaces the page in place. Unmanaged pages are created once. Nothing is
//! removed implicitly.

mod page;

pub use page::{CreatePageOptions, Page, PageFilter, PageInternals, PageQuery};

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::actions::ActionError;

/// Path reserved for the not-found fallback route.
pub const FALLBACK_PATH: &str = "*";

/// Page registry errors.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page not found: `{path}`")]
    NotFound { path: String },

    #[error("page `{path}` with component `{component}` already exists")]
    Duplicate { path: String, component: String },

    #[error("path `{path}` is already used by component `{existing}`, cannot add `{component}`")]
    PathConflict {
        path: String,
        existing: String,
        component: String,
    },

    #[error("path `*` is reserved for the not-found fallback route")]
    ReservedPath,

    #[error(transparent)]
    Action(#[from] ActionError),
}

/// All live pages of one build.
#[derive(Debug, Clone, Default)]
pub struct Pages {
    entries: BTreeMap<u64, Page>,
    by_path: FxHashMap<String, u64>,
    next: u64,
}

impl Pages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page owned by the plugin described by `owner`.
    pub fn create_page(&mut self, options: CreatePageOptions, owner: &PageInternals) -> Result<Page, PageError> {
        if options.path == FALLBACK_PATH {
            return Err(PageError::ReservedPath);
        }
        let replace = options.replace;
        let page = Page::new(options, owner);

        let Some(&key) = self.by_path.get(&page.path) else {
            self.next += 1;
            self.by_path.insert(page.path.clone(), self.next);
            self.entries.insert(self.next, page.clone());
            return Ok(page);
        };

        let existing = &self.entries[&key];
        if replace {
            self.entries.insert(key, page.clone());
            return Ok(page);
        }
        if existing.component != page.component {
            return Err(PageError::PathConflict {
                path: page.path,
                existing: existing.component.clone(),
                component: page.component,
            });
        }
        // Managed pages of another plugin are never taken over implicitly.
        if owner.is_managed && existing.internals.is_managed && existing.owner == page.owner {
            if existing.internals.digest == page.internals.digest {
                return Ok(existing.clone());
            }
            self.entries.insert(key, page.clone());
            return Ok(page);
        }
        Err(PageError::Duplicate {
            path: page.path,
            component: page.component,
        })
    }

    /// Replace the page at `options.path`, keeping its position.
    pub fn update_page(&mut self, options: CreatePageOptions, owner: &PageInternals) -> Result<Page, PageError> {
        let Some(&key) = self.by_path.get(&options.path) else {
            return Err(PageError::NotFound { path: options.path });
        };
        let page = Page::new(options, owner);
        self.entries.insert(key, page.clone());
        Ok(page)
    }

    /// Remove `page` if it is still registered at its path.
    pub fn remove_page(&mut self, page: &Page) -> bool {
        let matches = self
            .get(&page.path)
            .is_some_and(|existing| existing.component == page.component);
        matches && self.remove_page_by_path(&page.path) == 1
    }

    pub fn remove_page_by_path(&mut self, path: &str) -> usize {
        match self.by_path.remove(path) {
            Some(key) => usize::from(self.entries.remove(&key).is_some()),
            None => 0,
        }
    }

    pub fn remove_pages_by_component(&mut self, component: &str) -> usize {
        self.find_and_remove_pages(&PageFilter::default().component(component))
    }

    /// Remove every page matching `filter`. Returns the number removed.
    pub fn find_and_remove_pages(&mut self, filter: &PageFilter) -> usize {
        let keys: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, page)| filter.matches(page))
            .map(|(key, _)| *key)
            .collect();
        for key in &keys {
            if let Some(page) = self.entries.remove(key) {
                self.by_path.remove(&page.path);
            }
        }
        keys.len()
    }

    /// First page matching `filter`, in creation order.
    pub fn find_page(&self, filter: &PageFilter) -> Option<Page> {
        self.entries.values().find(|page| filter.matches(page)).cloned()
    }

    pub fn find_pages(&self, filter: &PageFilter) -> Vec<Page> {
        self.entries.values().filter(|page| filter.matches(page)).cloned().collect()
    }

    pub fn get(&self, path: &str) -> Option<&Page> {
        self.by_path.get(path).and_then(|key| self.entries.get(key))
    }

    /// Live pages in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
