//! Resolving `include "path";` to source text.
//!
//! The parser never touches the filesystem directly — it asks an
//! [`IncludeResolver`] for the text behind a path, so the driver stays the
//! only thing that owns I/O. A resolver checks its bundled-library
//! registry before falling back to reading a file, the same order the
//! driver wires up in practice.

use std::collections::HashMap;

pub trait IncludeResolver {
    /// Returns the source text for `path`, or `None` if it can't be found.
    fn resolve(&self, path: &str) -> Option<String>;
}

/// An in-memory registry of named library sources (the "standard library"
/// modules shipped with the compiler), checked before any filesystem
/// lookup a concrete resolver might also perform.
#[derive(Default)]
pub struct BundledLibraries {
    sources: HashMap<&'static str, &'static str>,
}

impl BundledLibraries {
    pub fn new() -> Self {
        Self { sources: HashMap::new() }
    }

    pub fn register(&mut self, name: &'static str, source: &'static str) {
        self.sources.insert(name, source);
    }

    pub fn get(&self, name: &str) -> Option<&'static str> {
        self.sources.get(name).copied()
    }
}

impl IncludeResolver for BundledLibraries {
    fn resolve(&self, path: &str) -> Option<String> {
        self.get(path).map(str::to_string)
    }
}

/// A resolver used in tests and by callers that have no bundled library
/// and no filesystem access to offer.
#[derive(Default)]
pub struct NullResolver;

impl IncludeResolver for NullResolver {
    fn resolve(&self, _path: &str) -> Option<String> {
        None
    }
}

/// The resolver the driver actually wires up: bundled libraries first, a
/// plain filesystem read second. This is the one place in the whole crate
/// that touches disk on `include`'s behalf.
#[derive(Default)]
pub struct FsFallbackResolver {
    bundled: BundledLibraries,
}

impl FsFallbackResolver {
    pub fn new(bundled: BundledLibraries) -> Self {
        Self { bundled }
    }
}

impl IncludeResolver for FsFallbackResolver {
    fn resolve(&self, path: &str) -> Option<String> {
        self.bundled.resolve(path).or_else(|| std::fs::read_to_string(path).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_library_resolves_registered_name() {
        let mut libs = BundledLibraries::new();
        libs.register("math", "func square(n) { return n * n; }");
        assert!(libs.resolve("math").is_some());
        assert!(libs.resolve("missing").is_none());
    }

    #[test]
    fn null_resolver_resolves_nothing() {
        assert_eq!(NullResolver.resolve("anything"), None);
    }
}
