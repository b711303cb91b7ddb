//! Diagnostic metadata attached to every declared object.
//!
//! Immutable once created and never part of the protocol semantics: the
//! protocol hash deliberately excludes it.

use std::backtrace::Backtrace;

/// Name, scope path, user tags and an optional declaration traceback.
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    pub name: String,
    /// Parent-linked scope path, outermost first.
    pub scope: Vec<String>,
    pub tags: Vec<String>,
    pub traceback: Option<String>,
}

impl Metadata {
    pub fn new(
        name: impl Into<String>,
        scope: Vec<String>,
        tags: Vec<String>,
        capture_traceback: bool,
    ) -> Self {
        Self {
            name: name.into(),
            scope,
            tags,
            traceback: capture_traceback.then(|| Backtrace::force_capture().to_string()),
        }
    }

    /// The scope path joined with the name, slash-separated.
    pub fn full_name(&self) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.scope.join("/"), self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_includes_the_scope_path() {
        let meta = Metadata::new(
            "alpha",
            vec!["outer".into(), "inner".into()],
            Vec::new(),
            false,
        );
        assert_eq!(meta.full_name(), "outer/inner/alpha");
        assert!(meta.traceback.is_none());
    }

    #[test]
    fn traceback_captured_on_demand() {
        let meta = Metadata::new("beta", Vec::new(), Vec::new(), true);
        assert!(meta.traceback.is_some());
    }
}
