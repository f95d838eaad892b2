//! Text analysis: turning column values into `(term, position)` streams.
//!
//! Analyzers are pure functions with no I/O. They are registered by name in
//! an [`AnalyzerRegistry`]; the process-wide [`default_registry`] comes
//! pre-populated with the [`StandardAnalyzer`] under the name `"standard"`.

mod standard;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::{Error, Position, Result};

pub use self::standard::StandardAnalyzer;

/// A single token emitted by an analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized text content of the token.
    pub text: String,
    /// Position of the token within its document, counted in tokens from 0.
    pub position: Position,
}

/// Splits a document into a stream of normalized tokens.
///
/// Positions are per-document, start at 0 and increase by one per emitted
/// token. Stopword policy, if any, is internal to the analyzer.
pub trait Analyzer: Send + Sync + 'static {
    /// Tokenizes `text`.
    fn analyze(&self, text: &str) -> Vec<Token>;
}

/// Store of named analyzers.
#[derive(Default)]
pub struct AnalyzerRegistry {
    analyzers: RwLock<HashMap<String, Arc<dyn Analyzer>>>,
}

impl AnalyzerRegistry {
    /// Registers `analyzer` under `name`, replacing any previous entry.
    pub fn register<A: Analyzer>(&self, name: &str, analyzer: A) {
        self.analyzers
            .write()
            .expect("poisoned lock")
            .insert(name.to_string(), Arc::new(analyzer));
    }

    /// Accesses an analyzer given its name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Analyzer>> {
        self.analyzers
            .read()
            .expect("poisoned lock")
            .get(name)
            .cloned()
    }

    /// Like [`get`](Self::get), but reports an unknown name as a
    /// [`Error::Config`].
    pub fn require(&self, name: &str) -> Result<Arc<dyn Analyzer>> {
        self.get(name)
            .ok_or_else(|| Error::Config(format!("unknown analyzer: '{name}'")))
    }
}

/// The process-wide analyzer registry.
pub fn default_registry() -> &'static AnalyzerRegistry {
    static REGISTRY: Lazy<AnalyzerRegistry> = Lazy::new(|| {
        let registry = AnalyzerRegistry::default();
        registry.register("standard", StandardAnalyzer);
        registry
    });
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::{default_registry, Analyzer, AnalyzerRegistry, StandardAnalyzer, Token};
    use crate::Error;

    #[test]
    fn test_default_registry_has_standard() {
        assert!(default_registry().get("standard").is_some());
        assert!(default_registry().get("no_such_analyzer").is_none());
    }

    #[test]
    fn test_require_unknown_is_config_error() {
        let err = match default_registry().require("klingon") {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_register_overrides() {
        struct Single;
        impl Analyzer for Single {
            fn analyze(&self, _text: &str) -> Vec<Token> {
                vec![Token {
                    text: "x".to_string(),
                    position: 0,
                }]
            }
        }
        let registry = AnalyzerRegistry::default();
        registry.register("custom", StandardAnalyzer);
        registry.register("custom", Single);
        let tokens = registry.get("custom").unwrap().analyze("a b c");
        assert_eq!(tokens.len(), 1);
    }
}
