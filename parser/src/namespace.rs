//! Namespace holding resolved configuration objects by scope.
//!
//! Ported from `namespace.py`'s `OmniConfigNamespace(SimpleNamespace)`.
//! Rust has no dynamic attribute access, so scopes are looked up by name
//! through an `Any`-downcasting map instead of `__dict__`/`__getitem__`.

use std::any::Any;
use std::sync::Arc;

use indexmap::IndexMap;
use omniconfig_core::value::Factoried;

use crate::error::{ParserError, Result};

/// Scope name -> resolved record instance, type-erased behind `Any`.
#[derive(Default)]
pub struct OmniConfigNamespace {
    entries: IndexMap<String, Arc<dyn Any + Send + Sync>>,
}

impl OmniConfigNamespace {
    pub fn new() -> Self {
        OmniConfigNamespace { entries: IndexMap::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Retrieve a scope's config instance as `T`, the type it was
    /// registered with. Returns `None` if the scope is absent or was
    /// registered under a different concrete type.
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.entries.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn insert_arc(&mut self, name: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.entries.insert(name.into(), value);
    }

    /// Store a materialized scope value, requiring it to be a record
    /// instance (the root configuration must always be a registered
    /// record, mirroring `OmniConfigNamespace.__setitem__`'s dataclass
    /// check).
    pub fn insert_factoried(&mut self, name: &str, factoried: Factoried) -> Result<()> {
        match factoried {
            Factoried::Record(_, arc) => {
                self.entries.insert(name.to_string(), arc);
                Ok(())
            }
            _ => Err(ParserError::config(format!(
                "scope '{name}' did not materialize into a record instance"
            ))),
        }
    }

    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roundtrips_an_arc_value() {
        let mut ns = OmniConfigNamespace::new();
        ns.insert_arc("app", Arc::new(42i64) as Arc<dyn Any + Send + Sync>);
        assert!(ns.contains("app"));
        assert_eq!(ns.get::<i64>("app"), Some(&42));
        assert_eq!(ns.get::<String>("app"), None);
    }
}
