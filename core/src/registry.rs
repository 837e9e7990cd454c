//! Global type registry facade.
//!
//! Ported from `registry.py`'s `OmniConfig` classmethods. A single
//! process-wide [`TypeSystem`] backs every config parsed in that process,
//! the same way the Python package keeps one module-level type system.

use std::sync::OnceLock;

use crate::error::Result;
use crate::types::{CustomFactoryFn, CustomId, CustomReducerFn, CustomTypeInfo, DeclaredType, TypeSystem};

static GLOBAL_TYPE_SYSTEM: OnceLock<TypeSystem> = OnceLock::new();

/// The process-wide type system backing [`register_type`] and friends.
pub fn global_type_system() -> &'static TypeSystem {
    GLOBAL_TYPE_SYSTEM.get_or_init(TypeSystem::new)
}

/// Register a custom type globally.
pub fn register_type(
    name: CustomId,
    type_hint: DeclaredType,
    factory: CustomFactoryFn,
    reducer: CustomReducerFn,
) -> Result<()> {
    global_type_system().register(name, type_hint, factory, reducer)
}

pub fn is_type_registered(name: CustomId) -> bool {
    global_type_system().is_registered(name)
}

pub fn get_type_info(name: CustomId) -> Option<CustomTypeInfo> {
    global_type_system().retrieve(name)
}

/// Clear every globally registered custom type. Intended for test isolation;
/// does not affect registered record schemas.
pub fn clear_type_registry() {
    global_type_system().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn register_and_retrieve_round_trips() {
        clear_type_registry();
        let factory: CustomFactoryFn = Arc::new(|v| Ok(Arc::new(v.clone()) as Arc<dyn std::any::Any + Send + Sync>));
        let reducer: CustomReducerFn = Arc::new(|_| crate::value::Value::Null);
        register_type("registry_test::marker", DeclaredType::String, factory, reducer).unwrap();
        assert!(is_type_registered("registry_test::marker"));
        assert!(get_type_info("registry_test::marker").is_some());
        clear_type_registry();
        assert!(!is_type_registered("registry_test::marker"));
    }
}
