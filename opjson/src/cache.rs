//! Process-wide program cache.

use core::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use opjson_core::Shape;
use parking_lot::RwLock;

use crate::compiler;
use crate::error::Result;
use crate::options::EncodeOptions;
use crate::program::Program;

/// Everything a compiled program depends on besides the type itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ProgramKey {
    pub type_id: TypeId,
    pub indent: bool,
    pub html_escape: bool,
    /// Root programs end with `End`, sub-programs with `Return`.
    pub root: bool,
}

impl ProgramKey {
    pub(crate) fn new(shape: &'static Shape, options: &EncodeOptions, root: bool) -> Self {
        Self {
            type_id: shape.id.type_id(),
            indent: options.indent.is_some(),
            html_escape: options.html_escape,
            root,
        }
    }
}

static CACHE: LazyLock<RwLock<HashMap<ProgramKey, Arc<Program>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Cache of compiled programs, keyed by type and the options that change
/// program shape.
pub struct ProgramCache;

impl ProgramCache {
    /// Clear all cached programs.
    /// Programs already handed out stay valid; the next encode recompiles.
    pub fn clear() {
        CACHE.write().clear();
    }

    /// Number of cached programs.
    pub fn len() -> usize {
        CACHE.read().len()
    }

    /// Check if cache is empty.
    pub fn is_empty() -> bool {
        CACHE.read().is_empty()
    }
}

/// Returns the cached program for `key`, compiling it on first use.
///
/// Two threads racing on the same key may both compile; the first insert
/// wins and both get the same program back.
pub(crate) fn get_or_compile(shape: &'static Shape, key: ProgramKey) -> Result<Arc<Program>> {
    if let Some(program) = CACHE.read().get(&key) {
        return Ok(Arc::clone(program));
    }
    let program = Arc::new(compiler::compile(shape, key)?);
    let mut cache = CACHE.write();
    let program = Arc::clone(cache.entry(key).or_insert(program));
    trace!("cached program for {} ({} total)", shape.type_name(), cache.len());
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opjson_core::Describe;
    use opjson_testhelpers::test;

    #[test]
    fn second_lookup_returns_the_inserted_program() {
        let options = EncodeOptions::default().html_escape(false);
        let key = ProgramKey::new(<[u16; 3]>::SHAPE, &options, true);
        let first = get_or_compile(<[u16; 3]>::SHAPE, key).unwrap();
        assert!(ProgramCache::len() >= 1);
        let second = get_or_compile(<[u16; 3]>::SHAPE, key).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.shape().is(<[u16; 3]>::SHAPE));
    }
}
