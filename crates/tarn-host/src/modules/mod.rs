//! Builtin module registration.
//!
//! Builtins are Lua sources compiled into the binary. At host init each one
//! is compiled under a synthetic origin (`@builtin/<name>.lua`), called with
//! its own name, and its return value cached in `package.loaded`, the same
//! table `require` consults. Nothing touches the filesystem.
//!
//! # Architecture
//!
//! ```text
//! package.loaded
//! ├── internal.log, internal.fiber, internal.fio   (native, see crate::native)
//! ├── strict, log, fiber, fio, clock, help          (BUILTIN_MODULES)
//! ├── string, table                                 (extended in place)
//! └── tarn                                          (host metadata)
//! ```

mod catalog;

pub use catalog::BUILTIN_MODULES;

use mlua::{Lua, Table, Value};

use crate::error::HostError;

/// A builtin module: a unique name and its embedded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleEntry {
    pub name: &'static str,
    pub source: &'static str,
}

impl ModuleEntry {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    /// Origin label used in error messages and stack frames.
    pub fn chunk_name(&self) -> String {
        format!("@builtin/{}.lua", self.name)
    }
}

/// The interpreter's module cache (`package.loaded`).
pub fn loaded_table(lua: &Lua) -> mlua::Result<Table> {
    let package: Table = lua.globals().get("package")?;
    package.get("loaded")
}

/// Compile and run each catalog entry in order, caching non-nil exports.
///
/// Returns the number of exports cached. Modules that return nothing are
/// assumed to have acted through side effects and leave `package.loaded`
/// untouched. Any failure is reported with the module's name; catalog
/// entries are build assets, so a failure means a broken build.
pub fn register_modules(lua: &Lua, catalog: &[ModuleEntry]) -> Result<usize, HostError> {
    let loaded = loaded_table(lua)?;
    let mut cached = 0;

    for entry in catalog {
        let func = lua
            .load(entry.source)
            .set_name(entry.chunk_name())
            .into_function()
            .map_err(|e| HostError::ModuleCompile {
                name: entry.name.to_string(),
                message: e.to_string(),
            })?;

        let export: Value = func.call(entry.name).map_err(|e| HostError::ModuleInit {
            name: entry.name.to_string(),
            message: e.to_string(),
        })?;

        if export.is_nil() {
            tracing::trace!(module = entry.name, "builtin registered (side effects only)");
        } else {
            loaded.set(entry.name, export)?;
            cached += 1;
            tracing::trace!(module = entry.name, "builtin registered");
        }
    }

    tracing::debug!(modules = catalog.len(), cached, "builtin modules registered");
    Ok(cached)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn catalog_names_are_unique() {
        let mut seen = HashSet::new();
        for entry in BUILTIN_MODULES {
            assert!(seen.insert(entry.name), "duplicate builtin module: {}", entry.name);
        }
    }

    #[test]
    fn strict_is_registered_first() {
        assert_eq!(BUILTIN_MODULES.first().map(|e| e.name), Some("strict"));
    }

    #[test]
    fn exports_are_cached_and_nil_results_skipped() {
        let lua = Lua::new();
        let catalog = [
            ModuleEntry::new("alpha", "return { value = 42 }"),
            ModuleEntry::new("beta", "side_effect = true"),
        ];

        let cached = register_modules(&lua, &catalog).unwrap();
        assert_eq!(cached, 1);

        let loaded = loaded_table(&lua).unwrap();
        let alpha: Table = loaded.get("alpha").unwrap();
        assert_eq!(alpha.get::<i64>("value").unwrap(), 42);
        assert!(loaded.get::<Value>("beta").unwrap().is_nil());
        assert!(lua.globals().get::<bool>("side_effect").unwrap());
    }

    #[test]
    fn module_receives_its_name() {
        let lua = Lua::new();
        let catalog = [ModuleEntry::new("named.thing", "local name = ... return name")];
        register_modules(&lua, &catalog).unwrap();
        let loaded = loaded_table(&lua).unwrap();
        assert_eq!(loaded.get::<String>("named.thing").unwrap(), "named.thing");
    }

    #[test]
    fn cached_module_is_what_require_returns() {
        let lua = Lua::new();
        let catalog = [ModuleEntry::new("gamma", "return { id = 'g' }")];
        register_modules(&lua, &catalog).unwrap();
        let id: String = lua.load("return require('gamma').id").eval().unwrap();
        assert_eq!(id, "g");
    }

    #[test]
    fn later_modules_see_earlier_ones() {
        let lua = Lua::new();
        let catalog = [
            ModuleEntry::new("base", "return { n = 1 }"),
            ModuleEntry::new("derived", "return { n = require('base').n + 1 }"),
        ];
        register_modules(&lua, &catalog).unwrap();
        let n: i64 = lua.load("return require('derived').n").eval().unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn compile_failure_names_the_module() {
        let lua = Lua::new();
        let catalog = [
            ModuleEntry::new("fine", "return {}"),
            ModuleEntry::new("broken", "return {"),
        ];
        let err = register_modules(&lua, &catalog).unwrap_err();
        match err {
            HostError::ModuleCompile { name, message } => {
                assert_eq!(name, "broken");
                assert!(message.contains("builtin/broken.lua"), "got: {message}");
            }
            other => panic!("expected ModuleCompile, got {other:?}"),
        }
    }

    #[test]
    fn init_failure_stops_registration() {
        let lua = Lua::new();
        let catalog = [
            ModuleEntry::new("raises", "error('bad build')"),
            ModuleEntry::new("never", "reached = true return {}"),
        ];
        let err = register_modules(&lua, &catalog).unwrap_err();
        assert!(matches!(err, HostError::ModuleInit { ref name, .. } if name == "raises"));
        assert!(lua.globals().get::<Value>("reached").unwrap().is_nil());
    }
}
