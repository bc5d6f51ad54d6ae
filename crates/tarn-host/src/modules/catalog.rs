//! The builtin module catalog, embedded at build time.

use super::ModuleEntry;

/// Builtin modules in registration order.
///
/// `strict` comes first so that it governs how every later module loads.
pub const BUILTIN_MODULES: &[ModuleEntry] = &[
    ModuleEntry::new("strict", include_str!("../../lua/strict.lua")),
    ModuleEntry::new("string", include_str!("../../lua/string.lua")),
    ModuleEntry::new("table", include_str!("../../lua/table.lua")),
    ModuleEntry::new("log", include_str!("../../lua/log.lua")),
    ModuleEntry::new("fiber", include_str!("../../lua/fiber.lua")),
    ModuleEntry::new("fio", include_str!("../../lua/fio.lua")),
    ModuleEntry::new("clock", include_str!("../../lua/clock.lua")),
    ModuleEntry::new("help", include_str!("../../lua/help.lua")),
];
