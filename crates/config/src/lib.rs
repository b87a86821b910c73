mod builtins;
mod config;
mod constants;

pub use builtins::{builtin_cell_deps, builtin_lock_cell_dep};
pub use config::*;
pub use constants::*;
