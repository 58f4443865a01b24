#[allow(clippy::module_inception)]
pub mod hypr;

pub use hypr::{HotkeyError, HotkeyRegistrar, HyprlandHotkeys, KeyBinding};
