//! CLI command implementations.

mod demo;
mod offline;
mod qr;
mod replay;
mod validate;

pub use demo::{run_demo, DemoOptions};
pub use qr::show_qr;
pub use replay::{replay_signals, ReplayRole};
pub use validate::validate_uri;
