//! UI utilities for terminal output.

mod header;
mod qr;
mod views;

pub use header::print_session_header;
pub use qr::print_qr_code;
pub use views::{TerminalExportView, TerminalImportView, UiEvent};
