//! Validate command implementation.

use std::sync::Arc;

use jamilink_core::{AuthUri, ExportSidePresenter};

use super::offline::OfflineDaemon;
use crate::ui::TerminalExportView;

/// Run an authentication URI through the export side's input check.
pub fn validate_uri(uri: &str) -> anyhow::Result<()> {
    let presenter = ExportSidePresenter::new(
        "local",
        Arc::new(OfflineDaemon),
        Arc::new(TerminalExportView::default()),
    );

    presenter.on_authentication_uri(uri)?;

    println!("\x1b[1;32m✓\x1b[0m Valid authentication uri");
    if let Ok(parsed) = AuthUri::parse(uri) {
        if let Some((account, code)) = parsed.parts() {
            println!("\x1b[1mAccount:\x1b[0m {}", account);
            println!("\x1b[1mCode:\x1b[0m    {}", code);
        }
    }
    Ok(())
}
