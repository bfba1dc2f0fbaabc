//! Demo command implementation.

use std::sync::Arc;

use jamilink_core::daemon::ArchiveIdentity;
use jamilink_core::{
    Config, ExportSidePresenter, ImportSidePresenter, LinkResult, LoopbackDaemon, Role,
    SignalRouter,
};
use tokio::sync::mpsc;

use crate::ui::{print_qr_code, print_session_header, TerminalExportView, TerminalImportView, UiEvent};

const IMPORT_ACCOUNT: &str = "new-device";
const EXPORT_ACCOUNT: &str = "this-device";

/// Options for a loopback linking session
pub struct DemoOptions {
    pub name: String,
    /// Password protecting the exported archive
    pub password: Option<String>,
    /// Password the new device types; defaults to the archive password
    pub typed_password: Option<String>,
    pub config: Config,
}

/// Link two in-process accounts, acting as the user on both devices.
pub async fn run_demo(options: DemoOptions) -> anyhow::Result<()> {
    print_session_header(&options.name, options.password.is_some(), &options.config);

    let daemon = Arc::new(LoopbackDaemon::new());
    let import_signals = daemon.register_account(IMPORT_ACCOUNT, None);
    let export_signals = daemon.register_account(
        EXPORT_ACCOUNT,
        Some(ArchiveIdentity::from_name(&options.name, options.password.clone())),
    );

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let import = Arc::new(ImportSidePresenter::new(
        IMPORT_ACCOUNT,
        daemon.clone(),
        Arc::new(TerminalImportView::new(Some(ui_tx.clone()))),
    ));
    let export = Arc::new(ExportSidePresenter::new(
        EXPORT_ACCOUNT,
        daemon.clone(),
        Arc::new(TerminalExportView::new(Some(ui_tx))),
    ));

    let import_router = Arc::new(SignalRouter::new(options.config.clone()));
    let import_generation = import_router.activate(import.clone());
    let export_router = Arc::new(SignalRouter::new(options.config));
    let export_generation = export_router.activate(export.clone());

    let import_task = tokio::spawn({
        let router = import_router.clone();
        async move { router.run(import_signals).await }
    });
    let export_task = tokio::spawn({
        let router = export_router.clone();
        async move { router.run(export_signals).await }
    });

    // Handle Ctrl+C gracefully
    let (cancel_tx, mut cancel_rx) = mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = cancel_tx.blocking_send(());
    })?;

    daemon.open_import_session(IMPORT_ACCOUNT)?;

    let typed_password = options
        .typed_password
        .or(options.password)
        .unwrap_or_default();
    let mut outcomes: Vec<(Role, LinkResult)> = Vec::new();

    while outcomes.len() < 2 {
        tokio::select! {
            Some(event) = ui_rx.recv() => match event {
                UiEvent::TokenShown(token) => {
                    println!();
                    print_qr_code(&token)?;
                    println!("\x1b[2m[export] Scanned the code\x1b[0m");
                    export.on_authentication_uri(&token)?;
                }
                UiEvent::PeerShown(_) => {
                    println!("\x1b[2m[export] Confirmed the new device\x1b[0m");
                    export.on_identity_confirmation()?;
                }
                UiEvent::AuthenticationShown { need_password } => {
                    if need_password {
                        println!("\x1b[2m[import] Entered the account password\x1b[0m");
                    }
                    import.on_authentication(&typed_password)?;
                }
                UiEvent::InputRejected(error) => {
                    anyhow::bail!("export side rejected the token: {}", error);
                }
                UiEvent::Finished(role, result) => outcomes.push((role, result)),
            },
            _ = cancel_rx.recv() => {
                println!("\n\x1b[1;33mCancelling...\x1b[0m");
                if let Err(e) = import.on_cancel() {
                    tracing::warn!("cancel on import side: {}", e);
                }
                if let Err(e) = export.on_cancel() {
                    tracing::warn!("cancel on export side: {}", e);
                }
                break;
            }
        }
    }

    import_router.finish(import_generation);
    export_router.finish(export_generation);
    import_task.abort();
    export_task.abort();

    if let Some((role, LinkResult::Failed(error))) = outcomes
        .iter()
        .copied()
        .find(|(_, result)| matches!(result, LinkResult::Failed(_)))
    {
        anyhow::bail!("{} side failed: {}", role, error);
    }
    if outcomes.len() == 2 {
        println!("\n\x1b[1;32m✓\x1b[0m {} is now available on the new device\n", options.name);
    }
    Ok(())
}
