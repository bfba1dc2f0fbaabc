//! Terminal renderings of the link-device views.

use jamilink_core::{
    ExportSideInputError, ExportSideView, ImportSideView, LinkResult, Role,
};
use tokio::sync::mpsc;

/// What a view showed, for drivers acting as the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    TokenShown(String),
    PeerShown(Option<String>),
    AuthenticationShown { need_password: bool },
    InputRejected(ExportSideInputError),
    Finished(Role, LinkResult),
}

fn forward(events: &Option<mpsc::UnboundedSender<UiEvent>>, event: UiEvent) {
    if let Some(tx) = events {
        if tx.send(event).is_err() {
            tracing::debug!("ui event receiver dropped");
        }
    }
}

fn print_result(side: &str, result: LinkResult) {
    match result {
        LinkResult::InProgress => println!("\x1b[1;34m⋯\x1b[0m [{}] Transferring account...", side),
        LinkResult::Done => println!("\x1b[1;32m✓\x1b[0m [{}] Device linked", side),
        LinkResult::Failed(error) => eprintln!("\x1b[1;31m✗\x1b[0m [{}] Linking failed: {}", side, error),
    }
}

/// Import side rendered as terminal lines
#[derive(Default)]
pub struct TerminalImportView {
    events: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl TerminalImportView {
    pub fn new(events: Option<mpsc::UnboundedSender<UiEvent>>) -> Self {
        Self { events }
    }
}

impl ImportSideView for TerminalImportView {
    fn show_authentication_uri(&self, uri: Option<&str>) {
        match uri {
            Some(uri) => {
                println!("\x1b[1;33m⚡\x1b[0m [import] Scan or enter this on the other device:");
                println!("    \x1b[1m{}\x1b[0m", uri);
                forward(&self.events, UiEvent::TokenShown(uri.to_string()));
            }
            None => println!("\x1b[2m[import] Waiting for an authentication token...\x1b[0m"),
        }
    }

    fn show_action_required(&self) {
        println!("\x1b[1;35m⬤\x1b[0m [import] Action required on the other device");
    }

    fn show_authentication(&self, need_password: bool, jami_id: &str, registered_name: Option<&str>) {
        match registered_name {
            Some(name) => println!("\x1b[1;35m⬤\x1b[0m [import] Importing \x1b[1m{}\x1b[0m ({})", name, jami_id),
            None => println!("\x1b[1;35m⬤\x1b[0m [import] Importing {}", jami_id),
        }
        if need_password {
            println!("    Account is password protected");
        }
        forward(&self.events, UiEvent::AuthenticationShown { need_password });
    }

    fn show_result(&self, result: LinkResult) {
        print_result("import", result);
        if result != LinkResult::InProgress {
            forward(&self.events, UiEvent::Finished(Role::Import, result));
        }
    }
}

/// Export side rendered as terminal lines
#[derive(Default)]
pub struct TerminalExportView {
    events: Option<mpsc::UnboundedSender<UiEvent>>,
}

impl TerminalExportView {
    pub fn new(events: Option<mpsc::UnboundedSender<UiEvent>>) -> Self {
        Self { events }
    }
}

impl ExportSideView for TerminalExportView {
    fn show_input(&self, error: Option<ExportSideInputError>) {
        match error {
            Some(error) => {
                eprintln!("\x1b[1;31m✗\x1b[0m [export] {}", error);
                forward(&self.events, UiEvent::InputRejected(error));
            }
            None => println!("\x1b[2m[export] Enter the authentication uri shown on the new device\x1b[0m"),
        }
    }

    fn show_ip(&self, ip: Option<&str>) {
        println!(
            "\x1b[1;35m⬤\x1b[0m [export] New device connecting from \x1b[1m{}\x1b[0m",
            ip.unwrap_or("an unknown address")
        );
        forward(&self.events, UiEvent::PeerShown(ip.map(str::to_string)));
    }

    fn show_password_protection(&self) {
        println!("\x1b[1;35m⬤\x1b[0m [export] Waiting for the new device to unlock the account");
    }

    fn show_result(&self, result: LinkResult) {
        print_result("export", result);
        if result != LinkResult::InProgress {
            forward(&self.events, UiEvent::Finished(Role::Export, result));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jamilink_core::AuthError;

    #[test]
    fn test_views_forward_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let import = TerminalImportView::new(Some(tx.clone()));
        let export = TerminalExportView::new(Some(tx));

        import.show_authentication_uri(Some("jami-auth://x"));
        import.show_result(LinkResult::InProgress);
        export.show_ip(Some("10.0.0.1"));
        export.show_result(LinkResult::Failed(AuthError::Network));

        assert_eq!(rx.try_recv().unwrap(), UiEvent::TokenShown("jami-auth://x".to_string()));
        assert_eq!(rx.try_recv().unwrap(), UiEvent::PeerShown(Some("10.0.0.1".to_string())));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::Finished(Role::Export, LinkResult::Failed(AuthError::Network))
        );
        assert!(rx.try_recv().is_err());
    }
}
