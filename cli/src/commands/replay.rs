//! Replay command implementation.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use jamilink_core::{
    AuthResult, Config, ExportSidePresenter, ImportSidePresenter, SignalHandler, SignalRouter,
};

use super::offline::OfflineDaemon;
use crate::ui::{TerminalExportView, TerminalImportView};

/// Which controller the recorded signals are fed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReplayRole {
    Import,
    Export,
}

/// Parse a JSON-lines file of daemon records, skipping blanks and `#` comments.
fn parse_records(content: &str) -> anyhow::Result<Vec<AuthResult>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str::<AuthResult>(line).with_context(|| format!("line {}: invalid auth result", index + 1))
        })
        .collect()
}

/// Feed recorded daemon signals through a controller and show what it renders.
pub fn replay_signals(role: ReplayRole, account: Option<String>, path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let records = parse_records(&content)?;

    let Some(account) = account.or_else(|| records.first().map(|r| r.account_id.clone())) else {
        println!("\x1b[2mNo records in {}\x1b[0m", path.display());
        return Ok(());
    };

    let daemon = Arc::new(OfflineDaemon);
    let handler: Arc<dyn SignalHandler> = match role {
        ReplayRole::Import => Arc::new(ImportSidePresenter::new(
            account.as_str(),
            daemon,
            Arc::new(TerminalImportView::default()),
        )),
        ReplayRole::Export => Arc::new(ExportSidePresenter::new(
            account.as_str(),
            daemon,
            Arc::new(TerminalExportView::default()),
        )),
    };

    let router = SignalRouter::new(Config::unbounded());
    let generation = router.activate(handler.clone());

    let mut rejected = 0;
    for record in &records {
        if let Err(e) = router.dispatch(record) {
            rejected += 1;
            eprintln!("\x1b[1;31m✗\x1b[0m {} signal rejected: {}", record.state, e);
        }
    }
    router.finish(generation);

    println!(
        "\n\x1b[1mReplayed\x1b[0m {} record(s), {} rejected, final state {}",
        records.len(),
        rejected,
        handler.current_state()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jamilink_core::protocol::LinkDeviceState;

    #[test]
    fn test_parse_records_skips_comments() {
        let content = r#"
# recorded on the new device
{"accountId":"acc","state":"TOKEN_AVAILABLE","details":{"token":"jami-auth://x"}}

{"accountId":"acc","state":"DONE"}
"#;
        let records = parse_records(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].state, LinkDeviceState::Done);
    }

    #[test]
    fn test_parse_records_reports_line() {
        let err = parse_records("{\"accountId\":\"acc\"}\nnot json").unwrap_err();
        assert!(err.to_string().starts_with("line 1"));
    }
}
