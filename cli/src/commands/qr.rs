//! QR command implementation.

use jamilink_core::AuthUri;

use crate::ui::print_qr_code;

/// Print `uri` as a QR code for the exporting device to scan.
pub fn show_qr(uri: &str) -> anyhow::Result<()> {
    if let Err(e) = AuthUri::parse(uri) {
        eprintln!("\x1b[1;33m!\x1b[0m {}; the other device will refuse it", e);
    }
    println!();
    print_qr_code(uri)?;
    println!("\n\x1b[2m{}\x1b[0m\n", uri);
    Ok(())
}
