//! Terminal QR codes for authentication tokens.

use qrcode::{Color, QrCode};

/// Blank columns either side of the code
const QUIET_ZONE: usize = 2;

/// Render `data` as a QR code made of half-block characters.
///
/// Each character covers two vertical modules: `▀` top only, `▄` bottom
/// only, `█` both.
pub fn render_qr(data: &str) -> Result<String, qrcode::types::QrError> {
    let code = QrCode::new(data.as_bytes())?;
    let colors = code.to_colors();
    let width = code.width();
    let dark = |index: usize| colors.get(index).is_some_and(|c| *c == Color::Dark);

    let margin = " ".repeat(QUIET_ZONE);
    let blank_row = " ".repeat(width + QUIET_ZONE * 2);
    let mut out = String::new();

    out.push_str(&blank_row);
    out.push('\n');
    for row in (0..width).step_by(2) {
        out.push_str(&margin);
        for col in 0..width {
            let top = dark(row * width + col);
            let bottom = row + 1 < width && dark((row + 1) * width + col);
            out.push(match (top, bottom) {
                (true, true) => '█',
                (true, false) => '▀',
                (false, true) => '▄',
                (false, false) => ' ',
            });
        }
        out.push_str(&margin);
        out.push('\n');
    }
    out.push_str(&blank_row);
    out.push('\n');
    Ok(out)
}

/// Print a QR code for `data`, indented to line up with the other output.
pub fn print_qr_code(data: &str) -> anyhow::Result<()> {
    let rendered = render_qr(data)?;
    for line in rendered.lines() {
        println!("  {}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_uses_half_rows() {
        let uri = "jami-auth://0123456789abcdef0123456789abcdef01234567/123456";
        let code = QrCode::new(uri.as_bytes()).unwrap();
        let rendered = render_qr(uri).unwrap();

        let expected_rows = (code.width() + 1) / 2 + 2;
        assert_eq!(rendered.lines().count(), expected_rows);
        assert!(rendered
            .lines()
            .all(|line| line.chars().count() == code.width() + QUIET_ZONE * 2));
    }
}
