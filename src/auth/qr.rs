use qrcode::render::unicode::Dense1x2;
use qrcode::{EcLevel, QrCode};

use crate::error::{Error, Result};

/// Shows a login URL to the user as a scannable code.
pub trait QrRenderer {
    fn render(&self, url: &str) -> Result<()>;
}

/// Half-block unicode rendering on stdout.
pub struct TerminalQr;

impl QrRenderer for TerminalQr {
    fn render(&self, url: &str) -> Result<()> {
        let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::L)
            .map_err(|err| Error::InvalidRequest(format!("QR code: {}", err)))?;

        let image = code
            .render::<Dense1x2>()
            .dark_color(Dense1x2::Light)
            .light_color(Dense1x2::Dark)
            .quiet_zone(true)
            .build();

        println!("{}", image);
        Ok(())
    }
}
