//! Verification links and their scannable rendering.

use std::fmt;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};

use certledger_core::ContentId;

use crate::error::RenderError;

/// `<base-url>/verify?fileH=<cid>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationLink(String);

impl VerificationLink {
    pub fn new(base_url: &str, cid: &ContentId) -> Self {
        Self(format!("{}/verify?fileH={cid}", base_url.trim_end_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for VerificationLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Turns a verification link into something a phone can scan.
pub trait PayloadRenderer: Send + Sync {
    fn render(&self, link: &VerificationLink) -> Result<String, RenderError>;
}

/// Renders the link as a QR code inside a `data:image/png;base64,` URI.
#[derive(Debug, Clone)]
pub struct QrPngRenderer {
    /// Longest link accepted.
    pub max_len: usize,
    /// Smallest edge of the rendered image, in pixels.
    pub min_edge: u32,
}

impl Default for QrPngRenderer {
    fn default() -> Self {
        // Byte capacity of a version 40 symbol at level M.
        Self {
            max_len: 2331,
            min_edge: 200,
        }
    }
}

impl QrPngRenderer {
    /// Raw PNG bytes of the symbol.
    pub fn png(&self, link: &VerificationLink) -> Result<Vec<u8>, RenderError> {
        let len = link.as_str().len();
        if len > self.max_len {
            return Err(RenderError::TooLarge {
                len,
                limit: self.max_len,
            });
        }

        let code = QrCode::with_error_correction_level(link.as_str(), EcLevel::M)
            .map_err(|e| RenderError::Failed(e.to_string()))?;
        let symbol = code
            .render::<Luma<u8>>()
            .min_dimensions(self.min_edge, self.min_edge)
            .build();

        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        DynamicImage::ImageLuma8(symbol)
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| RenderError::Failed(format!("png encoding failed: {e}")))?;
        Ok(buffer)
    }
}

impl PayloadRenderer for QrPngRenderer {
    fn render(&self, link: &VerificationLink) -> Result<String, RenderError> {
        let png = self.png(link)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}
