//! QR generation and decoding.
//!
//! Encoding goes through `qrcode`; decoding runs `rqrr` over a greyscale
//! buffer, which camera snapshots are converted into first.

pub mod payload;
pub mod scanner;

use qrcode::{render::svg, Color, EcLevel, QrCode};

use crate::error::{AppError, Result};

/// A greyscale frame, row-major, one byte per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl GrayFrame {
    pub fn new(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(AppError::Qr(format!(
                "Frame of {}x{} needs {} pixels, got {}",
                width,
                height,
                width * height,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Decodes a PNG or JPEG snapshot into a greyscale frame.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| AppError::Qr(format!("Unreadable image: {}", e)))?
            .to_luma8();
        let (width, height) = (image.width() as usize, image.height() as usize);
        Self::new(width, height, image.into_raw())
    }

    #[cfg(test)]
    fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }
}

/// Module grid of an encoded QR code.
#[derive(Debug, Clone)]
pub struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.dark[y * self.width + x]
    }

    /// Renders the grid as a greyscale frame, `scale` pixels per module and
    /// a `quiet` module border.
    pub fn to_frame(&self, scale: usize, quiet: usize) -> GrayFrame {
        let scale = scale.max(1);
        let side = (self.width + 2 * quiet) * scale;
        let mut pixels = vec![255u8; side * side];
        for y in 0..self.width {
            for x in 0..self.width {
                if !self.is_dark(x, y) {
                    continue;
                }
                let (px, py) = ((x + quiet) * scale, (y + quiet) * scale);
                for dy in 0..scale {
                    let row = (py + dy) * side;
                    pixels[row + px..row + px + scale].fill(0);
                }
            }
        }
        GrayFrame { width: side, height: side, pixels }
    }

    /// Two characters per module, for terminals.
    pub fn to_text(&self) -> String {
        let border = "  ".repeat(self.width + 2);
        let mut out = String::with_capacity((self.width + 2) * (self.width + 3) * 6);
        out.push_str(&border);
        out.push('\n');
        for y in 0..self.width {
            out.push_str("  ");
            for x in 0..self.width {
                out.push_str(if self.is_dark(x, y) { "██" } else { "  " });
            }
            out.push_str("  \n");
        }
        out.push_str(&border);
        out.push('\n');
        out
    }
}

fn build(payload: &str) -> Result<QrCode> {
    if payload.is_empty() {
        return Err(AppError::Qr("Nothing to encode".to_string()));
    }
    QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| AppError::Qr(format!("Cannot encode payload: {}", e)))
}

pub fn encode_matrix(payload: &str) -> Result<QrMatrix> {
    let code = build(payload)?;
    let dark = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
    Ok(QrMatrix { width: code.width(), dark })
}

/// SVG markup for `payload`, at least `min_px` pixels square.
pub fn encode_svg(payload: &str, min_px: u32) -> Result<String> {
    let code = build(payload)?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(min_px, min_px)
        .dark_color(svg::Color("#111827"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Decodes the first QR code found in a greyscale buffer.
pub fn decode_luma(width: usize, height: usize, pixels: &[u8]) -> Result<String> {
    if pixels.len() != width * height {
        return Err(AppError::Qr("Frame size does not match its dimensions".to_string()));
    }
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| pixels[y * width + x]);
    let grids = prepared.detect_grids();
    let mut last_error = None;
    for grid in grids {
        match grid.decode() {
            Ok((_, content)) => return Ok(content),
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(AppError::Qr(match last_error {
        Some(e) => format!("QR code found but could not be read: {}", e),
        None => "No QR code found in the image".to_string(),
    }))
}

pub fn decode_frame(frame: &GrayFrame) -> Result<String> {
    decode_luma(frame.width, frame.height, &frame.pixels)
}

/// Decodes a PNG or JPEG snapshot.
pub fn decode_image(bytes: &[u8]) -> Result<String> {
    decode_frame(&GrayFrame::from_image_bytes(bytes)?)
}
