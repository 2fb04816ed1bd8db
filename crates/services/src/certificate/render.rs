use lesson_core::model::{BackgroundStyle, Rgb};

use crate::error::CertificateError;

use super::layout::{CertificateLayout, FontFamily, TextBlock};

/// Bands used when a gradient has to be rasterised.
pub const GRADIENT_BANDS: usize = 64;

/// How the page background is actually painted.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundPaint {
    Flat(Rgb),
    NativeGradient { top: Rgb, bottom: Rgb },
    /// Horizontal bands approximating a gradient, top to bottom.
    Bands(Vec<Rgb>),
}

impl BackgroundPaint {
    /// Picks the native gradient when the renderer supports it and falls
    /// back to [`GRADIENT_BANDS`] flat bands otherwise.
    #[must_use]
    pub fn choose(style: BackgroundStyle, native_gradients: bool) -> Self {
        match style {
            BackgroundStyle::Flat(color) => BackgroundPaint::Flat(color),
            BackgroundStyle::VerticalGradient { top, bottom } if native_gradients => {
                BackgroundPaint::NativeGradient { top, bottom }
            }
            BackgroundStyle::VerticalGradient { top, bottom } => {
                let last = (GRADIENT_BANDS - 1) as f32;
                BackgroundPaint::Bands(
                    (0..GRADIENT_BANDS)
                        .map(|i| top.lerp(bottom, i as f32 / last))
                        .collect(),
                )
            }
        }
    }
}

/// Turns a [`CertificateLayout`] into a document.
pub trait DocumentRenderer: Send + Sync {
    /// File extension of the produced document, without the dot.
    fn extension(&self) -> &'static str;

    fn supports_native_gradients(&self) -> bool;

    /// # Errors
    ///
    /// Returns `CertificateError` if the document cannot be produced.
    fn render(&self, layout: &CertificateLayout) -> Result<Vec<u8>, CertificateError>;
}

/// Renders certificates as standalone SVG documents sized in millimetres.
#[derive(Debug, Clone, Copy)]
pub struct SvgRenderer {
    native_gradients: bool,
}

impl SvgRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            native_gradients: true,
        }
    }

    /// Renderer for viewers without gradient support; backgrounds are banded.
    #[must_use]
    pub fn without_gradients() -> Self {
        Self {
            native_gradients: false,
        }
    }
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentRenderer for SvgRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn supports_native_gradients(&self) -> bool {
        self.native_gradients
    }

    fn render(&self, layout: &CertificateLayout) -> Result<Vec<u8>, CertificateError> {
        let (w, h) = (layout.width, layout.height);
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}mm\" height=\"{h}mm\" \
             viewBox=\"0 0 {w} {h}\">\n"
        );

        match BackgroundPaint::choose(layout.background, self.native_gradients) {
            BackgroundPaint::Flat(color) => {
                svg.push_str(&rect(0.0, 0.0, w, h, color));
            }
            BackgroundPaint::NativeGradient { top, bottom } => {
                svg.push_str(&format!(
                    "<defs><linearGradient id=\"bg\" x1=\"0\" y1=\"0\" x2=\"0\" y2=\"1\">\
                     <stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/>\
                     </linearGradient></defs>\n",
                    top.to_hex(),
                    bottom.to_hex()
                ));
                svg.push_str(&format!(
                    "<rect x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" fill=\"url(#bg)\"/>\n"
                ));
            }
            BackgroundPaint::Bands(colors) => {
                let band = h / colors.len() as f32;
                for (i, color) in colors.iter().enumerate() {
                    // Overlap by a hair so no seams show between bands.
                    svg.push_str(&rect(0.0, band * i as f32, w, band + 0.05, *color));
                }
            }
        }

        for frame in &layout.frames {
            svg.push_str(&format!(
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"none\" \
                 stroke=\"{}\" stroke-width=\"{}\"/>\n",
                frame.x,
                frame.y,
                frame.width,
                frame.height,
                frame.color.to_hex(),
                frame.line_width
            ));
        }

        if let Some(logo) = &layout.logo {
            svg.push_str(&format!(
                "<image href=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\"/>\n",
                escape(&logo.href),
                logo.x,
                logo.y,
                logo.width,
                logo.height
            ));
        }

        for block in &layout.texts {
            svg.push_str(&text(block, layout.center_x()));
        }

        svg.push_str("</svg>\n");
        Ok(svg.into_bytes())
    }
}

fn rect(x: f32, y: f32, width: f32, height: f32, color: Rgb) -> String {
    format!(
        "<rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"{}\"/>\n",
        color.to_hex()
    )
}

/// Point size to user units (millimetres).
fn pt_to_mm(size: f32) -> f32 {
    size * 25.4 / 72.0
}

fn text(block: &TextBlock, x: f32) -> String {
    let family = match block.family {
        FontFamily::Sans => "Helvetica, Arial, sans-serif",
        FontFamily::Serif => "Times, 'Times New Roman', serif",
    };
    let weight = if block.style.is_bold() { "bold" } else { "normal" };
    let style = if block.style.is_italic() {
        "italic"
    } else {
        "normal"
    };
    format!(
        "<text x=\"{x}\" y=\"{}\" text-anchor=\"middle\" font-family=\"{family}\" \
         font-size=\"{:.2}\" font-weight=\"{weight}\" font-style=\"{style}\" fill=\"{}\">{}</text>\n",
        block.y,
        pt_to_mm(block.size),
        block.color.to_hex(),
        escape(&block.text)
    )
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP: Rgb = Rgb::new(0xFF, 0xF8, 0xE1);
    const BOTTOM: Rgb = Rgb::new(0xFF, 0xE0, 0x82);

    #[test]
    fn gradient_falls_back_to_bands() {
        let style = BackgroundStyle::VerticalGradient {
            top: TOP,
            bottom: BOTTOM,
        };
        assert_eq!(
            BackgroundPaint::choose(style, true),
            BackgroundPaint::NativeGradient {
                top: TOP,
                bottom: BOTTOM
            }
        );
        let BackgroundPaint::Bands(bands) = BackgroundPaint::choose(style, false) else {
            panic!("expected banded fallback");
        };
        assert_eq!(bands.len(), GRADIENT_BANDS);
        assert_eq!(bands.first(), Some(&TOP));
        assert_eq!(bands.last(), Some(&BOTTOM));
    }

    #[test]
    fn flat_background_ignores_capability() {
        let color = Rgb::new(0xF0, 0xF8, 0xFF);
        assert_eq!(
            BackgroundPaint::choose(BackgroundStyle::Flat(color), false),
            BackgroundPaint::Flat(color)
        );
    }

    #[test]
    fn text_is_escaped() {
        assert_eq!(escape("Tom & \"Jerry\" <3"), "Tom &amp; &quot;Jerry&quot; &lt;3");
    }
}
