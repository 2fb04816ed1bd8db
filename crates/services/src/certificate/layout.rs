//! Page geometry of the certificate, independent of the output format.

use lesson_core::model::{BackgroundStyle, CertificateRequest, Rgb};

use super::CertificateConfig;

/// A4 landscape, in millimetres.
pub const PAGE_WIDTH: f32 = 297.0;
pub const PAGE_HEIGHT: f32 = 210.0;
const CENTER_X: f32 = PAGE_WIDTH / 2.0;

const LOGO_SIZE: f32 = 40.0;
const LOGO_TOP: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFamily {
    Sans,
    Serif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    #[must_use]
    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    #[must_use]
    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

/// One line of text, horizontally centred on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    /// Baseline, from the top edge.
    pub y: f32,
    /// Point size.
    pub size: f32,
    pub color: Rgb,
    pub family: FontFamily,
    pub style: FontStyle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Rgb,
    pub line_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub href: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CertificateLayout {
    pub width: f32,
    pub height: f32,
    pub background: BackgroundStyle,
    pub frames: Vec<Frame>,
    pub logo: Option<ImageBlock>,
    pub texts: Vec<TextBlock>,
}

impl CertificateLayout {
    /// Lays out the certificate for `request`.
    #[must_use]
    pub fn for_request(request: &CertificateRequest, config: &CertificateConfig) -> Self {
        let tier = request.tier();
        let palette = tier.palette();
        let text = |text: String, y: f32, size: f32, color: Rgb, family, style| TextBlock {
            text,
            y,
            size,
            color,
            family,
            style,
        };

        let frames = vec![
            Frame {
                x: 10.0,
                y: 10.0,
                width: 277.0,
                height: 190.0,
                color: palette.primary,
                line_width: 1.5,
            },
            Frame {
                x: 12.0,
                y: 12.0,
                width: 273.0,
                height: 186.0,
                color: palette.secondary,
                line_width: 0.5,
            },
        ];

        let logo = config.logo.as_ref().map(|href| ImageBlock {
            href: href.clone(),
            x: (PAGE_WIDTH - LOGO_SIZE) / 2.0,
            y: LOGO_TOP,
            width: LOGO_SIZE,
            height: LOGO_SIZE,
        });

        let issued = request.issued_at.format("%d/%m/%Y");
        let texts = vec![
            text(
                tier.title().to_owned(),
                85.0,
                36.0,
                palette.primary,
                FontFamily::Sans,
                FontStyle::Bold,
            ),
            text(
                "This certificate is awarded to".to_owned(),
                100.0,
                18.0,
                palette.dark_text,
                FontFamily::Sans,
                FontStyle::Normal,
            ),
            text(
                request.profile.name().to_owned(),
                115.0,
                32.0,
                palette.primary,
                FontFamily::Serif,
                FontStyle::BoldItalic,
            ),
            text(
                "For successfully completing the interactive lesson".to_owned(),
                135.0,
                16.0,
                palette.dark_text,
                FontFamily::Sans,
                FontStyle::Normal,
            ),
            text(
                format!("\"{}\"", config.course_title),
                145.0,
                16.0,
                palette.dark_text,
                FontFamily::Sans,
                FontStyle::Bold,
            ),
            text(
                format!("Issued on: {issued}"),
                175.0,
                10.0,
                palette.light_text,
                FontFamily::Sans,
                FontStyle::Normal,
            ),
            text(
                "This certificate is generated for educational and demonstration purposes. \
                 It is not valid as a formal document."
                    .to_owned(),
                180.0,
                10.0,
                palette.light_text,
                FontFamily::Sans,
                FontStyle::Italic,
            ),
        ];

        Self {
            width: PAGE_WIDTH,
            height: PAGE_HEIGHT,
            background: palette.background,
            frames,
            logo,
            texts,
        }
    }

    #[must_use]
    pub fn center_x(&self) -> f32 {
        CENTER_X
    }
}

/// `Certificate-Python-<name>.<extension>`. Anything in the name other than
/// letters, digits, `-` and `_` becomes `_`, so the result is a single path
/// component.
#[must_use]
pub fn file_name(student_name: &str, extension: &str) -> String {
    let name: String = student_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("Certificate-Python-{name}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lesson_core::model::StudentProfile;
    use lesson_core::time::fixed_now;

    fn request(score: u32) -> CertificateRequest {
        CertificateRequest {
            profile: StudentProfile::new("Ada Lovelace", 36, "🐍", "advanced", "data").unwrap(),
            score,
            max_possible_score: 160,
            issued_at: fixed_now(),
        }
    }

    #[test]
    fn golden_layout_uses_gradient() {
        let layout = CertificateLayout::for_request(&request(160), &CertificateConfig::default());
        assert!(matches!(
            layout.background,
            BackgroundStyle::VerticalGradient { .. }
        ));
        assert_eq!(layout.texts[0].text, "Certificate of Excellence (Gold)");
        assert_eq!(layout.frames[0].color, Rgb::new(0xD4, 0xAF, 0x37));
    }

    #[test]
    fn standard_layout_is_flat() {
        let layout = CertificateLayout::for_request(&request(150), &CertificateConfig::default());
        assert!(matches!(layout.background, BackgroundStyle::Flat(_)));
        assert_eq!(layout.texts[0].text, "Certificate of Completion");
        assert_eq!(layout.texts[2].text, "Ada Lovelace");
        // 2023-11-14 in UTC.
        assert_eq!(layout.texts[5].text, "Issued on: 14/11/2023");
        assert!(layout.logo.is_none());
    }

    #[test]
    fn file_name_replaces_spaces() {
        assert_eq!(
            file_name("Ada King Lovelace", "svg"),
            "Certificate-Python-Ada_King_Lovelace.svg"
        );
    }

    #[test]
    fn file_name_never_leaves_the_directory() {
        assert_eq!(
            file_name("Ana/Maria", "svg"),
            "Certificate-Python-Ana_Maria.svg"
        );
        assert_eq!(
            file_name("../..\\etc", "svg"),
            "Certificate-Python-______etc.svg"
        );
        assert_eq!(file_name("José-Luis", "svg"), "Certificate-Python-José-Luis.svg");
    }
}
