//! Code 128 barcodes.
//!
//! [`encode`] turns a payload into Code 128 symbols and a module pattern.
//! [`BarcodeRenderer`] draws that pattern onto a [`BarcodeSurface`];
//! [`SvgSurface`] is the one used by the ticket view.

use std::fmt::Write as _;
use thiserror::Error;

/// Bar/space widths of symbols 0..=105 (each sums to 11 modules)
const PATTERNS: [&[u8; 6]; 106] = [
    b"212222", b"222122", b"222221", b"121223", b"121322", b"131222", b"122213", b"122312",
    b"132212", b"221213", b"221312", b"231212", b"112232", b"122132", b"122231", b"113222",
    b"123122", b"123221", b"223211", b"221132", b"221231", b"213212", b"223112", b"312131",
    b"311222", b"321122", b"321221", b"312212", b"322112", b"322211", b"212123", b"212321",
    b"232121", b"111323", b"131123", b"131321", b"112313", b"132113", b"132311", b"211313",
    b"231113", b"231311", b"112133", b"112331", b"132131", b"113123", b"113321", b"133121",
    b"313121", b"211331", b"231131", b"213113", b"213311", b"213131", b"311123", b"311321",
    b"331121", b"312113", b"312311", b"332111", b"314111", b"221411", b"431111", b"111224",
    b"111422", b"121124", b"121421", b"141122", b"141221", b"112214", b"112412", b"122114",
    b"122411", b"142112", b"142211", b"241211", b"221114", b"413111", b"241112", b"134111",
    b"111242", b"121142", b"121241", b"114212", b"124112", b"124211", b"411212", b"421112",
    b"421211", b"212141", b"214121", b"412121", b"111143", b"111341", b"131141", b"114113",
    b"114311", b"411113", b"411311", b"113141", b"114131", b"311141", b"411131", b"211412",
    b"211214", b"211232",
];

/// Stop pattern, including the trailing two-module termination bar
const STOP_PATTERN: &[u8; 7] = b"2331112";

const START_B: u8 = 104;
const START_C: u8 = 105;
const CHECKSUM_MODULUS: u32 = 103;

/// Code 128 character set used for the data symbols
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeSet {
    /// Printable ASCII, one character per symbol
    B,
    /// Digit pairs, two digits per symbol
    C,
}

/// Payloads Code 128 cannot carry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BarcodeError {
    /// Nothing to encode
    #[error("barcode payload is empty")]
    Empty,

    /// Character outside printable ASCII
    #[error("character {0:?} cannot be encoded in Code 128 set B")]
    Unencodable(char),
}

/// An encoded barcode
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Code128 {
    text: String,
    code_set: CodeSet,
    /// Start, data and checksum symbol values; the stop pattern is implicit
    symbols: Vec<u8>,
}

impl Code128 {
    /// Human-readable payload
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Character set the data was encoded in
    #[must_use]
    pub const fn code_set(&self) -> CodeSet {
        self.code_set
    }

    /// Symbol values: start code, data, checksum
    #[must_use]
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// The checksum symbol
    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.symbols.last().copied().unwrap_or_default()
    }

    /// Modules left to right, `true` for a bar
    #[must_use]
    pub fn modules(&self) -> Vec<bool> {
        let widths = self
            .symbols
            .iter()
            .flat_map(|&symbol| PATTERNS[usize::from(symbol)].iter())
            .chain(STOP_PATTERN.iter());

        let mut modules = Vec::with_capacity(self.symbols.len() * 11 + 13);
        // Every pattern starts with a bar and alternates
        for (i, width) in widths.enumerate() {
            let bar = i % 2 == 0;
            modules.extend(std::iter::repeat(bar).take(usize::from(width - b'0')));
        }
        modules
    }
}

/// Encodes `payload` as Code 128
///
/// Even-length all-digit payloads use set C, everything else set B.
///
/// # Errors
///
/// Returns [`BarcodeError`] for empty payloads or characters outside
/// printable ASCII.
pub fn encode(payload: &str) -> Result<Code128, BarcodeError> {
    if payload.is_empty() {
        return Err(BarcodeError::Empty);
    }

    let bytes = payload.as_bytes();
    let (code_set, mut symbols) =
        if bytes.len() % 2 == 0 && bytes.iter().all(u8::is_ascii_digit) {
            let mut symbols = vec![START_C];
            symbols.extend(
                bytes
                    .chunks_exact(2)
                    .map(|pair| (pair[0] - b'0') * 10 + (pair[1] - b'0')),
            );
            (CodeSet::C, symbols)
        } else {
            let mut symbols = vec![START_B];
            for c in payload.chars() {
                if !(' '..='~').contains(&c) {
                    return Err(BarcodeError::Unencodable(c));
                }
                // Printable ASCII, so the value is 0..=94
                symbols.push(c as u8 - b' ');
            }
            (CodeSet::B, symbols)
        };

    let weighted: u32 = symbols
        .iter()
        .enumerate()
        .map(|(i, &symbol)| u32::from(symbol) * u32::try_from(i.max(1)).unwrap_or(u32::MAX))
        .fold(0, |acc, v| (acc + v) % CHECKSUM_MODULUS);
    // Modulus is 103, so the remainder fits in a u8
    symbols.push(u8::try_from(weighted).unwrap_or_default());

    Ok(Code128 {
        text: payload.to_string(),
        code_set,
        symbols,
    })
}

/// Drawing options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BarcodeStyle {
    /// Width of one module
    pub module_width: u32,
    /// Bar height
    pub height: u32,
    /// Bar and text colour
    pub line_color: String,
    /// Background colour
    pub background: String,
    /// Print the payload under the bars
    pub display_value: bool,
    /// Quiet zone on every side
    pub margin: u32,
    /// Text size
    pub font_size: u32,
    /// Gap between bars and text
    pub text_margin: u32,
}

impl Default for BarcodeStyle {
    fn default() -> Self {
        Self {
            module_width: 2,
            height: 50,
            line_color: "#000".to_string(),
            background: "#ffffff".to_string(),
            display_value: true,
            margin: 10,
            font_size: 20,
            text_margin: 2,
        }
    }
}

/// Something a barcode can be drawn on
pub trait BarcodeSurface {
    /// Whether the surface is mounted and can be drawn on
    fn is_attached(&self) -> bool;

    /// Draws `code`, replacing previous content
    fn draw(&mut self, code: &Code128, style: &BarcodeStyle);
}

/// SVG drawing surface
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SvgSurface {
    attached: bool,
    markup: Option<String>,
}

impl SvgSurface {
    /// A surface not yet mounted
    #[must_use]
    pub const fn detached() -> Self {
        Self {
            attached: false,
            markup: None,
        }
    }

    /// A mounted surface
    #[must_use]
    pub const fn attached() -> Self {
        Self {
            attached: true,
            markup: None,
        }
    }

    /// Unmounts the surface and drops its content
    pub fn detach(&mut self) {
        self.attached = false;
        self.markup = None;
    }

    /// Rendered `<svg>` element, once drawn
    #[must_use]
    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }
}

impl BarcodeSurface for SvgSurface {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn draw(&mut self, code: &Code128, style: &BarcodeStyle) {
        let modules = code.modules();
        let bars_width = u32::try_from(modules.len()).unwrap_or(u32::MAX) * style.module_width;
        let width = bars_width + 2 * style.margin;
        let text_height = if style.display_value {
            style.font_size + style.text_margin
        } else {
            0
        };
        let height = style.height + text_height + 2 * style.margin;

        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}px" height="{height}px" viewBox="0 0 {width} {height}" data-format="CODE128">"#
        );
        let _ = write!(
            svg,
            r#"<rect x="0" y="0" width="{width}" height="{height}" style="fill:{};"/>"#,
            style.background
        );
        let _ = write!(
            svg,
            r#"<g transform="translate({m}, {m})" style="fill:{};">"#,
            style.line_color,
            m = style.margin
        );

        let mut x = 0u32;
        for run in runs(&modules) {
            let run_width = run.len * style.module_width;
            if run.bar {
                let _ = write!(
                    svg,
                    r#"<rect x="{x}" y="0" width="{run_width}" height="{}"/>"#,
                    style.height
                );
            }
            x += run_width;
        }

        if style.display_value {
            let _ = write!(
                svg,
                r#"<text style="font: {}px monospace" text-anchor="middle" x="{}" y="{}">{}</text>"#,
                style.font_size,
                bars_width / 2,
                style.height + style.text_margin + style.font_size,
                crate::view::escape_html(code.text())
            );
        }

        svg.push_str("</g></svg>");
        self.markup = Some(svg);
    }
}

struct Run {
    bar: bool,
    len: u32,
}

fn runs(modules: &[bool]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &bar in modules {
        match runs.last_mut() {
            Some(run) if run.bar == bar => run.len += 1,
            _ => runs.push(Run { bar, len: 1 }),
        }
    }
    runs
}

/// Encodes payloads and draws them with a fixed style
#[derive(Clone, Debug, Default)]
pub struct BarcodeRenderer {
    style: BarcodeStyle,
}

impl BarcodeRenderer {
    /// Renderer with a custom style
    #[must_use]
    pub const fn new(style: BarcodeStyle) -> Self {
        Self { style }
    }

    /// Style in use
    #[must_use]
    pub const fn style(&self) -> &BarcodeStyle {
        &self.style
    }

    /// Draws `payload` onto `target`
    ///
    /// Returns `Ok(false)` without drawing when there is no target or it is
    /// not attached; the render is not retried.
    ///
    /// # Errors
    ///
    /// Returns [`BarcodeError`] if the payload cannot be encoded.
    pub fn render(
        &self,
        payload: &str,
        target: Option<&mut dyn BarcodeSurface>,
    ) -> Result<bool, BarcodeError> {
        let Some(surface) = target.filter(|s| s.is_attached()) else {
            tracing::debug!(payload, "Barcode surface not attached, skipping render");
            return Ok(false);
        };

        let code = encode(payload)?;
        surface.draw(&code, &self.style);
        tracing::debug!(payload, modules = code.modules().len(), "Barcode rendered");
        Ok(true)
    }
}
