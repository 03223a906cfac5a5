//! svgthumb
//!
//! Renders SVG documents into fixed-size bitmap thumbnails. The SVG is
//! wrapped in a small HTML page and handed to a rendering backend; the crate
//! drives the backend, measures the rendered `<svg>` element, captures its
//! pixels and scales them to the requested box.
//!
//! # Features
//!
//! - **resvg Backend** (default): pure-Rust surface built on `resvg` and `scraper`
//! - **Modular Design**: any type implementing [`RenderBackend`] can host the pipeline
//! - **Bounded Waits**: every backend operation completes, times out or is cancelled
//!
//! # Example
//!
//! ```no_run
//! use svgthumb::{RendererConfig, Size};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! svgthumb::feature_gate::disable_all_on_process(&mut *svgthumb::feature_gate::platform_features())?;
//!
//! let mut host = svgthumb::new_host(RendererConfig::default())?;
//! let file = std::fs::File::open("drawing.svg")?;
//! let image = host.render(file, Size { width: 256, height: 256 }, None)?;
//! image.save_bmp("result.bmp")?;
//! # Ok(())
//! # }
//! ```

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub mod error;
pub use error::{Error, Result};

pub mod backend;
pub use backend::{CancelToken, Completer, Completion, RenderBackend, SvgRoot};

pub mod document;
pub mod feature_gate;
pub mod host;
pub use host::RenderHost;

pub mod locale;
pub mod resize;

// Pure-Rust backend: scraper for the document tree, resvg for paint
#[cfg(feature = "resvg")]
pub mod resvg_backend;

// Async-friendly renderer (worker-thread backed)
pub mod async_api;
pub use async_api::Renderer;

/// Largest width or height the renderer will produce by default
pub const DEFAULT_MAX_OUTPUT_SIZE: u32 = 10_000;

/// Configuration for a render host
///
/// The defaults match the command line tool: white background, output
/// bounded at 10000 px per side, a 30 second budget for each backend wait,
/// and the UI language taken from the environment.
///
/// # Examples
///
/// ```
/// let cfg = svgthumb::RendererConfig::default();
/// assert_eq!(cfg.max_output_size, 10_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Upper bound (inclusive) for requested and measured box sides
    pub max_output_size: u32,
    /// Page background behind the SVG
    pub background: Color,
    /// Language tag for the wrapped document; `None` uses the process UI language
    pub language: Option<String>,
    /// Budget for each wait on the backend, in milliseconds
    pub ready_timeout_ms: u64,
    /// When the captured image gets scaled to the requested box
    pub resize_trigger: ResizeTrigger,
    /// Whether the resvg backend loads system fonts for `<text>`
    pub load_system_fonts: bool,
    /// Worker threads for the async [`Renderer`]
    pub workers: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_output_size: DEFAULT_MAX_OUTPUT_SIZE,
            background: Color::WHITE,
            language: None,
            ready_timeout_ms: 30000,
            resize_trigger: ResizeTrigger::default(),
            load_system_fonts: true,
            workers: num_cpus::get().max(1),
        }
    }
}

impl RendererConfig {
    /// Load a configuration from a JSON file; missing fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: RendererConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_output_size == 0 {
            return Err(Error::ConfigError("max_output_size must be positive".into()));
        }
        if self.ready_timeout_ms == 0 {
            return Err(Error::ConfigError("ready_timeout_ms must be positive".into()));
        }
        if self.workers == 0 {
            return Err(Error::ConfigError("workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Width and height in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangle on the rendering surface, in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }

    /// `#RRGGBB`, the form the engine's CSS parser accepts. Alpha is dropped.
    pub fn to_html(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Accepts `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `white`, `black`, `transparent`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "white" => return Ok(Color::WHITE),
            "black" => return Ok(Color::BLACK),
            "transparent" => return Ok(Color::TRANSPARENT),
            _ => {}
        }
        let invalid = || Error::ConfigError(format!("invalid color '{}'", s));
        let hex = s.strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17).map_err(|_| invalid());
                Ok(Color::rgb(nib(0)?, nib(1)?, nib(2)?))
            }
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color { r: byte(0)?, g: byte(2)?, b: byte(4)?, a: byte(6)? }),
            _ => Err(invalid()),
        }
    }
}

/// Policy for scaling the captured image to the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeTrigger {
    /// Scale when width or height differs from the box
    #[default]
    AnyDimensionDiffers,
    /// Scale only when both width and height differ from the box
    BothDimensionsDiffer,
}

impl ResizeTrigger {
    pub fn should_resize(self, captured: Size, target: Size) -> bool {
        let w = captured.width != target.width;
        let h = captured.height != target.height;
        match self {
            ResizeTrigger::AnyDimensionDiffers => w || h,
            ResizeTrigger::BothDimensionsDiffer => w && h,
        }
    }
}

impl FromStr for ResizeTrigger {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any_dimension_differs" => Ok(ResizeTrigger::AnyDimensionDiffers),
            "both" | "both_dimensions_differ" => Ok(ResizeTrigger::BothDimensionsDiffer),
            other => Err(Error::ConfigError(format!("unknown resize trigger '{}'", other))),
        }
    }
}

/// Image resolution in dots per inch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub x_dpi: f32,
    pub y_dpi: f32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self { x_dpi: 96.0, y_dpi: 96.0 }
    }
}

/// A captured or resized bitmap, owned by whoever received it last
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: RgbaImage,
    resolution: Resolution,
}

impl RasterImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self::with_resolution(pixels, Resolution::default())
    }

    pub fn with_resolution(pixels: RgbaImage, resolution: Resolution) -> Self {
        Self { pixels, resolution }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// True when there are no pixels at all
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Encode as a 32-bit BMP
    pub fn to_bmp(&self) -> Result<Vec<u8>> {
        let mut buf = std::io::Cursor::new(Vec::new());
        self.pixels.write_to(&mut buf, image::ImageFormat::Bmp)?;
        Ok(buf.into_inner())
    }

    pub fn save_bmp<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.pixels.save_with_format(path, image::ImageFormat::Bmp)?;
        Ok(())
    }
}

/// Create a render host with the default backend
#[cfg(feature = "resvg")]
pub fn new_host(config: RendererConfig) -> Result<RenderHost<resvg_backend::ResvgBackend>> {
    let backend = resvg_backend::ResvgBackend::new(&config);
    RenderHost::new(backend, config)
}
