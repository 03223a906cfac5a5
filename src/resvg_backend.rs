//! ResvgBackend: pure-Rust rendering surface.
//!
//! The wrapped page is parsed with `scraper` on a loader thread; the first
//! `<svg>` element is serialized back out as a standalone SVG document and
//! measured with `usvg`. Layout follows the browser rules the pipeline relies
//! on: a root with fixed `width`/`height` keeps its size unless a
//! `max-width:100%;max-height:100%` style shrinks it into the surface, while
//! a root sized only by its view box fills the surface with its aspect ratio
//! intact. Painting is done by `resvg` into a `tiny-skia` pixmap.

use crate::backend::{Completion, RenderBackend, SvgRoot};
use crate::{Color, Error, RasterImage, Rect, RendererConfig, Result, Size};
use image::{Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};
use scraper::{Html, Selector};
use std::sync::{Arc, Mutex, MutexGuard};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Surface size before the host sets one
const INITIAL_SURFACE: Size = Size { width: 300, height: 150 };

/// The root `<svg>` of the loaded page
#[derive(Debug, Clone)]
struct LoadedSvg {
    /// Standalone SVG document
    markup: String,
    view_box: Option<String>,
    /// Size usvg resolves from width/height/viewBox
    natural: (f32, f32),
    /// Root has absolute `width` and `height` attributes
    explicit_size: bool,
    background: Color,
    style: Option<String>,
}

impl LoadedSvg {
    fn stretched(&self) -> bool {
        let Some(style) = &self.style else {
            return false;
        };
        let decls = parse_declarations(style);
        let is_full = |name: &str| decls.iter().any(|(n, v)| n == name && v == "100%");
        is_full("max-width") && is_full("max-height")
    }

    /// Bounding box of the root element on a surface of `surface` size.
    fn layout(&self, surface: Size) -> Rect {
        let (w, h) = self.natural;
        let (w, h) = if self.stretched() {
            let fit = f32::min(surface.width as f32 / w, surface.height as f32 / h);
            let scale = if self.explicit_size { fit.min(1.0) } else { fit };
            (w * scale, h * scale)
        } else {
            (w, h)
        };
        Rect {
            x: 0,
            y: 0,
            width: w.round() as u32,
            height: h.round() as u32,
        }
    }
}

struct Surface {
    size: Size,
    generation: u64,
    loaded: bool,
    document: Option<LoadedSvg>,
}

/// Rendering surface backed by `resvg`
pub struct ResvgBackend {
    surface: Arc<Mutex<Surface>>,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl ResvgBackend {
    pub fn new(config: &RendererConfig) -> Self {
        let mut db = usvg::fontdb::Database::new();
        if config.load_system_fonts {
            db.load_system_fonts();
            log::debug!("resvg backend loaded {} font faces", db.len());
        }
        Self {
            surface: Arc::new(Mutex::new(Surface {
                size: INITIAL_SURFACE,
                generation: 0,
                loaded: false,
                document: None,
            })),
            fontdb: Arc::new(db),
        }
    }

    /// Current surface size
    pub fn surface_size(&self) -> Result<Size> {
        Ok(self.lock()?.size)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Surface>> {
        self.surface
            .lock()
            .map_err(|_| Error::RenderError("rendering surface lock poisoned".into()))
    }
}

impl RenderBackend for ResvgBackend {
    fn name(&self) -> &'static str {
        "resvg"
    }

    fn resize_surface(&mut self, size: Size) -> Result<Completion> {
        self.lock()?.size = size;
        Ok(Completion::ready())
    }

    fn load_document(&mut self, html: &str) -> Result<Completion> {
        let generation = {
            let mut s = self.lock()?;
            s.generation += 1;
            s.loaded = false;
            s.document = None;
            s.generation
        };

        let html = html.to_string();
        let surface = Arc::clone(&self.surface);
        let (done, completion) = Completion::channel();

        std::thread::Builder::new()
            .name("svgthumb-loader".into())
            .spawn(move || {
                let outcome = parse_document(&html).and_then(|doc| {
                    let mut s = surface
                        .lock()
                        .map_err(|_| Error::RenderError("rendering surface lock poisoned".into()))?;
                    if s.generation != generation {
                        return Err(Error::LoadError("superseded by a newer document".into()));
                    }
                    s.document = doc;
                    s.loaded = true;
                    Ok(())
                });
                done.complete(outcome);
            })?;

        Ok(completion)
    }

    fn root_svg(&self) -> Result<Option<SvgRoot>> {
        let s = self.lock()?;
        if !s.loaded {
            return Err(Error::RenderError("no document has finished loading".into()));
        }
        Ok(s.document.as_ref().map(|doc| SvgRoot {
            bounds: doc.layout(s.size),
            view_box: doc.view_box.clone(),
        }))
    }

    fn set_root_style(&mut self, style: &str) -> Result<Completion> {
        let mut s = self.lock()?;
        let doc = s
            .document
            .as_mut()
            .ok_or_else(|| Error::RenderError("no <svg> element to style".into()))?;
        doc.style = Some(style.to_string());
        Ok(Completion::ready())
    }

    fn capture(&self, rect: Rect) -> Result<RasterImage> {
        let s = self.lock()?;
        let doc = s
            .document
            .as_ref()
            .ok_or_else(|| Error::RenderError("nothing to capture".into()))?;

        let mut pixmap = tiny_skia::Pixmap::new(rect.width, rect.height)
            .ok_or_else(|| Error::RenderError(format!("cannot allocate {}x{} pixmap", rect.width, rect.height)))?;
        let bg = doc.background;
        pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));

        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        let tree = usvg::Tree::from_str(&doc.markup, &options).map_err(|e| Error::RenderError(e.to_string()))?;

        let bounds = doc.layout(s.size);
        let tree_size = tree.size();
        let transform = tiny_skia::Transform::from_row(
            bounds.width as f32 / tree_size.width(),
            0.0,
            0.0,
            bounds.height as f32 / tree_size.height(),
            (bounds.x - rect.x) as f32,
            (bounds.y - rect.y) as f32,
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let mut out = RgbaImage::new(rect.width, rect.height);
        for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(RasterImage::new(out))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Other(format!("bad selector '{}': {:?}", css, e)))
}

/// Parse the wrapped page; `Ok(None)` when it has no `<svg>` element.
fn parse_document(html: &str) -> Result<Option<LoadedSvg>> {
    let doc = Html::parse_document(html);

    let background = doc
        .select(&selector("body")?)
        .next()
        .and_then(|body| body.value().attr("style"))
        .and_then(|style| {
            parse_declarations(style)
                .into_iter()
                .find(|(name, _)| name == "background-color")
        })
        .map(|(_, value)| {
            value.parse::<Color>().unwrap_or_else(|_| {
                log::warn!("unsupported background '{}'; using white", value);
                Color::WHITE
            })
        })
        .unwrap_or(Color::WHITE);

    let Some(svg) = doc.select(&selector("svg")?).next() else {
        log::debug!("document has no <svg> element");
        return Ok(None);
    };
    let el = svg.value();

    let view_box = el.attr("viewBox").or_else(|| el.attr("viewbox")).map(str::to_string);
    let explicit_size = [el.attr("width"), el.attr("height")]
        .iter()
        .all(|v| v.map_or(false, is_absolute_length));

    let markup = standalone_svg(&svg.html());
    let tree = usvg::Tree::from_str(&markup, &usvg::Options::default())
        .map_err(|e| Error::LoadError(format!("unusable <svg> element: {}", e)))?;
    let natural = (tree.size().width(), tree.size().height());

    Ok(Some(LoadedSvg {
        markup,
        view_box,
        natural,
        explicit_size,
        background,
        style: el.attr("style").map(str::to_string),
    }))
}

fn is_absolute_length(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && !v.ends_with('%') && v != "auto"
}

/// `name: value; ...` pairs, names lowercased.
fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect()
}

/// Turn an `<svg>` serialized out of an HTML tree into a document an XML
/// parser accepts: declare the SVG (and, if used, XLink) namespace on the
/// root and replace the HTML-only `&nbsp;` entity.
fn standalone_svg(outer: &str) -> String {
    let end = start_tag_end(outer).unwrap_or(outer.len());
    let (head, rest) = outer.split_at(end);
    let (head, slash) = match head.strip_suffix('/') {
        Some(h) => (h, "/"),
        None => (head, ""),
    };

    let mut head = head.to_string();
    if !head.contains("xmlns=") {
        head.push_str(&format!(" xmlns=\"{}\"", SVG_NS));
    }
    if outer.contains("xlink:") && !head.contains("xmlns:xlink") {
        head.push_str(&format!(" xmlns:xlink=\"{}\"", XLINK_NS));
    }

    format!("{}{}{}", head, slash, rest).replace("&nbsp;", "&#160;")
}

/// Byte offset of the `>` closing the first start tag, skipping quoted values.
fn start_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}
