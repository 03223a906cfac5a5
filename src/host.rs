//! The render pipeline: wrap, load, measure, capture, scale.

use crate::backend::{CancelToken, Completion, RenderBackend};
use crate::document::wrap_svg_in_html;
use crate::resize::{fit_within, resize_image};
use crate::{locale, Error, RasterImage, RendererConfig, Result, Size};
use encoding_rs::{Encoding, UTF_8};
use std::io::Read;
use std::time::Duration;

/// Style applied to a root `<svg>` with a view box so it scales with the
/// surface instead of being rasterized at its fixed size and upscaled.
pub const STRETCH_STYLE: &str = "max-width:100%;max-height:100%";

/// Drives one rendering backend through the thumbnail pipeline.
///
/// A host owns its backend's surface, so renders on one host run one at a
/// time (`&mut self`). Use one host per thread, or [`crate::Renderer`].
pub struct RenderHost<B: RenderBackend> {
    backend: B,
    config: RendererConfig,
    cancel: CancelToken,
}

impl<B: RenderBackend> RenderHost<B> {
    pub fn new(backend: B, config: RendererConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend,
            config,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Token that aborts the current and every later wait of this host
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Render an SVG stream into an image that fits `target`.
    ///
    /// The stream is decoded with `encoding` (UTF-8 when `None`); a byte
    /// order mark takes precedence over either.
    pub fn render<R: Read>(&mut self, mut reader: R, target: Size, encoding: Option<&'static Encoding>) -> Result<RasterImage> {
        check_box(target, self.config.max_output_size)?;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let svg = decode_svg(&bytes, encoding.unwrap_or(UTF_8));

        self.render_str(&svg, target)
    }

    /// Render SVG markup that is already text.
    pub fn render_str(&mut self, svg: &str, target: Size) -> Result<RasterImage> {
        check_box(target, self.config.max_output_size)?;

        let lang = match &self.config.language {
            Some(l) => Some(l.clone()),
            None => locale::ui_language(),
        };
        let html = wrap_svg_in_html(svg, self.config.background, lang.as_deref());
        self.render_content(&html, target)
    }

    fn render_content(&mut self, html: &str, target: Size) -> Result<RasterImage> {
        let backend = self.backend.name();
        log::debug!("[{}] loading {} byte document into {} surface", backend, html.len(), target);

        let resized = self.backend.resize_surface(target)?;
        let loaded = self.backend.load_document(html)?;
        self.wait(resized)?;
        self.wait(loaded)?;

        let root = self
            .backend
            .root_svg()?
            .ok_or_else(|| Error::MalformedDocumentError("no <svg> element in document".into()))?;

        let root = if let Some(view_box) = &root.view_box {
            log::debug!("[{}] root declares viewBox '{}'; stretching to surface", backend, view_box);
            let styled = self.backend.set_root_style(STRETCH_STYLE)?;
            self.wait(styled)?;
            self.backend
                .root_svg()?
                .ok_or_else(|| Error::MalformedDocumentError("<svg> element vanished after restyle".into()))?
        } else {
            root
        };

        let bounds = root.bounds;
        check_box(bounds.size(), self.config.max_output_size)?;
        let fitted = self.backend.resize_surface(bounds.size())?;
        self.wait(fitted)?;

        let bounds = self
            .backend
            .root_svg()?
            .map(|r| r.bounds)
            .ok_or_else(|| Error::MalformedDocumentError("<svg> element vanished after resize".into()))?;
        check_box(bounds.size(), self.config.max_output_size)?;
        let captured = self.backend.capture(bounds)?;
        log::debug!("[{}] captured {}", backend, captured.size());

        let image = if self.config.resize_trigger.should_resize(captured.size(), target) {
            let scaled = fit_within(captured.size(), target);
            resize_image(&captured, scaled.width, scaled.height, self.config.max_output_size)?
        } else {
            captured
        };

        log::info!("rendered {} thumbnail for {} box", image.size(), target);
        Ok(image)
    }

    fn wait(&self, completion: Completion) -> Result<()> {
        completion.wait(Duration::from_millis(self.config.ready_timeout_ms), &self.cancel)
    }
}

/// Reject boxes with a zero side or a side above `max`.
pub fn check_box(size: Size, max: u32) -> Result<()> {
    if size.width == 0 || size.width > max || size.height == 0 || size.height > max {
        return Err(Error::InvalidBoxError {
            width: size.width,
            height: size.height,
            max,
        });
    }
    Ok(())
}

/// Decode SVG bytes: a BOM wins, otherwise `encoding`. Malformed sequences
/// become U+FFFD.
pub fn decode_svg(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        log::warn!("input is not valid {}; replaced malformed sequences", used.name());
    }
    text.into_owned()
}

/// Resolve an encoding label such as `utf-16le` or `windows-1252`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| Error::DecodeError(format!("unknown encoding '{}'", label)))
}
