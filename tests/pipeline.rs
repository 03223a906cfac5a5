//! Pipeline tests against a scripted backend

use image::{Rgba, RgbaImage};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use svgthumb::host::STRETCH_STYLE;
use svgthumb::{
    Completion, Error, RasterImage, Rect, RenderBackend, RenderHost, RendererConfig, ResizeTrigger, Result, Size,
    SvgRoot,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Resize(Size),
    Load,
    Root,
    Style(String),
    Capture(Rect),
}

/// Backend that lays out a root of a fixed natural size and records calls.
#[derive(Clone)]
struct Scripted {
    calls: Arc<Mutex<Vec<Call>>>,
    html: Arc<Mutex<Option<String>>>,
    root: Option<(u32, u32)>,
    view_box: Option<&'static str>,
    /// With a view box and the stretch style, the root fills the surface
    stretched: bool,
    surface: Size,
    never_loads: bool,
}

impl Scripted {
    fn new(root: Option<(u32, u32)>) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            html: Arc::new(Mutex::new(None)),
            root,
            view_box: None,
            stretched: false,
            surface: Size::new(1, 1),
            never_loads: false,
        }
    }

    fn with_view_box(mut self) -> Self {
        self.view_box = Some("0 0 10 10");
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, c: Call) {
        self.calls.lock().unwrap().push(c);
    }
}

impl RenderBackend for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn resize_surface(&mut self, size: Size) -> Result<Completion> {
        self.record(Call::Resize(size));
        self.surface = size;
        Ok(Completion::ready())
    }

    fn load_document(&mut self, html: &str) -> Result<Completion> {
        self.record(Call::Load);
        *self.html.lock().unwrap() = Some(html.to_string());
        if self.never_loads {
            let (done, pending) = Completion::channel();
            // Keep the sender alive so the wait has to time out
            std::mem::forget(done);
            return Ok(pending);
        }
        Ok(Completion::ready())
    }

    fn root_svg(&self) -> Result<Option<SvgRoot>> {
        self.record(Call::Root);
        Ok(self.root.map(|(w, h)| {
            let (w, h) = if self.stretched {
                let fit = f32::min(self.surface.width as f32 / w as f32, self.surface.height as f32 / h as f32);
                ((w as f32 * fit) as u32, (h as f32 * fit) as u32)
            } else {
                (w, h)
            };
            SvgRoot {
                bounds: Rect { x: 0, y: 0, width: w, height: h },
                view_box: self.view_box.map(str::to_string),
            }
        }))
    }

    fn set_root_style(&mut self, style: &str) -> Result<Completion> {
        self.record(Call::Style(style.to_string()));
        self.stretched = true;
        Ok(Completion::ready())
    }

    fn capture(&self, rect: Rect) -> Result<RasterImage> {
        self.record(Call::Capture(rect));
        Ok(RasterImage::new(RgbaImage::from_pixel(rect.width, rect.height, Rgba([0, 128, 0, 255]))))
    }
}

fn config() -> RendererConfig {
    RendererConfig {
        language: Some("eng".into()),
        ready_timeout_ms: 2000,
        ..Default::default()
    }
}

#[test]
fn invalid_boxes_fail_before_backend_work() {
    for target in [Size::new(0, 10), Size::new(10, 0), Size::new(10_001, 10), Size::new(10, 10_001)] {
        let backend = Scripted::new(Some((10, 10)));
        let mut host = RenderHost::new(backend.clone(), config()).unwrap();
        let res = host.render_str("<svg/>", target);
        assert!(matches!(res, Err(Error::InvalidBoxError { .. })), "{:?}", target);
        assert!(backend.calls().is_empty());
    }
}

#[test]
fn missing_root_is_malformed() {
    let backend = Scripted::new(None);
    let mut host = RenderHost::new(backend.clone(), config()).unwrap();
    let res = host.render_str("<p>hello</p>", Size::new(50, 50));
    assert!(matches!(res, Err(Error::MalformedDocumentError(_))));
    assert!(!backend.calls().iter().any(|c| matches!(c, Call::Capture(_))));
}

#[test]
fn steps_run_in_order_without_view_box() {
    let backend = Scripted::new(Some((100, 100)));
    let mut host = RenderHost::new(backend.clone(), config()).unwrap();
    let img = host.render_str("<svg/>", Size::new(50, 50)).unwrap();
    assert_eq!(img.size(), Size::new(50, 50));

    let r = Rect { x: 0, y: 0, width: 100, height: 100 };
    assert_eq!(
        backend.calls(),
        vec![
            Call::Resize(Size::new(50, 50)),
            Call::Load,
            Call::Root,
            Call::Resize(Size::new(100, 100)),
            Call::Root,
            Call::Capture(r),
        ]
    );
}

#[test]
fn view_box_root_is_stretched_before_measuring() {
    let backend = Scripted::new(Some((10, 10))).with_view_box();
    let mut host = RenderHost::new(backend.clone(), config()).unwrap();
    let img = host.render_str("<svg viewBox='0 0 10 10'/>", Size::new(64, 64)).unwrap();
    assert_eq!(img.size(), Size::new(64, 64));

    let calls = backend.calls();
    assert_eq!(calls[3], Call::Style(STRETCH_STYLE.to_string()));
    assert_eq!(calls.last(), Some(&Call::Capture(Rect { x: 0, y: 0, width: 64, height: 64 })));
}

#[test]
fn matching_capture_is_returned_unscaled() {
    let backend = Scripted::new(Some((80, 40)));
    let mut host = RenderHost::new(backend, config()).unwrap();
    let img = host.render_str("<svg/>", Size::new(80, 40)).unwrap();
    assert_eq!(img.size(), Size::new(80, 40));
}

#[test]
fn aspect_ratio_is_kept_when_scaling() {
    let backend = Scripted::new(Some((200, 100)));
    let mut host = RenderHost::new(backend, config()).unwrap();
    let img = host.render_str("<svg/>", Size::new(100, 100)).unwrap();
    assert_eq!(img.size(), Size::new(100, 50));
}

#[test]
fn both_dimensions_trigger_skips_single_mismatch() {
    let cfg = RendererConfig {
        resize_trigger: ResizeTrigger::BothDimensionsDiffer,
        ..config()
    };
    let mut host = RenderHost::new(Scripted::new(Some((200, 100))), cfg.clone()).unwrap();
    assert_eq!(host.render_str("<svg/>", Size::new(100, 100)).unwrap().size(), Size::new(200, 100));

    let mut host = RenderHost::new(Scripted::new(Some((400, 50))), cfg).unwrap();
    assert_eq!(host.render_str("<svg/>", Size::new(100, 100)).unwrap().size(), Size::new(100, 12));
}

#[test]
fn extreme_aspect_ratio_that_scales_to_zero_fails() {
    let mut host = RenderHost::new(Scripted::new(Some((5000, 1))), config()).unwrap();
    let res = host.render_str("<svg/>", Size::new(10, 10));
    assert!(matches!(
        res,
        Err(Error::InvalidDimensionError { width: 10, height: 0, .. })
    ));
}

#[test]
fn oversized_measurement_is_rejected() {
    let cfg = RendererConfig {
        max_output_size: 500,
        ..config()
    };
    let backend = Scripted::new(Some((501, 20)));
    let mut host = RenderHost::new(backend.clone(), cfg).unwrap();
    let res = host.render_str("<svg/>", Size::new(100, 100));
    assert!(matches!(res, Err(Error::InvalidBoxError { width: 501, .. })));
    assert!(!backend.calls().iter().any(|c| matches!(c, Call::Capture(_))));
}

#[test]
fn stalled_load_times_out() {
    let mut backend = Scripted::new(Some((10, 10)));
    backend.never_loads = true;
    let cfg = RendererConfig {
        ready_timeout_ms: 100,
        ..config()
    };
    let mut host = RenderHost::new(backend, cfg).unwrap();
    let start = Instant::now();
    let res = host.render_str("<svg/>", Size::new(10, 10));
    assert!(matches!(res, Err(Error::Timeout(100))));
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn cancelled_host_stops_waiting() {
    let mut backend = Scripted::new(Some((10, 10)));
    backend.never_loads = true;
    let mut host = RenderHost::new(backend, RendererConfig { ready_timeout_ms: 60_000, ..config() }).unwrap();
    let token = host.cancel_token();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        token.cancel();
    });
    assert!(matches!(host.render_str("<svg/>", Size::new(10, 10)), Err(Error::Cancelled)));
}

#[test]
fn wrapped_document_carries_language_and_markup() {
    let backend = Scripted::new(Some((10, 10)));
    let mut host = RenderHost::new(backend.clone(), config()).unwrap();
    host.render(&b"<svg id='x'/>"[..], Size::new(10, 10), None).unwrap();
    let html = backend.html.lock().unwrap().clone().unwrap();
    assert!(html.contains("<html lang=eng>"));
    assert!(html.contains("<svg id='x'/>"));
    assert!(html.contains("background-color:#FFFFFF;"));
}

#[test]
fn invalid_config_is_rejected() {
    let cfg = RendererConfig {
        ready_timeout_ms: 0,
        ..config()
    };
    assert!(matches!(RenderHost::new(Scripted::new(None), cfg), Err(Error::ConfigError(_))));
}
