//! The capability surface a rendering backend has to offer.
//!
//! A backend owns one rendering surface. Operations that make the backend
//! do layout or paint work return a [`Completion`]; the host waits on it with
//! a timeout instead of polling busy/ready flags.

use crate::{Error, RasterImage, Rect, Result, Size};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often a waiting host re-checks its cancel token.
const WAIT_SLICE: Duration = Duration::from_millis(25);

/// The root `<svg>` element as laid out on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgRoot {
    /// Bounding rectangle in device pixels
    pub bounds: Rect,
    /// Raw `viewBox` attribute, when declared
    pub view_box: Option<String>,
}

/// Core trait for rendering backends
pub trait RenderBackend {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Resize the rendering surface
    fn resize_surface(&mut self, size: Size) -> Result<Completion>;

    /// Start loading an HTML document into the surface
    fn load_document(&mut self, html: &str) -> Result<Completion>;

    /// The first `<svg>` element of the loaded document, if any
    fn root_svg(&self) -> Result<Option<SvgRoot>>;

    /// Replace the inline style of the root `<svg>` element
    fn set_root_style(&mut self, style: &str) -> Result<Completion>;

    /// Copy the pixels inside `rect` into a new image
    fn capture(&self, rect: Rect) -> Result<RasterImage>;
}

impl<B: RenderBackend + ?Sized> RenderBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resize_surface(&mut self, size: Size) -> Result<Completion> {
        (**self).resize_surface(size)
    }

    fn load_document(&mut self, html: &str) -> Result<Completion> {
        (**self).load_document(html)
    }

    fn root_svg(&self) -> Result<Option<SvgRoot>> {
        (**self).root_svg()
    }

    fn set_root_style(&mut self, style: &str) -> Result<Completion> {
        (**self).set_root_style(style)
    }

    fn capture(&self, rect: Rect) -> Result<RasterImage> {
        (**self).capture(rect)
    }
}

/// Sending half of a [`Completion`], held by the backend.
pub struct Completer {
    tx: SyncSender<Result<()>>,
}

impl Completer {
    /// Report the outcome. Dropping the completer without calling this is
    /// reported to the waiter as a render error.
    pub fn complete(self, result: Result<()>) {
        let _ = self.tx.send(result);
    }
}

/// One-shot "surface is ready" signal.
pub struct Completion {
    rx: Receiver<Result<()>>,
}

impl Completion {
    pub fn channel() -> (Completer, Completion) {
        let (tx, rx) = mpsc::sync_channel(1);
        (Completer { tx }, Completion { rx })
    }

    /// A completion that has already succeeded
    pub fn ready() -> Self {
        Self::settled(Ok(()))
    }

    /// A completion that has already failed
    pub fn failed(err: Error) -> Self {
        Self::settled(Err(err))
    }

    fn settled(result: Result<()>) -> Self {
        let (done, completion) = Self::channel();
        done.complete(result);
        completion
    }

    /// Block until the backend signals, the timeout expires or `cancel` fires.
    pub fn wait(self, timeout: Duration, cancel: &CancelToken) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(timeout.as_millis() as u64));
            }
            match self.rx.recv_timeout(remaining.min(WAIT_SLICE)) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::RenderError("backend dropped a pending operation".into()))
                }
            }
        }
    }
}

/// Shared cancellation flag. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
