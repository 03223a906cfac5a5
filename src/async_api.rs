use crate::backend::{CancelToken, RenderBackend};
use crate::{Error, RasterImage, RenderHost, RendererConfig, Result, Size};
use encoding_rs::Encoding;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Render {
        svg: Vec<u8>,
        target: Size,
        encoding: Option<&'static Encoding>,
        resp: oneshot::Sender<Result<RasterImage>>,
    },
    Close(oneshot::Sender<()>),
}

struct Worker {
    cmd_tx: Sender<Command>,
    cancel: CancelToken,
}

/// An async-friendly renderer backed by dedicated worker threads.
///
/// Each worker thread owns its own backend and `RenderHost`; a rendering
/// surface never leaves the thread that created it. Requests are handed
/// to workers round-robin.
#[derive(Clone)]
pub struct Renderer {
    workers: Arc<Vec<Worker>>,
    next: Arc<AtomicUsize>,
}

impl Renderer {
    /// Create a renderer with the default backend and `config.workers` threads.
    #[cfg(feature = "resvg")]
    pub async fn new(config: Option<RendererConfig>) -> Result<Self> {
        let config = config.unwrap_or_default();
        let backend_config = config.clone();
        Self::with_backend(config, move || Ok(crate::resvg_backend::ResvgBackend::new(&backend_config))).await
    }

    /// Create a renderer whose workers build their backend with `factory`.
    pub async fn with_backend<B, F>(config: RendererConfig, factory: F) -> Result<Self>
    where
        B: RenderBackend + 'static,
        F: Fn() -> Result<B> + Send + Sync + 'static,
    {
        config.validate()?;
        let factory = Arc::new(factory);
        let mut workers = Vec::with_capacity(config.workers);

        for index in 0..config.workers {
            let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
            let (init_tx, init_rx) = oneshot::channel::<Result<CancelToken>>();
            let factory = Arc::clone(&factory);
            let config = config.clone();

            thread::Builder::new()
                .name(format!("svgthumb-render-{}", index))
                .spawn(move || {
                    // Build the backend on the worker thread
                    let mut host = match factory().and_then(|backend| RenderHost::new(backend, config)) {
                        Ok(h) => h,
                        Err(err) => {
                            let _ = init_tx.send(Err(err));
                            return;
                        }
                    };
                    let _ = init_tx.send(Ok(host.cancel_token()));

                    // Command loop
                    while let Ok(cmd) = cmd_rx.recv() {
                        match cmd {
                            Command::Render {
                                svg,
                                target,
                                encoding,
                                resp,
                            } => {
                                let res = host.render(svg.as_slice(), target, encoding);
                                if let Err(e) = &res {
                                    log::warn!("render worker {} failed: {}", index, e);
                                }
                                let _ = resp.send(res);
                            }
                            Command::Close(resp) => {
                                let _ = resp.send(());
                                break;
                            }
                        }
                    }
                })?;

            // Wait for the worker to report initialization success or failure
            let cancel = init_rx
                .await
                .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))??;
            workers.push(Worker { cmd_tx, cancel });
        }

        log::debug!("started {} render workers", workers.len());
        Ok(Self {
            workers: Arc::new(workers),
            next: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Number of worker threads
    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Render UTF-8 (or BOM-marked) SVG bytes into an image that fits `target`.
    pub async fn render(&self, svg: impl Into<Vec<u8>>, target: Size) -> Result<RasterImage> {
        self.render_with_encoding(svg, target, None).await
    }

    /// Render SVG bytes in the given text encoding.
    pub async fn render_with_encoding(
        &self,
        svg: impl Into<Vec<u8>>,
        target: Size,
        encoding: Option<&'static Encoding>,
    ) -> Result<RasterImage> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        let (tx, rx) = oneshot::channel();
        self.workers[index]
            .cmd_tx
            .send(Command::Render {
                svg: svg.into(),
                target,
                encoding,
                resp: tx,
            })
            .map_err(|_| Error::Other("Render worker has shut down".into()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Render canceled: {}", e)))?
    }

    /// Abort in-flight renders. Workers refuse further renders afterwards;
    /// create a new `Renderer` to continue.
    pub fn cancel(&self) {
        for w in self.workers.iter() {
            w.cancel.cancel();
        }
    }

    /// Shut down every worker thread.
    pub async fn close(self) -> Result<()> {
        for w in self.workers.iter() {
            let (tx, rx) = oneshot::channel();
            if w.cmd_tx.send(Command::Close(tx)).is_ok() {
                rx.await
                    .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?;
            }
        }
        Ok(())
    }
}
