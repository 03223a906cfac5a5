#![cfg(feature = "resvg")]

use futures::future::join_all;
use svgthumb::{Error, Renderer, RendererConfig, Size};

fn config(workers: usize) -> RendererConfig {
    RendererConfig {
        load_system_fonts: false,
        language: Some("eng".into()),
        workers,
        ..Default::default()
    }
}

const SQUARE: &str = r#"<svg width="100" height="100"><rect width="100" height="100" fill="red"/></svg>"#;

#[tokio::test]
async fn renders_through_worker() {
    let renderer = Renderer::new(Some(config(1))).await.expect("renderer");
    let img = renderer.render(SQUARE, Size::new(50, 50)).await.unwrap();
    assert_eq!(img.size(), Size::new(50, 50));
    renderer.close().await.unwrap();
}

#[tokio::test]
async fn errors_come_back_to_the_caller() {
    let renderer = Renderer::new(Some(config(1))).await.expect("renderer");
    let res = renderer.render("<p>no drawing</p>", Size::new(50, 50)).await;
    assert!(matches!(res, Err(Error::MalformedDocumentError(_))));
    let res = renderer.render(SQUARE, Size::new(0, 50)).await;
    assert!(matches!(res, Err(Error::InvalidBoxError { .. })));
    renderer.close().await.unwrap();
}

#[tokio::test]
async fn concurrent_requests_spread_over_workers() {
    let renderer = Renderer::new(Some(config(3))).await.expect("renderer");
    assert_eq!(renderer.workers(), 3);

    let jobs = (1..=6u32).map(|i| {
        let r = renderer.clone();
        async move { r.render(SQUARE, Size::new(10 * i, 10 * i)).await }
    });
    let results = join_all(jobs).await;
    for (i, res) in results.into_iter().enumerate() {
        let side = 10 * (i as u32 + 1);
        assert_eq!(res.unwrap().size(), Size::new(side, side));
    }
    renderer.close().await.unwrap();
}

#[tokio::test]
async fn cancelled_renderer_refuses_work() {
    let renderer = Renderer::new(Some(config(1))).await.expect("renderer");
    renderer.cancel();
    let res = renderer.render(SQUARE, Size::new(50, 50)).await;
    assert!(matches!(res, Err(Error::Cancelled)));
}

#[tokio::test]
async fn zero_workers_is_a_config_error() {
    let res = Renderer::new(Some(config(0))).await;
    assert!(matches!(res, Err(Error::ConfigError(_))));
}

#[tokio::test]
async fn failing_backend_factory_surfaces_at_startup() {
    let res = Renderer::with_backend(config(1), || -> svgthumb::Result<svgthumb::resvg_backend::ResvgBackend> {
        Err(Error::Other("no surface available".into()))
    })
    .await;
    assert!(matches!(res, Err(Error::Other(msg)) if msg == "no surface available"));
}
