use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use svgthumb::feature_gate::{self, FeatureScope};
use svgthumb::{Color, RendererConfig, ResizeTrigger, Size};

/// Render an SVG document into a BMP thumbnail
#[derive(Parser, Debug)]
#[command(name = "svgthumb", version, about)]
struct Cli {
    /// SVG document to render
    input: PathBuf,

    /// Where to write the bitmap
    #[arg(short, long, default_value = "result.bmp")]
    output: PathBuf,

    /// Width of the box the thumbnail must fit in
    #[arg(long, default_value_t = 1000)]
    width: u32,

    /// Height of the box the thumbnail must fit in
    #[arg(long, default_value_t = 1000)]
    height: u32,

    /// JSON file with renderer settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_output_size: Option<u32>,

    /// Budget for each backend wait
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Three-letter language code for the page (default: UI locale)
    #[arg(long)]
    lang: Option<String>,

    /// Page background, e.g. `#FFFFFF` or `transparent`
    #[arg(long)]
    background: Option<Color>,

    /// Text encoding of the input when it has no byte order mark
    #[arg(long)]
    encoding: Option<String>,

    /// Scope the platform features are disabled at
    #[arg(long, default_value = "process")]
    feature_scope: FeatureScope,

    /// `any`: scale when either side misses the box; `both`: only when both do
    #[arg(long)]
    resize_trigger: Option<ResizeTrigger>,
}

impl Cli {
    fn renderer_config(&self) -> anyhow::Result<RendererConfig> {
        let mut cfg = match &self.config {
            Some(path) => RendererConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => RendererConfig::default(),
        };
        if let Some(max) = self.max_output_size {
            cfg.max_output_size = max;
        }
        if let Some(ms) = self.timeout_ms {
            cfg.ready_timeout_ms = ms;
        }
        if let Some(lang) = &self.lang {
            cfg.language = Some(lang.clone());
        }
        if let Some(bg) = self.background {
            cfg.background = bg;
        }
        if let Some(trigger) = self.resize_trigger {
            cfg.resize_trigger = trigger;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut features = feature_gate::platform_features();
    feature_gate::disable_all(&mut *features, cli.feature_scope).context("disabling platform features")?;

    let config = cli.renderer_config()?;
    let encoding = cli
        .encoding
        .as_deref()
        .map(svgthumb::host::encoding_for_label)
        .transpose()?;

    let input = File::open(&cli.input).with_context(|| format!("opening {}", cli.input.display()))?;
    let mut host = svgthumb::new_host(config)?;
    let image = host
        .render(input, Size::new(cli.width, cli.height), encoding)
        .with_context(|| format!("rendering {}", cli.input.display()))?;

    image
        .save_bmp(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    log::info!("wrote {} ({})", cli.output.display(), image.size());
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("svgthumb: {:#}", e);
        std::process::exit(1);
    }
}
