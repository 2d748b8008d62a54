use clap::Parser;
use fontprobe::{AnalyzerConfig, NullFontFaceParser, Session, Viewport};

/// Analyze a page's font usage and print the result as JSON
#[derive(Parser)]
#[command(name = "fontprobe", version, about)]
struct Cli {
    /// URL of the page to analyze
    url: String,

    /// Viewport width in pixels
    #[arg(long, default_value_t = fontprobe::DEFAULT_VIEWPORT_WIDTH)]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = fontprobe::DEFAULT_VIEWPORT_HEIGHT)]
    height: u32,

    /// Route page console output to the host log
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let config = AnalyzerConfig {
        viewport: Viewport {
            width: cli.width,
            height: cli.height,
        },
        debug: cli.debug,
        ..Default::default()
    };

    let session = Session::start(config)?;
    let result = session.execute(&cli.url, &NullFontFaceParser);
    // Teardown runs regardless of how the analysis went
    let _ = session.shutdown();

    let result = result?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
