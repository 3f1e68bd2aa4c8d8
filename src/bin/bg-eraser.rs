//! Background eraser CLI tool
//!
//! Removes the background from an image and optionally erases painted strokes.

#[cfg(feature = "cli")]
use bg_eraser::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
