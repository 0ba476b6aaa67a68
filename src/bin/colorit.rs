//! Colorit CLI tool
//!
//! Command-line interface for colorizing black-and-white photos with the
//! colorit library, using ONNX Runtime or Tract backends.

#[cfg(feature = "cli")]
use colorit::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
