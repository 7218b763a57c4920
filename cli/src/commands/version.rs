//! Version prints the binary's own version.
use crate::render::Renderer;
use crate::ExitCode;

/// Run prints `CARGO_PKG_VERSION`.
pub fn run(renderer: &dyn Renderer) -> ExitCode {
    renderer.info(concat!("tailor ", env!("CARGO_PKG_VERSION")));
    ExitCode::Clean
}
