//! Interactive stress globe.
//!
//! Wires the viewport, orbit, threshold, clock, texture, and dataset sources
//! through the entity layers into a single composed scene, and paints it
//! once per settled change.

pub mod app;
pub mod camera_rig;
pub mod error;
pub mod orbit;
pub mod platform;
pub mod render;
pub mod render_loop;
pub mod script;
pub mod sources;
pub mod textures;

pub use app::GlobeApp;
pub use error::AppError;
pub use render::{FrameSummary, HeadlessBackend, RenderBackend, RenderError, Renderer};
pub use script::{Command, parse_script};
pub use sources::{FixedClock, SystemClock, TimeSource};

/// Parse `script` and feed it to `app`, picking up finished textures before
/// every command. Returns the number of commands executed.
pub fn run_script<B: RenderBackend + 'static>(
    app: &mut GlobeApp<B>,
    script: &str,
) -> Result<usize, AppError> {
    let commands = parse_script(script)?;
    for command in &commands {
        app.poll();
        app.execute(command);
    }
    app.poll();
    tracing::info!(
        commands = commands.len(),
        paints = app.paint_count(),
        "Script finished"
    );
    Ok(commands.len())
}
