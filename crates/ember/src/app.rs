//! Application lifecycle

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info};

use crate::graphics::{GraphicsContext, HeadlessContext};
use crate::settings::AppSettings;

/// What the main loop does after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Run another frame
    Continue,
    /// Leave the main loop
    Exit,
}

/// Hooks driven by [`run`]
pub trait Application {
    /// Called once after the graphics context is up
    fn init(&mut self, engine: &mut Engine) -> Result<()>;

    /// Called once per frame, before the frame is presented
    fn frame(&mut self, engine: &mut Engine) -> Result<Flow>;

    /// Called once when the run ends, whether or not it succeeded
    fn exit(&mut self, engine: &mut Engine);
}

/// Run state handed to the application hooks
pub struct Engine {
    settings: AppSettings,
    context: Box<dyn GraphicsContext>,
    frame: u64,
    exit_requested: bool,
}

impl Engine {
    fn new(settings: AppSettings, context: Box<dyn GraphicsContext>) -> Self {
        Self {
            settings,
            context,
            frame: 0,
            exit_requested: false,
        }
    }

    /// Settings of this run
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Graphics context of this run
    pub fn context(&self) -> &dyn GraphicsContext {
        self.context.as_ref()
    }

    /// Index of the current frame, counted from zero
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Leave the main loop after the current frame
    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    fn should_run(&self) -> bool {
        !self.exit_requested
            && self
                .settings
                .max_frames
                .map_or(true, |max| self.frame < max)
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Frames presented
    pub frames: u64,
}

/// Run an application against a context built by `create_context`
///
/// `exit` and `destroy` run once the context exists, even when `init` or a
/// frame fails.
pub fn run<A, F>(app: &mut A, settings: AppSettings, create_context: F) -> Result<RunSummary>
where
    A: Application + ?Sized,
    F: FnOnce(&AppSettings) -> Result<Box<dyn GraphicsContext>>,
{
    info!("Initializing {} {}", settings.app_name, settings.app_version);

    let context = create_context(&settings).with_context(|| {
        format!(
            "Failed to initialize {} {}",
            settings.app_name, settings.app_version
        )
    })?;
    let mut engine = Engine::new(settings, context);

    let outcome = drive(app, &mut engine);
    if let Err(e) = &outcome {
        error!("{} failed: {:#}", engine.settings.app_name, e);
    }

    app.exit(&mut engine);
    engine.context.destroy();
    info!(
        "{} {} shut down after {} frames",
        engine.settings.app_name, engine.settings.app_version, engine.frame
    );

    outcome.map(|frames| RunSummary { frames })
}

/// Run an application against a [`HeadlessContext`]
pub fn run_headless<A>(app: &mut A, settings: AppSettings) -> Result<RunSummary>
where
    A: Application + ?Sized,
{
    run(app, settings, |settings| {
        Ok(Box::new(HeadlessContext::create(settings)?) as Box<dyn GraphicsContext>)
    })
}

fn drive<A: Application + ?Sized>(app: &mut A, engine: &mut Engine) -> Result<u64> {
    app.init(engine).context("Application init failed")?;
    info!(
        "{} {} Initialized on {}",
        engine.settings.app_name,
        engine.settings.app_version,
        engine.context.describe()
    );

    while engine.should_run() {
        let flow = app
            .frame(engine)
            .with_context(|| format!("Frame {} failed", engine.frame))?;
        engine.context.present()?;
        engine.frame += 1;

        if flow == Flow::Exit {
            break;
        }
    }

    Ok(engine.frame)
}
