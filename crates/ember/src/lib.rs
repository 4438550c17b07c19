//! Ember - application bootstrap around a headless graphics context
//!
//! An [`Application`] is driven through `init`, a frame loop and `exit` by
//! [`run`]. The bundled [`CacheProbe`] exercises an
//! [`embercache::ReferenceCache`] each frame.

#![warn(missing_docs)]

pub mod app;
pub mod graphics;
pub mod probe;
pub mod settings;

pub use app::{run, run_headless, Application, Engine, Flow, RunSummary};
pub use graphics::{GraphicsContext, HeadlessContext};
pub use probe::{CacheProbe, Payload, ProbeReport};
pub use settings::{AppSettings, Version, API_VERSION, ENGINE_NAME, ENGINE_VERSION};
