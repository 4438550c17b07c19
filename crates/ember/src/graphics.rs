//! Graphics context boundary

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::settings::AppSettings;

/// Platform graphics instance owned by the engine for the duration of a run
pub trait GraphicsContext {
    /// One-line description for logs
    fn describe(&self) -> String;

    /// Present the current frame
    fn present(&mut self) -> Result<()>;

    /// Release the instance; called exactly once per run
    fn destroy(&mut self);
}

/// Context that renders nothing and counts presented frames
#[derive(Debug)]
pub struct HeadlessContext {
    label: String,
    extensions: Vec<String>,
    layers: Vec<String>,
    presented: u64,
    destroyed: bool,
}

impl HeadlessContext {
    /// Create a context from the run settings
    pub fn create(settings: &AppSettings) -> Result<Self> {
        if settings.extensions.is_empty() {
            bail!("no graphics extensions requested");
        }

        let context = Self {
            label: format!(
                "{} {} on {} {} (api {}, 0x{:08x})",
                settings.app_name,
                settings.app_version,
                settings.engine_name(),
                settings.engine_version(),
                settings.api_version(),
                settings.api_version().packed(),
            ),
            extensions: settings.extensions.iter().cloned().collect(),
            layers: settings.layers.iter().cloned().collect(),
            presented: 0,
            destroyed: false,
        };

        info!("Created headless context: {}", context.label);
        debug!(
            "extensions={:?} layers={:?}",
            context.extensions, context.layers
        );
        Ok(context)
    }

    /// Frames presented so far
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Whether `destroy` has run
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl GraphicsContext for HeadlessContext {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn present(&mut self) -> Result<()> {
        if self.destroyed {
            bail!("present on destroyed context");
        }
        self.presented += 1;
        Ok(())
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            info!(
                "Destroyed headless context after {} frames",
                self.presented
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Version;

    #[test]
    fn test_create_describes_settings() {
        let settings = AppSettings::new("Probe", Version::new(1, 2, 0));
        let context = HeadlessContext::create(&settings).unwrap();
        let label = context.describe();
        assert!(label.contains("Probe v1.2.0"));
        assert!(label.contains("Ember Engine"));
        assert_eq!(context.presented(), 0);
    }

    #[test]
    fn test_create_requires_extensions() {
        let mut settings = AppSettings::new("Probe", Version::new(1, 0, 0));
        settings.extensions.clear();
        assert!(HeadlessContext::create(&settings).is_err());
    }

    #[test]
    fn test_present_after_destroy_fails() {
        let settings = AppSettings::new("Probe", Version::new(1, 0, 0));
        let mut context = HeadlessContext::create(&settings).unwrap();
        context.present().unwrap();
        context.present().unwrap();
        assert_eq!(context.presented(), 2);

        context.destroy();
        context.destroy();
        assert!(context.is_destroyed());
        assert!(context.present().is_err());
        assert_eq!(context.presented(), 2);
    }
}
