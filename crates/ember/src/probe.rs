//! Reference cache probe application
//!
//! Each frame pins one payload and caches a batch of transient payloads
//! that nothing else owns. Pinned entries must survive; transient ones are
//! reclaimed once released (weak mode) or once soft retention lets go.

use anyhow::{bail, Context, Result};
use embercache::{BackingStoreKind, CacheMode, Handle, ReferenceCache, StatsSnapshot};
use serde::Serialize;
use tracing::{debug, info};

use crate::app::{Application, Engine, Flow};

/// Value cached by the probe
#[derive(Debug)]
pub struct Payload {
    /// Frame that created the payload
    pub frame: u64,
    /// Payload body
    pub bytes: Vec<u8>,
}

/// Cache state at the end of a probe run
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Application name
    pub app: String,
    /// Backing store of the probed cache
    pub backing: BackingStoreKind,
    /// Reclamation mode of the probed cache
    pub mode: CacheMode,
    /// Frames run
    pub frames: u64,
    /// Entries left in the cache
    pub entries: usize,
    /// Payloads held by the probe itself
    pub pinned: usize,
    /// Values kept alive by soft retention
    pub retained: usize,
    /// Cache counters
    pub stats: StatsSnapshot,
}

/// Application exercising a [`ReferenceCache`] once per frame
pub struct CacheProbe {
    transients: u64,
    payload_size: usize,
    cache: Option<ReferenceCache<u64, Payload>>,
    pinned: Vec<Handle<Payload>>,
    report: Option<ProbeReport>,
}

impl CacheProbe {
    /// Create a probe caching `transients` unowned payloads per frame
    pub fn new(transients: u64) -> Self {
        Self {
            transients,
            payload_size: 256,
            cache: None,
            pinned: Vec::new(),
            report: None,
        }
    }

    /// Report of the last run, available after `exit`
    pub fn report(&self) -> Option<&ProbeReport> {
        self.report.as_ref()
    }

    fn payload(&self, frame: u64) -> Handle<Payload> {
        Handle::new(Payload {
            frame,
            bytes: vec![(frame % 251) as u8; self.payload_size],
        })
    }
}

impl Application for CacheProbe {
    fn init(&mut self, engine: &mut Engine) -> Result<()> {
        let config = engine.settings().cache.clone();
        let cache = ReferenceCache::with_config(config).context("Invalid cache configuration")?;
        info!(
            "Probing {} cache in {} mode, {} transients per frame",
            cache.backing(),
            cache.mode(),
            self.transients
        );
        self.cache = Some(cache);
        Ok(())
    }

    fn frame(&mut self, engine: &mut Engine) -> Result<Flow> {
        let Some(cache) = &self.cache else {
            bail!("cache probe was not initialized");
        };

        let frame = engine.frame();
        let base = frame * (self.transients + 1);

        let pinned = self.payload(frame);
        cache.put(base, &pinned)?;
        for offset in 1..=self.transients {
            cache.put(base + offset, &self.payload(frame))?;
        }

        match cache.get(&base) {
            Some(value) if value.frame == frame => {}
            _ => bail!("pinned payload for frame {} is missing", frame),
        }

        if frame > 0 && self.transients > 0 {
            let previous = base - 1;
            let alive = cache.get(&previous).is_some();
            debug!(frame, previous, alive, entries = cache.len(), "probe frame");
        }

        self.pinned.push(pinned);
        Ok(Flow::Continue)
    }

    fn exit(&mut self, engine: &mut Engine) {
        let Some(cache) = self.cache.take() else {
            return;
        };

        let report = ProbeReport {
            app: engine.settings().app_name.clone(),
            backing: cache.backing(),
            mode: cache.mode(),
            frames: engine.frame(),
            entries: cache.len(),
            pinned: self.pinned.len(),
            retained: cache.retained(),
            stats: cache.stats().snapshot(),
        };
        info!(
            "Probe finished: {} entries, {} pinned, {} retained, hit ratio {:.2}",
            report.entries,
            report.pinned,
            report.retained,
            report.stats.hit_ratio
        );

        self.pinned.clear();
        self.report = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::run_headless;
    use crate::settings::{AppSettings, Version};
    use embercache::CacheConfig;

    fn settings(cache: CacheConfig, frames: u64) -> AppSettings {
        let mut settings = AppSettings::new("Probe", Version::new(0, 1, 0));
        settings.cache = cache;
        settings.max_frames = Some(frames);
        settings
    }

    #[test]
    fn test_weak_probe_keeps_only_pinned() {
        let mut probe = CacheProbe::new(3);
        let summary = run_headless(&mut probe, settings(CacheConfig::default(), 5)).unwrap();
        assert_eq!(summary.frames, 5);

        let report = probe.report().unwrap();
        assert_eq!(report.entries, 5);
        assert_eq!(report.pinned, 5);
        assert_eq!(report.retained, 0);
        assert_eq!(report.stats.inserts, 20);
        assert_eq!(report.stats.reclaimed, 15);
        assert_eq!(report.stats.hits, 5);
        assert_eq!(report.stats.misses, 4);
    }

    #[test]
    fn test_soft_probe_retains_up_to_capacity() {
        let config =
            CacheConfig::new(BackingStoreKind::Concurrent, CacheMode::Soft).with_soft_capacity(4);
        let mut probe = CacheProbe::new(3);
        run_headless(&mut probe, settings(config, 5)).unwrap();

        let report = probe.report().unwrap();
        assert_eq!(report.mode, CacheMode::Soft);
        assert_eq!(report.retained, 4);
        assert!(report.entries >= 5);
        assert_eq!(report.stats.inserts, 20);
    }

    #[test]
    fn test_identity_backing() {
        let config = CacheConfig::new(BackingStoreKind::Identity, CacheMode::Weak);
        let mut probe = CacheProbe::new(1);
        run_headless(&mut probe, settings(config, 3)).unwrap();

        let report = probe.report().unwrap();
        assert_eq!(report.backing, BackingStoreKind::Identity);
        assert_eq!(report.entries, 3);
    }

    #[test]
    fn test_invalid_cache_config_fails_init() {
        let config = CacheConfig::new(BackingStoreKind::Concurrent, CacheMode::Weak).with_shards(0);
        let mut probe = CacheProbe::new(1);
        let err = run_headless(&mut probe, settings(config, 3)).unwrap_err();

        assert!(format!("{:#}", err).contains("Invalid cache configuration"));
        assert!(probe.report().is_none());
    }
}
