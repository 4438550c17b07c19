//! Shared-ownership handles that notify observers on final release
//!
//! A [`Handle`] is the strong owner of a cached value. The cache only ever
//! observes it through a weak pointer and a [`Probe`] attached to the value.
//! When the last strong handle drops, the value is dropped and every
//! attached probe fires, which is how reclamation reaches the cache.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Observer attached to a value, fired once when the value is released
pub(crate) trait Probe: Send {
    /// Whether this probe can still have an effect when fired
    fn is_live(&self) -> bool;

    /// Deliver the release notification
    fn fire(self: Box<Self>);
}

/// Value together with the probes observing it
pub(crate) struct Referent<V> {
    value: V,
    probes: Mutex<Vec<Box<dyn Probe>>>,
}

impl<V> Referent<V> {
    /// Attach a probe, dropping any that can no longer have an effect
    pub(crate) fn attach(&self, probe: Box<dyn Probe>) {
        let mut probes = self.probes.lock();
        probes.retain(|p| p.is_live());
        probes.push(probe);
    }

    #[cfg(test)]
    pub(crate) fn probe_count(&self) -> usize {
        self.probes.lock().len()
    }
}

impl<V> Drop for Referent<V> {
    fn drop(&mut self) {
        for probe in self.probes.get_mut().drain(..) {
            probe.fire();
        }
    }
}

/// Strong, cloneable handle to a cacheable value
pub struct Handle<V> {
    inner: Arc<Referent<V>>,
}

impl<V> Handle<V> {
    /// Wrap a value in a new handle
    pub fn new(value: V) -> Self {
        Self {
            inner: Arc::new(Referent {
                value,
                probes: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a weak observer of this handle's value
    pub fn downgrade(&self) -> WeakHandle<V> {
        WeakHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Number of strong handles sharing this value
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether both handles share the same value
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn referent(&self) -> &Referent<V> {
        &self.inner
    }

    pub(crate) fn weak_referent(&self) -> Weak<Referent<V>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_referent(inner: Arc<Referent<V>>) -> Self {
        Self { inner }
    }
}

impl<V> Clone for Handle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Deref for Handle<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.inner.value
    }
}

impl<V> From<V> for Handle<V> {
    fn from(value: V) -> Self {
        Handle::new(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Handle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.inner.value).finish()
    }
}

/// Non-owning observer of a [`Handle`]'s value
pub struct WeakHandle<V> {
    inner: Weak<Referent<V>>,
}

impl<V> WeakHandle<V> {
    /// Recover a strong handle if the value is still owned somewhere
    pub fn upgrade(&self) -> Option<Handle<V>> {
        self.inner.upgrade().map(Handle::from_referent)
    }

    /// Whether every strong handle has been dropped
    pub fn is_dead(&self) -> bool {
        self.inner.strong_count() == 0
    }
}

impl<V> Clone for WeakHandle<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for WeakHandle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakHandle")
            .field("dead", &self.is_dead())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingProbe {
        fired: Arc<AtomicUsize>,
        live: Arc<AtomicBool>,
    }

    impl Probe for CountingProbe {
        fn is_live(&self) -> bool {
            self.live.load(Ordering::SeqCst)
        }

        fn fire(self: Box<Self>) {
            self.fired.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn probe(fired: &Arc<AtomicUsize>, live: &Arc<AtomicBool>) -> Box<dyn Probe> {
        Box::new(CountingProbe {
            fired: Arc::clone(fired),
            live: Arc::clone(live),
        })
    }

    #[test]
    fn test_handle_deref_and_clone() {
        let a = Handle::new(String::from("texture"));
        let b = a.clone();

        assert_eq!(&*b, "texture");
        assert!(Handle::ptr_eq(&a, &b));
        assert_eq!(a.strong_count(), 2);
    }

    #[test]
    fn test_weak_handle_upgrade() {
        let handle = Handle::new(5u32);
        let weak = handle.downgrade();

        assert_eq!(weak.upgrade().map(|h| *h), Some(5));
        drop(handle);
        assert!(weak.is_dead());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_probe_fires_on_last_drop() {
        let fired = Arc::new(AtomicUsize::new(0));
        let live = Arc::new(AtomicBool::new(true));

        let a = Handle::new(1u8);
        a.referent().attach(probe(&fired, &live));
        let b = a.clone();

        drop(a);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        drop(b);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attach_prunes_dead_probes() {
        let fired = Arc::new(AtomicUsize::new(0));
        let dead = Arc::new(AtomicBool::new(false));
        let live = Arc::new(AtomicBool::new(true));

        let handle = Handle::new(1u8);
        handle.referent().attach(probe(&fired, &dead));
        handle.referent().attach(probe(&fired, &dead));
        assert_eq!(handle.referent().probe_count(), 1);

        handle.referent().attach(probe(&fired, &live));
        assert_eq!(handle.referent().probe_count(), 1);
    }
}
