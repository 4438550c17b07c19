//! Key requirements for the cache

use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

/// A type usable as a [`ReferenceCache`](crate::ReferenceCache) key.
///
/// Every key is compared by `Eq + Hash` in the hash and concurrent stores.
/// The identity store compares keys by [`identity`](CacheKey::identity)
/// instead and rejects keys that report none.
///
/// Identity must survive `clone`: the cache keeps a clone of each key to
/// find the entry again when the value is reclaimed.
///
/// Implementing the trait for a custom key is usually a one-liner:
///
/// ```
/// use embercache::CacheKey;
///
/// #[derive(Clone, PartialEq, Eq, Hash)]
/// struct MeshId(u32);
///
/// impl CacheKey for MeshId {}
/// ```
pub trait CacheKey: Hash + Eq + Clone + Send + Sync + 'static {
    /// Stable identity of this key, shared by all of its clones
    fn identity(&self) -> Option<u64> {
        None
    }
}

macro_rules! value_identity {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheKey for $t {
                #[inline]
                fn identity(&self) -> Option<u64> {
                    Some(*self as u64)
                }
            }
        )*
    };
}

value_identity!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, char, bool);

impl CacheKey for String {}

impl CacheKey for &'static str {
    #[inline]
    fn identity(&self) -> Option<u64> {
        Some(self.as_ptr() as usize as u64)
    }
}

impl CacheKey for PathBuf {}

impl CacheKey for Vec<u8> {}

impl<T> CacheKey for Arc<T>
where
    T: ?Sized + Hash + Eq + Send + Sync + 'static,
{
    #[inline]
    fn identity(&self) -> Option<u64> {
        Some(Arc::as_ptr(self) as *const () as usize as u64)
    }
}

impl<A: CacheKey, B: CacheKey> CacheKey for (A, B) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_identity() {
        assert_eq!(7u32.identity(), Some(7));
        assert_eq!('a'.identity(), Some(97));
        assert_eq!(true.identity(), Some(1));
    }

    #[test]
    fn test_no_identity() {
        assert_eq!("name".to_string().identity(), None);
        assert_eq!(PathBuf::from("a/b").identity(), None);
        assert_eq!((1u8, 2u8).identity(), None);
        assert_eq!(vec![1u8, 2].identity(), None);
    }

    #[test]
    fn test_static_str_identity_is_address() {
        let literal: &'static str = "texture";
        let leaked: &'static str = Box::leak(String::from("texture").into_boxed_str());

        assert_eq!(literal, leaked);
        assert_eq!(literal.identity(), Some(literal.as_ptr() as usize as u64));
        assert_eq!(literal.identity(), literal.clone().identity());
        assert_ne!(literal.identity(), leaked.identity());
    }

    #[test]
    fn test_arc_identity_follows_allocation() {
        let a: Arc<str> = Arc::from("mesh");
        let b: Arc<str> = Arc::from("mesh");

        assert_eq!(a, b);
        assert_eq!(a.identity(), a.clone().identity());
        assert_ne!(a.identity(), b.identity());
    }
}
