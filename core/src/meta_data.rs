//! `MetaData` — the per-run context bag
//!
//! Every piece of state that flows between processors lives in one [`MetaData`]
//! instance, addressed by identity-typed [`MetaDataKey`]s.
//!
//! # Type erasure at the slot level
//!
//! The map stores `Box<dyn Any + Send>` slots keyed by an opaque [`KeyId`]. The
//! value type is recovered only inside [`MetaData::get`]/[`MetaData::set`], where
//! the key's type parameter names it. Since the only way to write a slot is through
//! a key of the matching type, a downcast never observes a foreign type.

use crate::MissingContextValue;
use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque identity of a [`MetaDataKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

/// Identity-typed token addressing one slot of a [`MetaData`] context.
///
/// Each call to [`MetaDataKey::new`] yields a new identity, so two keys never
/// collide even when they share a display name. Clones share the identity of the
/// original. Declare keys once per concept and share them:
///
/// ```
/// use std::sync::LazyLock;
/// use chainer::{MetaData, MetaDataKey};
///
/// static REQUEST_PATH: LazyLock<MetaDataKey<String>> =
///     LazyLock::new(|| MetaDataKey::new("request.path"));
///
/// let mut meta_data = MetaData::new();
/// meta_data.set(&REQUEST_PATH, "/internals".to_string());
/// assert_eq!(meta_data.get(&REQUEST_PATH).unwrap(), "/internals");
/// ```
pub struct MetaDataKey<T> {
    id: KeyId,
    name: Cow<'static, str>,
    // fn() -> T keeps the key Send + Sync whatever T is.
    _marker: PhantomData<fn() -> T>,
}

impl<T> MetaDataKey<T> {
    /// Create a key with a fresh identity.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            id: KeyId(NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// Display name, used in errors and debug output only.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The opaque identity of this key.
    #[must_use]
    pub fn id(&self) -> KeyId {
        self.id
    }
}

impl<T> Clone for MetaDataKey<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for MetaDataKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for MetaDataKey<T> {}

impl<T> fmt::Debug for MetaDataKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaDataKey")
            .field("name", &self.name)
            .field("id", &self.id.0)
            .finish()
    }
}

impl<T> fmt::Display for MetaDataKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

struct Slot {
    name: Cow<'static, str>,
    value: Box<dyn Any + Send>,
}

/// Mutable context for one unit of work.
///
/// Created by the transport for each request, threaded through every processor,
/// and read back once the run ends. Never shared between runs, so it carries no
/// synchronization.
#[derive(Default)]
pub struct MetaData {
    slots: HashMap<KeyId, Slot>,
}

impl MetaData {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MissingContextValue`] naming the key if nothing was stored.
    pub fn get<T: 'static>(&self, key: &MetaDataKey<T>) -> Result<&T, MissingContextValue> {
        self.get_optional(key).ok_or_else(|| missing(key))
    }

    /// Get a mutable reference to the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MissingContextValue`] naming the key if nothing was stored.
    pub fn get_mut<T: 'static>(
        &mut self,
        key: &MetaDataKey<T>,
    ) -> Result<&mut T, MissingContextValue> {
        self.slots
            .get_mut(&key.id)
            .and_then(|slot| slot.value.downcast_mut::<T>())
            .ok_or_else(|| missing(key))
    }

    /// Get the value stored under `key`, or `None`.
    #[must_use]
    pub fn get_optional<T: 'static>(&self, key: &MetaDataKey<T>) -> Option<&T> {
        self.slots
            .get(&key.id)
            .and_then(|slot| slot.value.downcast_ref::<T>())
    }

    /// Store `value` under `key`, returning the value it replaced.
    pub fn set<T: Send + 'static>(&mut self, key: &MetaDataKey<T>, value: T) -> Option<T> {
        let previous = self.slots.insert(
            key.id,
            Slot {
                name: key.name.clone(),
                value: Box::new(value),
            },
        );
        previous.and_then(|slot| slot.value.downcast::<T>().ok().map(|boxed| *boxed))
    }

    /// Returns `true` if a value is stored under `key`.
    #[must_use]
    pub fn contains<T>(&self, key: &MetaDataKey<T>) -> bool {
        self.slots.contains_key(&key.id)
    }

    /// Remove and return the value stored under `key`.
    pub fn remove<T: 'static>(&mut self, key: &MetaDataKey<T>) -> Option<T> {
        self.slots
            .remove(&key.id)
            .and_then(|slot| slot.value.downcast::<T>().ok().map(|boxed| *boxed))
    }

    /// Number of populated slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slot is populated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Display names of the populated slots, sorted.
    #[must_use]
    pub fn key_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.values().map(|slot| slot.name.as_ref()).collect();
        names.sort_unstable();
        names
    }
}

fn missing<T>(key: &MetaDataKey<T>) -> MissingContextValue {
    MissingContextValue {
        key: key.name().to_owned(),
    }
}

impl fmt::Debug for MetaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaData")
            .field("keys", &self.key_names())
            .finish()
    }
}
