//! # Registry
//!
//! Maps canvas ids to their engines for one host session. Hosts create one, hand it to whatever
//! needs to reach a canvas by id, and remove engines as their canvases go away.

use crate::engine::Engine;

/// Engines of one host session, keyed by canvas id.
pub struct Registry {
    // Write-locked only when a canvas comes or goes. Each engine has its own lock.
    engines: parking_lot::RwLock<hashbrown::HashMap<String, parking_lot::Mutex<Engine>>>,
}
impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Register an engine under `id`.
    /// If the id is taken, the untouched engine is returned as an error.
    pub fn insert(&self, id: impl Into<String>, engine: Engine) -> Result<(), Engine> {
        let id = id.into();
        match self.engines.write().entry(id) {
            hashbrown::hash_map::Entry::Occupied(o) => {
                log::warn!("canvas {} is already registered", o.key());
                return Err(engine);
            }
            hashbrown::hash_map::Entry::Vacant(v) => {
                log::debug!("registered canvas {}", v.key());
                v.insert(parking_lot::Mutex::new(engine));
            }
        }
        Ok(())
    }
    /// Call the given closure on the engine with the given id, if found.
    pub fn with<F, T>(&self, id: &str, f: F) -> Option<T>
    where
        F: FnOnce(&mut Engine) -> T,
    {
        let engines = self.engines.read();
        let mut engine = engines.get(id)?.lock();
        Some(f(&mut engine))
    }
    /// Take an engine out of the registry, e.g. when its canvas is destroyed.
    pub fn remove(&self, id: &str) -> Option<Engine> {
        let engine = self.engines.write().remove(id)?;
        log::debug!("removed canvas {id}");
        Some(engine.into_inner())
    }
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.engines.read().contains_key(id)
    }
    /// Iterate over the registered canvas ids.
    pub fn ids(&self) -> impl Iterator<Item = String> {
        let ids: Vec<_> = self.engines.read().keys().cloned().collect();
        ids.into_iter()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.engines.read().len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl Default for Registry {
    fn default() -> Self {
        Self {
            engines: parking_lot::RwLock::default(),
        }
    }
}
