//! Owner of many resources, addressed by generation-checked ids.

use std::fmt;

use log::{debug, warn};

use crate::backend::{DvbBackend, LinuxDvb};
use crate::config::DvbConfig;
use crate::error::{Error, Result};
use crate::resource::Resource;

/// Default number of slots in a registry.
pub const REGISTRY_CAPACITY: usize = 100;

/// Identifier of a resource inside a [`Registry`].
///
/// An id stays valid until its resource is deleted; deleting other
/// resources never changes it, and a deleted id is never valid again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot<B: DvbBackend> {
    generation: u32,
    resource: Option<Resource<B>>,
}

/// Fixed-capacity arena of [`Resource`]s.
pub struct Registry<B: DvbBackend = LinuxDvb> {
    backend: B,
    config: DvbConfig,
    slots: Vec<Slot<B>>,
    free: Vec<u32>,
    capacity: usize,
}

impl<B: DvbBackend + Clone> Registry<B> {
    pub fn new(backend: B, config: DvbConfig) -> Self {
        Self::with_capacity(backend, config, REGISTRY_CAPACITY)
    }

    pub fn with_capacity(backend: B, config: DvbConfig, capacity: usize) -> Self {
        Self {
            backend,
            config,
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
        }
    }

    /// Add a new, unopened resource.
    pub fn create(&mut self) -> Result<ResourceId> {
        let resource = Resource::new(self.backend.clone(), self.config.clone());

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.resource = Some(resource);
            let id = ResourceId {
                index,
                generation: slot.generation,
            };
            debug!("Created resource {} (reused slot)", id);
            return Ok(id);
        }

        if self.slots.len() >= self.capacity {
            return Err(Error::RegistryFull(self.capacity));
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            resource: Some(resource),
        });
        let id = ResourceId {
            index,
            generation: 0,
        };
        debug!("Created resource {}", id);
        Ok(id)
    }
}

impl<B: DvbBackend> Registry<B> {
    /// Look up a resource; `None` for unknown or deleted ids.
    pub fn get(&self, id: ResourceId) -> Option<&Resource<B>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.resource.as_ref())
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource<B>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.resource.as_mut())
    }

    /// Like [`get_mut`](Self::get_mut), failing with
    /// [`Error::InvalidHandle`].
    pub fn resolve(&mut self, id: ResourceId) -> Result<&mut Resource<B>> {
        self.get_mut(id).ok_or(Error::InvalidHandle(id))
    }

    /// Close (if open) and remove a resource. Its id becomes invalid.
    pub fn delete(&mut self, id: ResourceId) -> Result<()> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.resource.is_some())
            .ok_or(Error::InvalidHandle(id))?;

        if let Some(mut resource) = slot.resource.take() {
            if resource.is_open() {
                if let Err(e) = resource.close() {
                    warn!("Closing resource {}: {}", id, e);
                }
            }
        }
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        debug!("Deleted resource {}", id);
        Ok(())
    }

    /// Number of live resources.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeDvb;
    use dvbio_protocol::DeliverySystem;

    fn registry() -> (FakeDvb, Registry<FakeDvb>) {
        let fake = FakeDvb::new();
        fake.add_adapter("/dev/dvb/adapter0", "Terr", DeliverySystem::Terrestrial);
        let registry = Registry::new(fake.clone(), DvbConfig::default());
        (fake, registry)
    }

    #[test]
    fn test_create_and_get() {
        let (_fake, mut registry) = registry();
        let id = registry.create().unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.get(id).unwrap().is_open());
        assert!(registry.resolve(id).is_ok());
    }

    #[test]
    fn test_delete_earlier_keeps_later_ids() {
        let (_fake, mut registry) = registry();
        let first = registry.create().unwrap();
        let second = registry.create().unwrap();
        let third = registry.create().unwrap();

        registry.delete(first).unwrap();
        assert!(registry.get(second).is_some());
        assert!(registry.get(third).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_stale_id_is_invalid() {
        let (_fake, mut registry) = registry();
        let id = registry.create().unwrap();
        registry.delete(id).unwrap();

        assert!(registry.get(id).is_none());
        assert!(matches!(registry.resolve(id), Err(Error::InvalidHandle(_))));
        assert!(matches!(registry.delete(id), Err(Error::InvalidHandle(_))));

        // the slot is reused under a new generation
        let reused = registry.create().unwrap();
        assert_eq!(reused.index, id.index);
        assert_ne!(reused.generation, id.generation);
        assert!(registry.get(id).is_none());
        assert!(registry.get(reused).is_some());
    }

    #[test]
    fn test_unknown_index() {
        let (_fake, mut registry) = registry();
        let bogus = ResourceId {
            index: 42,
            generation: 0,
        };
        assert!(registry.get(bogus).is_none());
        let err = registry.resolve(bogus).err().unwrap();
        assert_eq!(err.to_string(), "Invalid resource handle 42v0");
    }

    #[test]
    fn test_capacity() {
        let (_fake, mut registry) = registry();
        let mut ids = Vec::new();
        for _ in 0..REGISTRY_CAPACITY {
            ids.push(registry.create().unwrap());
        }
        assert!(matches!(registry.create(), Err(Error::RegistryFull(100))));

        registry.delete(ids[10]).unwrap();
        assert!(registry.create().is_ok());
    }

    #[test]
    fn test_delete_closes_open_resource() {
        let (fake, mut registry) = registry();
        let id = registry.create().unwrap();
        registry.resolve(id).unwrap().open(610_000_000, None).unwrap();
        assert_eq!(fake.open_handles(), 3);

        registry.delete(id).unwrap();
        assert_eq!(fake.open_handles(), 0);
    }
}
