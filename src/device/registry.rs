use indexmap::IndexMap;

use crate::device::types::{DeviceIdentity, DeviceSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Updated(usize),
    Inserted(usize),
}

/// Current snapshot per identity. Iteration order is display order: first-seen, never
/// reordered by later updates.
#[derive(Debug, Default)]
pub struct Registry {
    devices: IndexMap<DeviceIdentity, DeviceSnapshot>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Builds the startup registry; untrusted devices are never tracked.
    pub fn admit(snapshots: impl IntoIterator<Item = DeviceSnapshot>) -> Self {
        let mut devices = IndexMap::new();

        for snapshot in snapshots.into_iter().filter(|snapshot| snapshot.trusted) {
            devices.entry(snapshot.identity.clone()).or_insert(snapshot);
        }

        Registry { devices }
    }

    pub fn upsert(&mut self, snapshot: DeviceSnapshot) -> Upsert {
        let (index, previous) = self.devices.insert_full(snapshot.identity.clone(), snapshot);
        match previous {
            Some(_) => Upsert::Updated(index),
            None => Upsert::Inserted(index),
        }
    }

    pub fn get(&self, identity: &DeviceIdentity) -> Option<&DeviceSnapshot> {
        self.devices.get(identity)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceSnapshot> {
        self.devices.values()
    }

    pub fn local_addresses(&self) -> Vec<String> {
        self.devices
            .keys()
            .filter(|identity| !identity.is_remote())
            .map(|identity| identity.address().to_string())
            .collect()
    }
}
