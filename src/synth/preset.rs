use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Flat parameter name to value map, using the same keys as
/// [`Synth::set_parameter`](super::engine::Synth::set_parameter): `opN_<field>` for
/// operators 1-6 plus global names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetData(BTreeMap<String, f32>);

impl PresetData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f32) -> Option<f32> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<f32> {
        self.0.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }
}

impl FromIterator<(String, f32)> for PresetData {
    fn from_iter<T: IntoIterator<Item = (String, f32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, f32>> for PresetData {
    fn from(map: BTreeMap<String, f32>) -> Self {
        Self(map)
    }
}

impl From<PresetData> for BTreeMap<String, f32> {
    fn from(preset: PresetData) -> Self {
        preset.0
    }
}

// -------------------------------------------------------------------------------------------------

pub type PresetListener = Arc<dyn Fn(&PresetData) + Send + Sync>;

/// Opaque handle of a registered preset listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// Callbacks invoked synchronously after a preset got applied.
#[derive(Default)]
pub struct PresetListeners {
    listeners: Mutex<Vec<(ListenerId, PresetListener)>>,
    next_id: AtomicUsize,
}

impl PresetListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: PresetListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it wasn't registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let count = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != count
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs all listeners registered at the time of the call. The registry isn't locked
    /// while they run, so listeners may add or remove listeners.
    pub fn notify(&self, preset: &PresetData) {
        let listeners: Vec<PresetListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(preset);
        }
    }
}
