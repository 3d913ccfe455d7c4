use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::gate::GateId;

/// Bijection between external gate names and dense ids.
///
/// Ids are assigned by first mention, so the id of a name equals its
/// insertion index and decoding is a positional lookup.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    names: IndexMap<String, GateId>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `name`, allocating the next dense id on first sight.
    pub fn encode(&mut self, name: &str) -> GateId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.insert(name.to_owned(), id);
        id
    }

    pub fn decode(&self, id: GateId) -> Option<&str> {
        self.names.get_index(id).map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<GateId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Builds the encoder of a renumbered circuit: new id `k` takes the name
    /// of old id `new_to_old[k]`.
    pub fn remap(&self, new_to_old: &[GateId]) -> Result<Encoder> {
        let mut remapped = Encoder::new();
        for &old_id in new_to_old {
            let name = self
                .decode(old_id)
                .with_context(|| format!("gate id {} has no name", old_id))?;
            remapped.encode(name);
        }
        Ok(remapped)
    }
}
