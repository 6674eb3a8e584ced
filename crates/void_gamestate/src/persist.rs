//! Persistable-entity contract
//!
//! Every component that takes part in a save pass implements [`Persistable`].
//! The save manager reaches the entities through [`SaveSource`] and
//! [`RestoreTarget`], looking them up by the same ids that are registered in
//! the [`SaveDependencyGraph`](crate::dependency::SaveDependencyGraph).

use crate::save::SaveError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// An entity that can be written to and restored from a save
pub trait Persistable {
    /// Stable id, the same one registered in the save graph
    fn save_id(&self) -> &str;

    /// Serialize the entity to a JSON payload
    fn serialize(&self) -> Result<String, SaveError>;

    /// Restore the entity from a JSON payload
    fn deserialize(&mut self, payload: &str) -> Result<(), SaveError>;

    /// Whether the entity changed since it was last saved
    fn is_modified(&self) -> bool;

    /// Internal consistency check run before serializing
    fn validate(&self) -> bool;
}

/// Lookup of persistable entities for a save pass
pub trait SaveSource {
    /// Entity registered under `id`, if it still exists
    fn persistable(&self, id: &str) -> Option<&dyn Persistable>;
}

/// Lookup of persistable entities for a restore pass
pub trait RestoreTarget {
    /// Entity registered under `id`, if it exists
    fn persistable_mut(&mut self, id: &str) -> Option<&mut dyn Persistable>;

    /// Called after the entity under `id` was restored successfully
    fn restored(&mut self, _id: &str) {}
}

/// Encode a payload struct as JSON
pub fn to_payload<T: Serialize>(value: &T) -> Result<String, SaveError> {
    serde_json::to_string(value).map_err(|e| SaveError::Serialization(e.to_string()))
}

/// Decode a JSON payload
pub fn from_payload<T: DeserializeOwned>(payload: &str) -> Result<T, SaveError> {
    serde_json::from_str(payload).map_err(|e| SaveError::Deserialization(e.to_string()))
}
