//! The entity contract and attribute mass-assignment.
//!
//! Repositories receive writes as loose attribute maps, the way an ORM
//! receives request input. [`fill`] overlays those attributes on the JSON
//! form of the current entity and deserializes the result, so every entity
//! gets create and partial update semantics from its serde definition.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::AttributeError;

/// Identifier assigned by the store.
pub type EntityId = u64;

/// Attribute map passed to `create` and `update`.
pub type Attributes = Map<String, Value>;

/// A persisted content type.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable entity name. Doubles as the cache namespace of the entity.
    const NAME: &'static str;

    /// Returns the store-assigned identifier.
    fn id(&self) -> EntityId;
}

/// Converts a JSON value into an attribute map.
///
/// # Examples
///
/// ```
/// use folio_core::content::attributes;
/// use serde_json::json;
///
/// let attrs = attributes(json!({ "title": "Hello" })).unwrap();
/// assert_eq!(attrs["title"], "Hello");
///
/// assert!(attributes(json!([1, 2, 3])).is_err());
/// ```
pub fn attributes(value: Value) -> Result<Attributes, AttributeError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AttributeError::NotAnObject),
    }
}

/// Builds an entity with `id` from `current` (if any) overlaid with `attributes`.
///
/// The `id` attribute is guarded: it is always set from the `id` argument.
pub fn fill<E: Entity>(
    current: Option<&E>,
    id: EntityId,
    attributes: &Attributes,
) -> Result<E, AttributeError> {
    if attributes.contains_key("id") {
        return Err(AttributeError::Guarded("id"));
    }

    let mut object = match current {
        Some(entity) => match serde_json::to_value(entity) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(AttributeError::NotAnObject),
            Err(e) => {
                return Err(AttributeError::Invalid {
                    entity: E::NAME,
                    reason: e.to_string(),
                })
            }
        },
        None => Map::new(),
    };

    for (name, value) in attributes {
        object.insert(name.clone(), value.clone());
    }
    object.insert("id".to_string(), Value::from(id));

    serde_json::from_value(Value::Object(object)).map_err(|e| AttributeError::Invalid {
        entity: E::NAME,
        reason: e.to_string(),
    })
}
