mod error;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{CacheKeyBuilder, KeyPart, Namespace, INITIAL_VERSION};
pub use serialization::{
    decode_counter, deserialize_value, encode_counter, serialize_value, SerializationError,
};
pub use traits::{Cache, TaggedCache};
