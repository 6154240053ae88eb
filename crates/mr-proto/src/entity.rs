use serde::de::DeserializeOwned;
use serde::Serialize;

/// Something stored in a single Redis hash keyed by its own identity.
/// `hash_name` gives the broker the name of the Redis hash (`jobs`,
/// `nodes`, ...), and `key` gives the field within it identifying this
/// particular instance. `mr-broker`'s `Store<T>` is generic over this
/// trait.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the Redis hash this entity type lives in, e.g. `"jobs"`.
    fn hash_name() -> &'static str;

    /// Field name within that hash identifying this particular instance.
    fn key(&self) -> String;
}
