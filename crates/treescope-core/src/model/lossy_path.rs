/// Serde helpers that write paths as display strings.
///
/// Serde rejects a `PathBuf` that is not valid UTF-8, and one odd filename
/// must not make an event or record unserialisable. Invalid sequences are
/// replaced with U+FFFD on the way out. The lossless form of a path lives in
/// the store, not in JSON.
use serde::{Deserialize, Deserializer, Serializer};
use std::path::{Path, PathBuf};

pub fn serialize<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(PathBuf::from)
}

/// The same for `Option<PathBuf>` fields.
pub mod option {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::path::PathBuf;

    pub fn serialize<S>(path: &Option<PathBuf>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match path {
            Some(path) => serializer.serialize_some(&*path.to_string_lossy()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(|p| p.map(PathBuf::from))
    }
}
