//! Partial update values

use serde::{Deserialize, Deserializer};

/// One field of a partial update.
///
/// Deserialized from an optional JSON field marked `#[serde(default)]`:
/// an absent field is [`Patch::Keep`], an explicit `null` is
/// [`Patch::Clear`] and any other value is [`Patch::Set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Resolve against the currently stored value
    pub fn apply(self, current: T) -> T
    where
        T: Default,
    {
        match self {
            Patch::Keep => current,
            Patch::Clear => T::default(),
            Patch::Set(value) => value,
        }
    }
}

impl Patch<String> {
    /// Older clients send `""` for "leave unchanged"; treat the empty string
    /// as [`Patch::Keep`] so they keep working. Whitespace is a real value.
    pub fn blank_as_keep(self) -> Self {
        match self {
            Patch::Set(value) if value.is_empty() => Patch::Keep,
            other => other,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(|value| match value {
            Some(value) => Patch::Set(value),
            None => Patch::Clear,
        })
    }
}
