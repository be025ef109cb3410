//! Serde helpers for configuration values that may be numbers or strings
// (c) 2024 Ross Younger

use std::{fmt, marker::PhantomData, str::FromStr};

use serde::de::{self, Visitor};

/// Deserialization helper for types which might reasonably be expressed as an
/// integer or a string.
///
/// Strings go to T's `FromStr` impl; integers go to T's `TryFrom<u64>` impl.
/// Negative integers are rejected.
pub(crate) struct IntOrString<T>(pub(crate) PhantomData<fn() -> T>);

impl<T> IntOrString<T> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Visitor<'_> for IntOrString<T>
where
    T: TryFrom<u64> + FromStr,
    <T as FromStr>::Err: fmt::Display,
    <T as TryFrom<u64>>::Error: fmt::Display,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("int or string")
    }

    fn visit_str<E>(self, value: &str) -> Result<T, E>
    where
        E: de::Error,
    {
        T::from_str(value).map_err(de::Error::custom)
    }

    fn visit_u64<E>(self, value: u64) -> Result<T, E>
    where
        E: de::Error,
    {
        T::try_from(value).map_err(de::Error::custom)
    }

    fn visit_i64<E>(self, value: i64) -> Result<T, E>
    where
        E: de::Error,
    {
        let u = u64::try_from(value).map_err(de::Error::custom)?;
        T::try_from(u).map_err(de::Error::custom)
    }
}
