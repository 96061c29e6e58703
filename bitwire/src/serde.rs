use crate::{
    error::{Error, Result},
    schema::{schema, BitStruct},
};

/// Serialization helpers available on every [`BitStruct`].
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "derive")] {
/// use bitwire::{BitStruct, Serialize};
///
/// #[derive(BitStruct, Default)]
/// #[bitwire(endian = "big")]
/// struct Version {
///     major: u16,
///     minor: u16,
/// }
///
/// let version = Version { major: 1, minor: 2 };
/// assert_eq!(version.calculate_size().unwrap(), 4);
/// assert_eq!(version.serialize().unwrap(), [0, 1, 0, 2]);
///
/// let mut buf = [0u8; 8];
/// assert_eq!(version.serialize_into(&mut buf).unwrap(), 4);
/// # }
/// ```
pub trait Serialize: BitStruct {
    /// Serialize into a new `Vec` sized with [`calculate_size`](Self::calculate_size).
    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(schema::<Self>()?.serialize(self)?)
    }

    /// Serialize into the front of `buf`, returning the number of bytes written.
    fn serialize_into(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(schema::<Self>()?.serialize_into(buf, self)?)
    }

    /// Encoded length of `self`.
    fn calculate_size(&self) -> Result<usize> {
        Ok(schema::<Self>()?.calculate_size(self))
    }
}

impl<T> Serialize for T where T: BitStruct {}

/// Deserialization helpers available on every [`BitStruct`].
///
/// ```
/// # #[cfg(feature = "derive")] {
/// use bitwire::{BitStruct, Deserialize};
///
/// #[derive(BitStruct, Default, Debug, PartialEq)]
/// struct Sample {
///     channel: u8,
///     #[bitwire(end_fill)]
///     values: Vec<i16>,
/// }
///
/// let (sample, read) = Sample::deserialize(&[3, 1, 0, 0xFF, 0xFF]).unwrap();
/// assert_eq!(sample, Sample { channel: 3, values: vec![1, -1] });
/// assert_eq!(read, 5);
/// # }
/// ```
pub trait Deserialize: BitStruct {
    /// Deserialize from the front of `bytes`, returning the value and the bytes consumed.
    fn deserialize(bytes: &[u8]) -> Result<(Self, usize)> {
        Ok(schema::<Self>()?.deserialize(bytes)?)
    }

    /// Deserialize a value that must span all of `bytes`.
    fn deserialize_exact(bytes: &[u8]) -> Result<Self> {
        Ok(schema::<Self>()?.deserialize_exact(bytes)?)
    }
}

impl<T> Deserialize for T where T: BitStruct {}

/// Serialize `value` into a new `Vec`.
///
/// Compiles the schema of `T` on first use.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "derive")] {
/// #[derive(bitwire::BitStruct, Default)]
/// struct Pair {
///     #[bitwire(fixed = 4)]
///     bytes: Vec<u8>,
///     tail: u16,
/// }
///
/// let pair = Pair { bytes: vec![1, 2], tail: 0x0304 };
/// assert_eq!(bitwire::serialize(&pair).unwrap(), [1, 2, 0, 0, 4, 3]);
/// # }
/// ```
pub fn serialize<T: BitStruct>(value: &T) -> Result<Vec<u8>> {
    value.serialize()
}

/// Serialize `value` into the front of `buf`, returning the number of bytes written.
///
/// On failure the bytes of the fields before the failing one have already been written.
pub fn serialize_into<T: BitStruct>(buf: &mut [u8], value: &T) -> Result<usize> {
    value.serialize_into(buf)
}

/// Deserialize a `T` from the front of `bytes`, returning it with the number of bytes consumed.
pub fn deserialize<T: BitStruct>(bytes: &[u8]) -> Result<(T, usize)> {
    T::deserialize(bytes)
}

/// Deserialize a `T` that must span all of `bytes`.
pub fn deserialize_exact<T: BitStruct>(bytes: &[u8]) -> Result<T> {
    T::deserialize_exact(bytes)
}

/// Encoded length of `value`.
pub fn calculate_size<T: BitStruct>(value: &T) -> Result<usize> {
    value.calculate_size()
}

/// Encoded length shared by every `T`, if it does not depend on the instance.
pub fn wire_size<T: BitStruct>() -> Result<Option<usize>> {
    schema::<T>().map(|schema| schema.wire_size()).map_err(Error::from)
}
