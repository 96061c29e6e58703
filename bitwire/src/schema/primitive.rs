//! Fixed-width integer codecs and byte order.
//!
//! Every supported width gets a little-endian and a big-endian encoder/decoder pair, generated
//! by [`impl_primitive`]. The schema compiler picks one pair per field when the containing
//! struct's [`Endian`] is known, so the per-call path never branches on byte order.
use {
    super::{Codec, Compiler, TypeClass, Wire},
    crate::{
        error::{ReadResult, SchemaError, SchemaErrorKind, WriteResult},
        io::{Reader, Writer},
    },
    core::{fmt, mem::size_of},
    pastey::paste,
};

/// Byte order of a struct's multi-byte fields and array elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    Big,
    #[default]
    Little,
}

/// Width and signedness of a wire integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntKind {
    pub width: usize,
    pub signed: bool,
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.signed { 'i' } else { 'u' };
        write!(f, "{prefix}{}", self.width * 8)
    }
}

pub type EncodeFn<P> = fn(&mut Writer<'_>, P) -> WriteResult<()>;
pub type DecodeFn<P> = fn(&mut Reader<'_>) -> ReadResult<P>;

/// An integer type with a direct wire representation.
///
/// Implemented for `u8 i8 u16 i16 u32 i32 u64 i64`. Enums declared with
/// [`bit_enum!`](crate::bit_enum) use one of these as their underlying representation.
pub trait Primitive: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: IntKind;

    fn encoder(endian: Endian) -> EncodeFn<Self>;

    fn decoder(endian: Endian) -> DecodeFn<Self>;
}

impl<P: Primitive> Codec<P> {
    pub(crate) fn primitive(endian: Endian) -> Self {
        let encode = P::encoder(endian);
        let decode = P::decoder(endian);
        Codec::new(
            move |writer, value: &P| encode(writer, *value),
            decode,
            |_| P::KIND.width,
        )
    }
}

/// Implement [`Primitive`] and [`Wire`] for the given integer types.
///
/// Generates `encode_<ty>_{le,be}` and `decode_<ty>_{le,be}` using the integer's
/// `to_*_bytes` / `from_*_bytes`.
macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        paste! {
            $(
                #[inline]
                fn [<encode_ $ty _le>](writer: &mut Writer<'_>, val: $ty) -> WriteResult<()> {
                    Ok(writer.write_array(val.to_le_bytes())?)
                }

                #[inline]
                fn [<encode_ $ty _be>](writer: &mut Writer<'_>, val: $ty) -> WriteResult<()> {
                    Ok(writer.write_array(val.to_be_bytes())?)
                }

                #[inline]
                fn [<decode_ $ty _le>](reader: &mut Reader<'_>) -> ReadResult<$ty> {
                    Ok(<$ty>::from_le_bytes(reader.read_array()?))
                }

                #[inline]
                fn [<decode_ $ty _be>](reader: &mut Reader<'_>) -> ReadResult<$ty> {
                    Ok(<$ty>::from_be_bytes(reader.read_array()?))
                }

                impl Primitive for $ty {
                    const KIND: IntKind = IntKind {
                        width: size_of::<$ty>(),
                        signed: <$ty>::MIN != 0,
                    };

                    fn encoder(endian: Endian) -> EncodeFn<Self> {
                        match endian {
                            Endian::Little => [<encode_ $ty _le>],
                            Endian::Big => [<encode_ $ty _be>],
                        }
                    }

                    fn decoder(endian: Endian) -> DecodeFn<Self> {
                        match endian {
                            Endian::Little => [<decode_ $ty _le>],
                            Endian::Big => [<decode_ $ty _be>],
                        }
                    }
                }

                impl Wire for $ty {
                    fn class() -> TypeClass {
                        TypeClass::Integer(<Self as Primitive>::KIND)
                    }

                    fn zero() -> Self {
                        0
                    }

                    fn codec(_cx: &mut Compiler<'_>, endian: Endian) -> Result<Codec<Self>, SchemaError> {
                        Ok(Codec::primitive(endian))
                    }
                }
            )*
        }
    };
}

impl_primitive!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Host types that exist as struct fields but have no wire layout.
///
/// They classify as [`TypeClass::Unsupported`] so the schema compiler can name them in
/// [`SchemaErrorKind::UnsupportedFieldType`].
macro_rules! impl_unsupported {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Wire for $ty {
                fn class() -> TypeClass {
                    TypeClass::Unsupported(stringify!($ty))
                }

                fn zero() -> Self {
                    <$ty>::default()
                }

                fn codec(cx: &mut Compiler<'_>, _endian: Endian) -> Result<Codec<Self>, SchemaError> {
                    Err(cx.reject(SchemaErrorKind::UnsupportedFieldType(stringify!($ty))))
                }
            }
        )*
    };
}

impl_unsupported!(bool, char, f32, f64, u128, i128, usize, isize, String);
