//! Open enums over a wire integer.
use super::{Codec, Endian, Primitive};

/// An enum carried on the wire as its underlying integer.
///
/// Enums are open: decoding never validates that the integer names a declared enumerator,
/// so the conversion from the raw value must be total. [`bit_enum!`](crate::bit_enum)
/// implements this for a newtype over the integer.
pub trait BitEnum: Copy + Send + Sync + 'static {
    type Repr: Primitive;

    fn from_raw(raw: Self::Repr) -> Self;

    fn into_raw(self) -> Self::Repr;
}

/// Codec that re-tags the underlying integer as `E`.
pub fn enum_codec<E: BitEnum>(endian: Endian) -> Codec<E> {
    let encode = E::Repr::encoder(endian);
    let decode = E::Repr::decoder(endian);
    Codec::new(
        move |writer, value: &E| encode(writer, value.into_raw()),
        move |reader| decode(reader).map(E::from_raw),
        |_| E::Repr::KIND.width,
    )
}

/// Declare an open enum with a fixed underlying integer.
///
/// Expands to a `#[repr(transparent)]` newtype with one associated constant per enumerator,
/// so any raw value is representable and named values still read like enum variants.
///
/// ```
/// bitwire::bit_enum! {
///     pub enum Opcode: u16 {
///         Nop = 0,
///         Load = 1,
///         Store = 2,
///     }
/// }
///
/// assert_eq!(Opcode::Load.raw(), 1);
/// assert_eq!(Opcode::default(), Opcode::Nop);
/// assert_eq!(format!("{:?}", Opcode::Store), "Opcode::Store");
/// assert_eq!(format!("{:?}", Opcode(9)), "Opcode(9)");
/// ```
#[macro_export]
macro_rules! bit_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        #[repr(transparent)]
        $vis struct $name(pub $repr);

        #[allow(non_upper_case_globals, dead_code)]
        impl $name {
            $(
                $(#[$variant_meta])*
                pub const $variant: Self = Self($value);
            )*

            pub const fn raw(self) -> $repr {
                self.0
            }

            /// Name of the enumerator holding this value, if any.
            pub fn name(self) -> ::core::option::Option<&'static str> {
                $(
                    if self.0 == $value {
                        return ::core::option::Option::Some(stringify!($variant));
                    }
                )*
                ::core::option::Option::None
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self.name() {
                    ::core::option::Option::Some(variant) => {
                        write!(f, "{}::{}", stringify!($name), variant)
                    }
                    ::core::option::Option::None => write!(f, "{}({:?})", stringify!($name), self.0),
                }
            }
        }

        impl $crate::BitEnum for $name {
            type Repr = $repr;

            fn from_raw(raw: $repr) -> Self {
                Self(raw)
            }

            fn into_raw(self) -> $repr {
                self.0
            }
        }

        impl $crate::Wire for $name {
            fn class() -> $crate::TypeClass {
                $crate::TypeClass::Enum {
                    name: stringify!($name),
                    repr: <$repr as $crate::Primitive>::KIND,
                }
            }

            fn zero() -> Self {
                <Self as ::core::default::Default>::default()
            }

            fn codec(
                _cx: &mut $crate::Compiler<'_>,
                endian: $crate::Endian,
            ) -> ::core::result::Result<$crate::Codec<Self>, $crate::SchemaError> {
                ::core::result::Result::Ok($crate::enum_codec::<Self>(endian))
            }
        }
    };
}
