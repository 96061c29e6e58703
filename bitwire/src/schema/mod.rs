//! Schema traits, type classification and the traversal engine.
//!
//! A record type describes its fields once through [`BitStruct::describe`]. The first time the
//! type is used, the schema compiler turns that description into a [`Schema`]: an ordered
//! playbook of per-field encode, decode and size operations plus the type's [`SizeClass`].
//! Every later call replays the same playbook.
//!
//! # Example
//!
//! ```
//! use bitwire::{ArrayPolicy, BitStruct, Endian, StructBuilder, impl_wire_struct};
//!
//! #[derive(Default, Debug, PartialEq)]
//! struct Frame {
//!     id: u16,
//!     payload: Vec<u8>,
//! }
//!
//! impl BitStruct for Frame {
//!     const ENDIAN: Endian = Endian::Big;
//!
//!     fn describe(fields: &mut StructBuilder<Self>) {
//!         fields
//!             .field("id", |f| &f.id, |f| &mut f.id)
//!             .array("payload", ArrayPolicy::EndFill, |f| &f.payload, |f| &mut f.payload);
//!     }
//! }
//! impl_wire_struct!(Frame);
//!
//! let frame = Frame { id: 0x0102, payload: vec![9, 8] };
//! let bytes = bitwire::serialize(&frame).unwrap();
//! assert_eq!(bytes, [1, 2, 9, 8]);
//! assert_eq!(bitwire::deserialize::<Frame>(&bytes).unwrap(), (frame, 4));
//! ```
use {
    crate::{
        error::{trailing_bytes, ReadResult, SchemaError, SchemaErrorKind, WriteResult},
        io::{write_buffer_too_small, Reader, Writer},
    },
    core::{any::TypeId, fmt},
};

mod array;
mod compile;
mod enums;
mod infer;
mod primitive;

pub use {
    compile::{schema, Compiler},
    enums::{enum_codec, BitEnum},
    primitive::{DecodeFn, EncodeFn, Endian, IntKind, Primitive},
};

/// A record type with a declared wire layout.
///
/// Usually implemented with `#[derive(BitStruct)]`. A manual implementation lists the fields
/// in wire order and pairs with [`impl_wire_struct!`](crate::impl_wire_struct) so the type
/// can itself be used as a field.
pub trait BitStruct: Default + Send + Sync + 'static {
    /// Byte order of every multi-byte field and array element of this struct.
    ///
    /// Nested structs use their own setting.
    const ENDIAN: Endian = Endian::Little;

    fn describe(fields: &mut StructBuilder<Self>);
}

/// Per-type hook the schema compiler uses to classify a field and obtain its codec.
///
/// Implemented for the wire integers, for `Vec<E>`, for enums declared with
/// [`bit_enum!`](crate::bit_enum) and for [`BitStruct`] types. A handful of host types
/// (`bool`, `f32`, `usize`, ...) implement it only to be rejected with a precise error.
pub trait Wire: Sized + Send + Sync + 'static {
    fn class() -> TypeClass;

    /// The value written for each backfilled slot of a [`ArrayPolicy::Fixed`] array.
    fn zero() -> Self;

    fn codec(cx: &mut Compiler<'_>, endian: Endian) -> Result<Codec<Self>, SchemaError>;
}

impl<E: Wire> Wire for Vec<E> {
    fn class() -> TypeClass {
        TypeClass::Array(Box::new(E::class()))
    }

    fn zero() -> Self {
        Vec::new()
    }

    fn codec(cx: &mut Compiler<'_>, _endian: Endian) -> Result<Codec<Self>, SchemaError> {
        Err(cx.reject(SchemaErrorKind::MissingArrayPolicy))
    }
}

/// Classification of a field's declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeClass {
    Integer(IntKind),
    Enum { name: &'static str, repr: IntKind },
    Struct(StructRef),
    Array(Box<TypeClass>),
    Unsupported(&'static str),
}

/// Identity of a nested struct type.
#[derive(Debug, Clone, Copy)]
pub struct StructRef {
    pub id: TypeId,
    pub name: &'static str,
}

impl StructRef {
    pub fn of<S: BitStruct>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: short_type_name::<S>(),
        }
    }
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StructRef {}

/// Element count policy of an array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayPolicy {
    /// Exactly `n` elements on the wire. Short arrays are backfilled with zero elements,
    /// longer ones are rejected.
    Fixed(usize),
    /// Elements until the input is exhausted. Must be the last field of its struct.
    EndFill,
}

/// Whether a type's encoded length is known without an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Const(usize),
    Dynamic,
}

impl SizeClass {
    pub const fn constant(self) -> Option<usize> {
        match self {
            SizeClass::Const(n) => Some(n),
            SizeClass::Dynamic => None,
        }
    }
}

/// A field as recorded in a compiled playbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Position in declaration order, which is also wire order.
    pub index: usize,
    pub class: TypeClass,
    pub policy: Option<ArrayPolicy>,
}

type EncodeOp<V> = Box<dyn Fn(&mut Writer<'_>, &V) -> WriteResult<()> + Send + Sync>;
type DecodeOp<V> = Box<dyn Fn(&mut Reader<'_>) -> ReadResult<V> + Send + Sync>;
type SizeOp<V> = Box<dyn Fn(&V) -> usize + Send + Sync>;

/// Encode, decode and size operations for one value type, bound to a byte order.
pub struct Codec<V> {
    encode: EncodeOp<V>,
    decode: DecodeOp<V>,
    size: SizeOp<V>,
}

impl<V: 'static> Codec<V> {
    pub(crate) fn new(
        encode: impl Fn(&mut Writer<'_>, &V) -> WriteResult<()> + Send + Sync + 'static,
        decode: impl Fn(&mut Reader<'_>) -> ReadResult<V> + Send + Sync + 'static,
        size: impl Fn(&V) -> usize + Send + Sync + 'static,
    ) -> Self {
        Self {
            encode: Box::new(encode),
            decode: Box::new(decode),
            size: Box::new(size),
        }
    }

    #[inline]
    pub fn encode(&self, writer: &mut Writer<'_>, value: &V) -> WriteResult<()> {
        (self.encode)(writer, value)
    }

    #[inline]
    pub fn decode(&self, reader: &mut Reader<'_>) -> ReadResult<V> {
        (self.decode)(reader)
    }

    #[inline]
    pub fn size(&self, value: &V) -> usize {
        (self.size)(value)
    }

    /// Lift the codec onto a field of `T` reached through the given accessors.
    fn project<T: 'static>(self, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> FieldOps<T> {
        let Codec {
            encode,
            decode,
            size,
        } = self;
        FieldOps {
            encode: Box::new(move |writer: &mut Writer<'_>, record: &T| {
                encode(writer, get(record))
            }),
            decode: Box::new(move |reader: &mut Reader<'_>, record: &mut T| {
                *get_mut(record) = decode(reader)?;
                Ok(())
            }),
            size: Box::new(move |record: &T| size(get(record))),
        }
    }
}

pub(crate) struct FieldOps<T> {
    encode: EncodeOp<T>,
    decode: Box<dyn Fn(&mut Reader<'_>, &mut T) -> ReadResult<()> + Send + Sync>,
    size: SizeOp<T>,
}

type Bind<T> = Box<dyn FnOnce(&mut Compiler<'_>, Endian) -> Result<FieldOps<T>, SchemaError>>;

pub(crate) struct FieldDecl<T> {
    pub(crate) name: &'static str,
    pub(crate) class: TypeClass,
    pub(crate) policy: Option<ArrayPolicy>,
    pub(crate) bind: Bind<T>,
}

/// Collects a struct's fields in wire order.
pub struct StructBuilder<T> {
    decls: Vec<FieldDecl<T>>,
}

impl<T: BitStruct> StructBuilder<T> {
    pub(crate) fn new() -> Self {
        Self { decls: Vec::new() }
    }

    /// Declare an integer, enum or nested struct field.
    pub fn field<F: Wire>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &F,
        get_mut: fn(&mut T) -> &mut F,
    ) -> &mut Self {
        self.decls.push(FieldDecl {
            name,
            class: F::class(),
            policy: None,
            bind: Box::new(move |cx: &mut Compiler<'_>, endian: Endian| {
                Ok(F::codec(cx, endian)?.project(get, get_mut))
            }),
        });
        self
    }

    /// Declare an array field with its element count policy.
    pub fn array<E: Wire>(
        &mut self,
        name: &'static str,
        policy: ArrayPolicy,
        get: fn(&T) -> &Vec<E>,
        get_mut: fn(&mut T) -> &mut Vec<E>,
    ) -> &mut Self {
        self.decls.push(FieldDecl {
            name,
            class: <Vec<E>>::class(),
            policy: Some(policy),
            bind: Box::new(move |cx: &mut Compiler<'_>, endian: Endian| {
                let element = E::codec(cx, endian)?;
                Ok(array::codec(element, policy).project(get, get_mut))
            }),
        });
        self
    }

    pub(crate) fn into_decls(self) -> Vec<FieldDecl<T>> {
        self.decls
    }
}

struct Play<T> {
    desc: FieldDescriptor,
    ops: FieldOps<T>,
    /// The field's contribution when it does not depend on the instance.
    constant: Option<usize>,
}

/// The compiled playbook of a [`BitStruct`] type.
///
/// Obtained from [`schema`]. Compiled once per type and shared for the life of the process.
pub struct Schema<T> {
    name: &'static str,
    endian: Endian,
    plays: Vec<Play<T>>,
    size: SizeClass,
}

impl<T: BitStruct> Schema<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn size_class(&self) -> SizeClass {
        self.size
    }

    /// Encoded length of every value of `T`, if it does not depend on the instance.
    pub fn wire_size(&self) -> Option<usize> {
        self.size.constant()
    }

    /// Fields in wire order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = &FieldDescriptor> + '_ {
        self.plays.iter().map(|play| &play.desc)
    }

    /// Encoded length of `value`.
    pub fn calculate_size(&self, value: &T) -> usize {
        match self.size {
            SizeClass::Const(n) => n,
            SizeClass::Dynamic => array::saturating_sum(
                self.plays
                    .iter()
                    .map(|play| play.constant.unwrap_or_else(|| (play.ops.size)(value))),
            ),
        }
    }

    /// Encoded length of `value` computed field by field, even when the struct's size is
    /// constant. Always equal to [`calculate_size`](Self::calculate_size).
    pub fn walk_size(&self, value: &T) -> usize {
        array::saturating_sum(self.plays.iter().map(|play| (play.ops.size)(value)))
    }

    /// Write `value` at the writer's position, field by field.
    ///
    /// On failure, the fields before the failing one stay written.
    pub fn encode(&self, writer: &mut Writer<'_>, value: &T) -> WriteResult<()> {
        for play in &self.plays {
            (play.ops.encode)(writer, value).map_err(|err| err.in_field(self.name, play.desc.name))?;
        }
        Ok(())
    }

    /// Read a fresh `T` from the reader's position, field by field.
    pub fn decode(&self, reader: &mut Reader<'_>) -> ReadResult<T> {
        let mut value = T::default();
        for play in &self.plays {
            (play.ops.decode)(reader, &mut value)
                .map_err(|err| err.in_field(self.name, play.desc.name))?;
        }
        Ok(value)
    }

    /// Serialize into `buf`, returning the number of bytes written.
    pub fn serialize_into(&self, buf: &mut [u8], value: &T) -> WriteResult<usize> {
        let mut writer = Writer::new(buf);
        self.encode(&mut writer, value)?;
        Ok(writer.position())
    }

    pub fn serialize(&self, value: &T) -> WriteResult<Vec<u8>> {
        let size = self.calculate_size(value);
        let mut buf = Vec::new();
        if buf.try_reserve_exact(size).is_err() {
            return Err(write_buffer_too_small(size, 0).into());
        }
        buf.resize(size, 0);
        let written = self.serialize_into(&mut buf, value)?;
        buf.truncate(written);
        Ok(buf)
    }

    /// Deserialize from the front of `bytes`, returning the value and the number of bytes
    /// consumed.
    pub fn deserialize(&self, bytes: &[u8]) -> ReadResult<(T, usize)> {
        let mut reader = Reader::new(bytes);
        let value = self.decode(&mut reader)?;
        Ok((value, reader.position()))
    }

    /// Deserialize a value that must span all of `bytes`.
    pub fn deserialize_exact(&self, bytes: &[u8]) -> ReadResult<T> {
        let mut reader = Reader::new(bytes);
        let value = self.decode(&mut reader)?;
        if !reader.is_empty() {
            return Err(trailing_bytes(reader.remaining()));
        }
        Ok(value)
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("endian", &self.endian)
            .field("size", &self.size)
            .field(
                "fields",
                &self.plays.iter().map(|play| play.desc.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Type name without its module path, e.g. `Header` for `my_crate::proto::Header`.
///
/// Generic names are returned unchanged.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = core::any::type_name::<T>();
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

/// Implement [`Wire`] for [`BitStruct`] types so they can be nested in other structs.
///
/// `#[derive(BitStruct)]` does this automatically.
#[macro_export]
macro_rules! impl_wire_struct {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Wire for $ty {
                fn class() -> $crate::TypeClass {
                    $crate::TypeClass::Struct($crate::StructRef::of::<Self>())
                }

                fn zero() -> Self {
                    <Self as ::core::default::Default>::default()
                }

                fn codec(
                    cx: &mut $crate::Compiler<'_>,
                    _endian: $crate::Endian,
                ) -> ::core::result::Result<$crate::Codec<Self>, $crate::SchemaError> {
                    cx.nested::<Self>()
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            bit_enum,
            error::{ReadError, WriteError},
            io,
            proptest_config::proptest_cfg,
        },
        proptest::prelude::*,
    };

    bit_enum! {
        enum Mode: u8 {
            Idle = 0,
            Run = 1,
            Halt = 2,
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Header {
        kind: u16,
        flags: u16,
    }

    impl BitStruct for Header {
        fn describe(fields: &mut StructBuilder<Self>) {
            fields
                .field("kind", |s| &s.kind, |s| &mut s.kind)
                .field("flags", |s| &s.flags, |s| &mut s.flags);
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Record {
        header: Header,
        mode: Mode,
        value: i32,
        tags: Vec<u8>,
        samples: Vec<u16>,
    }

    impl BitStruct for Record {
        const ENDIAN: Endian = Endian::Big;

        fn describe(fields: &mut StructBuilder<Self>) {
            fields
                .field("header", |s| &s.header, |s| &mut s.header)
                .field("mode", |s| &s.mode, |s| &mut s.mode)
                .field("value", |s| &s.value, |s| &mut s.value)
                .array("tags", ArrayPolicy::Fixed(3), |s| &s.tags, |s| &mut s.tags)
                .array(
                    "samples",
                    ArrayPolicy::EndFill,
                    |s| &s.samples,
                    |s| &mut s.samples,
                );
        }
    }

    /// Never settles on a constant size, since the empty array refers back to the struct.
    #[derive(Debug, Default, Clone, PartialEq)]
    struct Knot {
        id: u64,
        loops: Vec<Knot>,
    }

    impl BitStruct for Knot {
        fn describe(fields: &mut StructBuilder<Self>) {
            fields
                .field("id", |s| &s.id, |s| &mut s.id)
                .array("loops", ArrayPolicy::Fixed(0), |s| &s.loops, |s| &mut s.loops);
        }
    }

    #[derive(Debug, Default)]
    struct Knots {
        knots: Vec<Knot>,
    }

    impl BitStruct for Knots {
        fn describe(fields: &mut StructBuilder<Self>) {
            fields.array(
                "knots",
                ArrayPolicy::Fixed(usize::MAX),
                |s| &s.knots,
                |s| &mut s.knots,
            );
        }
    }

    impl_wire_struct!(Header, Record, Knot);

    fn backfilled(mut record: Record) -> Record {
        record.tags.resize(3, 0);
        record
    }

    #[test]
    fn unbounded_size_saturates() {
        let knots = schema::<Knots>().unwrap();
        assert_eq!(schema::<Knot>().unwrap().size_class(), SizeClass::Dynamic);
        assert_eq!(knots.size_class(), SizeClass::Dynamic);

        let value = Knots::default();
        assert_eq!(knots.calculate_size(&value), usize::MAX);
        assert_eq!(knots.walk_size(&value), usize::MAX);
        let err = knots.serialize(&value).unwrap_err();
        assert_eq!(
            err.kind(),
            &WriteError::Io(io::WriteError::BufferTooSmall {
                needed: usize::MAX,
                remaining: 0
            })
        );
    }

    #[test]
    fn playbook_follows_declaration_order() {
        let schema = schema::<Record>().unwrap();
        let names: Vec<_> = schema.fields().map(|field| field.name).collect();
        assert_eq!(names, ["header", "mode", "value", "tags", "samples"]);
        let indices: Vec<_> = schema.fields().map(|field| field.index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
        assert_eq!(schema.name(), "Record");
        assert_eq!(schema.endian(), Endian::Big);
    }

    #[test]
    fn field_classes() {
        let schema = schema::<Record>().unwrap();
        let classes: Vec<_> = schema.fields().map(|field| field.class.clone()).collect();
        assert_eq!(
            classes,
            [
                TypeClass::Struct(StructRef::of::<Header>()),
                TypeClass::Enum {
                    name: "Mode",
                    repr: u8::KIND
                },
                TypeClass::Integer(i32::KIND),
                TypeClass::Array(Box::new(TypeClass::Integer(u8::KIND))),
                TypeClass::Array(Box::new(TypeClass::Integer(u16::KIND))),
            ]
        );
    }

    #[test]
    fn nested_struct_keeps_its_own_byte_order() {
        let record = Record {
            header: Header {
                kind: 0x0102,
                flags: 0x0304,
            },
            mode: Mode::Halt,
            value: 0x0506_0708,
            tags: vec![9],
            samples: vec![0x0A0B],
        };
        let bytes = schema::<Record>().unwrap().serialize(&record).unwrap();
        assert_eq!(
            bytes,
            [2, 1, 4, 3, 2, 5, 6, 7, 8, 9, 0, 0, 0x0A, 0x0B],
        );
    }

    #[test]
    fn size_classes() {
        assert_eq!(schema::<Header>().unwrap().size_class(), SizeClass::Const(4));
        assert_eq!(schema::<Header>().unwrap().wire_size(), Some(4));
        assert_eq!(schema::<Record>().unwrap().size_class(), SizeClass::Dynamic);
        assert_eq!(schema::<Record>().unwrap().wire_size(), None);
    }

    #[test]
    fn decode_failure_names_innermost_field() {
        let err = schema::<Record>()
            .unwrap()
            .deserialize(&[1, 0, 2])
            .unwrap_err();
        assert_eq!(err.location(), Some(("Header", "flags")));
        assert!(err.is_buffer_too_small());
    }

    #[test]
    fn trailing_bytes_rejected_by_exact() {
        let schema = schema::<Header>().unwrap();
        assert_eq!(
            schema.deserialize_exact(&[1, 0, 2, 0, 7]),
            Err(ReadError::TrailingBytes { remaining: 1 })
        );
        assert_eq!(
            schema.deserialize_exact(&[1, 0, 2, 0]).unwrap(),
            Header { kind: 1, flags: 2 }
        );
    }

    #[test]
    fn unknown_enum_value_survives() {
        let mut bytes = vec![0u8; 4];
        bytes.extend([7, 0, 0, 0, 0, 0, 0, 0]);
        let (record, read) = schema::<Record>().unwrap().deserialize(&bytes).unwrap();
        assert_eq!(read, bytes.len());
        assert_eq!(record.mode, Mode(7));
        assert_eq!(record.mode.name(), None);
    }

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name::<Header>(), "Header");
        assert_eq!(short_type_name::<u8>(), "u8");
        assert!(short_type_name::<Vec<Header>>().starts_with("alloc::vec::Vec<"));
    }

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            any::<(u16, u16)>(),
            any::<u8>(),
            any::<i32>(),
            proptest::collection::vec(any::<u8>(), 0..=3),
            proptest::collection::vec(any::<u16>(), 0..16),
        )
            .prop_map(|((kind, flags), mode, value, tags, samples)| Record {
                header: Header { kind, flags },
                mode: Mode(mode),
                value,
                tags,
                samples,
            })
    }

    proptest! {
        #![proptest_config(proptest_cfg())]

        #[test]
        fn record_round_trip(record in arb_record()) {
            let schema = schema::<Record>().unwrap();
            let bytes = schema.serialize(&record).unwrap();
            prop_assert_eq!(bytes.len(), schema.calculate_size(&record));
            prop_assert_eq!(schema.calculate_size(&record), schema.walk_size(&record));
            let (decoded, read) = schema.deserialize(&bytes).unwrap();
            prop_assert_eq!(read, bytes.len());
            prop_assert_eq!(decoded, backfilled(record));
        }

        #[test]
        fn constant_shortcut_matches_walk(kind: u16, flags: u16) {
            let schema = schema::<Header>().unwrap();
            let header = Header { kind, flags };
            prop_assert_eq!(schema.calculate_size(&header), 4);
            prop_assert_eq!(schema.walk_size(&header), 4);
        }

        #[test]
        fn short_buffer_keeps_prefix(record in arb_record(), cut in 0usize..8) {
            let schema = schema::<Record>().unwrap();
            let full = schema.serialize(&record).unwrap();
            let len = full.len().saturating_sub(cut + 1);
            let mut buf = vec![0xEEu8; len];
            let err = schema.serialize_into(&mut buf, &record).unwrap_err();
            prop_assert!(matches!(err.kind(), crate::WriteError::Io(_)));
            // Whole fields written before the failure match the full encoding.
            let mut prefix = 0;
            let widths = [4usize, 1, 4, 3];
            for width in widths {
                if prefix + width > len {
                    break;
                }
                prefix += width;
            }
            prop_assert_eq!(&buf[..prefix], &full[..prefix]);
        }
    }
}
