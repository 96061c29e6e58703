//! Schema compilation and the process-wide schema registry.
//!
//! A type is compiled the first time [`schema`] is asked for it. Compilation runs as a
//! session under a single registry-wide mutex: the root type and every struct reachable from
//! it that is not yet published are compiled, size inference runs over the whole set, and the
//! results are published together. Nested struct fields hold a schema handle that is filled at
//! publication, which lets recursive type graphs compile without re-entering the registry.
//!
//! Alongside its size class, each published struct records whether it is open-ended, that is,
//! whether its encoding runs to the end of the input. Later sessions need both to validate
//! structs that contain it.
//!
//! Failures are permanent. A failed session publishes no schema, but records the error for the
//! failing type and for every type whose compilation depended on it.
use {
    super::{
        infer::{self, Node},
        ArrayPolicy, BitStruct, Codec, FieldDescriptor, FieldOps, Play, Schema, SizeClass,
        StructBuilder, TypeClass,
    },
    crate::error::{schema_error, SchemaError, SchemaErrorKind},
    parking_lot::{Mutex, RwLock},
    std::{
        any::{Any, TypeId},
        collections::{HashMap, HashSet},
        sync::{Arc, LazyLock, OnceLock},
    },
    tracing::{debug, trace, warn},
};

type Erased = Arc<dyn Any + Send + Sync>;

/// A published schema with its layout facts.
struct Found<S> {
    schema: Arc<Schema<S>>,
    size: SizeClass,
    open_ended: bool,
}

enum Published {
    Ready {
        schema: Erased,
        size: SizeClass,
        open_ended: bool,
    },
    Failed(SchemaError),
}

#[derive(Default)]
struct Registry {
    published: RwLock<HashMap<TypeId, Published>>,
    /// Held for the duration of a compile session.
    session: Mutex<()>,
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::default);

impl Registry {
    fn lookup<S: BitStruct>(&self) -> Option<Result<Found<S>, SchemaError>> {
        let published = self.published.read();
        match published.get(&TypeId::of::<S>())? {
            Published::Ready {
                schema,
                size,
                open_ended,
            } => {
                let schema = schema.clone().downcast::<Schema<S>>().ok()?;
                Some(Ok(Found {
                    schema,
                    size: *size,
                    open_ended: *open_ended,
                }))
            }
            Published::Failed(err) => Some(Err(err.clone())),
        }
    }

    fn publish(&self, entries: Vec<(TypeId, Published)>) {
        let mut published = self.published.write();
        for (id, entry) in entries {
            published.entry(id).or_insert(entry);
        }
    }
}

/// The compiled schema of `T`, compiling it on first use.
///
/// Compilation happens once per type for the life of the process. Both the schema and any
/// compilation error are cached, so later calls return the same result.
pub fn schema<T: BitStruct>() -> Result<Arc<Schema<T>>, SchemaError> {
    let registry = &*REGISTRY;
    if let Some(found) = registry.lookup::<T>() {
        return found.map(|found| found.schema);
    }

    let _session = registry.session.lock();
    // Another thread may have finished the same type while we waited.
    if let Some(found) = registry.lookup::<T>() {
        return found.map(|found| found.schema);
    }

    let mut cx = Compiler::new(registry);
    let root = cx.require::<T>();
    let outcome = root.and_then(|root| cx.settle().map(|()| root));
    match outcome {
        Ok(root) => Ok(root.shared()),
        Err(err) => {
            warn!(
                root = cx.root_name,
                type_name = err.type_name,
                field = err.field,
                error = %err.kind,
                "schema compilation failed"
            );
            registry.publish(
                cx.failed
                    .into_iter()
                    .map(|(id, err)| (id, Published::Failed(err)))
                    .collect(),
            );
            Err(err)
        }
    }
}

/// Handle to a schema compiled in the current session, usable once the session publishes.
pub(crate) struct SchemaRef<S>(Arc<OnceLock<Arc<Schema<S>>>>);

impl<S> Clone for SchemaRef<S> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<S: BitStruct> SchemaRef<S> {
    fn get(&self) -> &Schema<S> {
        match self.0.get() {
            Some(schema) => schema,
            None => unreachable!("nested schema used before its session was published"),
        }
    }

    fn shared(&self) -> Arc<Schema<S>> {
        match self.0.get() {
            Some(schema) => schema.clone(),
            None => unreachable!("schema returned before its session was published"),
        }
    }
}

/// Compiled but not yet published schema of one type.
trait Pending {
    fn publish(
        self: Box<Self>,
        sizes: &HashMap<TypeId, SizeClass>,
        open: &HashSet<TypeId>,
    ) -> (TypeId, Published);
}

struct PendingSchema<S> {
    name: &'static str,
    slot: Arc<OnceLock<Arc<Schema<S>>>>,
    fields: Vec<(FieldDescriptor, FieldOps<S>)>,
}

impl<S: BitStruct> Pending for PendingSchema<S> {
    fn publish(
        self: Box<Self>,
        sizes: &HashMap<TypeId, SizeClass>,
        open: &HashSet<TypeId>,
    ) -> (TypeId, Published) {
        let id = TypeId::of::<S>();
        let open_ended = open.contains(&id);
        let size = sizes.get(&id).copied().unwrap_or(SizeClass::Dynamic);
        let plays = self
            .fields
            .into_iter()
            .map(|(desc, ops)| Play {
                constant: infer::field_size(&desc.class, desc.policy, sizes).constant(),
                desc,
                ops,
            })
            .collect();
        let schema = Arc::new(Schema {
            name: self.name,
            endian: S::ENDIAN,
            plays,
            size,
        });
        // The slot is only ever filled here, once per session.
        let _ = self.slot.set(schema.clone());
        trace!(type_name = self.name, ?size, open_ended, "published schema");
        (
            id,
            Published::Ready {
                schema,
                size,
                open_ended,
            },
        )
    }
}

/// A schema compile session.
///
/// Passed to [`Wire::codec`](super::Wire::codec) so that nested struct fields can request
/// their own schema and so that rejected field types can report where they were declared.
pub struct Compiler<'r> {
    registry: &'r Registry,
    root_name: &'static str,
    /// Every struct requested in this session, published or not.
    slots: HashMap<TypeId, Erased>,
    /// Size classes of already published structs this session refers to.
    sizes: HashMap<TypeId, SizeClass>,
    /// Already published open-ended structs this session refers to.
    open: HashSet<TypeId>,
    nodes: Vec<Node>,
    pending: Vec<Box<dyn Pending>>,
    failed: Vec<(TypeId, SchemaError)>,
    /// Type and field currently being compiled.
    at: (&'static str, &'static str),
}

impl<'r> Compiler<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            root_name: "",
            slots: HashMap::new(),
            sizes: HashMap::new(),
            open: HashSet::new(),
            nodes: Vec::new(),
            pending: Vec::new(),
            failed: Vec::new(),
            at: ("", ""),
        }
    }

    /// Build a [`SchemaError`] for the field currently being compiled.
    pub fn reject(&self, kind: SchemaErrorKind) -> SchemaError {
        let (type_name, field) = self.at;
        schema_error(type_name, field, kind)
    }

    /// Codec for a field whose type is the [`BitStruct`] `S`.
    pub fn nested<S: BitStruct>(&mut self) -> Result<Codec<S>, SchemaError> {
        let sub = self.require::<S>()?;
        let (enc, dec, size) = (sub.clone(), sub.clone(), sub);
        Ok(Codec::new(
            move |writer, value: &S| enc.get().encode(writer, value),
            move |reader| dec.get().decode(reader),
            move |value: &S| size.get().calculate_size(value),
        ))
    }

    fn require<S: BitStruct>(&mut self) -> Result<SchemaRef<S>, SchemaError> {
        let id = TypeId::of::<S>();
        if let Some(slot) = self.slots.get(&id) {
            if let Ok(slot) = slot.clone().downcast::<OnceLock<Arc<Schema<S>>>>() {
                return Ok(SchemaRef(slot));
            }
        }
        if let Some(found) = self.registry.lookup::<S>() {
            let found = found?;
            self.sizes.insert(id, found.size);
            if found.open_ended {
                self.open.insert(id);
            }
            let slot = Arc::new(OnceLock::from(found.schema));
            self.slots.insert(id, slot.clone());
            return Ok(SchemaRef(slot));
        }

        let slot = Arc::new(OnceLock::new());
        self.slots.insert(id, slot.clone());
        let outer = self.at;
        let built = self.build::<S>(slot.clone());
        self.at = outer;
        match built {
            Ok(()) => Ok(SchemaRef(slot)),
            Err(err) => {
                self.failed.push((id, err.clone()));
                Err(err)
            }
        }
    }

    fn build<S: BitStruct>(
        &mut self,
        slot: Arc<OnceLock<Arc<Schema<S>>>>,
    ) -> Result<(), SchemaError> {
        let name = super::short_type_name::<S>();
        if self.root_name.is_empty() {
            self.root_name = name;
        }
        let mut builder = StructBuilder::<S>::new();
        S::describe(&mut builder);

        let decls = builder.into_decls();
        let mut fields = Vec::with_capacity(decls.len());
        let mut shapes = Vec::with_capacity(decls.len());
        let mut after_end_fill = false;
        for (index, decl) in decls.into_iter().enumerate() {
            self.at = (name, decl.name);
            check_field(&decl.class, decl.policy, after_end_fill).map_err(|kind| self.reject(kind))?;
            after_end_fill |= decl.policy == Some(ArrayPolicy::EndFill);

            let ops = (decl.bind)(self, S::ENDIAN)?;
            let desc = FieldDescriptor {
                name: decl.name,
                index,
                class: decl.class,
                policy: decl.policy,
            };
            shapes.push(desc.clone());
            fields.push((desc, ops));
        }

        debug!(
            type_name = name,
            fields = fields.len(),
            endian = ?S::ENDIAN,
            "compiled struct schema"
        );
        self.nodes.push(Node {
            id: TypeId::of::<S>(),
            name,
            fields: shapes,
        });
        self.pending.push(Box::new(PendingSchema { name, slot, fields }));
        Ok(())
    }

    /// Infer sizes, validate the compiled set and publish it.
    fn settle(&mut self) -> Result<(), SchemaError> {
        let mut sizes = std::mem::take(&mut self.sizes);
        infer::infer(&self.nodes, &mut sizes);
        let mut open = std::mem::take(&mut self.open);
        infer::open_ended(&self.nodes, &mut open);
        if let Err((id, err)) = infer::validate(&self.nodes, &sizes, &open) {
            for dependent in infer::dependents(&self.nodes, id) {
                self.failed.push((dependent, err.clone()));
            }
            return Err(err);
        }

        let entries = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|pending| pending.publish(&sizes, &open))
            .collect();
        self.registry.publish(entries);
        Ok(())
    }
}

/// Reject field shapes that have no wire layout, before any codec is built.
fn check_field(
    class: &TypeClass,
    policy: Option<ArrayPolicy>,
    after_end_fill: bool,
) -> Result<(), SchemaErrorKind> {
    if after_end_fill {
        return Err(SchemaErrorKind::EndFillNotLast);
    }
    match (class, policy) {
        (TypeClass::Unsupported(name), _) => Err(SchemaErrorKind::UnsupportedFieldType(name)),
        (TypeClass::Array(_), None) => Err(SchemaErrorKind::MissingArrayPolicy),
        (TypeClass::Array(element), Some(_)) => match **element {
            TypeClass::Array(_) => Err(SchemaErrorKind::UnsupportedNestedArray),
            TypeClass::Unsupported(name) => Err(SchemaErrorKind::UnsupportedFieldType(name)),
            _ => Ok(()),
        },
        _ => Ok(()),
    }
}
