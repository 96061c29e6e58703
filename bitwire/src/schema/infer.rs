//! Size inference and whole-graph validation for a compile session.
//!
//! Every struct compiled in a session starts out [`SizeClass::Dynamic`]. Passes over the whole
//! set recompute each struct's class from its fields' current classes until a pass changes
//! nothing. A class only ever moves from `Dynamic` to `Const`, so this terminates after at
//! most one pass per struct plus a final quiet pass. Structs in a cycle can never prove
//! themselves constant and stay `Dynamic`.
//!
//! A struct is open-ended when its encoding runs to the end of the input: its last field is an
//! end-fill array, or a nested open-ended struct. Such a struct may only sit at the very end of
//! whatever contains it.
use {
    super::{ArrayPolicy, FieldDescriptor, SizeClass, StructRef, TypeClass},
    crate::error::{schema_error, SchemaError, SchemaErrorKind},
    std::{
        any::TypeId,
        collections::{HashMap, HashSet},
    },
    tracing::debug,
};

/// A struct compiled in the current session.
pub(crate) struct Node {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) fields: Vec<FieldDescriptor>,
}

/// Size class of one field given the current classes of the structs it refers to.
pub(crate) fn field_size(
    class: &TypeClass,
    policy: Option<ArrayPolicy>,
    sizes: &HashMap<TypeId, SizeClass>,
) -> SizeClass {
    match class {
        TypeClass::Integer(kind) | TypeClass::Enum { repr: kind, .. } => SizeClass::Const(kind.width),
        TypeClass::Struct(target) => sizes.get(&target.id).copied().unwrap_or(SizeClass::Dynamic),
        TypeClass::Array(element) => match policy {
            Some(ArrayPolicy::Fixed(len)) => match field_size(element, None, sizes) {
                SizeClass::Const(width) => len
                    .checked_mul(width)
                    .map_or(SizeClass::Dynamic, SizeClass::Const),
                SizeClass::Dynamic => SizeClass::Dynamic,
            },
            Some(ArrayPolicy::EndFill) | None => SizeClass::Dynamic,
        },
        TypeClass::Unsupported(_) => SizeClass::Dynamic,
    }
}

fn struct_size(node: &Node, sizes: &HashMap<TypeId, SizeClass>) -> SizeClass {
    node.fields
        .iter()
        .try_fold(0usize, |total, field| {
            field_size(&field.class, field.policy, sizes)
                .constant()
                .and_then(|size| total.checked_add(size))
        })
        .map_or(SizeClass::Dynamic, SizeClass::Const)
}

/// Classify every node, adding the results to `sizes`. Returns the number of passes run.
pub(crate) fn infer(nodes: &[Node], sizes: &mut HashMap<TypeId, SizeClass>) -> usize {
    for node in nodes {
        sizes.insert(node.id, SizeClass::Dynamic);
    }

    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        for node in nodes {
            let candidate = struct_size(node, sizes);
            if sizes.insert(node.id, candidate) != Some(candidate) {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    debug!(types = nodes.len(), passes, "size inference converged");
    for node in nodes {
        debug!(type_name = node.name, size = ?sizes.get(&node.id), "size class");
    }
    passes
}

fn ends_open(field: &FieldDescriptor, open: &HashSet<TypeId>) -> bool {
    match (&field.class, field.policy) {
        (_, Some(ArrayPolicy::EndFill)) => true,
        (TypeClass::Struct(target), None) => open.contains(&target.id),
        _ => false,
    }
}

/// Add every open-ended node to `open`, which arrives holding the published open-ended structs
/// the session refers to.
pub(crate) fn open_ended(nodes: &[Node], open: &mut HashSet<TypeId>) {
    loop {
        let mut changed = false;
        for node in nodes {
            if !open.contains(&node.id)
                && node.fields.last().is_some_and(|field| ends_open(field, open))
            {
                open.insert(node.id);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Whether `field` places an open-ended struct anywhere but the end of its record.
fn swallows_tail(field: &FieldDescriptor, last: bool, open: &HashSet<TypeId>) -> bool {
    match &field.class {
        TypeClass::Struct(target) => !last && open.contains(&target.id),
        TypeClass::Array(element) => {
            matches!(&**element, TypeClass::Struct(target) if open.contains(&target.id))
        }
        _ => false,
    }
}

/// Whether the encoded size of `field` overflows `usize`, or pushes `total` past it.
fn overflows(
    field: &FieldDescriptor,
    total: &mut Option<usize>,
    sizes: &HashMap<TypeId, SizeClass>,
) -> bool {
    if let (TypeClass::Array(element), Some(ArrayPolicy::Fixed(len))) = (&field.class, field.policy)
    {
        if let SizeClass::Const(width) = field_size(element, None, sizes) {
            if len.checked_mul(width).is_none() {
                return true;
            }
        }
    }
    match (*total, field_size(&field.class, field.policy, sizes)) {
        (Some(sum), SizeClass::Const(size)) => {
            *total = sum.checked_add(size);
            total.is_none()
        }
        _ => {
            *total = None;
            false
        }
    }
}

/// Checks that need the classes of the whole session.
///
/// On failure returns the offending struct along with the error.
pub(crate) fn validate(
    nodes: &[Node],
    sizes: &HashMap<TypeId, SizeClass>,
    open: &HashSet<TypeId>,
) -> Result<(), (TypeId, SchemaError)> {
    for node in nodes {
        let reject = |field: &FieldDescriptor, kind| {
            Err((node.id, schema_error(node.name, field.name, kind)))
        };
        let mut total = Some(0);
        for (at, field) in node.fields.iter().enumerate() {
            if let TypeClass::Array(element) = &field.class {
                if field.policy == Some(ArrayPolicy::EndFill)
                    && field_size(element, None, sizes) == SizeClass::Const(0)
                {
                    return reject(field, SchemaErrorKind::ZeroSizedEndFill);
                }
            }
            if swallows_tail(field, at + 1 == node.fields.len(), open) {
                return reject(field, SchemaErrorKind::EndFillNotLast);
            }
            if overflows(field, &mut total, sizes) {
                return reject(field, SchemaErrorKind::SizeOverflow);
            }
        }
    }

    let index: HashMap<TypeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(at, node)| (node.id, at))
        .collect();
    let mut marks = vec![Mark::New; nodes.len()];
    for start in 0..nodes.len() {
        if marks[start] == Mark::New {
            visit(start, nodes, &index, &mut marks)?;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    New,
    Open,
    Done,
}

/// The struct a field always contains at least one of, if any.
fn unconditional_target(field: &FieldDescriptor) -> Option<&StructRef> {
    match (&field.class, field.policy) {
        (TypeClass::Struct(target), None) => Some(target),
        (TypeClass::Array(element), Some(ArrayPolicy::Fixed(len))) if len > 0 => match &**element {
            TypeClass::Struct(target) => Some(target),
            _ => None,
        },
        _ => None,
    }
}

/// Depth-first search for a cycle of unconditional containment.
fn visit(
    at: usize,
    nodes: &[Node],
    index: &HashMap<TypeId, usize>,
    marks: &mut [Mark],
) -> Result<(), (TypeId, SchemaError)> {
    marks[at] = Mark::Open;
    let node = &nodes[at];
    for field in &node.fields {
        let Some(target) = unconditional_target(field) else {
            continue;
        };
        // Published structs cannot refer back into this session.
        let Some(&next) = index.get(&target.id) else {
            continue;
        };
        match marks[next] {
            Mark::Open => {
                return Err((
                    node.id,
                    schema_error(
                        node.name,
                        field.name,
                        SchemaErrorKind::InvalidRecursiveLayout(target.name),
                    ),
                ))
            }
            Mark::New => visit(next, nodes, index, marks)?,
            Mark::Done => {}
        }
    }
    marks[at] = Mark::Done;
    Ok(())
}

/// `id` and every node that refers to it, directly or transitively.
pub(crate) fn dependents(nodes: &[Node], id: TypeId) -> Vec<TypeId> {
    fn refers_to(class: &TypeClass, id: TypeId) -> bool {
        match class {
            TypeClass::Struct(target) => target.id == id,
            TypeClass::Array(element) => refers_to(element, id),
            _ => false,
        }
    }

    let mut found = vec![id];
    let mut at = 0;
    while let Some(&target) = found.get(at) {
        for node in nodes {
            if !found.contains(&node.id) && node.fields.iter().any(|f| refers_to(&f.class, target)) {
                found.push(node.id);
            }
        }
        at += 1;
    }
    found
}

#[cfg(test)]
mod tests {
    use {super::*, crate::schema::Primitive};

    struct A;
    struct B;
    struct C;
    struct D;

    fn id<T: 'static>() -> TypeId {
        TypeId::of::<T>()
    }

    fn to<T: 'static>(name: &'static str) -> TypeClass {
        TypeClass::Struct(StructRef { id: id::<T>(), name })
    }

    fn node<T: 'static>(name: &'static str, fields: Vec<(TypeClass, Option<ArrayPolicy>)>) -> Node {
        Node {
            id: id::<T>(),
            name,
            fields: fields
                .into_iter()
                .enumerate()
                .map(|(index, (class, policy))| FieldDescriptor {
                    name: ["f0", "f1", "f2", "f3"][index],
                    index,
                    class,
                    policy,
                })
                .collect(),
        }
    }

    fn int<P: Primitive>() -> TypeClass {
        TypeClass::Integer(P::KIND)
    }

    fn array(element: TypeClass) -> TypeClass {
        TypeClass::Array(Box::new(element))
    }

    #[test]
    fn field_sizes() {
        let sizes = HashMap::new();
        assert_eq!(field_size(&int::<u32>(), None, &sizes), SizeClass::Const(4));
        assert_eq!(
            field_size(
                &TypeClass::Enum {
                    name: "E",
                    repr: i16::KIND
                },
                None,
                &sizes
            ),
            SizeClass::Const(2)
        );
        assert_eq!(
            field_size(&array(int::<u16>()), Some(ArrayPolicy::Fixed(3)), &sizes),
            SizeClass::Const(6)
        );
        assert_eq!(
            field_size(&array(int::<u8>()), Some(ArrayPolicy::EndFill), &sizes),
            SizeClass::Dynamic
        );
        assert_eq!(
            field_size(&array(int::<u64>()), Some(ArrayPolicy::Fixed(usize::MAX)), &sizes),
            SizeClass::Dynamic
        );
        assert_eq!(field_size(&to::<A>("A"), None, &sizes), SizeClass::Dynamic);
    }

    #[test]
    fn chain_converges_over_several_passes() {
        // Listed outermost first so each pass resolves one more level.
        let nodes = vec![
            node::<A>("A", vec![(to::<B>("B"), None), (int::<u8>(), None)]),
            node::<B>("B", vec![(array(to::<C>("C")), Some(ArrayPolicy::Fixed(2)))]),
            node::<C>("C", vec![(int::<u16>(), None), (int::<u16>(), None)]),
        ];
        let mut sizes = HashMap::new();
        let passes = infer(&nodes, &mut sizes);
        assert_eq!(sizes[&id::<C>()], SizeClass::Const(4));
        assert_eq!(sizes[&id::<B>()], SizeClass::Const(8));
        assert_eq!(sizes[&id::<A>()], SizeClass::Const(9));
        assert_eq!(passes, 4);
    }

    #[test]
    fn published_sizes_are_used() {
        let nodes = vec![node::<A>("A", vec![(to::<D>("D"), None)])];
        let mut sizes = HashMap::from([(id::<D>(), SizeClass::Const(7))]);
        assert_eq!(infer(&nodes, &mut sizes), 2);
        assert_eq!(sizes[&id::<A>()], SizeClass::Const(7));
    }

    #[test]
    fn end_fill_makes_struct_dynamic() {
        let nodes = vec![node::<A>(
            "A",
            vec![(int::<u8>(), None), (array(int::<u8>()), Some(ArrayPolicy::EndFill))],
        )];
        let mut sizes = HashMap::new();
        infer(&nodes, &mut sizes);
        assert_eq!(sizes[&id::<A>()], SizeClass::Dynamic);
    }

    /// Run inference and the open-ended pass, then validate.
    fn check(nodes: &[Node]) -> Result<(), (TypeId, SchemaError)> {
        let mut sizes = HashMap::new();
        infer(nodes, &mut sizes);
        let mut open = HashSet::new();
        open_ended(nodes, &mut open);
        validate(nodes, &sizes, &open)
    }

    #[test]
    fn cycle_through_end_fill_rejected() {
        let nodes = vec![
            node::<A>(
                "A",
                vec![(int::<u8>(), None), (array(to::<B>("B")), Some(ArrayPolicy::EndFill))],
            ),
            node::<B>("B", vec![(to::<A>("A"), None)]),
        ];
        let mut sizes = HashMap::new();
        infer(&nodes, &mut sizes);
        assert_eq!(sizes[&id::<A>()], SizeClass::Dynamic);
        assert_eq!(sizes[&id::<B>()], SizeClass::Dynamic);
        let (at, err) = check(&nodes).unwrap_err();
        assert_eq!(at, id::<A>());
        assert_eq!(err, schema_error("A", "f1", SchemaErrorKind::EndFillNotLast));
    }

    #[test]
    fn open_ended_propagates_through_last_fields() {
        let nodes = vec![
            node::<A>("A", vec![(int::<u8>(), None), (to::<B>("B"), None)]),
            node::<B>("B", vec![(to::<C>("C"), None)]),
            node::<C>("C", vec![(array(int::<u8>()), Some(ArrayPolicy::EndFill))]),
            node::<D>("D", vec![(to::<C>("C"), None), (int::<u8>(), None)]),
        ];
        let mut open = HashSet::new();
        open_ended(&nodes, &mut open);
        assert_eq!(open, HashSet::from([id::<A>(), id::<B>(), id::<C>()]));

        let (at, err) = check(&nodes).unwrap_err();
        assert_eq!(at, id::<D>());
        assert_eq!(err, schema_error("D", "f0", SchemaErrorKind::EndFillNotLast));
    }

    #[test]
    fn published_open_ended_struct_checked() {
        // `D` was published in an earlier session.
        let nodes = vec![node::<A>(
            "A",
            vec![(array(to::<D>("D")), Some(ArrayPolicy::Fixed(1)))],
        )];
        let sizes = HashMap::from([(id::<D>(), SizeClass::Dynamic)]);
        let mut open = HashSet::from([id::<D>()]);
        open_ended(&nodes, &mut open);
        let (_, err) = validate(&nodes, &sizes, &open).unwrap_err();
        assert_eq!(err, schema_error("A", "f0", SchemaErrorKind::EndFillNotLast));
    }

    #[test]
    fn overflowing_sizes_rejected() {
        let nodes = vec![node::<A>(
            "A",
            vec![(array(int::<u32>()), Some(ArrayPolicy::Fixed(usize::MAX / 4 + 1)))],
        )];
        let (_, err) = check(&nodes).unwrap_err();
        assert_eq!(err, schema_error("A", "f0", SchemaErrorKind::SizeOverflow));

        let nodes = vec![node::<B>(
            "B",
            vec![
                (array(int::<u8>()), Some(ArrayPolicy::Fixed(usize::MAX - 1))),
                (int::<u8>(), None),
                (int::<u8>(), None),
            ],
        )];
        let (_, err) = check(&nodes).unwrap_err();
        assert_eq!(err, schema_error("B", "f2", SchemaErrorKind::SizeOverflow));
    }

    #[test]
    fn empty_fixed_array_breaks_a_cycle() {
        let nodes = vec![node::<A>("A", vec![(array(to::<A>("A")), Some(ArrayPolicy::Fixed(0)))])];
        assert!(check(&nodes).is_ok());
    }

    #[test]
    fn unconditional_cycle_rejected() {
        let nodes = vec![
            node::<A>("A", vec![(to::<B>("B"), None)]),
            node::<B>("B", vec![(int::<u8>(), None), (array(to::<A>("A")), Some(ArrayPolicy::Fixed(1)))]),
        ];
        let (at, err) = check(&nodes).unwrap_err();
        assert_eq!(at, id::<B>());
        assert_eq!(
            err,
            schema_error("B", "f1", SchemaErrorKind::InvalidRecursiveLayout("A"))
        );
    }

    #[test]
    fn zero_sized_end_fill_rejected() {
        let nodes = vec![
            node::<A>("A", vec![]),
            node::<B>("B", vec![(array(to::<A>("A")), Some(ArrayPolicy::EndFill))]),
        ];
        let mut sizes = HashMap::new();
        infer(&nodes, &mut sizes);
        assert_eq!(sizes[&id::<A>()], SizeClass::Const(0));
        let (at, err) = check(&nodes).unwrap_err();
        assert_eq!(at, id::<B>());
        assert_eq!(err.kind, SchemaErrorKind::ZeroSizedEndFill);
    }

    #[test]
    fn dependents_are_transitive() {
        let nodes = vec![
            node::<A>("A", vec![(to::<B>("B"), None)]),
            node::<B>("B", vec![(array(to::<C>("C")), Some(ArrayPolicy::EndFill))]),
            node::<C>("C", vec![(int::<u8>(), None)]),
            node::<D>("D", vec![(int::<u8>(), None)]),
        ];
        let found = dependents(&nodes, id::<C>());
        assert_eq!(found, [id::<C>(), id::<B>(), id::<A>()]);
    }
}
