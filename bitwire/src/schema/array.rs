//! Array codecs for the two element count policies.
use {
    super::{ArrayPolicy, Codec, Wire},
    crate::{
        error::{array_too_large, stalled_element, truncated_element},
        io::Reader,
    },
    std::sync::{Arc, OnceLock},
};

/// Sizes past `usize::MAX` can never fit a buffer, so they stop there.
pub(crate) fn saturating_sum(sizes: impl Iterator<Item = usize>) -> usize {
    sizes.fold(0, usize::saturating_add)
}

pub(crate) fn codec<E: Wire>(element: Codec<E>, policy: ArrayPolicy) -> Codec<Vec<E>> {
    match policy {
        ArrayPolicy::Fixed(len) => fixed(element, len),
        ArrayPolicy::EndFill => end_fill(element),
    }
}

/// Exactly `len` elements. Missing trailing elements are written as [`Wire::zero`].
fn fixed<E: Wire>(element: Codec<E>, len: usize) -> Codec<Vec<E>> {
    let element = Arc::new(element);
    let (enc, dec, size) = (element.clone(), element.clone(), element);
    // Size of one backfill element, resolved on first use since a nested schema is only
    // published after this codec is built.
    let zero_size = OnceLock::new();

    Codec::new(
        move |writer, items: &Vec<E>| {
            if items.len() > len {
                return Err(array_too_large(items.len(), len));
            }
            for item in items {
                enc.encode(writer, item)?;
            }
            if items.len() < len {
                let zero = E::zero();
                for _ in items.len()..len {
                    enc.encode(writer, &zero)?;
                }
            }
            Ok(())
        },
        move |reader| {
            let mut items = Vec::with_capacity(len.min(reader.remaining()));
            for _ in 0..len {
                items.push(dec.decode(reader)?);
            }
            Ok(items)
        },
        move |items: &Vec<E>| {
            let present = saturating_sum(items.iter().map(|item| size.size(item)));
            let missing = len.saturating_sub(items.len());
            if missing == 0 {
                return present;
            }
            let zero = *zero_size.get_or_init(|| size.size(&E::zero()));
            present.saturating_add(missing.saturating_mul(zero))
        },
    )
}

/// Elements until the reader is exhausted. No count or terminator on the wire.
fn end_fill<E: Wire>(element: Codec<E>) -> Codec<Vec<E>> {
    let element = Arc::new(element);
    let (enc, dec, size) = (element.clone(), element.clone(), element);

    Codec::new(
        move |writer, items: &Vec<E>| {
            for item in items {
                enc.encode(writer, item)?;
            }
            Ok(())
        },
        move |reader: &mut Reader<'_>| {
            let mut items = Vec::new();
            while !reader.is_empty() {
                let remaining = reader.remaining();
                match dec.decode(reader) {
                    Ok(item) => items.push(item),
                    Err(err) if err.is_buffer_too_small() => {
                        return Err(truncated_element(remaining))
                    }
                    Err(err) => return Err(err),
                }
                if reader.remaining() == remaining {
                    return Err(stalled_element(remaining));
                }
            }
            Ok(items)
        },
        move |items: &Vec<E>| saturating_sum(items.iter().map(|item| size.size(item))),
    )
}
