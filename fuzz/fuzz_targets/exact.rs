#![no_main]

use {
    bitwire::{Deserialize, Error, ReadError},
    libfuzzer_sys::fuzz_target,
};

include!("../types.rs");

/// `deserialize_exact` accepts `data` iff a prefix decode consumes all of it.
fn exact<T: BitStruct + PartialEq + std::fmt::Debug>(data: &[u8]) {
    match (T::deserialize(data), T::deserialize_exact(data)) {
        (Ok((value, read)), Ok(exact)) => {
            assert_eq!(read, data.len());
            assert_eq!(value, exact);
        }
        (Ok((_, read)), Err(Error::Read(ReadError::TrailingBytes { remaining }))) => {
            assert_eq!(read + remaining, data.len());
        }
        (Err(_), Err(_)) => {}
        (prefix, exact) => panic!("prefix decode {prefix:?} disagrees with exact decode {exact:?}"),
    }
}

fuzz_target!(|data: &[u8]| {
    exact::<Scalars>(data);
    exact::<FixedArrays>(data);
    exact::<Program>(data);
    exact::<Samples>(data);
});
