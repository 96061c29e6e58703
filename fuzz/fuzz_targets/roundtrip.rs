#![no_main]

use {
    bitwire::{Deserialize, Serialize},
    libfuzzer_sys::fuzz_target,
    std::fmt::Debug,
};

include!("../types.rs");

/// Whatever decodes from `data` must encode back to exactly the bytes it was read from.
fn roundtrip<T: BitStruct + Debug + PartialEq>(data: &[u8]) {
    let Ok((value, read)) = T::deserialize(data) else {
        return;
    };
    assert_eq!(value.calculate_size().unwrap(), read);

    let bytes = value.serialize().unwrap();
    assert_eq!(bytes, &data[..read]);

    let (again, reread) = T::deserialize(&bytes).unwrap();
    assert_eq!(again, value);
    assert_eq!(reread, read);
}

fuzz_target!(|data: &[u8]| {
    roundtrip::<Scalars>(data);
    roundtrip::<BigScalars>(data);
    roundtrip::<Instruction>(data);
    roundtrip::<FixedArrays>(data);
    roundtrip::<Program>(data);
    roundtrip::<Samples>(data);
});
