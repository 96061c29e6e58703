//! Derive macro for `BitStruct`.
//!
//! The derive only describes the struct: its fields in declaration order, its byte order and
//! each array field's policy. Encoding, decoding and size inference all happen in the
//! `bitwire` schema compiler.
//!
//! Refer to the [`bitwire`](https://docs.rs/bitwire) crate for examples.
use {
    proc_macro::TokenStream,
    syn::{parse_macro_input, DeriveInput},
};

mod bit_struct;
mod common;

/// Implement `BitStruct` and `Wire` for a struct.
///
/// Struct attribute: `#[bitwire(endian = "little" | "big")]`.
/// Field attributes (on `Vec<_>` fields): `#[bitwire(fixed = N)]` or `#[bitwire(end_fill)]`.
#[proc_macro_derive(BitStruct, attributes(bitwire))]
pub fn derive_bit_struct(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match bit_struct::generate(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.write_errors().into(),
    }
}
