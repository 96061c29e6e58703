// Record types shared by the fuzz targets and the corpus seeding in build.rs.

use bitwire::{bit_enum, BitStruct};

bit_enum! {
    pub enum Opcode: u16 {
        Nop = 0,
        Load = 1,
        Store = 2,
        Jump = 0x8000,
    }
}

#[derive(BitStruct, Debug, Default, Clone, PartialEq)]
pub struct Scalars {
    pub a: u8,
    pub b: i8,
    pub c: u16,
    pub d: i16,
    pub e: u32,
    pub f: i32,
    pub g: u64,
    pub h: i64,
}

#[derive(BitStruct, Debug, Default, Clone, PartialEq)]
#[bitwire(endian = "big")]
pub struct BigScalars {
    pub c: u16,
    pub e: u32,
    pub h: i64,
}

#[derive(BitStruct, Debug, Default, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operand: u32,
}

#[derive(BitStruct, Debug, Default, Clone, PartialEq)]
#[bitwire(endian = "big")]
pub struct FixedArrays {
    #[bitwire(fixed = 4)]
    pub bytes: Vec<u8>,
    #[bitwire(fixed = 3)]
    pub words: Vec<u32>,
    #[bitwire(fixed = 2)]
    pub ops: Vec<Opcode>,
}

#[derive(BitStruct, Debug, Default, Clone, PartialEq)]
pub struct Program {
    pub header: BigScalars,
    #[bitwire(fixed = 2)]
    pub prologue: Vec<Instruction>,
    #[bitwire(end_fill)]
    pub body: Vec<Instruction>,
}

#[derive(BitStruct, Debug, Default, Clone, PartialEq)]
pub struct Samples(pub u8, #[bitwire(end_fill)] pub Vec<i16>);
