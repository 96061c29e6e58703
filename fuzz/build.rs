use std::{fs, path::Path};

include!("types.rs");

fn write_seed(dir: &Path, name: &str, bytes: &[u8]) {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap_or_else(|e| panic!("failed to write seed {}: {e}", path.display()));
}

macro_rules! seed {
    ($dir:expr, $name:literal, $value:expr) => {{
        let bytes = bitwire::serialize(&$value)
            .unwrap_or_else(|e| panic!("failed to serialize seed {}: {e}", $name));
        write_seed($dir, $name, &bytes);
    }};
}

fn main() {
    println!("cargo:rerun-if-changed=types.rs");
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let corpus_dir = Path::new(&manifest_dir).join("corpus").join("roundtrip");
    fs::create_dir_all(&corpus_dir).expect("failed to create corpus directory");

    seed!(&corpus_dir, "seed-scalars-zero", Scalars::default());
    seed!(
        &corpus_dir,
        "seed-scalars-extremes",
        Scalars {
            a: u8::MAX,
            b: i8::MIN,
            c: u16::MAX,
            d: i16::MIN,
            e: u32::MAX,
            f: i32::MIN,
            g: u64::MAX,
            h: i64::MIN,
        }
    );
    seed!(
        &corpus_dir,
        "seed-big_scalars",
        BigScalars {
            c: 0x0102,
            e: 0x0304_0506,
            h: -2,
        }
    );
    seed!(
        &corpus_dir,
        "seed-fixed_arrays-short",
        FixedArrays {
            bytes: vec![0xAB],
            words: vec![1, 2],
            ops: vec![Opcode::Jump],
        }
    );
    seed!(
        &corpus_dir,
        "seed-program",
        Program {
            header: BigScalars::default(),
            prologue: vec![Instruction {
                opcode: Opcode::Load,
                operand: 7,
            }],
            body: vec![
                Instruction {
                    opcode: Opcode::Store,
                    operand: 8,
                },
                Instruction {
                    opcode: Opcode(0x1234),
                    operand: u32::MAX,
                },
            ],
        }
    );
    seed!(&corpus_dir, "seed-samples-empty", Samples(0, vec![]));
    seed!(&corpus_dir, "seed-samples", Samples(3, vec![1, -1, i16::MAX]));
}
