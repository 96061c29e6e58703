use proptest::test_runner::Config;

/// Shared proptest configuration for unit tests.
///
/// Under Miri, failure persistence touches the filesystem and full case counts take far too
/// long, so both are cut back.
pub(crate) fn proptest_cfg() -> Config {
    if cfg!(miri) {
        Config {
            failure_persistence: None,
            cases: 8,
            ..Config::default()
        }
    } else {
        Config {
            cases: 128,
            ..Config::default()
        }
    }
}
