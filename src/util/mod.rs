//! General utility code that didn't fit anywhere else
// (c) 2024 Ross Younger

mod cli;

mod file_mode;
pub use file_mode::FileMode;

mod human_duration;
pub use human_duration::HumanDuration;

mod tracing;
pub use tracing::setup as setup_tracing;
#[cfg(test)]
pub(crate) use tracing::setup_tracing_for_tests;

mod optionalify;
pub use optionalify::{derive_deftly_template_Optionalify, insert_if_some};

#[cfg(test)]
pub(crate) fn make_test_tempfile(
    data: &str,
    filename: &str,
) -> (std::path::PathBuf, tempfile::TempDir) {
    let tempdir = tempfile::tempdir().unwrap();
    let path = tempdir.path().join(filename);
    std::fs::write(&path, data).expect("Unable to write tempfile");
    (path, tempdir)
}
