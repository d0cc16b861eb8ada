//! Filesystem checks deciding whether a step applies to this working directory.
//!
//! Each call hits the filesystem again; results are never cached.

use std::path::Path;

use crate::core::commands::DESCRIPTOR_PATH;

pub const MAKEFILE: &str = "makefile";

pub fn needs_make(workdir: &Path) -> bool {
    workdir.join(MAKEFILE).exists()
}

pub fn needs_build_image(workdir: &Path) -> bool {
    workdir.join(DESCRIPTOR_PATH).exists()
}

/// An image is only pushed if it was buildable.
pub fn needs_push_image(workdir: &Path) -> bool {
    needs_build_image(workdir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::touch;

    #[test]
    fn empty_workdir_needs_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(!needs_make(temp.path()));
        assert!(!needs_build_image(temp.path()));
        assert!(!needs_push_image(temp.path()));
    }

    #[test]
    fn makefile_enables_make_only() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "makefile").expect("touch");
        assert!(needs_make(temp.path()));
        assert!(!needs_build_image(temp.path()));
        assert!(!needs_push_image(temp.path()));
    }

    #[test]
    fn descriptor_enables_build_and_push() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "docker/Dockerfile").expect("touch");
        assert!(!needs_make(temp.path()));
        assert!(needs_build_image(temp.path()));
        assert!(needs_push_image(temp.path()));
    }

    #[test]
    fn dockerfile_at_root_does_not_count() {
        let temp = tempfile::tempdir().expect("tempdir");
        touch(temp.path(), "Dockerfile").expect("touch");
        assert!(!needs_build_image(temp.path()));
    }

    #[test]
    fn predicates_observe_changes_between_calls() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(!needs_make(temp.path()));
        touch(temp.path(), "makefile").expect("touch");
        assert!(needs_make(temp.path()));
        std::fs::remove_file(temp.path().join("makefile")).expect("remove");
        assert!(!needs_make(temp.path()));
    }
}
