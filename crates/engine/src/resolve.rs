use std::path::PathBuf;

/// Maps a task's relative path to its absolute location at the target.
#[derive(Clone, Debug)]
pub struct TargetResolver {
    work_root: PathBuf,
    single_file_copy: bool,
}

impl TargetResolver {
    /// Creates a resolver rooted at `work_root`.
    ///
    /// With `single_file_copy`, every task resolves to the root itself: the
    /// destination names the target file directly rather than a directory to
    /// copy into, and that literal path wins over relative-path naming.
    #[must_use]
    pub fn new(work_root: PathBuf, single_file_copy: bool) -> Self {
        Self {
            work_root,
            single_file_copy,
        }
    }

    /// Resolves `relative_path` (rooted with `/`) under the work root.
    #[must_use]
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        if self.single_file_copy {
            return self.work_root.clone();
        }
        let trimmed = relative_path.trim_start_matches('/');
        if trimmed.is_empty() {
            self.work_root.clone()
        } else {
            self.work_root.join(trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn relative_paths_resolve_under_the_work_root() {
        let resolver = TargetResolver::new(PathBuf::from("/target"), false);
        assert_eq!(resolver.resolve("/dir1/file0"), Path::new("/target/dir1/file0"));
        assert_eq!(resolver.resolve(""), Path::new("/target"));
    }

    #[test]
    fn single_file_destinations_ignore_the_relative_path() {
        let resolver = TargetResolver::new(PathBuf::from("/target/out.bin"), true);
        assert_eq!(resolver.resolve("/file0"), Path::new("/target/out.bin"));
    }
}
