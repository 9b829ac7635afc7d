//! Writing mutants to disk
//!
//! Each mutant gets its own directory below a scratch root, named after the
//! mutant id: `<scratch>/0`, `<scratch>/1`, ... A directory is created
//! exactly once; an existing one is an error, never overwritten. The scratch
//! root is deleted when the [`Materializer`] is dropped, whichever way the
//! run ends, unless it is explicitly kept. Build output of the baseline and
//! of all mutants goes to one shared `<scratch>/target`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use tracing::debug;

use crate::codegen::generate_source;
use crate::error::{MutationError, Result};
use crate::package::Package;

/// Name of the directory holding the unmutated package
const BASELINE_DIR: &str = "baseline";

/// Name of the build directory shared by every copy
const TARGET_DIR: &str = "target";

/// A mutant written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutantDir {
    pub id: usize,
    pub path: PathBuf,
}

/// Owner of the scratch root and the mutant id counter
pub struct Materializer {
    scratch: Option<TempDir>,
    root: PathBuf,
    next_id: AtomicUsize,
}

impl Materializer {
    /// Create a fresh scratch root inside `parent`, or the system temp dir
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("mutants-");
        let scratch = match parent {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(|e| {
            let parent = parent.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir);
            MutationError::isolation(parent, e)
        })?;

        let root = scratch.path().to_path_buf();
        debug!(scratch = %root.display(), "created scratch root");
        Ok(Self {
            scratch: Some(scratch),
            root,
            next_id: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build directory for the baseline and every mutant.
    ///
    /// Each copy still compiles its own crate, since Cargo keys build
    /// artifacts of local packages by their path; dependencies are built once.
    pub fn target_dir(&self) -> PathBuf {
        self.root.join(TARGET_DIR)
    }

    /// Number of mutant directories handed out so far
    pub fn generated(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Write the unmutated package to `<scratch>/baseline`
    pub fn materialize_baseline(&self, package: &Package) -> Result<PathBuf> {
        let dir = self.root.join(BASELINE_DIR);
        self.write_package(&dir, package, None)?;
        Ok(dir)
    }

    /// Write `package` to a new mutant directory.
    ///
    /// `substitution` replaces the tree of the source file at the given index
    /// of `package.sources`; every other file is written from the package.
    pub fn materialize(
        &self,
        package: &Package,
        substitution: Option<(usize, &syn::File)>,
    ) -> Result<MutantDir> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let path = self.root.join(id.to_string());
        self.write_package(&path, package, substitution)?;
        Ok(MutantDir { id, path })
    }

    /// Persist the scratch root instead of deleting it, returning its path
    pub fn keep(mut self) -> PathBuf {
        match self.scratch.take() {
            Some(scratch) => scratch.keep(),
            None => self.root.clone(),
        }
    }

    fn write_package(
        &self,
        dir: &Path,
        package: &Package,
        substitution: Option<(usize, &syn::File)>,
    ) -> Result<()> {
        fs::create_dir(dir).map_err(|e| MutationError::isolation(dir, e))?;

        let manifest = dir.join("Cargo.toml");
        fs::write(&manifest, &package.manifest)
            .map_err(|e| MutationError::isolation(&manifest, e))?;

        for (index, file) in package.sources.iter().enumerate() {
            let ast = match substitution {
                Some((replaced, ast)) if replaced == index => ast,
                _ => &file.ast,
            };
            let target = dir.join(&file.path);
            create_parent(&target)?;
            fs::write(&target, generate_source(ast))
                .map_err(|e| MutationError::isolation(&target, e))?;
        }

        for relative in &package.support_files {
            let target = dir.join(relative);
            create_parent(&target)?;
            fs::copy(package.root.join(relative), &target)
                .map_err(|e| MutationError::isolation(&target, e))?;
        }

        debug!(dir = %dir.display(), files = package.sources.len(), "materialized package");
        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| MutationError::isolation(parent, e))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::SourceFile;
    use pretty_assertions::assert_eq;

    fn package(root: &Path) -> Package {
        fs::write(root.join("README.md"), "demo\n").unwrap();
        Package {
            name: "demo".to_string(),
            root: root.to_path_buf(),
            sources: vec![
                SourceFile::parse("src/lib.rs".into(), "pub fn one() -> u8 { 1 }").unwrap(),
                SourceFile::parse("tests/it.rs".into(), "#[test]\nfn t() {}").unwrap(),
            ],
            manifest: "[package]\nname = \"demo\"\n\n[workspace]\n".to_string(),
            support_files: vec![PathBuf::from("README.md")],
        }
    }

    #[test]
    fn test_directories_are_numbered() {
        let source = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let package = package(source.path());
        let materializer = Materializer::new(Some(scratch.path())).unwrap();

        let ids: Vec<usize> = (0..3)
            .map(|_| materializer.materialize(&package, None).unwrap().id)
            .collect();

        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(materializer.generated(), 3);
        for id in ids {
            let dir = materializer.root().join(id.to_string());
            assert!(dir.join("Cargo.toml").is_file());
            assert!(dir.join("README.md").is_file());
            assert!(dir.join("src/lib.rs").is_file());
            assert!(dir.join("tests/it.rs").is_file());
        }
    }

    #[test]
    fn test_substitution_only_touches_one_file() {
        let source = tempfile::tempdir().unwrap();
        let package = package(source.path());
        let materializer = Materializer::new(Some(source.path())).unwrap();
        let replacement = syn::parse_file("pub fn one() -> u8 { 2 }").unwrap();

        let mutant = materializer
            .materialize(&package, Some((0, &replacement)))
            .unwrap();
        let baseline = materializer.materialize_baseline(&package).unwrap();

        let mutated = fs::read_to_string(mutant.path.join("src/lib.rs")).unwrap();
        let original = fs::read_to_string(baseline.join("src/lib.rs")).unwrap();
        assert!(mutated.contains('2') && !mutated.contains('1'), "{mutated}");
        assert!(original.contains('1'), "{original}");
        assert_eq!(
            fs::read_to_string(mutant.path.join("tests/it.rs")).unwrap(),
            fs::read_to_string(baseline.join("tests/it.rs")).unwrap()
        );
    }

    #[test]
    fn test_manifest_is_written_from_package() {
        let source = tempfile::tempdir().unwrap();
        let package = package(source.path());
        let materializer = Materializer::new(Some(source.path())).unwrap();

        let mutant = materializer.materialize(&package, None).unwrap();

        assert_eq!(
            fs::read_to_string(mutant.path.join("Cargo.toml")).unwrap(),
            package.manifest
        );
        assert_eq!(materializer.target_dir(), materializer.root().join("target"));
        assert!(!mutant.path.starts_with(materializer.target_dir()));
    }

    #[test]
    fn test_existing_directory_is_not_reused() {
        let source = tempfile::tempdir().unwrap();
        let package = package(source.path());
        let materializer = Materializer::new(Some(source.path())).unwrap();
        fs::create_dir(materializer.root().join("0")).unwrap();

        let err = materializer.materialize(&package, None).unwrap_err();
        assert_eq!(err.category(), "isolation");
    }

    #[test]
    fn test_scratch_root_released_on_drop() {
        let source = tempfile::tempdir().unwrap();
        let package = package(source.path());
        let materializer = Materializer::new(Some(source.path())).unwrap();
        materializer.materialize(&package, None).unwrap();
        let root = materializer.root().to_path_buf();

        drop(materializer);
        assert!(!root.exists());
    }

    #[test]
    fn test_keep_persists_scratch_root() {
        let source = tempfile::tempdir().unwrap();
        let package = package(source.path());
        let materializer = Materializer::new(Some(source.path())).unwrap();
        materializer.materialize(&package, None).unwrap();

        let root = materializer.keep();
        assert!(root.join("0/src/lib.rs").is_file());
        fs::remove_dir_all(root).unwrap();
    }
}
