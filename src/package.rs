//! Loading the package under test
//!
//! A package is a Cargo package directory. Rust files below `src/` form the
//! primary sources, the ones that get mutated. Every other Rust file (`tests/`,
//! `benches/`, `build.rs`, ...) is a companion source: it is written out with
//! each mutant so the mutant builds and tests as a whole, but never mutated.
//! So are files below `src/` that only hold test code: those marked
//! `#![cfg(test)]` and those declared by a `#[cfg(test)] mod name;`.
//! `Cargo.toml` is rewritten for building elsewhere; everything else
//! (`Cargo.lock`, data files) is copied as is.

use std::path::{Component, Path, PathBuf};

use syn::ext::IdentExt;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{MutationError, Result};
use crate::manifest;
use crate::walker::is_test_only;

/// Whether a source file is mutated or only carried along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    Primary,
    Companion,
}

/// A parsed Rust source file of the package
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the package root
    pub path: PathBuf,
    pub role: FileRole,
    pub ast: syn::File,
}

/// A parsed Cargo package
#[derive(Debug)]
pub struct Package {
    pub name: String,
    pub root: PathBuf,
    /// Rust sources, ordered by path
    pub sources: Vec<SourceFile>,
    /// `Cargo.toml`, made independent of the package's location
    pub manifest: String,
    /// Other non-Rust files relative to the root, ordered by path
    pub support_files: Vec<PathBuf>,
}

impl Package {
    /// Locate `package` below `workspace_root` and check it looks like a Cargo package
    pub fn resolve(workspace_root: &Path, package: &Path) -> Result<PathBuf> {
        if !workspace_root.is_dir() {
            return Err(MutationError::config(format!(
                "workspace root '{}' is not a directory",
                workspace_root.display()
            )));
        }

        let dir = workspace_root.join(package);
        if !dir.is_dir() {
            return Err(MutationError::config(format!(
                "package '{}' not found under '{}'",
                package.display(),
                workspace_root.display()
            )));
        }
        if !dir.join("Cargo.toml").is_file() {
            return Err(MutationError::config(format!(
                "'{}' has no Cargo.toml",
                dir.display()
            )));
        }

        Ok(dir)
    }

    /// Read and parse every file of the package at `root`
    pub fn load(root: &Path) -> Result<Self> {
        let root = root.canonicalize().map_err(|e| MutationError::FileRead {
            file: root.to_path_buf(),
            error: e.to_string(),
        })?;
        let root = root.as_path();
        let manifest_path = root.join("Cargo.toml");
        let manifest = std::fs::read_to_string(&manifest_path).map_err(|e| {
            MutationError::FileRead {
                file: manifest_path.clone(),
                error: e.to_string(),
            }
        })?;
        let manifest = manifest::isolate(root, &manifest)?;

        let mut sources = Vec::new();
        let mut support_files = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry));

        for entry in walker {
            let entry = entry.map_err(|e| MutationError::FileRead {
                file: e.path().unwrap_or(root).to_path_buf(),
                error: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();

            if relative.extension().is_some_and(|ext| ext == "rs") {
                let source =
                    std::fs::read_to_string(entry.path()).map_err(|e| MutationError::FileRead {
                        file: entry.path().to_path_buf(),
                        error: e.to_string(),
                    })?;
                sources.push(SourceFile::parse(relative, &source)?);
            } else if relative != Path::new("Cargo.toml") {
                support_files.push(relative);
            }
        }
        demote_test_modules(&mut sources);

        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        let package = Package {
            name,
            root: root.to_path_buf(),
            sources,
            manifest,
            support_files,
        };
        debug!(
            package = %package.name,
            primary = package.primary_files().count(),
            sources = package.sources.len(),
            support = package.support_files.len(),
            "loaded package"
        );
        Ok(package)
    }

    /// Sources that get mutated, with their index into `sources`
    pub fn primary_files(&self) -> impl Iterator<Item = (usize, &SourceFile)> {
        self.sources
            .iter()
            .enumerate()
            .filter(|(_, file)| file.role == FileRole::Primary)
    }
}

impl SourceFile {
    /// Parse `source`, assigning the role from the relative `path`
    pub fn parse(path: PathBuf, source: &str) -> Result<Self> {
        let ast = syn::parse_file(source).map_err(|e| MutationError::Parse {
            file: path.clone(),
            error: format!("line {}: {}", e.span().start().line, e),
        })?;

        let role = match path.components().next() {
            Some(Component::Normal(first)) if first == "src" => FileRole::Primary,
            _ => FileRole::Companion,
        };

        Ok(Self { path, role, ast })
    }
}

/// Turn primary files that only hold test code into companions
fn demote_test_modules(sources: &mut [SourceFile]) {
    let mut pending = Vec::new();
    for file in sources.iter().filter(|file| file.role == FileRole::Primary) {
        if is_test_only(&file.ast.attrs) {
            pending.push(file.path.clone());
        }
        pending.extend(declared_modules(file, true));
    }

    // Everything a test-only file declares is test-only too
    while let Some(path) = pending.pop() {
        let Some(file) = sources
            .iter_mut()
            .find(|file| file.path == path && file.role == FileRole::Primary)
        else {
            continue;
        };
        file.role = FileRole::Companion;
        debug!(file = %file.path.display(), "skipping test-only file");
        pending.extend(declared_modules(file, false));
    }
}

/// Candidate files of the out-of-line `mod name;` items of `file`
fn declared_modules(file: &SourceFile, test_only: bool) -> Vec<PathBuf> {
    let dir = module_dir(&file.path);
    file.ast
        .items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Mod(module)
                if module.content.is_none() && (!test_only || is_test_only(&module.attrs)) =>
            {
                Some(module.ident.unraw().to_string())
            }
            _ => None,
        })
        .flat_map(|name| [dir.join(format!("{name}.rs")), dir.join(name).join("mod.rs")])
        .collect()
}

/// Directory holding the child modules of the file at `path`
fn module_dir(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    match path.file_stem().and_then(|stem| stem.to_str()) {
        Some("lib" | "main" | "mod") => parent.to_path_buf(),
        _ if parent.ends_with("src/bin") => parent.to_path_buf(),
        Some(stem) => parent.join(stem),
        None => parent.to_path_buf(),
    }
}

/// Build output and hidden directories never belong to a mutant
fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || (entry.depth() == 1 && entry.file_type().is_dir() && name == "target")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_classifies_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Cargo.toml", "[package]\nname = \"demo\"\n");
        write(root, "src/lib.rs", "pub mod util;\n");
        write(root, "src/util.rs", "pub fn one() -> u8 { 1 }\n");
        write(root, "tests/it.rs", "#[test]\nfn works() {}\n");
        write(root, "build.rs", "fn main() {}\n");
        write(root, "data/words.txt", "hello\n");
        write(root, "target/debug/junk.rs", "this is not rust");
        write(root, ".git/config", "");

        let package = Package::load(root).unwrap();

        let sources: Vec<_> = package
            .sources
            .iter()
            .map(|f| (f.path.clone(), f.role))
            .collect();
        assert_eq!(
            sources,
            vec![
                (PathBuf::from("build.rs"), FileRole::Companion),
                (PathBuf::from("src/lib.rs"), FileRole::Primary),
                (PathBuf::from("src/util.rs"), FileRole::Primary),
                (PathBuf::from("tests/it.rs"), FileRole::Companion),
            ]
        );
        assert_eq!(package.support_files, vec![PathBuf::from("data/words.txt")]);
        assert!(package.manifest.contains("[workspace]"), "{}", package.manifest);
        assert_eq!(package.primary_files().count(), 2);
    }

    #[test]
    fn test_test_only_files_are_companions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "Cargo.toml", "[package]\nname = \"demo\"\n");
        write(
            root,
            "src/lib.rs",
            "pub mod util;\nmod checks;\n\n#[cfg(test)]\nmod tests;\n",
        );
        write(root, "src/util.rs", "pub fn one() -> u8 { 1 }\n");
        write(root, "src/checks.rs", "#![cfg(test)]\nfn helper(x: bool) -> u8 { if x { 1 } else { 0 } }\n");
        write(root, "src/tests.rs", "mod fixtures;\nfn helper(x: bool) -> u8 { if x { 1 } else { 0 } }\n");
        write(root, "src/tests/fixtures.rs", "pub fn data() -> u8 { 3 }\n");

        let package = Package::load(root).unwrap();

        let primary: Vec<_> = package
            .primary_files()
            .map(|(_, file)| file.path.clone())
            .collect();
        assert_eq!(
            primary,
            vec![PathBuf::from("src/lib.rs"), PathBuf::from("src/util.rs")]
        );
        assert_eq!(package.sources.len(), 5);
    }

    #[test]
    fn test_module_dir() {
        assert_eq!(module_dir(Path::new("src/lib.rs")), PathBuf::from("src"));
        assert_eq!(module_dir(Path::new("src/a/mod.rs")), PathBuf::from("src/a"));
        assert_eq!(module_dir(Path::new("src/a.rs")), PathBuf::from("src/a"));
        assert_eq!(module_dir(Path::new("src/bin/tool.rs")), PathBuf::from("src/bin"));
    }

    #[cfg(unix)]
    #[test]
    fn test_manifest_paths_are_absolute() {
        let workspace = tempfile::tempdir().unwrap();
        write(
            workspace.path(),
            "app/Cargo.toml",
            "[package]\nname = \"app\"\n\n[dependencies]\nhelper = { path = \"../helper\" }\n",
        );
        write(workspace.path(), "app/src/lib.rs", "");

        let package = Package::load(&workspace.path().join("app")).unwrap();

        let root = workspace.path().canonicalize().unwrap();
        let expected = root.join("app").join("../helper");
        assert_eq!(package.root, root.join("app"));
        assert!(
            package.manifest.contains(&expected.display().to_string()),
            "{}",
            package.manifest
        );
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Cargo.toml", "[package]\nname = \"demo\"\n");
        write(dir.path(), "src/lib.rs", "fn broken( {");

        let err = Package::load(dir.path()).unwrap_err();
        assert!(matches!(err, MutationError::Parse { ref file, .. } if file == Path::new("src/lib.rs")));
    }

    #[test]
    fn test_resolve() {
        let workspace = tempfile::tempdir().unwrap();
        write(workspace.path(), "good/Cargo.toml", "");
        fs::create_dir_all(workspace.path().join("bare")).unwrap();

        let dir = Package::resolve(workspace.path(), Path::new("good")).unwrap();
        assert_eq!(dir, workspace.path().join("good"));

        for missing in ["bare", "absent"] {
            let err = Package::resolve(workspace.path(), Path::new(missing)).unwrap_err();
            assert_eq!(err.category(), "configuration");
        }

        let err = Package::resolve(&workspace.path().join("nope"), Path::new("good")).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }
}
