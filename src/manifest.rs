//! Cargo manifests for copies of a package
//!
//! Mutants are built away from the package's own directory, so the manifest
//! written next to them cannot lean on that location. Relative `path`
//! dependencies are made absolute, and the copy is declared its own
//! workspace root so Cargo never attaches it to an enclosing workspace.

use std::path::Path;

use toml::{Table, Value};

use crate::error::{MutationError, Result};

/// Tables that list dependencies, at the top level or under `[target.<cfg>]`
const DEPENDENCY_TABLES: [&str; 5] = [
    "dependencies",
    "dev-dependencies",
    "build-dependencies",
    "dev_dependencies",
    "build_dependencies",
];

/// `[workspace]` keys naming other packages of the workspace
const MEMBER_KEYS: [&str; 3] = ["members", "default-members", "exclude"];

/// Rewrite the manifest `source` of the package at `package_root`, which
/// must be absolute, so it builds from any directory.
pub fn isolate(package_root: &Path, source: &str) -> Result<String> {
    let manifest_path = package_root.join("Cargo.toml");
    let mut manifest: Table = source.parse().map_err(|e: toml::de::Error| {
        MutationError::config(format!(
            "invalid manifest '{}': {}",
            manifest_path.display(),
            e.to_string().replace('\n', " ")
        ))
    })?;

    match manifest.get_mut("workspace") {
        Some(Value::Table(workspace)) => {
            for key in MEMBER_KEYS {
                workspace.remove(key);
            }
            if let Some(Value::Table(deps)) = workspace.get_mut("dependencies") {
                absolutize_paths(deps, package_root);
            }
        }
        Some(_) => {
            return Err(MutationError::config(format!(
                "invalid manifest '{}': `workspace` must be a table",
                manifest_path.display()
            )))
        }
        None => {
            if let Some(key) = find_inherited(&manifest, "") {
                return Err(MutationError::config(format!(
                    "'{}' inherits `{key}` from an enclosing workspace; only packages that \
                     are their own workspace root can be copied",
                    manifest_path.display()
                )));
            }
            manifest.insert("workspace".to_string(), Value::Table(Table::new()));
        }
    }

    if let Some(Value::Table(package)) = manifest.get_mut("package") {
        package.remove("workspace");
    }

    for deps in dependency_tables(&mut manifest) {
        absolutize_paths(deps, package_root);
    }

    toml::to_string(&manifest).map_err(|e| {
        MutationError::config(format!(
            "cannot rewrite manifest '{}': {}",
            manifest_path.display(),
            e
        ))
    })
}

/// Every table whose entries are dependency specifications
fn dependency_tables(manifest: &mut Table) -> Vec<&mut Table> {
    let mut tables = Vec::new();
    for (key, value) in manifest.iter_mut() {
        let key = key.as_str();
        let Value::Table(table) = value else {
            continue;
        };
        if DEPENDENCY_TABLES.contains(&key) {
            tables.push(table);
        } else if key == "target" {
            for platform in table
                .iter_mut()
                .map(|(_, v)| v)
                .filter_map(Value::as_table_mut)
            {
                tables.extend(platform.iter_mut().filter_map(|(key, value)| match value {
                    Value::Table(deps) if DEPENDENCY_TABLES.contains(&key.as_str()) => Some(deps),
                    _ => None,
                }));
            }
        } else if key == "patch" {
            tables.extend(
                table
                    .iter_mut()
                    .map(|(_, v)| v)
                    .filter_map(Value::as_table_mut),
            );
        } else if key == "replace" {
            tables.push(table);
        }
    }
    tables
}

fn absolutize_paths(deps: &mut Table, package_root: &Path) {
    for dep in deps.iter_mut().map(|(_, v)| v) {
        let Some(Value::String(path)) = dep.as_table_mut().and_then(|dep| dep.get_mut("path"))
        else {
            continue;
        };
        if Path::new(path.as_str()).is_relative() {
            *path = package_root.join(path.as_str()).display().to_string();
        }
    }
}

/// Dotted key of the first `{ workspace = true }` entry
fn find_inherited(table: &Table, prefix: &str) -> Option<String> {
    for (key, value) in table {
        let Value::Table(inner) = value else {
            continue;
        };
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if inner.get("workspace").and_then(Value::as_bool) == Some(true) {
            return Some(path);
        }
        if let Some(found) = find_inherited(inner, &path) {
            return Some(found);
        }
    }
    None
}
