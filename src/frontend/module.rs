//! Module resolution
//!
//! Maps an import path to the directory holding that package and the
//! package's declared name, the way the Go toolchain lays packages out on
//! disk: relative paths, the enclosing `go.mod` module, `vendor/`
//! directories and finally the configured search roots.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::frontend::parser::package_clause;
use crate::utils::{Error, Result};

/// Where an import path lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub dir: PathBuf,
    pub unit_name: String,
}

/// Locates the package behind an import path
pub trait ModuleResolver: Send + Sync {
    fn locate(&self, import_path: &str, from_dir: &Path) -> Result<Located>;
}

/// Filesystem-backed resolver
#[derive(Debug, Clone, Default)]
pub struct FsModuleResolver {
    /// Roots searched as `<root>/<import path>`
    search_paths: Vec<PathBuf>,
}

impl FsModuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed search roots from `GOPATH` and `GOROOT`
    pub fn from_env() -> Self {
        let mut resolver = Self::new();
        if let Some(gopath) = env::var_os("GOPATH") {
            for entry in env::split_paths(&gopath) {
                resolver.add_search_path(entry.join("src"));
            }
        }
        if let Some(goroot) = env::var_os("GOROOT") {
            resolver.add_search_path(PathBuf::from(goroot).join("src"));
        }
        resolver
    }

    /// Add a search path
    pub fn add_search_path(&mut self, path: PathBuf) {
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn find_package_dir(&self, import_path: &str, from_dir: &Path) -> Option<PathBuf> {
        let path = Path::new(import_path);
        if path.is_absolute() {
            return Some(path.to_path_buf()).filter(|p| p.is_dir());
        }
        if import_path == "." || import_path.starts_with("./") || import_path.starts_with("../")
            || import_path == ".."
        {
            return Some(from_dir.join(path)).filter(|p| p.is_dir());
        }

        if let Some((root, module)) = find_go_mod(from_dir) {
            if import_path == module {
                return Some(root);
            }
            if let Some(rest) = import_path.strip_prefix(&format!("{}/", module)) {
                let dir = root.join(rest);
                if dir.is_dir() {
                    return Some(dir);
                }
            }
        }

        for dir in from_dir.ancestors() {
            let vendored = dir.join("vendor").join(import_path);
            if vendored.is_dir() {
                return Some(vendored);
            }
        }

        self.search_paths
            .iter()
            .map(|root| root.join(import_path))
            .find(|p| p.is_dir())
    }
}

impl ModuleResolver for FsModuleResolver {
    fn locate(&self, import_path: &str, from_dir: &Path) -> Result<Located> {
        let not_found = || Error::UnitNotFound {
            import_path: import_path.to_string(),
            from: from_dir.to_path_buf(),
        };
        let dir = self.find_package_dir(import_path, from_dir).ok_or_else(not_found)?;
        let unit_name = package_name(&dir)?.ok_or_else(not_found)?;
        debug!("located {:?} at {} (package {})", import_path, dir.display(), unit_name);
        Ok(Located { dir, unit_name })
    }
}

/// Go source files of a directory, sorted
pub fn go_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "go") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Package name declared by the first non-test file of `dir`
fn package_name(dir: &Path) -> Result<Option<String>> {
    for path in go_files(dir)? {
        if path.to_string_lossy().ends_with("_test.go") {
            continue;
        }
        let source = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        if let Some(name) = package_clause(&source) {
            return Ok(Some(name));
        }
    }
    Ok(None)
}

/// Nearest `go.mod` at or above `dir`: (module root, module path)
fn find_go_mod(dir: &Path) -> Option<(PathBuf, String)> {
    dir.ancestors().find_map(|d| {
        let source = fs::read_to_string(d.join("go.mod")).ok()?;
        source.lines().find_map(|line| {
            let module = line.trim().strip_prefix("module")?.trim();
            let module = module.trim_matches('"');
            (!module.is_empty()).then(|| (d.to_path_buf(), module.to_string()))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_locate_through_go_mod() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(&root.join("go.mod"), "module example.com/app\n\ngo 1.21\n");
        write(&root.join("api/api.go"), "package api\n");
        write(&root.join("models/models.go"), "// Package models\npackage model\n");

        let resolver = FsModuleResolver::new();
        let located = resolver.locate("example.com/app/models", &root.join("api")).unwrap();
        assert_eq!(located.dir, root.join("models"));
        assert_eq!(located.unit_name, "model");
    }

    #[test]
    fn test_locate_relative_vendor_and_search_path() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(&root.join("app/main.go"), "package main\n");
        write(&root.join("app/vendor/github.com/x/y/y.go"), "package y\n");
        write(&root.join("gopath/src/lib/z/z_test.go"), "package z_test\n");
        write(&root.join("gopath/src/lib/z/z.go"), "package z\n");

        let mut resolver = FsModuleResolver::new();
        resolver.add_search_path(root.join("gopath/src"));

        let app = root.join("app");
        assert_eq!(resolver.locate(".", &app).unwrap().unit_name, "main");
        assert_eq!(resolver.locate("github.com/x/y", &app).unwrap().unit_name, "y");
        assert_eq!(resolver.locate("lib/z", &app).unwrap().unit_name, "z");
    }

    #[test]
    fn test_locate_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let err = FsModuleResolver::new()
            .locate("nowhere/pkg", tmp.path())
            .unwrap_err();
        assert!(matches!(err, Error::UnitNotFound { ref import_path, .. } if import_path == "nowhere/pkg"));
    }
}
