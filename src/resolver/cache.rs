//! Compilation unit cache
//!
//! Parsed files are cached by path and loaded units by `(directory, name)`.
//! Both caches are append-only for the resolver's lifetime.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::frontend::ast::SourceFile;
use crate::frontend::module::go_files;
use crate::frontend::parser::parse_source;
use crate::frontend::unit::Unit;
use crate::utils::{Error, Result};

#[derive(Debug, Default)]
pub(crate) struct UnitCache {
    next_file_id: AtomicUsize,
    files: Mutex<HashMap<PathBuf, Arc<SourceFile>>>,
    units: Mutex<HashMap<(PathBuf, String), Arc<Unit>>>,
}

impl UnitCache {
    pub fn parse_file(&self, path: &Path) -> Result<Arc<SourceFile>> {
        if let Some(file) = self.files.lock().get(path) {
            return Ok(Arc::clone(file));
        }

        let source = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        // id 0 is left to synthetic spans
        let file_id = self.next_file_id.fetch_add(1, Ordering::Relaxed) + 1;
        let file = Arc::new(parse_source(path, &source, file_id)?);
        debug!("parsed {} as file {}", file.path.display(), file.file_id);

        let mut files = self.files.lock();
        Ok(Arc::clone(files.entry(path.to_path_buf()).or_insert(file)))
    }

    /// Every unit declared by the `.go` files of `dir`, keyed by name
    pub fn parse_dir(&self, dir: &Path) -> Result<HashMap<String, Arc<Unit>>> {
        let mut groups: BTreeMap<String, Vec<Arc<SourceFile>>> = BTreeMap::new();
        for path in go_files(dir)? {
            let file = self.parse_file(&path)?;
            groups.entry(file.package.name.clone()).or_default().push(file);
        }
        Ok(groups
            .into_iter()
            .map(|(name, files)| (name.clone(), Arc::new(Unit::new(name, dir, files))))
            .collect())
    }

    pub fn load_unit(&self, dir: &Path, name: &str) -> Result<Arc<Unit>> {
        let dir = dir.canonicalize().map_err(|e| Error::io(dir, e))?;
        let key = (dir.clone(), name.to_string());
        if let Some(unit) = self.units.lock().get(&key) {
            return Ok(Arc::clone(unit));
        }

        let mut units = self.parse_dir(&dir)?;
        let unit = match units.remove(name) {
            Some(unit) => unit,
            None => {
                let mut found: Vec<_> = units.into_keys().collect();
                found.sort();
                return Err(Error::UnitAmbiguous {
                    name: name.to_string(),
                    dir,
                    found,
                });
            }
        };
        debug!("loaded package {} from {} ({} files)", name, dir.display(), unit.files.len());

        let mut cached = self.units.lock();
        Ok(Arc::clone(cached.entry(key).or_insert(unit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_cached_by_dir_and_name() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.go"), "package p\ntype A struct{}\n").unwrap();
        fs::write(tmp.path().join("a_test.go"), "package p_test\ntype T struct{}\n").unwrap();

        let cache = UnitCache::default();
        let units = cache.parse_dir(tmp.path()).unwrap();
        let mut names: Vec<_> = units.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["p", "p_test"]);

        let first = cache.load_unit(tmp.path(), "p").unwrap();
        let second = cache.load_unit(&tmp.path().join("."), "p").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.lookup_type("A").is_some());

        // files are shared with the earlier parse_dir
        let file = cache.parse_file(&first.files[0].path).unwrap();
        assert!(Arc::ptr_eq(&file, &first.files[0]));
    }

    #[test]
    fn test_missing_package_name() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.go"), "package p\n").unwrap();

        let err = UnitCache::default().load_unit(tmp.path(), "q").unwrap_err();
        assert!(matches!(err, Error::UnitAmbiguous { ref found, .. } if found == &vec!["p".to_string()]));
    }
}
