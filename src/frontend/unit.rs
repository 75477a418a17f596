//! Compilation units (Go packages)

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::frontend::ast::{ImportSpec, SourceFile, TypeSpec};

/// A parsed group of files sharing one package namespace
#[derive(Debug)]
pub struct Unit {
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<Arc<SourceFile>>,
    types: OnceLock<HashMap<String, Arc<TypeSpec>>>,
}

impl Unit {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, files: Vec<Arc<SourceFile>>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            files,
            types: OnceLock::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name index of the unit's type declarations, built on first use.
    /// The first declaration of a name (in file order) wins.
    pub fn types(&self) -> &HashMap<String, Arc<TypeSpec>> {
        self.types.get_or_init(|| {
            let mut index = HashMap::new();
            for file in &self.files {
                for ts in file.type_specs() {
                    index
                        .entry(ts.name.name.clone())
                        .or_insert_with(|| Arc::clone(ts));
                }
            }
            index
        })
    }

    pub fn lookup_type(&self, name: &str) -> Option<&Arc<TypeSpec>> {
        self.types().get(name)
    }

    /// The file an identifier was written in, by span file id
    pub fn file(&self, file_id: usize) -> Option<&Arc<SourceFile>> {
        self.files.iter().find(|f| f.file_id == file_id)
    }

    /// Every import of every file, first occurrence of each path only
    pub fn imports(&self) -> Vec<&ImportSpec> {
        let mut seen = Vec::new();
        let mut imports = Vec::new();
        for spec in self.files.iter().flat_map(|f| f.imports.iter()) {
            let key = (spec.alias.as_deref(), spec.path.as_str());
            if !seen.contains(&key) {
                seen.push(key);
                imports.push(spec);
            }
        }
        imports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_source;

    fn file(name: &str, source: &str, id: usize) -> Arc<SourceFile> {
        Arc::new(parse_source(Path::new(name), source, id).unwrap())
    }

    #[test]
    fn test_type_index_spans_files() {
        let unit = Unit::new(
            "p",
            "/src/p",
            vec![
                file("a.go", "package p\nimport \"time\"\ntype A struct{ B B }\nconst C = 1\n", 1),
                file("b.go", "package p\nimport \"time\"\ntype B struct{ T time.Time }\n", 2),
            ],
        );
        let mut names: Vec<_> = unit.types().keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);
        assert!(unit.lookup_type("C").is_none());
        assert_eq!(unit.file(2).map(|f| f.path.clone()), Some(PathBuf::from("b.go")));
        assert_eq!(unit.imports().len(), 1);
    }
}
