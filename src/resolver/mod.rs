//! Type resolver - turns named Go types into schema definitions
//!
//! A [`Resolver`] owns the compilation unit cache and the definition
//! registry. It is `Sync`; several threads may resolve through one
//! instance and share what the others have already built.

mod cache;
mod ident;
mod reference;
mod registry;
mod synth;
mod walk;

use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::frontend::ast::{ImportSpec, SourceFile, TypeSpec};
use crate::frontend::module::{FsModuleResolver, ModuleResolver};
use crate::frontend::unit::Unit;
use crate::types::{Definitions, Schema};
use crate::utils::{Error, Result, ResultExt};

use cache::UnitCache;
use registry::Registry;
use synth::Synth;
use walk::Walk;

pub struct Resolver {
    modules: Box<dyn ModuleResolver>,
    cache: UnitCache,
    registry: Registry,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(FsModuleResolver::from_env())
    }
}

impl Resolver {
    pub fn new(modules: impl ModuleResolver + 'static) -> Self {
        Self {
            modules: Box::new(modules),
            cache: UnitCache::default(),
            registry: Registry::default(),
        }
    }

    pub fn parse_file(&self, path: &Path) -> Result<Arc<SourceFile>> {
        self.cache.parse_file(path)
    }

    pub fn parse_dir(&self, dir: &Path) -> Result<Vec<Arc<Unit>>> {
        let mut units: Vec<_> = self.cache.parse_dir(dir)?.into_values().collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(units)
    }

    /// Load the unit called `name` from `dir`
    pub fn load_unit(&self, dir: &Path, name: &str) -> Result<Arc<Unit>> {
        self.cache.load_unit(dir, name)
    }

    /// Load the unit an import of `from` refers to
    pub fn import(&self, from: &Unit, spec: &ImportSpec) -> Result<Arc<Unit>> {
        self.import_path(&spec.path, from.dir())
            .with_context(|| format!("importing {:?} from package {}", spec.path, from.name))
    }

    /// Locate an import path (or directory) relative to `from_dir` and load it
    pub fn import_path(&self, path: &str, from_dir: &Path) -> Result<Arc<Unit>> {
        let located = self.modules.locate(path, from_dir)?;
        self.load_unit(&located.dir, &located.unit_name)
    }

    /// Resolve `Name` or `unit.Name` as seen from `unit`.
    ///
    /// Every definition built along the way stays in the registry. On error
    /// the failing definitions are dropped; completed siblings are kept.
    pub fn resolve(&self, unit: &Arc<Unit>, reference: &str) -> Result<Arc<Schema>> {
        let (alias, name) = split_reference(unit, reference)?;
        let mut walk = Walk::default();
        let (id, synth) = self.resolve_named(unit, alias, name, &mut walk)?;
        match synth {
            Synth::Ready(node) => Ok(node),
            // a fresh walk has nothing in flight
            Synth::Pending => self.registry.get(&id).ok_or_else(|| Error::TypeNotFound {
                unit: alias.to_string(),
                name: name.to_string(),
            }),
        }
    }

    /// Every fully built definition
    pub fn definitions(&self) -> Definitions {
        self.registry.definitions()
    }

    /// Forget every definition; parsed units stay cached
    pub fn reset(&self) {
        self.registry.reset();
    }

    /// Find `alias.name` and synthesize it under its canonical id.
    pub(crate) fn resolve_named(
        &self,
        unit: &Arc<Unit>,
        alias: &str,
        name: &str,
        walk: &mut Walk,
    ) -> Result<(String, Synth)> {
        let (owner, spec) = self.lookup_type(unit, alias, name)?;
        let id = format!("{}.{}", owner.name, name);
        let synth = self
            .synthesize(&owner, &spec.declared_type(), name, &id, walk)
            .with_context(|| format!("resolving {}", id))?;
        Ok((id, synth))
    }

    fn lookup_type(
        &self,
        unit: &Arc<Unit>,
        alias: &str,
        name: &str,
    ) -> Result<(Arc<Unit>, Arc<TypeSpec>)> {
        let not_found = || Error::TypeNotFound {
            unit: alias.to_string(),
            name: name.to_string(),
        };

        if alias == unit.name {
            let spec = unit.lookup_type(name).ok_or_else(not_found)?;
            return Ok((Arc::clone(unit), Arc::clone(spec)));
        }

        for spec in unit.imports() {
            let explicit = spec.alias.as_deref();
            match explicit {
                Some("_") => continue,
                Some(a) if a != alias && a != "." => continue,
                _ => {}
            }

            let imported = match self.import(unit, spec) {
                Ok(imported) => imported,
                // only fatal when this import is the one being asked for
                Err(err) if explicit == Some(alias) || spec.base_name() == alias => {
                    return Err(err)
                }
                Err(err) => {
                    debug!("skipping import {:?}: {}", spec.path, err);
                    continue;
                }
            };

            if imported.name != alias && explicit != Some(alias) {
                continue;
            }
            if let Some(ts) = imported.lookup_type(name) {
                debug!("{}.{} found in {}", alias, name, imported.dir().display());
                return Ok((Arc::clone(&imported), Arc::clone(ts)));
            }
        }
        Err(not_found())
    }
}

/// `Name` refers to `unit` itself; `alias.Name` to an import
fn split_reference<'a>(unit: &'a Unit, reference: &'a str) -> Result<(&'a str, &'a str)> {
    let malformed = || Error::MalformedTypeReference {
        reference: reference.to_string(),
    };
    let mut parts = reference.split('.');
    let (alias, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, _) => (unit.name.as_str(), name),
        (Some(alias), Some(name), None) if !alias.is_empty() => (alias, name),
        _ => return Err(malformed()),
    };
    if name.is_empty() {
        return Err(malformed());
    }
    Ok((alias, name))
}
