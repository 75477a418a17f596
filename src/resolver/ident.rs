//! Identifier resolution

use std::sync::Arc;

use crate::frontend::ast::{Decl, Ident, TypeExpr, TypeSpec};
use crate::frontend::unit::Unit;
use crate::resolver::Resolver;
use crate::utils::{Error, Result};

impl Resolver {
    /// Strip pointers and follow identifiers to their declared type.
    ///
    /// Named types declared through other named types are followed until a
    /// non-identifier or an undeclared name (a basic type probe) is reached.
    pub(crate) fn resolve_ident_expr(&self, expr: &TypeExpr, unit: &Unit) -> Result<TypeExpr> {
        let mut current = expr.deref().clone();
        let mut followed: Vec<String> = Vec::new();
        while let TypeExpr::Ident(ident) = &current {
            if followed.contains(&ident.name) {
                break;
            }
            let Some(spec) = self.lookup_ident(ident, unit)? else {
                break;
            };
            followed.push(ident.name.clone());
            current = spec.declared_type().deref().clone();
        }
        Ok(current)
    }

    /// File scope of the identifier first, then the unit's type index.
    fn lookup_ident(&self, ident: &Ident, unit: &Unit) -> Result<Option<Arc<TypeSpec>>> {
        let bound = unit
            .file(ident.span.file_id)
            .and_then(|file| file.lookup(&ident.name));
        match bound {
            Some(Decl::Type(spec)) => Ok(Some(Arc::clone(spec))),
            Some(other) => Err(Error::NotATypeDeclaration {
                name: ident.name.clone(),
                found: other.kind(),
            }),
            None => Ok(unit.lookup_type(&ident.name).cloned()),
        }
    }

    /// `time.Time`, also when `time` is imported under another name
    pub(crate) fn is_timestamp(&self, unit: &Unit, alias: &Ident, name: &Ident) -> bool {
        if name.name != "Time" {
            return false;
        }
        if alias.name == "time" {
            return true;
        }
        unit.file(alias.span.file_id).is_some_and(|file| {
            file.imports
                .iter()
                .any(|i| i.path == "time" && i.alias.as_deref() == Some(alias.name.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::module::FsModuleResolver;
    use crate::frontend::parser::parse_source;
    use std::path::Path;

    fn unit(sources: &[&str]) -> Unit {
        let files = sources
            .iter()
            .enumerate()
            .map(|(i, src)| {
                let name = format!("f{}.go", i);
                Arc::new(parse_source(Path::new(&name), src, i + 1).unwrap())
            })
            .collect();
        Unit::new("p", "/src/p", files)
    }

    fn field_type(unit: &Unit, ty: &str, field: usize) -> TypeExpr {
        match unit.lookup_type(ty).map(|s| &s.ty) {
            Some(TypeExpr::Struct(st)) => st.fields[field].ty.clone(),
            other => panic!("{} is not a struct: {:?}", ty, other),
        }
    }

    #[test]
    fn test_follows_pointers_and_named_chains() {
        let unit = unit(&[
            "package p\ntype S struct{ A *Chain; B **Leaf; C string }\n",
            "package p\ntype Chain Middle\ntype Middle *Leaf\ntype Leaf struct{ V int }\n",
        ]);
        let resolver = Resolver::new(FsModuleResolver::new());

        for i in 0..2 {
            let resolved = resolver.resolve_ident_expr(&field_type(&unit, "S", i), &unit).unwrap();
            assert!(matches!(resolved, TypeExpr::Struct(_)), "field {}", i);
        }
        let basic = resolver.resolve_ident_expr(&field_type(&unit, "S", 2), &unit).unwrap();
        assert!(matches!(basic, TypeExpr::Ident(ref id) if id.name == "string"));
    }

    #[test]
    fn test_value_in_file_scope_is_not_a_type() {
        let unit = unit(&["package p\nconst Limit = 3\ntype S struct{ L Limit }\n"]);
        let resolver = Resolver::new(FsModuleResolver::new());
        let err = resolver
            .resolve_ident_expr(&field_type(&unit, "S", 0), &unit)
            .unwrap_err();
        assert!(matches!(err, Error::NotATypeDeclaration { ref name, found: "const" } if name == "Limit"));
    }

    #[test]
    fn test_named_cycle_terminates() {
        let unit = unit(&["package p\ntype A B\ntype B A\ntype S struct{ X A }\n"]);
        let resolver = Resolver::new(FsModuleResolver::new());
        let resolved = resolver.resolve_ident_expr(&field_type(&unit, "S", 0), &unit).unwrap();
        assert!(matches!(resolved, TypeExpr::Ident(_)));
    }

    #[test]
    fn test_timestamp_aliases() {
        let unit = unit(&["package p\nimport t \"time\"\ntype S struct{ A t.Time; B time.Time; C t.Duration }\n"]);
        let resolver = Resolver::new(FsModuleResolver::new());
        let check = |i: usize| match field_type(&unit, "S", i) {
            TypeExpr::Qualified { unit: alias, name } => resolver.is_timestamp(&unit, &alias, &name),
            other => panic!("not qualified: {:?}", other),
        };
        assert!(check(0));
        assert!(check(1));
        assert!(!check(2));
    }
}
