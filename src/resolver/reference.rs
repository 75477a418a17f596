//! Type references: decide between a `$ref` to a named definition and an
//! inlined schema.

use std::sync::Arc;

use crate::frontend::ast::{Ident, TypeExpr};
use crate::frontend::unit::Unit;
use crate::resolver::registry::Claim;
use crate::resolver::walk::Walk;
use crate::resolver::Resolver;
use crate::types::Schema;
use crate::utils::Result;

impl Resolver {
    /// Schema for a field or element type.
    ///
    /// Struct types named by an identifier always use their canonical id
    /// `unit.Name`; unnamed structs use the proposed id, or are inlined when
    /// there is none. Named slices and maps are inlined. Qualified types other than `time.Time` are resolved in
    /// their own unit and referenced by their canonical id.
    pub(crate) fn resolve_ref(
        &self,
        unit: &Arc<Unit>,
        expr: &TypeExpr,
        title: &str,
        id: &str,
        walk: &mut Walk,
    ) -> Result<Schema> {
        let bare = match expr.deref() {
            TypeExpr::Ident(ident) => Some(ident),
            _ => None,
        };
        let resolved = self.resolve_ident_expr(expr, unit)?;

        match (&resolved, bare) {
            (TypeExpr::Struct(_), _) => {
                let (title, id) = match bare {
                    Some(ident) => (ident.name.clone(), format!("{}.{}", unit.name, ident.name)),
                    None => (title.to_string(), id.to_string()),
                };
                if id.is_empty() {
                    return Ok(self.synthesize(unit, &resolved, "", "", walk)?.into_schema(""));
                }
                self.synthesize(unit, &resolved, &title, &id, walk)?;
                Ok(Schema::reference(&id))
            }
            (TypeExpr::Qualified { unit: alias, name }, _) if !self.is_timestamp(unit, alias, name) => {
                let (id, _) = self.resolve_named(unit, &alias.name, &name.name, walk)?;
                Ok(Schema::reference(&id))
            }
            (TypeExpr::Array(..) | TypeExpr::Map { .. }, Some(ident)) => {
                self.resolve_composite(unit, ident, &resolved, title, id, walk)
            }
            _ => Ok(self.synthesize(unit, &resolved, title, id, walk)?.into_schema(id)),
        }
    }

    /// Named slice and map types are inlined. One that contains itself is
    /// also registered under its canonical id, and the inner occurrence
    /// becomes a `$ref` to that definition.
    fn resolve_composite(
        &self,
        unit: &Arc<Unit>,
        ident: &Ident,
        resolved: &TypeExpr,
        title: &str,
        id: &str,
        walk: &mut Walk,
    ) -> Result<Schema> {
        let named = format!("{}.{}", unit.name, ident.name);
        if walk.contains(&named) {
            walk.refer_back(&named);
            return Ok(Schema::reference(&named));
        }

        walk.push(&named);
        let built = self.synthesize(unit, resolved, title, id, walk);
        let popped = walk.pop();
        let node = match built {
            Ok(synth) => synth.into_schema(id),
            Err(err) => {
                // never claimed unless recursive and finished
                self.withdraw(walk, popped, false);
                return Err(err);
            }
        };

        let mut definition = None;
        if popped.recursive && !walk.is_held(&named) {
            if let Claim::Claimed = self.registry.claim(&named, walk) {
                definition = Some(Arc::new(Schema::named(&named, &ident.name).with_body(&node)));
            }
        }
        self.settle(walk, popped, definition);
        Ok(node)
    }
}
