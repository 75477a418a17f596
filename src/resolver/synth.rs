//! Schema synthesis
//!
//! The recursive build of one schema node. Nodes with a non-empty id are
//! claimed in the registry before building so that self- and mutually
//! referential types terminate; nodes without an id belong to a single
//! parent and are rebuilt each time they are referenced.

use std::sync::Arc;

use log::{trace, warn};

use crate::frontend::ast::{StructType, TypeExpr};
use crate::frontend::unit::Unit;
use crate::resolver::registry::Claim;
use crate::resolver::walk::{Popped, Walk};
use crate::resolver::Resolver;
use crate::types::basic::{self, basic_type};
use crate::types::{Schema, SchemaKind};
use crate::utils::{Error, Result, ResultExt};

/// Result of a synthesis request
#[derive(Debug)]
pub(crate) enum Synth {
    Ready(Arc<Schema>),
    /// The id is still being built further up this call chain
    Pending,
}

impl Synth {
    /// Owned node for inlining; a pending node can only be referenced.
    pub fn into_schema(self, id: &str) -> Schema {
        match self {
            Synth::Ready(node) => Arc::try_unwrap(node).unwrap_or_else(|node| (*node).clone()),
            Synth::Pending => Schema::reference(id),
        }
    }
}

impl Resolver {
    pub(crate) fn synthesize(
        &self,
        unit: &Arc<Unit>,
        expr: &TypeExpr,
        title: &str,
        id: &str,
        walk: &mut Walk,
    ) -> Result<Synth> {
        if id.is_empty() {
            return Ok(Synth::Ready(Arc::new(self.build(unit, expr, title, id, walk)?)));
        }

        if let Some(node) = walk.held(id) {
            return Ok(Synth::Ready(node));
        }
        match self.registry.claim(id, walk) {
            Claim::Built(node) => return Ok(Synth::Ready(node)),
            Claim::Cycle => {
                trace!("{} refers back to itself", id);
                walk.refer_back(id);
                return Ok(Synth::Pending);
            }
            Claim::Claimed => {}
        }

        walk.push(id);
        let built = self.build(unit, expr, title, id, walk);
        let popped = walk.pop();

        match built {
            Ok(node) => {
                let node = Arc::new(node);
                let published = self.settle(walk, popped, Some(Arc::clone(&node)));
                Ok(Synth::Ready(published.unwrap_or(node)))
            }
            Err(err) => {
                self.withdraw(walk, popped, true);
                Err(err)
            }
        }
    }

    /// Publish a finished frame and the nodes held on it, or hand them all to
    /// the unfinished frame they still refer back to.
    pub(crate) fn settle(
        &self,
        walk: &mut Walk,
        popped: Popped,
        node: Option<Arc<Schema>>,
    ) -> Option<Arc<Schema>> {
        if let Some(anchor) = popped.anchor {
            walk.defer(anchor, &popped.id, node.clone(), popped.dependents);
            return node;
        }
        for dep in popped.dependents {
            if let Some(held) = walk.release(&dep) {
                self.registry.complete(&dep, held);
            }
        }
        node.map(|node| self.registry.complete(&popped.id, node))
    }

    /// Drop a failed frame together with every node that referred into it.
    pub(crate) fn withdraw(&self, walk: &mut Walk, popped: Popped, claimed: bool) {
        if claimed {
            self.registry.abandon(&popped.id);
        }
        for dep in popped.dependents {
            if walk.release(&dep).is_some() {
                trace!("dropping {} with {}", dep, popped.id);
                self.registry.abandon(&dep);
            }
        }
    }

    fn build(
        &self,
        unit: &Arc<Unit>,
        expr: &TypeExpr,
        title: &str,
        id: &str,
        walk: &mut Walk,
    ) -> Result<Schema> {
        let expr = self.resolve_ident_expr(expr, unit)?;
        trace!("synthesizing {:?} from {}", id, expr.describe());
        let node = Schema::named(id, title);

        match &expr {
            TypeExpr::Struct(st) => self.build_struct(unit, st, node, title, id, walk),
            TypeExpr::Array(elem, _) => {
                let items = self.resolve_ref(unit, elem, "", "", walk)?;
                Ok(Schema {
                    items: Some(Box::new(items)),
                    ..node.typed(SchemaKind::Array, None)
                })
            }
            TypeExpr::Map { key, value, .. } => {
                self.check_map_key(unit, key)?;
                let values = self.resolve_ref(unit, value, "", "", walk)?;
                Ok(Schema {
                    additional_properties: Some(Box::new(values)),
                    ..node.typed(SchemaKind::Object, None)
                })
            }
            TypeExpr::Qualified { unit: alias, name } => {
                if self.is_timestamp(unit, alias, name) {
                    return basic_node(node, basic::TIMESTAMP);
                }
                let (target, synth) = self.resolve_named(unit, &alias.name, &name.name, walk)?;
                Ok(match synth {
                    Synth::Ready(body) => node.with_body(&body),
                    Synth::Pending => node.with_body(&Schema::reference(&target)),
                })
            }
            // predeclared alias of interface{}
            TypeExpr::Ident(ident) if ident.name == "any" => Ok(node),
            TypeExpr::Ident(ident) => basic_node(node, &ident.name),
            TypeExpr::Interface(_) => Ok(node),
            TypeExpr::Pointer(inner, _) => self.build(unit, inner, title, id, walk),
            TypeExpr::Unsupported { kind, .. } => Err(Error::UnsupportedTypeExpression {
                kind: kind.to_string(),
            }),
        }
    }

    fn build_struct(
        &self,
        unit: &Arc<Unit>,
        st: &StructType,
        node: Schema,
        title: &str,
        id: &str,
        walk: &mut Walk,
    ) -> Result<Schema> {
        let mut node = node.typed(SchemaKind::Object, None);

        for field in &st.fields {
            match &field.name {
                Some(name) => {
                    let (field_title, field_id) =
                        if matches!(field.ty.deref(), TypeExpr::Struct(_)) && !id.is_empty() {
                            (format!("{}_{}", title, name.name), format!("{}_{}", id, name.name))
                        } else {
                            (String::new(), String::new())
                        };
                    let property = self
                        .resolve_ref(unit, &field.ty, &field_title, &field_id, walk)
                        .with_context(|| format!("field {}", name.name))?;
                    node.set_property_if_absent(&name.name, property);
                }
                None => {
                    let embedded = self
                        .embedded_schema(unit, &field.ty, walk)
                        .with_context(|| format!("embedded field {}", field.ty.describe()))?;
                    let Some(embedded) = embedded else {
                        warn!(
                            "embedded {} in {:?} is still being built, its fields are skipped",
                            field.ty.describe(),
                            id
                        );
                        continue;
                    };
                    // declared fields and earlier embeds win
                    for (prop, schema) in embedded.properties.iter().flatten() {
                        node.set_property_if_absent(prop, schema.clone());
                    }
                }
            }
        }
        Ok(node)
    }

    /// Embedded structs are registered under their canonical id like any
    /// other named struct; their properties are then merged by the caller.
    fn embedded_schema(
        &self,
        unit: &Arc<Unit>,
        ty: &TypeExpr,
        walk: &mut Walk,
    ) -> Result<Option<Arc<Schema>>> {
        let target = ty.deref();
        let synth = match target {
            TypeExpr::Ident(ident) => {
                if let TypeExpr::Struct(_) = self.resolve_ident_expr(target, unit)? {
                    let id = format!("{}.{}", unit.name, ident.name);
                    self.synthesize(unit, target, &ident.name, &id, walk)?
                } else {
                    self.synthesize(unit, target, "", "", walk)?
                }
            }
            TypeExpr::Qualified { unit: alias, name } if !self.is_timestamp(unit, alias, name) => {
                self.resolve_named(unit, &alias.name, &name.name, walk)?.1
            }
            _ => self.synthesize(unit, target, "", "", walk)?,
        };
        Ok(match synth {
            Synth::Ready(node) => Some(node),
            Synth::Pending => None,
        })
    }

    fn check_map_key(&self, unit: &Arc<Unit>, key: &TypeExpr) -> Result<()> {
        match self.resolve_ident_expr(key, unit)? {
            TypeExpr::Ident(ident) if basic::is_string_like(&ident.name) => Ok(()),
            _ => Err(Error::UnsupportedKeyType { key: key.describe() }),
        }
    }
}

fn basic_node(node: Schema, name: &str) -> Result<Schema> {
    let (kind, format) = basic_type(name).ok_or_else(|| Error::UnknownBasicType {
        name: name.to_string(),
    })?;
    Ok(node.typed(kind, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::Ident;
    use crate::frontend::module::FsModuleResolver;
    use crate::types::basic::basic_type_names;
    use crate::utils::Span;

    #[test]
    fn test_every_basic_type() {
        let resolver = Resolver::new(FsModuleResolver::new());
        let unit = Arc::new(Unit::new("p", "/src/p", Vec::new()));

        for name in basic_type_names() {
            let expr = TypeExpr::Ident(Ident::new(name, Span::dummy()));
            let node = resolver
                .synthesize(&unit, &expr, "", "", &mut Walk::default())
                .unwrap()
                .into_schema("");
            let (kind, format) = basic_type(name).unwrap();
            assert_eq!(node.kind, Some(kind), "{}", name);
            assert_eq!(node.format.as_deref(), format, "{}", name);
            assert!(node.properties.is_none(), "{}", name);
            assert!(node.id.is_none());
        }
        assert!(resolver.definitions().is_empty());
    }

    #[test]
    fn test_unknown_basic_type() {
        let resolver = Resolver::new(FsModuleResolver::new());
        let unit = Arc::new(Unit::new("p", "/src/p", Vec::new()));
        let expr = TypeExpr::Ident(Ident::new("uint128", Span::dummy()));
        let err = resolver
            .synthesize(&unit, &expr, "", "", &mut Walk::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownBasicType { ref name } if name == "uint128"));
    }
}
