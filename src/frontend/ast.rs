//! Abstract Syntax Tree for Go type declarations
//!
//! Only the parts of a Go file that matter for schema synthesis are kept:
//! the package clause, imports, the names bound at file scope and the full
//! type expression of every type declaration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::utils::Span;

/// A parsed source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file_id: usize,
    pub package: Ident,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
    /// File-scope names, indexing into `decls`
    pub scope: HashMap<String, usize>,
}

impl SourceFile {
    /// Look up a name bound at this file's top level
    pub fn lookup(&self, name: &str) -> Option<&Decl> {
        self.scope.get(name).map(|&i| &self.decls[i])
    }

    /// Iterate the type declarations of this file in source order
    pub fn type_specs(&self) -> impl Iterator<Item = &Arc<TypeSpec>> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Type(ts) => Some(ts),
            _ => None,
        })
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

/// Import declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSpec {
    /// Explicit name: an alias, `.` or `_`
    pub alias: Option<String>,
    pub path: String,
}

impl ImportSpec {
    /// Last element of the import path, the conventional package name
    pub fn base_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A top-level name binding
#[derive(Debug, Clone)]
pub enum Decl {
    Type(Arc<TypeSpec>),
    Var(Ident),
    Const(Ident),
    Func(Ident),
}

impl Decl {
    pub fn name(&self) -> &Ident {
        match self {
            Decl::Type(ts) => &ts.name,
            Decl::Var(id) | Decl::Const(id) | Decl::Func(id) => id,
        }
    }

    /// Human-readable declaration kind
    pub fn kind(&self) -> &'static str {
        match self {
            Decl::Type(_) => "type",
            Decl::Var(_) => "var",
            Decl::Const(_) => "const",
            Decl::Func(_) => "func",
        }
    }
}

/// Type declaration: `type Name[Params] Type` or `type Name = Type`
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: Ident,
    pub type_params: Vec<Ident>,
    pub ty: TypeExpr,
    pub span: Span,
}

impl TypeSpec {
    /// The declared type as seen by a use site. Parameterized declarations
    /// cannot be resolved without instantiation.
    pub fn declared_type(&self) -> TypeExpr {
        if self.type_params.is_empty() {
            self.ty.clone()
        } else {
            TypeExpr::Unsupported {
                kind: UnsupportedKind::Generic,
                span: self.span,
            }
        }
    }
}

/// Type expressions as written at a use site
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    Ident(Ident),
    Pointer(Box<TypeExpr>, Span),
    Struct(StructType),
    /// Slices and fixed-length arrays
    Array(Box<TypeExpr>, Span),
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        span: Span,
    },
    /// `unit.Name`, a reference into another compilation unit
    Qualified { unit: Ident, name: Ident },
    Interface(Span),
    Unsupported { kind: UnsupportedKind, span: Span },
}

impl TypeExpr {
    /// Strip every pointer layer
    pub fn deref(&self) -> &TypeExpr {
        let mut expr = self;
        while let TypeExpr::Pointer(inner, _) = expr {
            expr = inner;
        }
        expr
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            TypeExpr::Ident(id) => id.name.clone(),
            TypeExpr::Pointer(inner, _) => format!("*{}", inner.describe()),
            TypeExpr::Struct(_) => "struct{...}".to_string(),
            TypeExpr::Array(elem, _) => format!("[]{}", elem.describe()),
            TypeExpr::Map { key, value, .. } => {
                format!("map[{}]{}", key.describe(), value.describe())
            }
            TypeExpr::Qualified { unit, name } => format!("{}.{}", unit.name, name.name),
            TypeExpr::Interface(_) => "interface{}".to_string(),
            TypeExpr::Unsupported { kind, .. } => kind.to_string(),
        }
    }
}

/// Struct type literal
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub fields: Vec<Field>,
}

/// Struct field; `name == None` marks an embedded field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: Option<Ident>,
    pub ty: TypeExpr,
}

/// Type expressions with no schema counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    Func,
    Chan,
    Generic,
}

impl std::fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsupportedKind::Func => write!(f, "func type"),
            UnsupportedKind::Chan => write!(f, "chan type"),
            UnsupportedKind::Generic => write!(f, "generic type"),
        }
    }
}
