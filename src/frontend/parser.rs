//! Parser for Go source files
//!
//! Recursive descent over the declaration level of a file. Type
//! declarations are parsed in full; `var`, `const` and `func` declarations
//! only contribute their names to the file scope and their bodies are
//! skipped with bracket balancing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span};

/// Parse one file's source text, reporting failures as `SourceSyntax`.
pub fn parse_source(path: &Path, source: &str, file_id: usize) -> Result<SourceFile> {
    let mut parser = Parser::new(Lexer::new(source, file_id));
    parser.parse_file(path.to_path_buf()).map_err(|err| {
        let (line, column) = err.span().map(|s| s.line_col(source)).unwrap_or((0, 0));
        Error::SourceSyntax {
            path: path.to_path_buf(),
            line,
            column,
            message: err.to_string(),
        }
    })
}

/// Read only the package clause of a source file.
pub fn package_clause(source: &str) -> Option<String> {
    let mut lexer = Lexer::new(source, 0);
    let mut token = lexer.next_token();
    while token.kind == TokenKind::Semicolon {
        token = lexer.next_token();
    }
    if token.kind != TokenKind::Package {
        return None;
    }
    match lexer.next_token().kind {
        TokenKind::Ident(name) => Some(name),
        _ => None,
    }
}

/// The parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from a lexer
    pub fn new(mut lexer: Lexer) -> Self {
        Self {
            tokens: lexer.tokenize(),
            pos: 0,
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        // tokenize() always ends with Eof, so the fallback is never empty
        let idx = self.pos.min(self.tokens.len().saturating_sub(1));
        &self.tokens[idx]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::UnexpectedToken {
            expected: expected.to_string(),
            got: self.current_kind().to_string(),
            span: self.current().span,
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// A semicolon may be omitted before a closing `)` or `}`.
    fn expect_semi(&mut self) -> Result<()> {
        if self.consume(&TokenKind::Semicolon)
            || self.check(&TokenKind::RParen)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
        {
            Ok(())
        } else {
            Err(self.unexpected(";"))
        }
    }

    fn span_from(&self, start: Span) -> Span {
        start.merge(&self.tokens[self.pos.saturating_sub(1)].span)
    }

    fn is_open(kind: &TokenKind) -> bool {
        matches!(kind, TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace)
    }

    fn is_close(kind: &TokenKind) -> bool {
        matches!(kind, TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace)
    }

    /// Skip a bracketed group starting at the current opening bracket.
    fn skip_balanced(&mut self) -> Result<()> {
        if !Self::is_open(self.current_kind()) {
            return Err(self.unexpected("( or [ or {"));
        }
        let mut depth = 0usize;
        loop {
            let token = self.advance();
            if Self::is_open(&token.kind) {
                depth += 1;
            } else if Self::is_close(&token.kind) {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            } else if token.kind == TokenKind::Eof {
                return Err(Error::UnexpectedToken {
                    expected: "closing bracket".to_string(),
                    got: token.kind.to_string(),
                    span: token.span,
                });
            }
        }
    }

    /// Skip tokens up to (not including) one of `stops` or an unmatched
    /// closing bracket.
    fn skip_until(&mut self, stops: &[TokenKind]) -> Result<()> {
        loop {
            let kind = self.current_kind();
            if *kind == TokenKind::Eof || Self::is_close(kind) {
                return Ok(());
            }
            if stops.iter().any(|s| std::mem::discriminant(s) == std::mem::discriminant(kind)) {
                return Ok(());
            }
            if Self::is_open(kind) {
                self.skip_balanced()?;
            } else {
                self.advance();
            }
        }
    }

    /// Token following the bracket group that opens at `open`
    fn after_brackets(&self, open: usize) -> Option<&TokenKind> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            if Self::is_open(&token.kind) {
                depth += 1;
            } else if Self::is_close(&token.kind) {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return self.tokens.get(i + 1).map(|t| &t.kind);
                }
            } else if token.kind == TokenKind::Eof {
                return None;
            }
        }
        None
    }

    // ==================== Parsing Methods ====================

    /// Parse a complete source file
    pub fn parse_file(&mut self, path: PathBuf) -> Result<SourceFile> {
        let file_id = self.current().span.file_id;
        while self.consume(&TokenKind::Semicolon) {}

        self.expect(TokenKind::Package)?;
        let package = self.parse_ident()?;
        self.expect_semi()?;

        let mut imports = Vec::new();
        while self.check(&TokenKind::Import) {
            self.parse_import_decl(&mut imports)?;
            self.expect_semi()?;
        }

        let mut decls = Vec::new();
        while !self.is_at_end() {
            if self.consume(&TokenKind::Semicolon) {
                continue;
            }
            match self.current_kind() {
                TokenKind::Type => self.parse_type_decl(&mut decls)?,
                TokenKind::Var | TokenKind::Const => self.parse_value_decl(&mut decls)?,
                TokenKind::Func => {
                    if let Some(name) = self.parse_func_decl()? {
                        decls.push(Decl::Func(name));
                    }
                }
                _ => return Err(self.unexpected("declaration (type, var, const, func)")),
            }
            self.expect_semi()?;
        }

        let mut scope = HashMap::new();
        for (i, decl) in decls.iter().enumerate() {
            let name = &decl.name().name;
            if name == "_" || (name == "init" && matches!(decl, Decl::Func(_))) {
                continue;
            }
            scope.entry(name.clone()).or_insert(i);
        }

        Ok(SourceFile {
            path,
            file_id,
            package,
            imports,
            decls,
            scope,
        })
    }

    fn parse_import_decl(&mut self, imports: &mut Vec<ImportSpec>) -> Result<()> {
        self.expect(TokenKind::Import)?;
        if self.consume(&TokenKind::LParen) {
            while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                if self.consume(&TokenKind::Semicolon) {
                    continue;
                }
                imports.push(self.parse_import_spec()?);
                self.expect_semi()?;
            }
            self.expect(TokenKind::RParen)?;
        } else {
            imports.push(self.parse_import_spec()?);
        }
        Ok(())
    }

    fn parse_import_spec(&mut self) -> Result<ImportSpec> {
        let alias = match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Some(name)
            }
            TokenKind::Dot => {
                self.advance();
                Some(".".to_string())
            }
            _ => None,
        };
        match self.current_kind().clone() {
            TokenKind::StringLit(path) => {
                self.advance();
                Ok(ImportSpec { alias, path })
            }
            _ => Err(self.unexpected("import path")),
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident::new(name.clone(), token.span))
            }
            _ => Err(Error::ExpectedIdent { span: token.span }),
        }
    }

    fn parse_ident_list(&mut self) -> Result<Vec<Ident>> {
        let mut names = vec![self.parse_ident()?];
        while self.consume(&TokenKind::Comma) {
            names.push(self.parse_ident()?);
        }
        Ok(names)
    }

    // ==================== Declarations ====================

    fn parse_type_decl(&mut self, decls: &mut Vec<Decl>) -> Result<()> {
        self.expect(TokenKind::Type)?;
        if self.consume(&TokenKind::LParen) {
            while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                if self.consume(&TokenKind::Semicolon) {
                    continue;
                }
                decls.push(Decl::Type(Arc::new(self.parse_type_spec()?)));
                self.expect_semi()?;
            }
            self.expect(TokenKind::RParen)?;
        } else {
            decls.push(Decl::Type(Arc::new(self.parse_type_spec()?)));
        }
        Ok(())
    }

    fn parse_type_spec(&mut self) -> Result<TypeSpec> {
        let start = self.current().span;
        let name = self.parse_ident()?;
        let type_params = if self.at_type_params() {
            self.parse_type_params()?
        } else {
            Vec::new()
        };
        // `type A = B` binds the same way as `type A B` here
        self.consume(&TokenKind::Eq);
        let ty = self.parse_type()?;
        Ok(TypeSpec {
            name,
            type_params,
            ty,
            span: self.span_from(start),
        })
    }

    /// `type A[T any] ...` versus the array type `type A [N]T`
    fn at_type_params(&self) -> bool {
        if !self.check(&TokenKind::LBracket) {
            return false;
        }
        let after = |n: usize| self.tokens.get(self.pos + n).map(|t| &t.kind);
        matches!(after(1), Some(TokenKind::Ident(_)))
            && matches!(
                after(2),
                Some(
                    TokenKind::Ident(_)
                        | TokenKind::Comma
                        | TokenKind::Interface
                        | TokenKind::Tilde
                        | TokenKind::Map
                        | TokenKind::Chan
                        | TokenKind::Func
                )
            )
    }

    fn parse_type_params(&mut self) -> Result<Vec<Ident>> {
        self.expect(TokenKind::LBracket)?;
        let mut params = Vec::new();
        loop {
            params.push(self.parse_ident()?);
            if self.consume(&TokenKind::Comma) {
                continue;
            }
            // constraint
            self.skip_until(&[TokenKind::Comma])?;
            if !self.consume(&TokenKind::Comma) || self.check(&TokenKind::RBracket) {
                break;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(params)
    }

    fn parse_value_decl(&mut self, decls: &mut Vec<Decl>) -> Result<()> {
        let is_const = self.check(&TokenKind::Const);
        self.advance();
        let mut push = |names: Vec<Ident>| {
            for name in names {
                decls.push(if is_const { Decl::Const(name) } else { Decl::Var(name) });
            }
        };
        if self.consume(&TokenKind::LParen) {
            while !self.check(&TokenKind::RParen) && !self.is_at_end() {
                if self.consume(&TokenKind::Semicolon) {
                    continue;
                }
                push(self.parse_ident_list()?);
                self.skip_until(&[TokenKind::Semicolon])?;
                self.expect_semi()?;
            }
            self.expect(TokenKind::RParen)?;
        } else {
            push(self.parse_ident_list()?);
            self.skip_until(&[TokenKind::Semicolon])?;
        }
        Ok(())
    }

    /// Returns the function name, or `None` for methods.
    fn parse_func_decl(&mut self) -> Result<Option<Ident>> {
        self.expect(TokenKind::Func)?;
        let is_method = self.check(&TokenKind::LParen);
        if is_method {
            self.skip_balanced()?;
        }
        let name = self.parse_ident()?;
        if self.check(&TokenKind::LBracket) {
            self.skip_balanced()?;
        }
        if !self.check(&TokenKind::LParen) {
            return Err(self.unexpected("("));
        }
        self.skip_balanced()?;

        // results, up to the body or the end of a body-less declaration
        while !matches!(
            self.current_kind(),
            TokenKind::LBrace | TokenKind::Semicolon | TokenKind::Eof
        ) {
            let opens_literal = matches!(self.current_kind(), TokenKind::Struct | TokenKind::Interface)
                && matches!(self.peek_kind(), Some(TokenKind::LBrace));
            if opens_literal {
                self.advance();
                self.skip_balanced()?;
            } else if Self::is_open(self.current_kind()) {
                self.skip_balanced()?;
            } else if Self::is_close(self.current_kind()) {
                return Err(self.unexpected("function body"));
            } else {
                self.advance();
            }
        }
        if self.check(&TokenKind::LBrace) {
            self.skip_balanced()?;
        }
        Ok(if is_method { None } else { Some(name) })
    }

    // ==================== Types ====================

    fn starts_type(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Ident(_)
                | TokenKind::Star
                | TokenKind::LBracket
                | TokenKind::LParen
                | TokenKind::Map
                | TokenKind::Struct
                | TokenKind::Interface
                | TokenKind::Func
                | TokenKind::Chan
                | TokenKind::Arrow
        )
    }

    pub fn parse_type(&mut self) -> Result<TypeExpr> {
        let start = self.current().span;
        match self.current_kind().clone() {
            TokenKind::Ident(_) => {
                let first = self.parse_ident()?;
                let ty = if self.consume(&TokenKind::Dot) {
                    let name = self.parse_ident()?;
                    TypeExpr::Qualified { unit: first, name }
                } else {
                    TypeExpr::Ident(first)
                };
                if self.check(&TokenKind::LBracket) {
                    // instantiation of a generic type
                    self.skip_balanced()?;
                    return Ok(TypeExpr::Unsupported {
                        kind: UnsupportedKind::Generic,
                        span: self.span_from(start),
                    });
                }
                Ok(ty)
            }
            TokenKind::Star => {
                self.advance();
                let inner = self.parse_type()?;
                Ok(TypeExpr::Pointer(Box::new(inner), self.span_from(start)))
            }
            TokenKind::LBracket => {
                self.advance();
                if !self.check(&TokenKind::RBracket) {
                    // array length
                    self.skip_until(&[])?;
                }
                self.expect(TokenKind::RBracket)?;
                let elem = self.parse_type()?;
                Ok(TypeExpr::Array(Box::new(elem), self.span_from(start)))
            }
            TokenKind::Map => {
                self.advance();
                self.expect(TokenKind::LBracket)?;
                let key = self.parse_type()?;
                self.expect(TokenKind::RBracket)?;
                let value = self.parse_type()?;
                Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                    span: self.span_from(start),
                })
            }
            TokenKind::Struct => self.parse_struct_type().map(TypeExpr::Struct),
            TokenKind::Interface => {
                self.advance();
                if !self.check(&TokenKind::LBrace) {
                    return Err(self.unexpected("{"));
                }
                self.skip_balanced()?;
                Ok(TypeExpr::Interface(self.span_from(start)))
            }
            TokenKind::Func => {
                self.advance();
                if !self.check(&TokenKind::LParen) {
                    return Err(self.unexpected("("));
                }
                self.skip_balanced()?;
                if self.check(&TokenKind::LParen) {
                    self.skip_balanced()?;
                } else if self.starts_type() {
                    self.parse_type()?;
                }
                Ok(TypeExpr::Unsupported {
                    kind: UnsupportedKind::Func,
                    span: self.span_from(start),
                })
            }
            TokenKind::Chan | TokenKind::Arrow => {
                if self.consume(&TokenKind::Arrow) {
                    self.expect(TokenKind::Chan)?;
                } else {
                    self.advance();
                    self.consume(&TokenKind::Arrow);
                }
                self.parse_type()?;
                Ok(TypeExpr::Unsupported {
                    kind: UnsupportedKind::Chan,
                    span: self.span_from(start),
                })
            }
            TokenKind::LParen => {
                self.advance();
                let ty = self.parse_type()?;
                self.expect(TokenKind::RParen)?;
                Ok(ty)
            }
            _ => Err(Error::ExpectedType { span: start }),
        }
    }

    fn parse_struct_type(&mut self) -> Result<StructType> {
        self.expect(TokenKind::Struct)?;
        self.expect(TokenKind::LBrace)?;

        let mut fields = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.consume(&TokenKind::Semicolon) {
                continue;
            }
            self.parse_field_decl(&mut fields)?;
            if !self.check(&TokenKind::RBrace) {
                self.expect(TokenKind::Semicolon)?;
            }
        }
        self.expect(TokenKind::RBrace)?;

        Ok(StructType { fields })
    }

    fn parse_field_decl(&mut self, fields: &mut Vec<Field>) -> Result<()> {
        let embedded = match self.current_kind() {
            TokenKind::Star => true,
            TokenKind::Ident(_) => match self.peek_kind() {
                Some(TokenKind::Dot | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::StringLit(_)) => true,
                // `Box[int]` embeds an instantiation, `Items [4]T` declares an array
                Some(TokenKind::LBracket) => matches!(
                    self.after_brackets(self.pos + 1),
                    Some(TokenKind::Semicolon | TokenKind::RBrace | TokenKind::StringLit(_))
                ),
                _ => false,
            },
            _ => return Err(Error::ExpectedIdent { span: self.current().span }),
        };

        if embedded {
            let ty = self.parse_type()?;
            fields.push(Field { name: None, ty });
        } else {
            let names = self.parse_ident_list()?;
            let ty = self.parse_type()?;
            for name in names {
                fields.push(Field {
                    name: Some(name),
                    ty: ty.clone(),
                });
            }
        }

        // field tag
        if let TokenKind::StringLit(_) = self.current_kind() {
            self.advance();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<SourceFile> {
        parse_source(Path::new("test.go"), source, 7)
    }

    fn type_of<'a>(file: &'a SourceFile, name: &str) -> &'a TypeExpr {
        match file.lookup(name) {
            Some(Decl::Type(ts)) => &ts.ty,
            other => panic!("{} is not a type: {:?}", name, other),
        }
    }

    #[test]
    fn test_package_and_imports() {
        let file = parse(
            "// Package doc\npackage samples\n\nimport \"time\"\nimport (\n\tx \"example.com/pkga\"\n\t_ \"embed\"\n)\n",
        )
        .unwrap();
        assert_eq!(file.package.name, "samples");
        assert_eq!(file.file_id, 7);
        let imports: Vec<_> = file
            .imports
            .iter()
            .map(|i| (i.alias.as_deref(), i.path.as_str()))
            .collect();
        assert_eq!(
            imports,
            vec![(None, "time"), (Some("x"), "example.com/pkga"), (Some("_"), "embed")]
        );
        assert_eq!(file.imports[1].base_name(), "pkga");
    }

    #[test]
    fn test_struct_fields() {
        let file = parse(
            "package p\ntype S struct {\n\tA, B int `json:\"a\"`\n\t*Base\n\tpkga.Other\n\tC *struct{ D string }\n\tInner\n}\n",
        )
        .unwrap();
        let TypeExpr::Struct(st) = type_of(&file, "S") else {
            panic!("expected struct");
        };
        let names: Vec<_> = st
            .fields
            .iter()
            .map(|f| f.name.as_ref().map(|n| n.name.as_str()))
            .collect();
        assert_eq!(names, vec![Some("A"), Some("B"), None, None, Some("C"), None]);
        assert!(matches!(&st.fields[2].ty, TypeExpr::Pointer(inner, _) if matches!(**inner, TypeExpr::Ident(ref id) if id.name == "Base")));
        assert!(matches!(&st.fields[3].ty, TypeExpr::Qualified { unit, name } if unit.name == "pkga" && name.name == "Other"));
        assert!(matches!(st.fields[4].ty.deref(), TypeExpr::Struct(_)));
    }

    #[test]
    fn test_embedded_instantiation_and_array_field() {
        let file = parse(
            "package p
type Box[T any] struct{ V T }
type S struct {
	Box[int]
	Items [4]Box[string]
	pkga.List[int] `json:\"l\"`
}
type Ok struct{ A string }
",
        )
        .unwrap();
        let TypeExpr::Struct(st) = type_of(&file, "S") else {
            panic!("expected struct");
        };
        assert_eq!(st.fields.len(), 3);
        assert!(st.fields[0].name.is_none());
        assert!(matches!(st.fields[0].ty, TypeExpr::Unsupported { kind: UnsupportedKind::Generic, .. }));
        assert_eq!(st.fields[1].name.as_ref().map(|n| n.name.as_str()), Some("Items"));
        assert!(matches!(st.fields[1].ty, TypeExpr::Array(..)));
        assert!(st.fields[2].name.is_none());
        assert!(matches!(type_of(&file, "Ok"), TypeExpr::Struct(_)));
    }

    #[test]
    fn test_composite_types() {
        let file = parse(
            "package p\ntype (\n\tL []string\n\tFixed [4]int\n\tM map[string]*T\n\tAny interface{ Do() error }\n\tF func(int) (string, error)\n\tCh <-chan int\n\tG[T any] struct{ V T }\n\tI List[int]\n\tAl = L\n)\n",
        )
        .unwrap();
        assert!(matches!(type_of(&file, "L"), TypeExpr::Array(..)));
        assert!(matches!(type_of(&file, "Fixed"), TypeExpr::Array(..)));
        assert!(matches!(type_of(&file, "M"), TypeExpr::Map { .. }));
        assert!(matches!(type_of(&file, "Any"), TypeExpr::Interface(_)));
        assert!(matches!(type_of(&file, "F"), TypeExpr::Unsupported { kind: UnsupportedKind::Func, .. }));
        assert!(matches!(type_of(&file, "Ch"), TypeExpr::Unsupported { kind: UnsupportedKind::Chan, .. }));
        assert!(matches!(type_of(&file, "I"), TypeExpr::Unsupported { kind: UnsupportedKind::Generic, .. }));

        let Some(Decl::Type(g)) = file.lookup("G") else {
            panic!("G missing");
        };
        assert_eq!(g.type_params.len(), 1);
        assert!(matches!(g.declared_type(), TypeExpr::Unsupported { kind: UnsupportedKind::Generic, .. }));

        let Some(Decl::Type(al)) = file.lookup("Al") else {
            panic!("Al missing");
        };
        assert!(matches!(al.ty, TypeExpr::Ident(ref id) if id.name == "L"));
    }

    #[test]
    fn test_values_and_funcs_in_scope() {
        let file = parse(
            "package p\nconst (\n\tA = iota\n\tB\n)\nvar x, y = f(1), map[string]int{\"a\": 1}\nfunc init() {}\nfunc New() *T { return &T{} }\nfunc (t *T) Method() interface{} { return nil }\ntype T struct{}\n",
        )
        .unwrap();
        let kinds: Vec<_> = ["A", "B", "x", "y", "New", "T"]
            .iter()
            .map(|n| file.lookup(n).map(|d| d.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![Some("const"), Some("const"), Some("var"), Some("var"), Some("func"), Some("type")]
        );
        assert!(file.lookup("init").is_none());
        assert!(file.lookup("Method").is_none());
    }

    #[test]
    fn test_syntax_error_location() {
        let err = parse("package p\n\ntype X struct {\n\tA int\n\tB [\n}\n").unwrap_err();
        match err {
            Error::SourceSyntax { line, path, .. } => {
                assert_eq!(path, PathBuf::from("test.go"));
                assert!(line >= 5, "line {}", line);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_package_clause() {
        assert_eq!(package_clause("// doc\n\npackage pkga\n").as_deref(), Some("pkga"));
        assert_eq!(package_clause("type X int"), None);
    }
}
