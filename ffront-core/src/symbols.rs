#![forbid(unsafe_code)]

//! Static classification of the names used by a single function definition.

use std::collections::BTreeSet;

use ffront_lex::{Lexer, Token, TokenKind};
use tracing::debug;

use crate::error::{FrontendError, SourceShapeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Param,
    Local,
    Imported,
    Nonlocal,
    Global,
}

/// The names of one function scope, split into disjoint sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolNames {
    pub params: BTreeSet<String>,
    pub locals: BTreeSet<String>,
    pub imported: BTreeSet<String>,
    pub nonlocals: BTreeSet<String>,
    pub globals: BTreeSet<String>,
}

impl SymbolNames {
    /// Classify the names of the single function defined in `source`.
    ///
    /// Names used only inside nested functions, lambdas or comprehensions
    /// belong to those scopes and are not reported. Free names without a
    /// `nonlocal` declaration are globals, as for any module-level function.
    pub fn from_source(source: &str, filename: &str) -> Result<Self, FrontendError> {
        let tokens = Lexer::new(source).lex()?;
        let def = find_single_function(&tokens, filename)?;

        let mut scope = ScopeScanner::default();
        for name in param_names(&tokens[def.params.0..def.params.1]) {
            scope.params.insert(name);
        }
        scope.scan_body(&tokens[def.body.0..def.body.1]);

        let names = scope.classify();
        debug!(
            function = %def.name,
            params = names.params.len(),
            locals = names.locals.len(),
            imported = names.imported.len(),
            nonlocals = names.nonlocals.len(),
            globals = names.globals.len(),
            "classified symbols"
        );
        Ok(names)
    }

    /// `params ∪ locals ∪ imported`
    pub fn all_locals(&self) -> BTreeSet<String> {
        self.params
            .iter()
            .chain(&self.locals)
            .chain(&self.imported)
            .cloned()
            .collect()
    }

    /// `nonlocals ∪ globals`
    pub fn free_names(&self) -> BTreeSet<String> {
        self.nonlocals.iter().chain(&self.globals).cloned().collect()
    }

    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        if self.params.contains(name) {
            Some(SymbolKind::Param)
        } else if self.locals.contains(name) {
            Some(SymbolKind::Local)
        } else if self.imported.contains(name) {
            Some(SymbolKind::Imported)
        } else if self.nonlocals.contains(name) {
            Some(SymbolKind::Nonlocal)
        } else if self.globals.contains(name) {
            Some(SymbolKind::Global)
        } else {
            None
        }
    }
}

struct FunctionDef {
    name: String,
    /// Token range between the parameter parentheses.
    params: (usize, usize),
    /// Token range of the body.
    body: (usize, usize),
}

fn shape_error(message: String, token: Option<&Token>) -> FrontendError {
    SourceShapeError {
        message,
        span: token.map(|t| t.span),
    }
    .into()
}

fn find_single_function(tokens: &[Token], filename: &str) -> Result<FunctionDef, FrontendError> {
    let mut found: Option<FunctionDef> = None;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::Newline => i += 1,
            TokenKind::Eof => break,
            TokenKind::At => i = statement_end(tokens, i) + 1,
            TokenKind::KwDef => {
                let def = parse_def_header(tokens, i, filename)?;
                if found.is_some() {
                    return Err(shape_error(
                        format!(
                            "sources with multiple function definitions are not yet supported ({filename})"
                        ),
                        Some(&tokens[i]),
                    ));
                }
                i = def.1;
                found = Some(def.0);
            }
            TokenKind::KwAsync if matches!(tokens.get(i + 1).map(|t| &t.kind), Some(TokenKind::KwDef)) => {
                i += 1;
            }
            _ => {
                return Err(shape_error(
                    format!("only a single function definition is supported at the top level of {filename}"),
                    Some(&tokens[i]),
                ));
            }
        }
    }

    found.ok_or_else(|| shape_error(format!("no function definition found in {filename}"), None))
}

/// Parse `def name(params) [-> ann]:` at `start` and locate the body. Returns
/// the definition and the index just past it.
fn parse_def_header(
    tokens: &[Token],
    start: usize,
    filename: &str,
) -> Result<(FunctionDef, usize), FrontendError> {
    let malformed = |i: usize| {
        shape_error(
            format!("malformed function definition in {filename}"),
            tokens.get(i),
        )
    };

    let name = tokens
        .get(start + 1)
        .and_then(|t| t.kind.ident())
        .ok_or_else(|| malformed(start + 1))?
        .to_string();
    if !matches!(tokens.get(start + 2).map(|t| &t.kind), Some(TokenKind::LParen)) {
        return Err(malformed(start + 2));
    }
    let rparen = matching_close(tokens, start + 2);
    if rparen >= tokens.len() {
        return Err(malformed(start + 2));
    }
    let end = statement_end(tokens, rparen);
    let colon = header_colon(tokens, rparen + 1, end);
    if colon >= end {
        return Err(malformed(rparen));
    }

    let (body, next) = block_after_colon(tokens, colon, end);
    Ok((
        FunctionDef {
            name,
            params: (start + 3, rparen),
            body,
        },
        next,
    ))
}

/// Body of a compound statement whose header ends at `colon`: either the
/// indented block that follows, or the rest of the line.
fn block_after_colon(tokens: &[Token], colon: usize, line_end: usize) -> ((usize, usize), usize) {
    let is = |i: usize, kind: TokenKind| tokens.get(i).is_some_and(|t| t.kind == kind);

    if colon + 1 == line_end && is(line_end, TokenKind::Newline) && is(line_end + 1, TokenKind::Indent) {
        let body_start = line_end + 2;
        let mut depth = 1usize;
        let mut i = body_start;
        while i < tokens.len() {
            match tokens[i].kind {
                TokenKind::Indent => depth += 1,
                TokenKind::Dedent => {
                    depth -= 1;
                    if depth == 0 {
                        return ((body_start, i), i + 1);
                    }
                }
                TokenKind::Eof => break,
                _ => {}
            }
            i += 1;
        }
        ((body_start, i), i)
    } else {
        // Single-line suite: `def f(): return x`.
        let mut end = colon + 1;
        while end < tokens.len() && tokens[end].kind != TokenKind::Newline {
            end += 1;
        }
        ((colon + 1, end), end + 1)
    }
}

/// Index of the bracket closing the one at `open`, or `tokens.len()`.
fn matching_close(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        if t.kind.is_open_bracket() {
            depth += 1;
        } else if t.kind.is_close_bracket() {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i;
            }
        }
    }
    tokens.len()
}

/// Index of the `Newline` (or top-level `;`) ending the statement at `start`.
fn statement_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(start) {
        match t.kind {
            TokenKind::Newline | TokenKind::Eof => return i,
            TokenKind::Semicolon if depth == 0 => return i,
            _ if t.kind.is_open_bracket() => depth += 1,
            _ if t.kind.is_close_bracket() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    tokens.len()
}

/// First top-level `:` in `start..end` that does not belong to a lambda.
fn header_colon(tokens: &[Token], start: usize, end: usize) -> usize {
    let mut depth = 0usize;
    let mut lambdas = 0usize;
    for (i, t) in tokens.iter().enumerate().take(end).skip(start) {
        match t.kind {
            TokenKind::KwLambda if depth == 0 => lambdas += 1,
            TokenKind::Colon if depth == 0 => {
                if lambdas == 0 {
                    return i;
                }
                lambdas -= 1;
            }
            _ if t.kind.is_open_bracket() => depth += 1,
            _ if t.kind.is_close_bracket() => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    end
}

/// Indices of top-level tokens in `tokens` matching `pred`.
fn top_level_positions(tokens: &[Token], pred: impl Fn(&TokenKind) -> bool) -> Vec<usize> {
    let mut depth = 0usize;
    let mut out = Vec::new();
    for (i, t) in tokens.iter().enumerate() {
        if t.kind.is_open_bracket() {
            depth += 1;
        } else if t.kind.is_close_bracket() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && pred(&t.kind) {
            out.push(i);
        }
    }
    out
}

fn split_top_level<'t>(tokens: &'t [Token], pred: impl Fn(&TokenKind) -> bool) -> Vec<&'t [Token]> {
    let mut parts = Vec::new();
    let mut last = 0;
    for pos in top_level_positions(tokens, pred) {
        parts.push(&tokens[last..pos]);
        last = pos + 1;
    }
    parts.push(&tokens[last..]);
    parts
}

/// Parameter names of a parameter list (the tokens between the parentheses).
fn param_names(tokens: &[Token]) -> Vec<String> {
    split_top_level(tokens, |k| *k == TokenKind::Comma)
        .into_iter()
        .filter_map(|param| {
            param
                .iter()
                .find(|t| !matches!(t.kind, TokenKind::Star | TokenKind::StarStar | TokenKind::Slash))
                .and_then(|t| t.kind.ident())
                .map(str::to_string)
        })
        .collect()
}

#[derive(Default)]
struct ScopeScanner {
    params: BTreeSet<String>,
    bound: BTreeSet<String>,
    imported: BTreeSet<String>,
    declared_global: BTreeSet<String>,
    declared_nonlocal: BTreeSet<String>,
    refs: BTreeSet<String>,
}

impl ScopeScanner {
    fn classify(self) -> SymbolNames {
        let imported: BTreeSet<String> = self.imported.difference(&self.params).cloned().collect();
        let locals: BTreeSet<String> = self
            .bound
            .iter()
            .filter(|n| {
                !self.params.contains(*n)
                    && !imported.contains(*n)
                    && !self.declared_global.contains(*n)
                    && !self.declared_nonlocal.contains(*n)
            })
            .cloned()
            .collect();
        let nonlocals = self.declared_nonlocal;
        let mut globals = self.declared_global;
        for name in self.refs {
            if !self.params.contains(&name)
                && !locals.contains(&name)
                && !imported.contains(&name)
                && !nonlocals.contains(&name)
            {
                globals.insert(name);
            }
        }
        SymbolNames {
            params: self.params,
            locals,
            imported,
            nonlocals,
            globals,
        }
    }

    fn scan_body(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i].kind {
                TokenKind::Newline
                | TokenKind::Indent
                | TokenKind::Dedent
                | TokenKind::Semicolon
                | TokenKind::Eof => i += 1,
                _ => i = self.scan_statement(tokens, i),
            }
        }
    }

    /// Scan the statement at `start`; returns where scanning resumes.
    fn scan_statement(&mut self, tokens: &[Token], start: usize) -> usize {
        let end = statement_end(tokens, start);
        let first = &tokens[start].kind;

        match first {
            TokenKind::KwAsync => {
                // `async def`, `async for`, `async with`
                if start + 1 < end {
                    self.scan_statement(tokens, start + 1)
                } else {
                    end
                }
            }
            TokenKind::At => {
                self.scan_expr(&tokens[start + 1..end]);
                end
            }
            TokenKind::KwDef | TokenKind::KwClass => self.scan_nested_definition(tokens, start, end),
            TokenKind::KwGlobal | TokenKind::KwNonlocal => {
                let global = *first == TokenKind::KwGlobal;
                for t in &tokens[start + 1..end] {
                    if let Some(name) = t.kind.ident() {
                        if global {
                            self.declared_global.insert(name.to_string());
                        } else {
                            self.declared_nonlocal.insert(name.to_string());
                        }
                    }
                }
                end
            }
            TokenKind::KwImport => {
                for item in split_top_level(&tokens[start + 1..end], |k| *k == TokenKind::Comma) {
                    self.bind_import(item, true);
                }
                end
            }
            TokenKind::KwFrom => {
                let stmt = &tokens[start..end];
                if let Some(pos) = stmt.iter().position(|t| t.kind == TokenKind::KwImport) {
                    let items: Vec<Token> = stmt[pos + 1..]
                        .iter()
                        .filter(|t| !matches!(t.kind, TokenKind::LParen | TokenKind::RParen))
                        .cloned()
                        .collect();
                    for item in split_top_level(&items, |k| *k == TokenKind::Comma) {
                        self.bind_import(item, false);
                    }
                }
                end
            }
            TokenKind::KwFor => {
                let colon = header_colon(tokens, start + 1, end);
                let header = &tokens[start + 1..colon];
                match top_level_positions(header, |k| *k == TokenKind::KwIn).first() {
                    Some(&pos) => {
                        self.bind_targets(&header[..pos]);
                        self.scan_expr(&header[pos + 1..]);
                    }
                    None => self.scan_expr(header),
                }
                colon + 1
            }
            TokenKind::KwWith => {
                let colon = header_colon(tokens, start + 1, end);
                for item in split_top_level(&tokens[start + 1..colon], |k| *k == TokenKind::Comma) {
                    match top_level_positions(item, |k| *k == TokenKind::KwAs).first() {
                        Some(&pos) => {
                            self.scan_expr(&item[..pos]);
                            self.bind_targets(&item[pos + 1..]);
                        }
                        None => self.scan_expr(item),
                    }
                }
                colon + 1
            }
            TokenKind::KwExcept => {
                let colon = header_colon(tokens, start + 1, end);
                let header = &tokens[start + 1..colon];
                match top_level_positions(header, |k| *k == TokenKind::KwAs).first() {
                    Some(&pos) => {
                        self.scan_expr(&header[..pos]);
                        self.bind_targets(&header[pos + 1..]);
                    }
                    None => self.scan_expr(header),
                }
                colon + 1
            }
            TokenKind::KwIf | TokenKind::KwElif | TokenKind::KwWhile => {
                let colon = header_colon(tokens, start + 1, end);
                self.scan_expr(&tokens[start + 1..colon]);
                colon + 1
            }
            TokenKind::KwElse | TokenKind::KwTry | TokenKind::KwFinally => {
                header_colon(tokens, start + 1, end) + 1
            }
            TokenKind::KwDel => {
                self.bind_targets(&tokens[start + 1..end]);
                end
            }
            TokenKind::KwPass | TokenKind::KwBreak | TokenKind::KwContinue => end,
            _ => {
                self.scan_simple_statement(&tokens[start..end]);
                end
            }
        }
    }

    /// Nested `def`/`class`: the name binds here, the body is its own scope.
    fn scan_nested_definition(&mut self, tokens: &[Token], start: usize, end: usize) -> usize {
        let is_def = tokens[start].kind == TokenKind::KwDef;
        if let Some(name) = tokens.get(start + 1).and_then(|t| t.kind.ident()) {
            self.bound.insert(name.to_string());
        }

        let colon = header_colon(tokens, start + 1, end);
        let header = &tokens[(start + 2).min(colon)..colon];
        if let Some(TokenKind::LParen) = header.first().map(|t| &t.kind) {
            let close = matching_close(header, 0).min(header.len());
            let inner = &header[1..close.max(1)];
            if is_def {
                // Annotations and defaults are evaluated in this scope.
                for param in split_top_level(inner, |k| *k == TokenKind::Comma) {
                    self.scan_param_tail(param);
                }
            } else {
                self.scan_expr(inner);
            }
            if close + 1 < header.len() {
                // `-> annotation`
                self.scan_expr(&header[close + 1..]);
            }
        }

        if colon >= end {
            return end;
        }
        block_after_colon(tokens, colon, end).1
    }

    fn scan_param_tail(&mut self, param: &[Token]) {
        let Some(colon_or_eq) = param
            .iter()
            .position(|t| matches!(t.kind, TokenKind::Colon | TokenKind::Eq))
        else {
            return;
        };
        for part in split_top_level(&param[colon_or_eq + 1..], |k| *k == TokenKind::Eq) {
            self.scan_expr(part);
        }
    }

    fn bind_import(&mut self, item: &[Token], plain_import: bool) {
        let name = match top_level_positions(item, |k| *k == TokenKind::KwAs).first() {
            Some(&pos) => item.get(pos + 1).and_then(|t| t.kind.ident()),
            // `import a.b` binds `a`; `from m import x` binds `x`.
            None if plain_import => item.first().and_then(|t| t.kind.ident()),
            None => item.last().and_then(|t| t.kind.ident()),
        };
        if let Some(name) = name {
            self.imported.insert(name.to_string());
        }
    }

    /// Assignment (plain, chained, annotated, augmented) or expression.
    fn scan_simple_statement(&mut self, stmt: &[Token]) {
        // Stop at the first top-level lambda: its `=` and `:` are not ours.
        let cut = top_level_positions(stmt, |k| *k == TokenKind::KwLambda)
            .first()
            .copied()
            .unwrap_or(stmt.len());
        let head = &stmt[..cut];

        if let Some(&aug) =
            top_level_positions(head, |k| matches!(k, TokenKind::AugAssign(_))).first()
        {
            self.bind_targets(&stmt[..aug]);
            self.scan_expr(&stmt[aug + 1..]);
            return;
        }

        let eqs = top_level_positions(head, |k| *k == TokenKind::Eq);
        let annotation = top_level_positions(head, |k| *k == TokenKind::Colon)
            .first()
            .copied()
            .filter(|c| eqs.first().is_none_or(|e| c < e));

        if let Some(colon) = annotation {
            self.bind_targets(&stmt[..colon]);
            match eqs.first() {
                Some(&eq) => {
                    self.scan_expr(&stmt[colon + 1..eq]);
                    self.scan_expr(&stmt[eq + 1..]);
                }
                None => self.scan_expr(&stmt[colon + 1..]),
            }
            return;
        }

        let mut last = 0;
        for &eq in &eqs {
            self.bind_targets(&stmt[last..eq]);
            last = eq + 1;
        }
        self.scan_expr(&stmt[last..]);
    }

    fn bind_targets(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            if let Some(name) = tokens[i].kind.ident() {
                if i > 0 && tokens[i - 1].kind == TokenKind::Dot {
                    i += 1;
                    continue;
                }
                let next = tokens.get(i + 1).map(|t| &t.kind);
                if matches!(
                    next,
                    Some(TokenKind::Dot | TokenKind::LBracket | TokenKind::LParen)
                ) {
                    // `a.b = ..`, `a[i] = ..`: the base is read, not bound.
                    self.refs.insert(name.to_string());
                    let end = trailer_end(tokens, i + 1);
                    self.scan_expr(&tokens[i + 1..end]);
                    i = end;
                    continue;
                }
                self.bound.insert(name.to_string());
            }
            i += 1;
        }
    }

    fn scan_expr(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            let kind = &tokens[i].kind;
            if let Some(name) = kind.ident() {
                let after_dot = i > 0 && tokens[i - 1].kind == TokenKind::Dot;
                match tokens.get(i + 1).map(|t| &t.kind) {
                    _ if after_dot => {}
                    Some(TokenKind::Walrus) => {
                        self.bound.insert(name.to_string());
                    }
                    // keyword argument name
                    Some(TokenKind::Eq) => {}
                    _ => {
                        self.refs.insert(name.to_string());
                    }
                }
            } else if *kind == TokenKind::KwLambda {
                i = skip_lambda(tokens, i);
                continue;
            } else if kind.is_open_bracket() {
                let close = matching_close(tokens, i).min(tokens.len());
                let inner = &tokens[i + 1..close.max(i + 1)];
                if let Some(&for_at) = top_level_positions(inner, |k| *k == TokenKind::KwFor).first() {
                    self.scan_comprehension(inner, for_at);
                    i = close + 1;
                    continue;
                }
            }
            i += 1;
        }
    }

    /// Only the first iterable of a comprehension is evaluated in the
    /// enclosing scope.
    fn scan_comprehension(&mut self, inner: &[Token], for_at: usize) {
        let rest = &inner[for_at + 1..];
        let Some(&in_at) = top_level_positions(rest, |k| *k == TokenKind::KwIn).first() else {
            return;
        };
        let iterable = &rest[in_at + 1..];
        let end = top_level_positions(iterable, |k| {
            matches!(k, TokenKind::KwFor | TokenKind::KwIf | TokenKind::KwAsync)
        })
        .first()
        .copied()
        .unwrap_or(iterable.len());
        self.scan_expr(&iterable[..end]);
    }
}

/// End of an attribute/subscript/call trailer chain starting at `start`.
fn trailer_end(tokens: &[Token], start: usize) -> usize {
    let mut i = start;
    while i < tokens.len() {
        match tokens[i].kind {
            TokenKind::Dot => i += 2,
            TokenKind::LBracket | TokenKind::LParen => i = matching_close(tokens, i) + 1,
            _ => break,
        }
    }
    i.min(tokens.len())
}

/// Index just past the lambda starting at `start`: the first top-level `,`
/// or unmatched closing bracket after its `:`.
fn skip_lambda(tokens: &[Token], start: usize) -> usize {
    let colon = header_colon(tokens, start + 1, tokens.len());
    let mut depth = 0usize;
    let mut i = colon + 1;
    while i < tokens.len() {
        let kind = &tokens[i].kind;
        if kind.is_open_bracket() {
            depth += 1;
        } else if kind.is_close_bracket() {
            if depth == 0 {
                return i;
            }
            depth -= 1;
        } else if *kind == TokenKind::Comma && depth == 0 {
            return i;
        }
        i += 1;
    }
    tokens.len()
}
