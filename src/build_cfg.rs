//! Build the control-flow graph from the token stream.
//!
//! This is the single-pass front end: a recursive-descent parser with one
//! token of lookahead that lowers declarations, statements, and expressions
//! directly into basic blocks. Declarations produce symbols and types,
//! statements splice blocks together through their jump edges, and
//! expressions append linear IR to the current block and return the symbol
//! naming their result.

use if_chain::if_chain;

use crate::Symbol;
use crate::error::{CResult, CompileError};
use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::symtab::{Imm, SymId, SymTab};
use crate::types::ir::{Binop, BlockId, Cfg, Ir};
use crate::types::{Quals, Type, TypeKind, TypeS};

/// One-token-lookahead cursor over the lexer, owning the peek slot and the
/// end-of-input latch.
struct Cursor<'a> {
  lexer: Lexer<'a>,
  peeked: Option<Token>,
  eof: bool,
}

impl Cursor<'_> {
  fn fill(&mut self) -> CResult<Token> {
    if let Some(tok) = self.peeked { return Ok(tok) }
    let tok = if self.eof {
      Token::eof()
    } else {
      match self.lexer.get_token()? {
        Some(tok) => tok,
        None => { self.eof = true; Token::eof() }
      }
    };
    self.peeked = Some(tok);
    Ok(tok)
  }

  /// The kind of the next token, without consuming it.
  fn peek(&mut self) -> CResult<TokenKind> { Ok(self.fill()?.k) }

  /// Consume and return the next token.
  fn readtoken(&mut self) -> CResult<Token> {
    let tok = self.fill()?;
    self.peeked = None;
    Ok(tok)
  }

  /// Consume the next token, which must have kind `k`.
  fn consume(&mut self, k: TokenKind) -> CResult<Token> {
    let tok = self.readtoken()?;
    if tok.k != k {
      return Err(CompileError::Syntax { expected: k.to_string(), found: tok.describe() })
    }
    Ok(tok)
  }
}

/// The parser and CFG builder for one translation unit.
///
/// Single-threaded and non-reentrant: there is one cursor, one scope stack,
/// and one loop-context stack. The CFG field holds the function currently
/// being lowered; at file scope it doubles as scratch space for the
/// throwaway blocks of constant-expression evaluation.
pub struct Parser<'a> {
  cur: Cursor<'a>,
  symtab: SymTab,
  cfg: Cfg,
  /// `(break, continue)` targets, innermost last.
  loops: Vec<(BlockId, BlockId)>,
}

impl<'a> Parser<'a> {
  /// Create a parser over the given source, with file scope open.
  #[must_use] pub fn new(src: &'a str) -> Self {
    let mut symtab = SymTab::default();
    symtab.push_scope();
    Self {
      cur: Cursor { lexer: Lexer::new(src), peeked: None, eof: false },
      symtab,
      cfg: Cfg::default(),
      loops: vec![],
    }
  }

  /// The symbol table of the translation unit.
  #[must_use] pub fn symtab(&self) -> &SymTab { &self.symtab }

  /// Whether the token stream is exhausted.
  pub fn at_eof(&mut self) -> CResult<bool> { Ok(self.cur.peek()? == TokenKind::Eof) }

  /// Close the file scope. Call once after the last declaration.
  pub fn finish(&mut self) { self.symtab.pop_scope() }

  /// Parse one external declaration. Returns the finished CFG when the
  /// declaration was a function definition; its entry block is
  /// [`BlockId::ENTRY`].
  pub fn declaration(&mut self) -> CResult<Option<Cfg>> { self.declaration_into(None) }

  // Declarations

  /// Consume a run of type-specifier, qualifier, and storage-class
  /// keywords, collapsed to a scalar base type. Storage classes are
  /// accepted and discarded; a missing type specifier is fatal.
  fn declaration_specifiers(&mut self) -> CResult<Type> {
    let mut kind = None;
    let mut quals = Quals::empty();
    loop {
      let TokenKind::Kw(kw) = self.cur.peek()? else { break };
      match kw {
        Keyword::Char => kind = Some(TypeKind::Char),
        Keyword::Short | Keyword::Int | Keyword::Long | Keyword::Signed |
        Keyword::Unsigned => kind = Some(TypeKind::Int64),
        Keyword::Float | Keyword::Double => kind = Some(TypeKind::Double),
        Keyword::Void => kind = Some(TypeKind::Void),
        Keyword::Const => quals |= Quals::CONST,
        Keyword::Volatile => quals |= Quals::VOLATILE,
        Keyword::Auto | Keyword::Register | Keyword::Static | Keyword::Extern |
        Keyword::Typedef => {}
        _ => break,
      }
      self.cur.readtoken()?;
    }
    match kind {
      Some(kind) => Ok(TypeS::scalar(kind, quals)),
      None => Err(CompileError::Shape("missing type specifier in declaration".into())),
    }
  }

  /// Peel `*` prefixes left to right, each wrapping the base in a fresh
  /// pointer node that absorbs its own trailing qualifiers.
  fn declarator(&mut self, mut base: Type) -> CResult<(Type, Option<Symbol>)> {
    while self.cur.peek()? == TokenKind::Punct('*') {
      self.cur.readtoken()?;
      let mut quals = Quals::empty();
      loop {
        match self.cur.peek()? {
          TokenKind::Kw(Keyword::Const) => quals |= Quals::CONST,
          TokenKind::Kw(Keyword::Volatile) => quals |= Quals::VOLATILE,
          _ => break,
        }
        self.cur.readtoken()?;
      }
      base = TypeS::ptr(base, quals);
    }
    self.direct_declarator(base)
  }

  /// The declarator head (a name, a parenthesized sub-declarator, or
  /// nothing for an abstract declarator), followed by array and function
  /// suffixes.
  fn direct_declarator(&mut self, base: Type) -> CResult<(Type, Option<Symbol>)> {
    let (mut ty, name) = match self.cur.peek()? {
      TokenKind::Ident => {
        let tok = self.cur.readtoken()?;
        (base, Some(tok.lexeme))
      }
      TokenKind::Punct('(') => {
        self.cur.readtoken()?;
        let inner = self.declarator(base)?;
        self.cur.consume(TokenKind::Punct(')'))?;
        inner
      }
      _ => (base, None),
    };
    loop {
      match self.cur.peek()? {
        TokenKind::Punct('[') => ty = self.array_declarator(ty)?,
        TokenKind::Punct('(') => ty = self.parameter_list(ty)?,
        _ => break,
      }
    }
    Ok((ty, name))
  }

  /// Consume all consecutive `[..]` groups, then unwind, wrapping outside
  /// in: `T x[a][b]` yields `Array(a, Array(b, T))`.
  fn array_declarator(&mut self, base: Type) -> CResult<Type> {
    self.cur.readtoken()?; // `[`
    let len = if self.cur.peek()? == TokenKind::Punct(']') { 0 } else { self.array_dimension()? };
    self.cur.consume(TokenKind::Punct(']'))?;
    let inner = if self.cur.peek()? == TokenKind::Punct('[') {
      self.array_declarator(base)?
    } else {
      base
    };
    Ok(TypeS::array(len, inner))
  }

  /// An array dimension: a constant expression evaluated at parse time into
  /// a throwaway block. It must reduce to a positive integer immediate.
  fn array_dimension(&mut self) -> CResult<u64> {
    let scratch = self.cfg.new_block(None);
    let val = self.assignment_expression(scratch)?;
    let sym = &self.symtab[val];
    if_chain! {
      if let Some(Imm::Int(n)) = sym.imm;
      if n > 0;
      then { Ok(u64::try_from(n).expect("checked positive")) }
      else {
        Err(CompileError::Constant(
          "array dimension must be a positive constant integer".into()))
      }
    }
  }

  /// Build a function type whose return type is `ret`. Parameter names may
  /// be absent in a prototype; a trailing `, ...` marks a variadic
  /// function, and a bare trailing comma is fatal.
  fn parameter_list(&mut self, ret: Type) -> CResult<Type> {
    self.cur.readtoken()?; // `(`
    let mut args = vec![];
    let mut params = vec![];
    let mut variadic = false;
    if self.cur.peek()? != TokenKind::Punct(')') {
      loop {
        if self.cur.peek()? == TokenKind::Kw(Keyword::Dots) {
          self.cur.readtoken()?;
          variadic = true;
          break
        }
        let base = self.declaration_specifiers()?;
        let (ty, name) = self.declarator(base)?;
        args.push(ty);
        params.push(name);
        if self.cur.peek()? == TokenKind::Punct(',') {
          self.cur.readtoken()?;
          if self.cur.peek()? == TokenKind::Punct(')') {
            return Err(CompileError::Shape("trailing comma in parameter list".into()))
          }
          continue
        }
        break
      }
    }
    self.cur.consume(TokenKind::Punct(')'))?;
    Ok(TypeS::func(ret, args, params, variadic))
  }

  /// Parse one declaration. `b` is the block receiving initializer code for
  /// block-scope declarations; at file scope (`None`) initializers are
  /// constant expressions evaluated into a throwaway block.
  fn declaration_into(&mut self, b: Option<BlockId>) -> CResult<Option<Cfg>> {
    let base = self.declaration_specifiers()?;
    loop {
      let (ty, name) = self.declarator(base.clone())?;
      let Some(name) = name else {
        return Err(CompileError::Shape("expected a name in declarator".into()))
      };
      self.symtab.add(name, ty.clone());
      match self.cur.peek()? {
        TokenKind::Punct(';') => {
          self.cur.readtoken()?;
          return Ok(None)
        }
        TokenKind::Punct('=') => {
          self.cur.readtoken()?;
          let blk = b.unwrap_or_else(|| self.cfg.new_block(None));
          let val = self.assignment_expression(blk)?;
          // file scope requires a constant; the value itself is discarded
          if b.is_none() && !self.symtab[val].is_immediate() {
            return Err(CompileError::Constant(
              format!("initializer of `{name}` is not a constant expression")))
          }
          if self.cur.peek()? == TokenKind::Punct(',') {
            self.cur.readtoken()?;
            continue
          }
          self.cur.consume(TokenKind::Punct(';'))?;
          return Ok(None)
        }
        TokenKind::Punct('{') => return self.function_definition(name, &ty).map(Some),
        _ => { self.cur.consume(TokenKind::Punct(','))?; }
      }
    }
  }

  /// Lower a function body. The entry block carries the function name as
  /// its label; parameters are bound in a fresh scope and must all be
  /// named. Nested definitions are rejected.
  fn function_definition(&mut self, name: Symbol, ty: &Type) -> CResult<Cfg> {
    let TypeKind::Function(ft) = &ty.k else {
      return Err(CompileError::Shape(format!("`{name}` is not a function type")))
    };
    if self.symtab.depth() != 0 {
      return Err(CompileError::Shape(format!("nested definition of function `{name}`")))
    }
    log::debug!("lowering function `{name}`");
    self.cfg = Cfg::default();
    let entry = self.cfg.new_block(Some(name));
    debug_assert_eq!(entry, BlockId::ENTRY);
    self.symtab.push_scope();
    let r = (|| {
      for (i, (arg, param)) in ft.args.iter().zip(&ft.params).enumerate() {
        let Some(param) = *param else {
          return Err(CompileError::Shape(
            format!("parameter {} of `{name}` needs a name", i + 1)))
        };
        self.symtab.add(param, arg.clone());
      }
      self.block(entry)
    })();
    self.symtab.pop_scope();
    r?;
    Ok(std::mem::take(&mut self.cfg))
  }

  // Statements

  /// Lower a compound statement `{ ... }` starting in `parent`; returns the
  /// tail block that subsequent lowering should continue into.
  fn block(&mut self, mut parent: BlockId) -> CResult<BlockId> {
    self.cur.consume(TokenKind::Punct('{'))?;
    while self.cur.peek()? != TokenKind::Punct('}') {
      if self.cur.peek()? == TokenKind::Eof {
        return Err(CompileError::Syntax {
          expected: TokenKind::Punct('}').to_string(),
          found: "end of input".into(),
        })
      }
      parent = self.statement(parent)?;
    }
    self.cur.readtoken()?;
    Ok(parent)
  }

  /// Lower one statement into `parent` and return the new tail. The caller
  /// must keep its own roots: compound constructs splice in fresh blocks
  /// and return a different tail, which always has both jumps unset.
  fn statement(&mut self, parent: BlockId) -> CResult<BlockId> {
    match self.cur.peek()? {
      TokenKind::Punct(';') => {
        self.cur.readtoken()?;
        Ok(parent)
      }
      TokenKind::Punct('{') => {
        self.symtab.push_scope();
        let r = self.block(parent);
        self.symtab.pop_scope();
        r
      }
      // `switch` lowers identically to `if` for now; case dispatch is not
      // implemented
      TokenKind::Kw(Keyword::If | Keyword::Switch) => {
        self.cur.readtoken()?;
        // parent:
        //   cbr cond, next, right
        // right:              (the true branch; `left` replaces next
        //   ...  -> next       as the zero target when `else` is present)
        // next:
        let right = self.cfg.new_block(None);
        let next = self.cfg.new_block(None);
        self.cur.consume(TokenKind::Punct('('))?;
        let cond = self.expression(parent)?;
        self.cur.consume(TokenKind::Punct(')'))?;
        self.cfg[parent].expr = Some(cond);
        self.cfg[parent].jumps = [Some(next), Some(right)];
        let tail = self.statement(right)?;
        self.cfg[tail].jumps[0] = Some(next);
        if self.cur.peek()? == TokenKind::Kw(Keyword::Else) {
          self.cur.readtoken()?;
          let left = self.cfg.new_block(None);
          self.cfg[parent].jumps[0] = Some(left);
          let tail = self.statement(left)?;
          self.cfg[tail].jumps[0] = Some(next);
        }
        Ok(next)
      }
      TokenKind::Kw(Keyword::While) => {
        self.cur.readtoken()?;
        // parent -> top:
        //   cbr cond, next, body
        // body:
        //   ...  -> top
        // next:
        let top = self.cfg.new_block(None);
        let body = self.cfg.new_block(None);
        let next = self.cfg.new_block(None);
        self.cfg[parent].jumps[0] = Some(top);
        self.loops.push((next, top));
        self.cur.consume(TokenKind::Punct('('))?;
        let cond = self.expression(top)?;
        self.cur.consume(TokenKind::Punct(')'))?;
        self.cfg[top].expr = Some(cond);
        self.cfg[top].jumps = [Some(next), Some(body)];
        let tail = self.statement(body)?;
        self.cfg[tail].jumps[0] = Some(top);
        self.loops.pop();
        Ok(next)
      }
      TokenKind::Kw(Keyword::Do) => {
        self.cur.readtoken()?;
        // parent -> top:
        //   ...  -> test       (body)
        // test:
        //   cbr cond, next, top     (continue re-enters at test)
        // next:
        let top = self.cfg.new_block(None);
        let next = self.cfg.new_block(None);
        let test = self.cfg.new_block(None);
        self.cfg[parent].jumps[0] = Some(top);
        self.loops.push((next, test));
        let tail = self.statement(top)?;
        self.cur.consume(TokenKind::Kw(Keyword::While))?;
        self.cur.consume(TokenKind::Punct('('))?;
        let cond = self.expression(test)?;
        self.cur.consume(TokenKind::Punct(')'))?;
        self.cur.consume(TokenKind::Punct(';'))?;
        self.cfg[tail].jumps[0] = Some(test);
        self.cfg[test].expr = Some(cond);
        self.cfg[test].jumps = [Some(next), Some(top)];
        self.loops.pop();
        Ok(next)
      }
      TokenKind::Kw(Keyword::For) => {
        self.cur.readtoken()?;
        self.cur.consume(TokenKind::Punct('('))?;
        if self.cur.peek()? != TokenKind::Punct(';') {
          self.expression(parent)?;
        }
        self.cur.consume(TokenKind::Punct(';'))?;
        // parent -> top:
        //   cbr cond, next, body     (without a condition, top aliases body)
        // body:
        //   ...  -> increment -> top
        // next:
        let next = self.cfg.new_block(None);
        let increment = self.cfg.new_block(None);
        self.loops.push((next, increment));
        let (top, body);
        if self.cur.peek()? != TokenKind::Punct(';') {
          top = self.cfg.new_block(None);
          body = self.cfg.new_block(None);
          let cond = self.expression(top)?;
          self.cfg[parent].jumps[0] = Some(top);
          self.cfg[top].expr = Some(cond);
          self.cfg[top].jumps = [Some(next), Some(body)];
        } else {
          body = self.cfg.new_block(None);
          self.cfg[parent].jumps[0] = Some(body);
          top = body;
        }
        self.cur.consume(TokenKind::Punct(';'))?;
        if self.cur.peek()? != TokenKind::Punct(')') {
          self.expression(increment)?;
        }
        self.cfg[increment].jumps[0] = Some(top);
        self.cur.consume(TokenKind::Punct(')'))?;
        let tail = self.statement(body)?;
        self.cfg[tail].jumps[0] = Some(increment);
        self.loops.pop();
        Ok(next)
      }
      TokenKind::Kw(kw @ (Keyword::Continue | Keyword::Break)) => {
        self.cur.readtoken()?;
        self.cur.consume(TokenKind::Punct(';'))?;
        let &(brk, cont) = self.loops.last().ok_or_else(|| CompileError::Shape(
          format!("`{}` outside of a loop",
            if kw == Keyword::Break { "break" } else { "continue" })))?;
        self.cfg[parent].jumps[0] = Some(if kw == Keyword::Break { brk } else { cont });
        // dead code lowers into an orphan until labels are wired up
        Ok(self.cfg.new_block(None))
      }
      TokenKind::Kw(Keyword::Return) => {
        self.cur.readtoken()?;
        if self.cur.peek()? != TokenKind::Punct(';') {
          let v = self.expression(parent)?;
          self.cfg[parent].expr = Some(v);
        }
        self.cur.consume(TokenKind::Punct(';'))?;
        Ok(self.cfg.new_block(None))
      }
      TokenKind::Kw(Keyword::Goto) => {
        // parsed and discarded; label targets are not wired up
        self.cur.readtoken()?;
        self.cur.consume(TokenKind::Ident)?;
        self.cur.consume(TokenKind::Punct(';'))?;
        Ok(parent)
      }
      TokenKind::Ident | TokenKind::Int | TokenKind::Str | TokenKind::Punct('(') => {
        self.expression(parent)?;
        self.cur.consume(TokenKind::Punct(';'))?;
        Ok(parent)
      }
      _ => {
        self.declaration_into(Some(parent))?;
        Ok(parent)
      }
    }
  }

  // Expressions
  //
  // Each level lowers into the block `b` and returns the symbol naming the
  // result. Binary levels allocate a fresh temporary per operation.

  /// Full expression. Comma sequencing is not implemented, so this is
  /// assignment level.
  fn expression(&mut self, b: BlockId) -> CResult<SymId> { self.assignment_expression(b) }

  /// `l = r` emits an assignment and yields `l`; right-associative by
  /// recursion. The left side is not checked for l-value-ness.
  fn assignment_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let l = self.conditional_expression(b)?;
    if self.cur.peek()? == TokenKind::Punct('=') {
      self.cur.readtoken()?;
      let r = self.assignment_expression(b)?;
      self.cfg[b].push(Ir::Assign(l, r));
    }
    Ok(l)
  }

  /// `c ? t : f` evaluates all three operands into the current block, in
  /// order, with no branching; the result is the last arm.
  fn conditional_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let cond = self.logical_expression(b)?;
    if self.cur.peek()? == TokenKind::Punct('?') {
      self.cur.readtoken()?;
      self.expression(b)?;
      self.cur.consume(TokenKind::Punct(':'))?;
      return self.conditional_expression(b)
    }
    Ok(cond)
  }

  /// `&&` and `||`, emitted as plain binary ops without a short-circuit
  /// split.
  fn logical_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let mut l = self.bitor_expression(b)?;
    loop {
      let op = match self.cur.peek()? {
        TokenKind::Kw(Keyword::LogicalAnd) => Binop::LogicalAnd,
        TokenKind::Kw(Keyword::LogicalOr) => Binop::LogicalOr,
        _ => return Ok(l),
      };
      self.cur.readtoken()?;
      let r = self.bitor_expression(b)?;
      l = self.emit_binop(b, op, l, r);
    }
  }

  /// `|` and `^` share a level.
  fn bitor_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let mut l = self.bitand_expression(b)?;
    loop {
      let op = match self.cur.peek()? {
        TokenKind::Punct('|') => Binop::BitOr,
        TokenKind::Punct('^') => Binop::BitXor,
        _ => return Ok(l),
      };
      self.cur.readtoken()?;
      let r = self.bitand_expression(b)?;
      l = self.emit_binop(b, op, l, r);
    }
  }

  fn bitand_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let mut l = self.equality_expression(b)?;
    while self.cur.peek()? == TokenKind::Punct('&') {
      self.cur.readtoken()?;
      let r = self.equality_expression(b)?;
      l = self.emit_binop(b, Binop::BitAnd, l, r);
    }
    Ok(l)
  }

  /// Equality operators do not lex as single tokens yet; the rung is
  /// structural.
  fn equality_expression(&mut self, b: BlockId) -> CResult<SymId> {
    self.relational_expression(b)
  }

  /// No IR encoding for comparisons yet; the rung is structural.
  fn relational_expression(&mut self, b: BlockId) -> CResult<SymId> {
    self.shift_expression(b)
  }

  /// Shift operators do not lex as single tokens yet; the rung is
  /// structural.
  fn shift_expression(&mut self, b: BlockId) -> CResult<SymId> {
    self.additive_expression(b)
  }

  fn additive_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let mut l = self.multiplicative_expression(b)?;
    loop {
      let op = match self.cur.peek()? {
        TokenKind::Punct('+') => Binop::Add,
        TokenKind::Punct('-') => Binop::Sub,
        _ => return Ok(l),
      };
      self.cur.readtoken()?;
      let r = self.multiplicative_expression(b)?;
      l = self.emit_binop(b, op, l, r);
    }
  }

  fn multiplicative_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let mut l = self.cast_expression(b)?;
    loop {
      let op = match self.cur.peek()? {
        TokenKind::Punct('*') => Binop::Mul,
        TokenKind::Punct('/') => Binop::Div,
        TokenKind::Punct('%') => Binop::Mod,
        _ => return Ok(l),
      };
      self.cur.readtoken()?;
      let r = self.cast_expression(b)?;
      l = self.emit_binop(b, op, l, r);
    }
  }

  /// Cast syntax is not lowered yet; the rung is structural.
  fn cast_expression(&mut self, b: BlockId) -> CResult<SymId> {
    self.unary_expression(b)
  }

  /// Unary `*` loads through a pointer; other unary operators have no IR
  /// encoding yet.
  fn unary_expression(&mut self, b: BlockId) -> CResult<SymId> {
    if self.cur.peek()? == TokenKind::Punct('*') {
      self.cur.readtoken()?;
      let v = self.cast_expression(b)?;
      let ty = self.symtab[v].ty.clone();
      let TypeKind::Pointer(pointee) = &ty.k else {
        return Err(CompileError::Type(format!("dereference of non-pointer `{ty}`")))
      };
      let res = self.symtab.mktemp(pointee.clone());
      self.cfg[b].push(Ir::Deref(res, v));
      return Ok(res)
    }
    self.postfix_expression(b)
  }

  fn postfix_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let mut root = self.primary_expression(b)?;
    loop {
      match self.cur.peek()? {
        TokenKind::Punct('[') => root = self.index_expression(b, root)?,
        TokenKind::Punct('(') => {
          // call arguments are parsed and discarded; the expression keeps
          // the callee symbol
          self.cur.readtoken()?;
          if self.cur.peek()? != TokenKind::Punct(')') {
            loop {
              self.assignment_expression(b)?;
              if self.cur.peek()? == TokenKind::Punct(',') {
                self.cur.readtoken()?;
                continue
              }
              break
            }
          }
          self.cur.consume(TokenKind::Punct(')'))?;
        }
        TokenKind::Punct('.') => {
          // member access is parsed and discarded
          self.cur.readtoken()?;
          self.cur.consume(TokenKind::Ident)?;
        }
        _ => return Ok(root),
      }
    }
  }

  /// `a[i]` scales the index by the element size and adds it to the root.
  /// Indexing an array of arrays decays one rank without a load; otherwise
  /// the root must be a pointer and the element is loaded through it.
  fn index_expression(&mut self, b: BlockId, root: SymId) -> CResult<SymId> {
    self.cur.readtoken()?; // `[`
    let idx = self.expression(b)?;
    self.cur.consume(TokenKind::Punct(']'))?;
    let root_ty = self.symtab[root].ty.clone();
    let Some(elem) = root_ty.deref().cloned() else {
      return Err(CompileError::Type(format!("`{root_ty}` cannot be indexed")))
    };
    let size = self.symtab.mkimmediate_long(i64::try_from(elem.size).expect("overflow"));
    let t1 = self.symtab.mktemp(TypeS::int64());
    self.cfg[b].push(Ir::Binop(Binop::Mul, t1, idx, size));
    if elem.is_array() {
      let t2 = self.symtab.mktemp(elem);
      self.cfg[b].push(Ir::Binop(Binop::Add, t2, root, t1));
      Ok(t2)
    } else {
      if !root_ty.is_pointer() {
        return Err(CompileError::Type(format!("dereference of non-pointer `{root_ty}`")))
      }
      let t2 = self.symtab.mktemp(TypeS::combine(&root_ty, &self.symtab[t1].ty));
      self.cfg[b].push(Ir::Binop(Binop::Add, t2, root, t1));
      let t3 = self.symtab.mktemp(elem);
      self.cfg[b].push(Ir::Deref(t3, t2));
      Ok(t3)
    }
  }

  fn primary_expression(&mut self, b: BlockId) -> CResult<SymId> {
    let tok = self.cur.readtoken()?;
    match tok.k {
      TokenKind::Ident =>
        self.symtab.lookup(tok.lexeme).ok_or(CompileError::Name(tok.lexeme)),
      TokenKind::Int => self.symtab.mkimmediate(tok.lexeme),
      TokenKind::Str => Ok(self.symtab.mkimmediate_str(tok.lexeme)),
      TokenKind::Punct('(') => {
        let v = self.expression(b)?;
        self.cur.consume(TokenKind::Punct(')'))?;
        Ok(v)
      }
      _ => Err(CompileError::Syntax {
        expected: "an expression".into(),
        found: tok.describe(),
      }),
    }
  }

  /// Emit `res = l op r` into `b`, with a fresh temporary of the combined
  /// type as the result.
  fn emit_binop(&mut self, b: BlockId, op: Binop, l: SymId, r: SymId) -> SymId {
    let ty = TypeS::combine(&self.symtab[l].ty, &self.symtab[r].ty);
    let res = self.symtab.mktemp(ty);
    self.cfg[b].push(Ir::Binop(op, res, l, r));
    res
  }
}
