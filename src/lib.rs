//! A small self-hosting-style C compiler front end.
//!
//! `tacc` parses a subset of C in a single pass over the token stream and
//! lowers it to a control-flow graph of basic blocks whose bodies are
//! three-address IR operations. Declarations produce functions; statements
//! splice basic blocks together via branch edges; expressions emit linear IR
//! into the current block and return the symbol naming the result.
//!
//! The pipeline is one-way: tokens ([`lexer`]) flow through the parser
//! ([`build_cfg`]), which builds types ([`types`]) and scoped symbols
//! ([`symtab`]) as it goes, and each finished function is handed to the
//! textual IR emitter ([`emit`]). Nothing is retained across function
//! definitions except file-scope symbols.

pub mod symbol;
pub mod error;
pub mod types;
pub mod lexer;
pub mod symtab;
pub mod build_cfg;
pub mod emit;

use std::io::Write;

pub use symbol::{Symbol, intern};
pub use types::{Idx, IdxVec};

use build_cfg::Parser;
use error::CResult;
use types::ir::BlockId;

/// Compiler state for one translation unit.
pub struct Compiler<'a> {
  parser: Parser<'a>,
}

impl<'a> Compiler<'a> {
  /// Create a compiler over the given source text.
  #[must_use] pub fn new(src: &'a str) -> Self { Self { parser: Parser::new(src) } }

  /// Parse declarations until end of input, writing the textual IR of each
  /// function definition to `out`. Emitted functions are separated by blank
  /// lines. On error the translation unit is abandoned; no partially
  /// lowered function reaches the output.
  pub fn compile(mut self, out: &mut impl Write) -> CResult<()> {
    while !self.parser.at_eof()? {
      if let Some(cfg) = self.parser.declaration()? {
        emit::output_block(&cfg, BlockId::ENTRY, self.parser.symtab(), out)?;
        out.write_all(b"\n")?;
      }
    }
    self.parser.finish();
    log::debug!("translation unit complete");
    Ok(())
  }
}

/// Compile `src`, writing textual IR to `out`.
pub fn compile(src: &str, out: &mut impl Write) -> CResult<()> {
  Compiler::new(src).compile(out)
}
