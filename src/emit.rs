//! Textual IR output.
//!
//! The emitter receives the entry block of a finished function and prints
//! the reachable part of its CFG. One line per IR operation, followed by the
//! block exit:
//!
//! * `ret` / `ret x` for a terminal block;
//! * `jmp .L2` for an unconditional branch;
//! * `cbr x, .L2, .L3` for a conditional branch (zero goes to the first
//!   target).
//!
//! Orphan blocks are skipped; temporaries are numbered per function in
//! order of first appearance.

use std::io::{self, Write};

use bit_set::BitSet;
use hashbrown::HashMap;

use crate::symtab::{Imm, SymId, SymTab};
use crate::types::Idx;
use crate::types::ir::{BlockId, Cfg, Ir};

struct Names<'a> {
  symtab: &'a SymTab,
  temps: HashMap<SymId, usize>,
}

impl Names<'_> {
  fn get(&mut self, id: SymId) -> String {
    let sym = &self.symtab[id];
    match (sym.name, sym.imm) {
      (Some(name), _) => name.to_string(),
      (None, Some(Imm::Int(n))) => n.to_string(),
      (None, Some(Imm::Str(s))) => format!("\"{s}\""),
      (None, None) => {
        let next = self.temps.len();
        format!("t{}", *self.temps.entry(id).or_insert(next))
      }
    }
  }
}

fn block_name(cfg: &Cfg, b: BlockId) -> String {
  cfg[b].label.map_or_else(|| format!(".L{}", b.into_usize()), |name| name.to_string())
}

/// Print the reachable CFG of a finished function, entry first.
pub fn output_block(cfg: &Cfg, entry: BlockId, symtab: &SymTab,
  w: &mut impl Write
) -> io::Result<()> {
  let mut visited = BitSet::with_capacity(cfg.blocks.len());
  let mut order = vec![];
  let mut stack = vec![entry];
  while let Some(b) = stack.pop() {
    if !visited.insert(b.into_usize()) { continue }
    order.push(b);
    // push the zero target last so it is visited first
    for &tgt in cfg[b].jumps.iter().rev().flatten() { stack.push(tgt) }
  }
  log::debug!("emitting `{}`: {} of {} blocks reachable",
    block_name(cfg, entry), order.len(), cfg.blocks.len());

  let mut names = Names { symtab, temps: HashMap::new() };
  for &b in &order {
    let bl = &cfg[b];
    writeln!(w, "{}:", block_name(cfg, b))?;
    for &op in &bl.stmts {
      match op {
        Ir::Assign(dst, src) => {
          let (dst, src) = (names.get(dst), names.get(src));
          writeln!(w, "  {dst} = {src}")?;
        }
        Ir::Deref(dst, src) => {
          let (dst, src) = (names.get(dst), names.get(src));
          writeln!(w, "  {dst} = *{src}")?;
        }
        Ir::Binop(op, dst, l, r) => {
          let (dst, l, r) = (names.get(dst), names.get(l), names.get(r));
          writeln!(w, "  {dst} = {l} {} {r}", op.as_str())?;
        }
      }
    }
    match bl.jumps {
      [None, None] => match bl.expr {
        Some(e) => { let e = names.get(e); writeln!(w, "  ret {e}")? }
        None => writeln!(w, "  ret")?,
      },
      [Some(tgt), None] => writeln!(w, "  jmp {}", block_name(cfg, tgt))?,
      [Some(zero), Some(nonzero)] => {
        let e = names.get(bl.expr.expect("conditional block without a condition"));
        writeln!(w, "  cbr {e}, {}, {}", block_name(cfg, zero), block_name(cfg, nonzero))?;
      }
      [None, Some(_)] => unreachable!("one-armed conditional"),
    }
  }
  Ok(())
}
