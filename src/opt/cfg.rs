//! Control-flow graph construction over a flat TAC instruction stream
//! (spec §4.E "CFG construction").
//!
//! Modeled on `cranelift_codegen::flowgraph::ControlFlowGraph`, but
//! built from leaders over a flat `Vec<Instruction>` rather than from
//! pre-existing EBB boundaries, since this IR has no block structure
//! until this pass imposes one.

use std::collections::HashMap;

use crate::tac::entities::Label;
use crate::tac::function::TacFunction;
use crate::tac::instructions::Instruction;

/// One basic block: a half-open range `[start, end)` of instruction
/// indices into the owning function's instruction stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub start: usize,
    pub end: usize,
    pub successors: Vec<usize>,
    pub predecessors: Vec<usize>,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// The control-flow graph of one lowered function.
#[derive(Clone, Debug, Default)]
pub struct Cfg {
    pub blocks: Vec<Block>,
    /// Label -> owning block index, for resolving jump targets.
    pub label_blocks: HashMap<Label, usize>,
}

impl Cfg {
    /// Leaders are instruction 0, every label, and every instruction
    /// immediately after a block terminator (spec §4.E).
    pub fn build(func: &TacFunction) -> Cfg {
        let instructions = &func.instructions;
        let mut leaders: Vec<usize> = Vec::new();
        if !instructions.is_empty() {
            leaders.push(0);
        }
        for (i, inst) in instructions.iter().enumerate() {
            if matches!(inst, Instruction::Label(_)) {
                leaders.push(i);
            }
            if inst.is_terminator() && i + 1 < instructions.len() {
                leaders.push(i + 1);
            }
        }
        leaders.sort_unstable();
        leaders.dedup();

        let mut blocks: Vec<Block> = Vec::with_capacity(leaders.len());
        for (idx, &start) in leaders.iter().enumerate() {
            let end = leaders.get(idx + 1).copied().unwrap_or(instructions.len());
            blocks.push(Block {
                start,
                end,
                successors: Vec::new(),
                predecessors: Vec::new(),
            });
        }

        let mut label_blocks = HashMap::new();
        for (block_idx, block) in blocks.iter().enumerate() {
            if let Some(Instruction::Label(l)) = instructions.get(block.start) {
                label_blocks.insert(*l, block_idx);
            }
        }

        let block_of = |idx: usize, leaders: &[usize]| -> usize {
            leaders.partition_point(|&l| l <= idx).saturating_sub(1)
        };

        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); blocks.len()];
        for (bi, block) in blocks.iter().enumerate() {
            if block.is_empty() {
                continue;
            }
            let last = &instructions[block.end - 1];
            match last {
                Instruction::ConditionalJump { target, .. } => {
                    if let Some(&tb) = label_blocks.get(target) {
                        successors[bi].push(tb);
                    }
                    if block.end < instructions.len() {
                        successors[bi].push(block_of(block.end, &leaders));
                    }
                }
                Instruction::UnconditionalJump { target } => {
                    if let Some(&tb) = label_blocks.get(target) {
                        successors[bi].push(tb);
                    }
                }
                Instruction::Return { .. } => {}
                _ => {
                    if block.end < instructions.len() {
                        successors[bi].push(block_of(block.end, &leaders));
                    }
                }
            }
        }

        for (bi, succs) in successors.into_iter().enumerate() {
            blocks[bi].successors = succs;
        }
        let preds: Vec<Vec<usize>> = {
            let mut preds = vec![Vec::new(); blocks.len()];
            for (bi, block) in blocks.iter().enumerate() {
                for &s in &block.successors {
                    preds[s].push(bi);
                }
            }
            preds
        };
        for (bi, p) in preds.into_iter().enumerate() {
            blocks[bi].predecessors = p;
        }

        Cfg { blocks, label_blocks }
    }

    pub fn entry(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::entities::{Operand, Temp};
    use cranelift_entity::EntityRef;

    fn label(n: u32) -> Label {
        Label::new(n as usize)
    }

    #[test]
    fn straight_line_is_one_block() {
        let mut f = TacFunction::new(None);
        f.push(Instruction::Copy {
            dest: Operand::Temporary { id: Temp::new(0), ty: crate::types::TypeSymbol::Single },
            src: Operand::number_const(1.0),
        });
        f.push(Instruction::Return { value: None });
        let cfg = Cfg::build(&f);
        assert_eq!(cfg.blocks.len(), 1);
    }

    #[test]
    fn jump_splits_into_blocks() {
        let mut f = TacFunction::new(None);
        f.push(Instruction::UnconditionalJump { target: label(0) });
        f.push(Instruction::Label(label(0)));
        f.push(Instruction::Return { value: None });
        let cfg = Cfg::build(&f);
        assert_eq!(cfg.blocks.len(), 2);
        assert_eq!(cfg.blocks[0].successors, vec![1]);
        assert_eq!(cfg.blocks[1].predecessors, vec![0]);
    }
}
