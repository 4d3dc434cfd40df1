//! Lay out code elements and widen jumps that don't fit
//!
//! Most jump instructions only have a signed 16-bit relative offset. Injecting code can push a
//! jump target out of that range, in which case the jump is rewritten into a form using the 32-bit
//! `goto_w`:
//!
//! ```text,ignore,no_run
//!     goto L2               goto_w L2
//! L1: ...         =>    L1: ...
//! ```
//!
//! Conditional branches have no wide form, so the condition is flipped to jump over an
//! unconditional wide jump:
//!
//! ```text,ignore,no_run
//!                           ifnot* L3
//!     if* L2                goto_w L2
//! L1: ...         =>    L3:
//!                       L1: ...
//! ```
//!
//! ### Termination
//!
//! Every rewrite makes the code longer, which may in turn push other jumps out of range (and
//! change `tableswitch`/`lookupswitch` padding). Layout is therefore repeated until nothing needs
//! rewriting. This terminates since a jump is never narrowed again once widened and the jumps
//! introduced by the rewrite only cover a fixed 8 bytes.

use crate::jvm::code::{CodeElement, Instruction, Label, LabelGenerator};
use crate::jvm::Error;
use std::collections::HashMap;
use std::ops::RangeInclusive;

/// Range of relative jump offsets supported by `goto` and `if*` branch instructions
pub const SIGNED_16BIT_JUMP_RANGE: RangeInclusive<isize> =
    RangeInclusive::new(i16::MIN as isize, i16::MAX as isize);

/// Offsets of every element, given the current instructions
#[derive(Debug)]
pub struct Layout {
    /// Offset at which each element starts (labels take no space)
    pub element_offsets: Vec<usize>,

    /// Offset of each label
    pub label_offsets: HashMap<Label, usize>,

    /// Total length of the code array
    pub code_length: usize,
}

impl Layout {
    pub fn compute(elements: &[CodeElement]) -> Layout {
        let mut element_offsets = Vec::with_capacity(elements.len());
        let mut label_offsets = HashMap::new();
        let mut offset = 0;
        for element in elements {
            element_offsets.push(offset);
            match element {
                CodeElement::Label(label) => {
                    label_offsets.insert(*label, offset);
                }
                CodeElement::Instruction(insn) => offset += insn.width(offset),
            }
        }
        Layout {
            element_offsets,
            label_offsets,
            code_length: offset,
        }
    }

    pub fn label_offset(&self, label: Label) -> Result<usize, Error> {
        self.label_offsets
            .get(&label)
            .copied()
            .ok_or(Error::UnplacedLabel(label))
    }

    /// Signed distance from the instruction at `offset` to `label`
    pub fn jump_distance(&self, offset: usize, label: Label) -> Result<isize, Error> {
        Ok(self.label_offset(label)? as isize - offset as isize)
    }
}

/// Widen every jump whose distance does not fit in 16 bits
///
/// Returns whether any conditional branch was rewritten (those rewrites introduce new labels which
/// are jump targets).
pub fn widen_oversized_jumps(
    elements: &mut Vec<CodeElement>,
    label_generator: &mut LabelGenerator,
) -> Result<bool, Error> {
    widen_jumps_in_range(elements, label_generator, &SIGNED_16BIT_JUMP_RANGE)
}

/// Same as [`widen_oversized_jumps`], with a configurable range (for testing)
fn widen_jumps_in_range(
    elements: &mut Vec<CodeElement>,
    label_generator: &mut LabelGenerator,
    small_jump_range: &RangeInclusive<isize>,
) -> Result<bool, Error> {
    let mut rewrote_branches = false;
    loop {
        let layout = Layout::compute(elements);
        let mut widened_any = false;
        let mut oversized_branches = vec![];

        for (idx, element) in elements.iter_mut().enumerate() {
            let insn = match element {
                CodeElement::Instruction(insn) => insn,
                CodeElement::Label(_) => continue,
            };
            let offset = layout.element_offsets[idx];
            match insn {
                Instruction::Goto(target) => {
                    let target = *target;
                    if !small_jump_range.contains(&layout.jump_distance(offset, target)?) {
                        *insn = Instruction::GotoW(target);
                        widened_any = true;
                    }
                }
                Instruction::Jsr(target) => {
                    let target = *target;
                    if !small_jump_range.contains(&layout.jump_distance(offset, target)?) {
                        *insn = Instruction::JsrW(target);
                        widened_any = true;
                    }
                }
                Instruction::If(_, target)
                | Instruction::IfICmp(_, target)
                | Instruction::IfACmp(_, target)
                | Instruction::IfNull(_, target) => {
                    if !small_jump_range.contains(&layout.jump_distance(offset, *target)?) {
                        oversized_branches.push(idx);
                    }
                }
                _ => (),
            }
        }

        if !widened_any && oversized_branches.is_empty() {
            return Ok(rewrote_branches);
        }

        // Back to front, so that indices of the remaining branches stay valid
        for idx in oversized_branches.into_iter().rev() {
            let skip_label = label_generator.fresh_label();
            let (inverted, far_target) = match &elements[idx] {
                CodeElement::Instruction(insn) => match invert_branch(insn, skip_label) {
                    Some(rewrite) => rewrite,
                    None => continue,
                },
                CodeElement::Label(_) => continue,
            };
            elements.splice(
                idx..=idx,
                [
                    CodeElement::Instruction(inverted),
                    CodeElement::Instruction(Instruction::GotoW(far_target)),
                    CodeElement::Label(skip_label),
                ],
            );
            rewrote_branches = true;
        }
    }
}

/// Flip a conditional branch so that it jumps to `new_target`, returning the old target too
fn invert_branch(insn: &Instruction, new_target: Label) -> Option<(Instruction, Label)> {
    let inverted = match insn {
        Instruction::If(comp, target) => (Instruction::If(!*comp, new_target), *target),
        Instruction::IfICmp(comp, target) => (Instruction::IfICmp(!*comp, new_target), *target),
        Instruction::IfACmp(comp, target) => (Instruction::IfACmp(!*comp, new_target), *target),
        Instruction::IfNull(comp, target) => (Instruction::IfNull(!*comp, new_target), *target),
        _ => return None,
    };
    Some(inverted)
}
