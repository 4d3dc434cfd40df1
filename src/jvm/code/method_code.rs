use crate::jvm::class_file::{
    AttributeLike, BytecodeArray, Code, ConstantPool, ExceptionHandler, LineNumber,
    LineNumberTable, LocalVariable, LocalVariableTable, LocalVariableTypeTable, StackMapTable,
    Version,
};
use crate::jvm::code::jump_encoding::{widen_oversized_jumps, Layout};
use crate::jvm::code::{
    decode_instructions, encode_instructions, CodeElement, Instruction, Label, LabelGenerator,
};
use crate::jvm::RenderDescriptor;
use crate::jvm::verifier::{
    compute_frames, declared_frames, Frame, FrameAnalysis, MethodContext, VerificationType,
    VerifierFrame,
};
use crate::jvm::{ClassConstantIndex, Error, Utf8ConstantIndex, VerifierErrorKind};
use std::collections::{HashMap, HashSet};

/// Entry of the exception table, in terms of labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRange {
    /// Start of the covered range (inclusive)
    pub start: Label,

    /// End of the covered range (exclusive)
    pub end: Label,

    pub handler: Label,

    /// Caught class, or [`ClassConstantIndex::NONE`] for any throwable
    pub catch_type: ClassConstantIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start: Label,
    pub line_number: u16,
}

/// Entry of `LocalVariableTable` or `LocalVariableTypeTable`, in terms of labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableRange {
    pub start: Label,
    pub end: Label,
    pub name_index: Utf8ConstantIndex,

    /// Descriptor (or generic signature, for `LocalVariableTypeTable`)
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

/// Decoded body of a method, ready for editing
///
/// Everything in here refers to positions through labels, so elements can be inserted anywhere
/// in [`Self::elements`] without invalidating jumps, exception ranges, or debug tables.
#[derive(Debug, Clone)]
pub struct MethodCode {
    /// Operand stack size, only used as is when no frames get computed
    pub max_stack: u16,
    pub max_locals: u16,
    pub elements: Vec<CodeElement>,
    pub exception_table: Vec<ExceptionRange>,
    pub line_numbers: Vec<LineNumberEntry>,
    pub local_variables: Vec<LocalVariableRange>,
    pub local_variable_types: Vec<LocalVariableRange>,

    /// Frames declared by the original code
    pub stack_map: Option<StackMapTable>,

    /// Names of code attributes that cannot survive a rewrite
    pub dropped_attributes: Vec<String>,

    label_generator: LabelGenerator,
}

impl MethodCode {
    /// Decode a `Code` attribute
    ///
    /// Every instruction gets a label named after its offset, and there is one last label at the
    /// end of the code. Debug table entries that don't line up with instructions are dropped.
    pub fn decode(code: &Code, constants: &ConstantPool) -> Result<MethodCode, Error> {
        let bytes = &code.code_array.0;
        let code_length = bytes.len();
        if code_length == 0 || code_length > u16::MAX as usize {
            return Err(Error::Malformed(format!(
                "invalid method code length {}",
                code_length
            )));
        }

        let instructions = decode_instructions(bytes)?;
        let mut boundaries = HashSet::with_capacity(instructions.len() + 1);
        let mut elements = Vec::with_capacity(2 * instructions.len() + 1);
        for (offset, insn) in instructions {
            boundaries.insert(offset);
            elements.push(CodeElement::Label(Label::at_offset(offset)));
            elements.push(CodeElement::Instruction(insn));
        }
        boundaries.insert(code_length);
        elements.push(CodeElement::Label(Label::at_offset(code_length)));

        let placed: HashSet<Label> = elements.iter().filter_map(CodeElement::label).collect();
        for element in &elements {
            if let CodeElement::Instruction(insn) = element {
                for target in insn.jump_targets() {
                    if !placed.contains(&target) {
                        return Err(Error::Malformed(format!(
                            "jump to {:?} lands in the middle of an instruction",
                            target
                        )));
                    }
                }
            }
        }

        let mut exception_table = vec![];
        for handler in &code.exception_table {
            let (start, end, handler_pc) = (
                handler.start_pc as usize,
                handler.end_pc as usize,
                handler.handler_pc as usize,
            );
            let well_formed = start < end
                && handler_pc < code_length
                && boundaries.contains(&start)
                && boundaries.contains(&end)
                && boundaries.contains(&handler_pc);
            if !well_formed {
                return Err(Error::Malformed(format!(
                    "invalid exception handler {:?}",
                    handler
                )));
            }
            exception_table.push(ExceptionRange {
                start: Label::at_offset(start),
                end: Label::at_offset(end),
                handler: Label::at_offset(handler_pc),
                catch_type: handler.catch_type,
            });
        }

        let mut line_numbers = vec![];
        let mut local_variables = vec![];
        let mut local_variable_types = vec![];
        let mut stack_map = None;
        let mut dropped_attributes = vec![];
        for attribute in &code.attributes {
            let name = attribute.name(constants)?;
            if name == LineNumberTable::NAME {
                let table: LineNumberTable = attribute.decode()?;
                for entry in table.0 {
                    let start = entry.start_pc as usize;
                    if boundaries.contains(&start) {
                        line_numbers.push(LineNumberEntry {
                            start: Label::at_offset(start),
                            line_number: entry.line_number,
                        });
                    } else {
                        log::warn!("dropping line number entry at offset {}", start);
                    }
                }
            } else if name == LocalVariableTable::NAME {
                let table: LocalVariableTable = attribute.decode()?;
                local_variables.extend(local_variable_ranges(table.0, &boundaries));
            } else if name == LocalVariableTypeTable::NAME {
                let table: LocalVariableTypeTable = attribute.decode()?;
                local_variable_types.extend(local_variable_ranges(table.0, &boundaries));
            } else if name == StackMapTable::NAME {
                stack_map = Some(attribute.decode()?);
            } else {
                dropped_attributes.push(name);
            }
        }

        Ok(MethodCode {
            max_stack: code.max_stack,
            max_locals: code.max_locals,
            elements,
            exception_table,
            line_numbers,
            local_variables,
            local_variable_types,
            stack_map,
            dropped_attributes,
            label_generator: LabelGenerator::after_code_length(code_length),
        })
    }

    /// Label which doesn't appear anywhere in the code yet
    pub fn fresh_label(&mut self) -> Label {
        self.label_generator.fresh_label()
    }

    /// Allocate a new local variable (after every existing one) taking `width` slots
    pub fn fresh_local(&mut self, width: usize) -> Result<u16, Error> {
        let index = self.max_locals;
        let max_locals = index as usize + width;
        if max_locals > u16::MAX as usize {
            return Err(Error::MethodCodeMaxLocalsOverflow(max_locals));
        }
        self.max_locals = max_locals as u16;
        Ok(index)
    }

    /// Position of a label in [`Self::elements`]
    pub fn label_position(&self, label: Label) -> Option<usize> {
        self.elements
            .iter()
            .position(|element| element.label() == Some(label))
    }

    /// Lay out the code back into a `Code` attribute
    ///
    /// From class file version 50, frames are recomputed and a fresh `StackMapTable` is emitted
    /// (this may replace unreachable code and split exception ranges). Code attributes that can't
    /// be remapped to the new offsets are left out.
    pub fn assemble(
        mut self,
        constants: &mut ConstantPool,
        version: Version,
        method: &MethodContext,
    ) -> Result<Code, Error> {
        widen_oversized_jumps(&mut self.elements, &mut self.label_generator)?;

        let analysis = if version.uses_stack_map_frames() {
            self.reject_subroutines()?;
            let declared = self.declared_frames(constants, method);

            // Rewriting branches introduces jump targets, which then need frames
            Some(loop {
                let analysis = compute_frames(
                    &mut self.elements,
                    &mut self.exception_table,
                    self.max_locals as usize,
                    &declared,
                    &mut self.label_generator,
                    constants,
                    method,
                )?;
                if !widen_oversized_jumps(&mut self.elements, &mut self.label_generator)? {
                    break analysis;
                }
            })
        } else {
            None
        };

        let layout = Layout::compute(&self.elements);
        if layout.code_length > u16::MAX as usize {
            return Err(Error::MethodCodeOverflow(layout.code_length));
        }
        let code_array = encode_instructions(&self.elements, &layout)?;
        let offset = |label: Label| layout.label_offset(label).map(|offset| offset as u16);

        let mut exception_table = vec![];
        for range in &self.exception_table {
            let start_pc = offset(range.start)?;
            let end_pc = offset(range.end)?;
            if start_pc < end_pc {
                exception_table.push(ExceptionHandler {
                    start_pc,
                    end_pc,
                    handler_pc: offset(range.handler)?,
                    catch_type: range.catch_type,
                });
            }
        }

        let mut attributes = vec![];
        if !self.line_numbers.is_empty() {
            let mut entries = vec![];
            for entry in &self.line_numbers {
                entries.push(LineNumber {
                    start_pc: offset(entry.start)?,
                    line_number: entry.line_number,
                });
            }
            attributes.push(constants.get_attribute(LineNumberTable(entries))?);
        }
        if !self.local_variables.is_empty() {
            let entries = local_variable_entries(&self.local_variables, &layout)?;
            attributes.push(constants.get_attribute(LocalVariableTable(entries))?);
        }
        if !self.local_variable_types.is_empty() {
            let entries = local_variable_entries(&self.local_variable_types, &layout)?;
            attributes.push(constants.get_attribute(LocalVariableTypeTable(entries))?);
        }

        let max_stack = match &analysis {
            Some(analysis) => {
                if !analysis.frames.is_empty() {
                    let table = stack_map_table(analysis, &layout, constants)?;
                    attributes.push(constants.get_attribute(table)?);
                }
                analysis.max_stack
            }
            None => self.max_stack as usize,
        };
        if max_stack > u16::MAX as usize {
            return Err(Error::MethodCodeMaxStackOverflow(max_stack));
        }

        for name in &self.dropped_attributes {
            log::debug!(
                "{}.{}{}: dropping {} attribute",
                method.this_class,
                method.method_name,
                method.descriptor.render(),
                name
            );
        }

        Ok(Code {
            max_stack: max_stack as u16,
            max_locals: self.max_locals,
            code_array: BytecodeArray(code_array),
            exception_table,
            attributes,
        })
    }

    /// `jsr`/`ret` can't be given frames
    fn reject_subroutines(&self) -> Result<(), Error> {
        let subroutine = self.elements.iter().position(|element| {
            matches!(
                element.instruction(),
                Some(Instruction::Jsr(_) | Instruction::JsrW(_) | Instruction::Ret(_))
            )
        });
        match subroutine {
            None => Ok(()),
            Some(idx) => Err(Error::VerifierError {
                offset: Layout::compute(&self.elements).element_offsets[idx],
                kind: VerifierErrorKind::Subroutine,
            }),
        }
    }

    /// Frames from the original `StackMapTable`, keyed by the label at their offset
    fn declared_frames(
        &self,
        constants: &ConstantPool,
        method: &MethodContext,
    ) -> HashMap<Label, VerifierFrame> {
        let stack_map = match &self.stack_map {
            Some(stack_map) => stack_map,
            None => return HashMap::new(),
        };
        let max_locals = self.max_locals as usize;
        let declared = method
            .initial_frame(max_locals)
            .and_then(|initial| declared_frames(stack_map, &initial, max_locals, constants));
        match declared {
            Ok(declared) => declared,
            Err(kind) => {
                log::warn!(
                    "{}.{}: ignoring unreadable StackMapTable ({:?})",
                    method.this_class,
                    method.method_name,
                    kind
                );
                HashMap::new()
            }
        }
    }
}

fn local_variable_ranges(
    entries: Vec<LocalVariable>,
    boundaries: &HashSet<usize>,
) -> Vec<LocalVariableRange> {
    let mut ranges = vec![];
    for entry in entries {
        let start = entry.start_pc as usize;
        let end = start + entry.length as usize;
        if boundaries.contains(&start) && boundaries.contains(&end) {
            ranges.push(LocalVariableRange {
                start: Label::at_offset(start),
                end: Label::at_offset(end),
                name_index: entry.name_index,
                descriptor_index: entry.descriptor_index,
                index: entry.index,
            });
        } else {
            log::warn!(
                "dropping local variable {} entry spanning offsets {}..{}",
                entry.index,
                start,
                end
            );
        }
    }
    ranges
}

fn local_variable_entries(
    ranges: &[LocalVariableRange],
    layout: &Layout,
) -> Result<Vec<LocalVariable>, Error> {
    let mut entries = vec![];
    for range in ranges {
        let start = layout.label_offset(range.start)?;
        let end = layout.label_offset(range.end)?;
        entries.push(LocalVariable {
            start_pc: start as u16,
            length: (end - start) as u16,
            name_index: range.name_index,
            descriptor_index: range.descriptor_index,
            index: range.index,
        });
    }
    Ok(entries)
}

/// Compress the frames into a table (frames at the same offset only appear once)
fn stack_map_table(
    analysis: &FrameAnalysis,
    layout: &Layout,
    constants: &mut ConstantPool,
) -> Result<StackMapTable, Error> {
    let mut frames = vec![];
    for (label, frame) in &analysis.frames {
        frames.push((layout.label_offset(*label)?, frame));
    }
    frames.sort_by_key(|(offset, _)| *offset);
    frames.dedup_by_key(|(offset, _)| *offset);

    let mut previous = serializable_frame(&analysis.initial_frame, layout, constants)?;
    let mut previous_offset: Option<usize> = None;
    let mut table = vec![];
    for (offset, frame) in frames {
        let frame = serializable_frame(frame, layout, constants)?;
        let offset_delta = match previous_offset {
            None => offset,
            Some(previous_offset) => offset - previous_offset - 1,
        };
        table.push(frame.stack_map_frame(offset_delta as u16, &previous));
        previous = frame;
        previous_offset = Some(offset);
    }
    Ok(StackMapTable(table))
}

/// Frame listed per value, with class constants and offsets in place of names and labels
fn serializable_frame(
    frame: &VerifierFrame,
    layout: &Layout,
    constants: &mut ConstantPool,
) -> Result<Frame<ClassConstantIndex, u16>, Error> {
    let entries = frame.to_entries();
    Ok(Frame {
        locals: serializable_types(&entries.locals, layout, constants)?,
        stack: serializable_types(&entries.stack, layout, constants)?,
    })
}

fn serializable_types(
    types: &[VerificationType<String, Label>],
    layout: &Layout,
    constants: &mut ConstantPool,
) -> Result<Vec<VerificationType<ClassConstantIndex, u16>>, Error> {
    let mut converted = Vec::with_capacity(types.len());
    for typ in types {
        converted.push(typ.try_map(
            |class| constants.get_class(class),
            |label| layout.label_offset(*label).map(|offset| offset as u16),
        )?);
    }
    Ok(converted)
}
