//! Frame inference over a whole method body
//!
//! The type state at every instruction is found by propagating [`VerifierFrame`]s along all
//! control flow edges (fall through, jumps, exception handlers) until nothing changes. Once that
//! converges:
//!
//!   - instructions that no edge reaches get replaced by `nop ... athrow` (the JVM still type
//!     checks unreachable code, and we have no frame to give it otherwise)
//!   - exception ranges are split so that they never cover those replaced blocks
//!   - the frames needed for the stack map table are collected

use super::{ClassHierarchy, Frame, InstructionContext, VerificationType, VerifierFrame};
use crate::jvm::class_file::{ConstantPool, StackMapTable};
use crate::jvm::code::jump_encoding::Layout;
use crate::jvm::code::{CodeElement, ExceptionRange, Instruction, Label, LabelGenerator};
use crate::jvm::{ClassConstantIndex, Error, MethodDescriptor, VerifierErrorKind};
use std::collections::{BTreeSet, HashMap};

type VType = VerificationType<String, Label>;

/// Method whose body is being analyzed
pub struct MethodContext<'a> {
    pub hierarchy: &'a ClassHierarchy,

    /// Binary name of the declaring class
    pub this_class: &'a str,
    pub method_name: &'a str,
    pub descriptor: &'a MethodDescriptor,
    pub is_static: bool,
}

impl<'a> MethodContext<'a> {
    /// Frame on entry to the method, with one local per slot
    pub fn initial_frame(&self, max_locals: usize) -> Result<VerifierFrame, VerifierErrorKind> {
        VerifierFrame::method_entry(
            self.this_class,
            self.method_name,
            self.descriptor,
            self.is_static,
            max_locals,
        )
    }
}

/// Outcome of [`compute_frames`]
#[derive(Debug)]
pub struct FrameAnalysis {
    /// Frame on entry to the method
    pub initial_frame: VerifierFrame,

    /// Frames that must appear in the stack map table (jump targets, handlers, dead blocks)
    pub frames: Vec<(Label, VerifierFrame)>,

    /// Largest operand stack size reached anywhere, in slots
    pub max_stack: usize,
}

/// Expand a `StackMapTable` into one frame (with one local per slot) per declared offset
pub fn declared_frames(
    stack_map: &StackMapTable,
    initial_frame: &VerifierFrame,
    max_locals: usize,
    constants: &ConstantPool,
) -> Result<HashMap<Label, VerifierFrame>, VerifierErrorKind> {
    let convert = |typ: &VerificationType<ClassConstantIndex, u16>| {
        typ.try_map(
            |class| {
                constants
                    .class_name(*class)
                    .map_err(|_| VerifierErrorKind::MissingConstant(class.0))
            },
            |offset| Ok(Label::at_offset(*offset as usize)),
        )
    };

    let mut declared = HashMap::new();
    let mut previous = initial_frame.to_entries();
    let mut previous_offset: Option<usize> = None;
    for frame in &stack_map.0 {
        let delta = frame.offset_delta() as usize;
        let offset = match previous_offset {
            None => delta,
            Some(previous_offset) => previous_offset + delta + 1,
        };
        let next = previous.next_frame(frame, convert)?;
        declared.insert(
            Label::at_offset(offset),
            Frame::from_entries(&next, max_locals),
        );
        previous = next;
        previous_offset = Some(offset);
    }
    Ok(declared)
}

/// Exception handler resolved to element indices
struct HandlerRange {
    start: usize,
    end: usize,
    handler: usize,
    caught: VType,
}

impl HandlerRange {
    fn covers(&self, idx: usize) -> bool {
        self.start < idx && idx < self.end
    }
}

/// Infer frames for a method body
///
/// This may rewrite unreachable code in `elements` and split ranges in `exception_table`
/// accordingly. Frames declared by the original code (`declared`) are trusted as the result of
/// merging two different object types at that label.
pub fn compute_frames(
    elements: &mut Vec<CodeElement>,
    exception_table: &mut Vec<ExceptionRange>,
    max_locals: usize,
    declared: &HashMap<Label, VerifierFrame>,
    label_generator: &mut LabelGenerator,
    constants: &ConstantPool,
    method: &MethodContext,
) -> Result<FrameAnalysis, Error> {
    let new_instructions = label_new_instructions(elements, label_generator);
    let layout = Layout::compute(elements);
    let error_at = |idx: usize, kind: VerifierErrorKind| Error::VerifierError {
        offset: layout
            .element_offsets
            .get(idx)
            .copied()
            .unwrap_or(layout.code_length),
        kind,
    };

    let label_indices = label_indices(elements);
    let mut handlers = vec![];
    for range in exception_table.iter() {
        let caught = if range.catch_type == ClassConstantIndex::NONE {
            VType::object("java/lang/Throwable")
        } else {
            VType::Object(constants.class_name(range.catch_type)?)
        };
        handlers.push(HandlerRange {
            start: label_index(&label_indices, range.start)?,
            end: label_index(&label_indices, range.end)?,
            handler: label_index(&label_indices, range.handler)?,
            caught,
        });
    }

    let initial_frame = method
        .initial_frame(max_locals)
        .map_err(|kind| error_at(0, kind))?;
    let context = InstructionContext {
        constants,
        this_class: method.this_class,
        new_instructions: &new_instructions,
    };

    let code: &[CodeElement] = elements;
    let mut dataflow = Dataflow {
        elements: code,
        declared,
        hierarchy: method.hierarchy,
        states: vec![None; code.len()],
        worklist: BTreeSet::new(),
    };
    dataflow
        .merge(0, initial_frame.clone())
        .map_err(|kind| error_at(0, kind))?;

    let mut max_stack = 0;
    while let Some(idx) = dataflow.worklist.pop_first() {
        let frame = match &dataflow.states[idx] {
            Some(frame) => frame.clone(),
            None => continue,
        };
        let insn = match &code[idx] {
            CodeElement::Label(_) => {
                if idx + 1 >= code.len() {
                    return Err(error_at(idx, VerifierErrorKind::FallsOffEnd));
                }
                dataflow
                    .merge(idx + 1, frame)
                    .map_err(|kind| error_at(idx + 1, kind))?;
                continue;
            }
            CodeElement::Instruction(insn) => insn,
        };

        for handler in handlers.iter().filter(|handler| handler.covers(idx)) {
            let handler_frame = Frame {
                locals: frame.locals.clone(),
                stack: vec![handler.caught.clone()],
            };
            dataflow
                .merge(handler.handler, handler_frame)
                .map_err(|kind| error_at(handler.handler, kind))?;
        }

        let label = match idx.checked_sub(1).map(|prev| &code[prev]) {
            Some(CodeElement::Label(label)) => Some(*label),
            _ => None,
        };
        let mut next = frame.clone();
        next.verify_instruction(insn, label, &context)
            .map_err(|kind| error_at(idx, kind))?;
        max_stack = max_stack.max(frame.stack_size()).max(next.stack_size());

        for target in insn.jump_targets() {
            let target_idx = label_index(&label_indices, target)?;
            dataflow
                .merge(target_idx, next.clone())
                .map_err(|kind| error_at(target_idx, kind))?;
        }
        if insn.falls_through() {
            if idx + 1 >= code.len() {
                return Err(error_at(idx, VerifierErrorKind::FallsOffEnd));
            }
            dataflow
                .merge(idx + 1, next)
                .map_err(|kind| error_at(idx + 1, kind))?;
        }
    }
    let states = dataflow.states;

    // Frames at jump targets and handlers which are reachable
    let mut frame_indices = BTreeSet::new();
    for (idx, element) in elements.iter().enumerate() {
        if let CodeElement::Instruction(insn) = element {
            if states[idx].is_some() {
                for target in insn.jump_targets() {
                    frame_indices.insert(label_index(&label_indices, target)?);
                }
            }
        }
    }
    frame_indices.extend(handlers.iter().map(|handler| handler.handler));

    let mut frames = vec![];
    for idx in frame_indices {
        if let (CodeElement::Label(label), Some(frame)) = (&elements[idx], &states[idx]) {
            frames.push((*label, frame.clone()));
        }
    }

    let dead_runs = dead_runs(elements, &states);
    if !dead_runs.is_empty() {
        log::debug!(
            "{}.{}: replacing {} unreachable block(s)",
            method.this_class,
            method.method_name,
            dead_runs.len()
        );
        let bounds = replace_dead_code(elements, &dead_runs, label_generator);
        let dead_frame = Frame {
            locals: vec![VType::Top; max_locals],
            stack: vec![VType::object("java/lang/Throwable")],
        };
        frames.extend(bounds.iter().map(|(start, _)| (*start, dead_frame.clone())));
        split_exception_ranges(elements, exception_table, &bounds)?;
        max_stack = max_stack.max(1);
    }

    Ok(FrameAnalysis {
        initial_frame,
        frames,
        max_stack,
    })
}

/// Propagation state
struct Dataflow<'a> {
    elements: &'a [CodeElement],
    declared: &'a HashMap<Label, VerifierFrame>,
    hierarchy: &'a ClassHierarchy,

    /// Frame before each element, once reached
    states: Vec<Option<VerifierFrame>>,

    /// Elements whose frame changed since they were last visited
    worklist: BTreeSet<usize>,
}

impl<'a> Dataflow<'a> {
    fn merge(&mut self, idx: usize, incoming: VerifierFrame) -> Result<(), VerifierErrorKind> {
        let merged = match &self.states[idx] {
            None => incoming,
            Some(existing) => {
                let hint = self.declared_frame_at(idx);
                let merged = merge_frames(existing, &incoming, hint, self.hierarchy)?;
                if &merged == existing {
                    return Ok(());
                }
                merged
            }
        };
        self.states[idx] = Some(merged);
        self.worklist.insert(idx);
        Ok(())
    }

    /// Declared frame for the position of `idx` (any of the labels placed there)
    fn declared_frame_at(&self, idx: usize) -> Option<&'a VerifierFrame> {
        let declared = self.declared;
        self.elements[idx..]
            .iter()
            .map_while(|element| element.label())
            .find_map(|label| declared.get(&label))
    }
}

fn merge_frames(
    existing: &VerifierFrame,
    incoming: &VerifierFrame,
    hint: Option<&VerifierFrame>,
    hierarchy: &ClassHierarchy,
) -> Result<VerifierFrame, VerifierErrorKind> {
    if existing.stack.len() != incoming.stack.len() {
        return Err(VerifierErrorKind::StackHeightMismatch(
            existing.stack.len(),
            incoming.stack.len(),
        ));
    }

    let mut locals = Vec::with_capacity(existing.locals.len());
    for (slot, (typ1, typ2)) in existing.locals.iter().zip(&incoming.locals).enumerate() {
        let hint = hint.and_then(|frame| frame.locals.get(slot));
        locals.push(merge_types(typ1, typ2, hint, hierarchy).unwrap_or(VType::Top));
    }

    let mut stack = Vec::with_capacity(existing.stack.len());
    for (idx, (typ1, typ2)) in existing.stack.iter().zip(&incoming.stack).enumerate() {
        let hint = hint.and_then(|frame| frame.stack.get(idx));
        match merge_types(typ1, typ2, hint, hierarchy) {
            Some(typ) => stack.push(typ),
            None => {
                return Err(VerifierErrorKind::IncompatibleTypes(
                    typ1.clone(),
                    typ2.clone(),
                ))
            }
        }
    }

    Ok(Frame { locals, stack })
}

/// Least upper bound of two types, if there is a usable one
fn merge_types(
    typ1: &VType,
    typ2: &VType,
    hint: Option<&VType>,
    hierarchy: &ClassHierarchy,
) -> Option<VType> {
    match (typ1, typ2) {
        _ if typ1 == typ2 => Some(typ1.clone()),
        (VerificationType::Null, obj @ VerificationType::Object(_))
        | (obj @ VerificationType::Object(_), VerificationType::Null) => Some(obj.clone()),
        (VerificationType::Object(class1), VerificationType::Object(class2)) => match hint {
            Some(declared @ VerificationType::Object(_)) => Some(declared.clone()),
            _ => Some(VerificationType::Object(
                hierarchy.common_superclass(class1, class2),
            )),
        },
        _ => None,
    }
}

/// Make sure every `new` is directly preceded by a label, and map those labels to the class
fn label_new_instructions(
    elements: &mut Vec<CodeElement>,
    label_generator: &mut LabelGenerator,
) -> HashMap<Label, ClassConstantIndex> {
    let mut new_instructions = HashMap::new();
    let mut idx = 0;
    while idx < elements.len() {
        if let CodeElement::Instruction(Instruction::New(class)) = &elements[idx] {
            let class = *class;
            let label = match idx.checked_sub(1).map(|prev| &elements[prev]) {
                Some(CodeElement::Label(label)) => *label,
                _ => {
                    let label = label_generator.fresh_label();
                    elements.insert(idx, CodeElement::Label(label));
                    idx += 1;
                    label
                }
            };
            new_instructions.insert(label, class);
        }
        idx += 1;
    }
    new_instructions
}

fn label_indices(elements: &[CodeElement]) -> HashMap<Label, usize> {
    elements
        .iter()
        .enumerate()
        .filter_map(|(idx, element)| element.label().map(|label| (label, idx)))
        .collect()
}

fn label_index(label_indices: &HashMap<Label, usize>, label: Label) -> Result<usize, Error> {
    label_indices
        .get(&label)
        .copied()
        .ok_or(Error::UnplacedLabel(label))
}

/// Maximal runs of unreached instructions, as the indices of their first and last instruction
fn dead_runs(elements: &[CodeElement], states: &[Option<VerifierFrame>]) -> Vec<(usize, usize)> {
    let mut runs = vec![];
    let mut current: Option<(usize, usize)> = None;
    for (idx, element) in elements.iter().enumerate() {
        match element {
            CodeElement::Label(_) => (),
            CodeElement::Instruction(_) if states[idx].is_none() => {
                current = Some(match current {
                    Some((first, _)) => (first, idx),
                    None => (idx, idx),
                });
            }
            CodeElement::Instruction(_) => runs.extend(current.take()),
        }
    }
    runs.extend(current);
    runs
}

/// Overwrite dead runs with `nop ... athrow`, returning labels around each run (in code order)
fn replace_dead_code(
    elements: &mut Vec<CodeElement>,
    dead_runs: &[(usize, usize)],
    label_generator: &mut LabelGenerator,
) -> Vec<(Label, Label)> {
    let mut bounds = vec![];

    // Back to front, so that inserting labels leaves the remaining indices valid
    for &(first, last) in dead_runs.iter().rev() {
        for element in &mut elements[first..=last] {
            if let CodeElement::Instruction(insn) = element {
                *insn = Instruction::Nop;
            }
        }
        elements[last] = CodeElement::Instruction(Instruction::AThrow);

        let end = match elements.get(last + 1) {
            Some(CodeElement::Label(label)) => *label,
            _ => {
                let label = label_generator.fresh_label();
                elements.insert(last + 1, CodeElement::Label(label));
                label
            }
        };
        let start = match first.checked_sub(1).map(|prev| &elements[prev]) {
            Some(CodeElement::Label(label)) => *label,
            _ => {
                let label = label_generator.fresh_label();
                elements.insert(first, CodeElement::Label(label));
                label
            }
        };
        bounds.push((start, end));
    }

    bounds.reverse();
    bounds
}

/// Cut the parts covering dead blocks out of exception ranges (empty pieces are dropped)
fn split_exception_ranges(
    elements: &[CodeElement],
    exception_table: &mut Vec<ExceptionRange>,
    dead_bounds: &[(Label, Label)],
) -> Result<(), Error> {
    let label_indices = label_indices(elements);
    let has_instruction = |from: usize, to: usize| {
        elements[from..to]
            .iter()
            .any(|element| element.instruction().is_some())
    };

    let mut split_table = vec![];
    for range in exception_table.iter() {
        let end_idx = label_index(&label_indices, range.end)?;
        let mut pieces = vec![];
        let mut cursor = range.start;
        for (dead_start, dead_end) in dead_bounds {
            let dead_start_idx = label_index(&label_indices, *dead_start)?;
            let dead_end_idx = label_index(&label_indices, *dead_end)?;
            let cursor_idx = label_index(&label_indices, cursor)?;
            if dead_end_idx <= cursor_idx || dead_start_idx >= end_idx {
                continue;
            }
            if dead_start_idx > cursor_idx {
                pieces.push((cursor, *dead_start));
            }
            cursor = if dead_end_idx < end_idx {
                *dead_end
            } else {
                range.end
            };
        }
        pieces.push((cursor, range.end));

        for (start, end) in pieces {
            let start_idx = label_index(&label_indices, start)?;
            let end_idx = label_index(&label_indices, end)?;
            if start_idx < end_idx && has_instruction(start_idx, end_idx) {
                split_table.push(ExceptionRange {
                    start,
                    end,
                    ..range.clone()
                });
            }
        }
    }

    *exception_table = split_table;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::{InvokeType, OrdComparison, ValueKind};
    use crate::jvm::ParseDescriptor;
    use VerificationType::*;

    fn label(n: usize) -> Label {
        Label::at_offset(n)
    }

    fn insn(insn: Instruction) -> CodeElement {
        CodeElement::Instruction(insn)
    }

    struct Method {
        hierarchy: ClassHierarchy,
        descriptor: MethodDescriptor,
        is_static: bool,
    }

    impl Method {
        fn new(descriptor: &str, is_static: bool) -> Method {
            Method {
                hierarchy: ClassHierarchy::with_java_library(),
                descriptor: MethodDescriptor::parse(descriptor).unwrap(),
                is_static,
            }
        }

        fn context(&self) -> MethodContext<'_> {
            MethodContext {
                hierarchy: &self.hierarchy,
                this_class: "a/Foo",
                method_name: "run",
                descriptor: &self.descriptor,
                is_static: self.is_static,
            }
        }

        fn analyze(
            &self,
            elements: &mut Vec<CodeElement>,
            exception_table: &mut Vec<ExceptionRange>,
            max_locals: usize,
            constants: &ConstantPool,
        ) -> Result<FrameAnalysis, Error> {
            let mut labels = LabelGenerator::after_code_length(1000);
            compute_frames(
                elements,
                exception_table,
                max_locals,
                &HashMap::new(),
                &mut labels,
                constants,
                &self.context(),
            )
        }
    }

    #[test]
    fn branch_targets_get_frames() {
        // static int run(int x) { if (x == 0) x = 1; return x; }
        let method = Method::new("(I)I", true);
        let constants = ConstantPool::new();
        let mut elements = vec![
            CodeElement::Label(label(0)),
            insn(Instruction::Load(ValueKind::Int, 0)),
            CodeElement::Label(label(1)),
            insn(Instruction::If(OrdComparison::NE, label(6))),
            CodeElement::Label(label(4)),
            insn(Instruction::IConst(1)),
            CodeElement::Label(label(5)),
            insn(Instruction::Store(ValueKind::Int, 0)),
            CodeElement::Label(label(6)),
            insn(Instruction::Load(ValueKind::Int, 0)),
            CodeElement::Label(label(7)),
            insn(Instruction::Return(Some(ValueKind::Int))),
            CodeElement::Label(label(8)),
        ];
        let analysis = method
            .analyze(&mut elements, &mut vec![], 1, &constants)
            .unwrap();
        assert_eq!(analysis.max_stack, 1);
        assert_eq!(
            analysis.frames,
            vec![(
                label(6),
                Frame {
                    locals: vec![Integer],
                    stack: vec![]
                }
            )]
        );
    }

    #[test]
    fn locals_merge_to_common_superclass_or_top() {
        let method = Method::new("(Z)V", true);
        let mut constants = ConstantPool::new();
        let box_int = constants
            .get_method_ref("java/lang/Integer", "valueOf", "(I)Ljava/lang/Integer;", false)
            .unwrap();
        let box_long = constants
            .get_method_ref("java/lang/Long", "valueOf", "(J)Ljava/lang/Long;", false)
            .unwrap();

        // slot 1 is boxed on both paths, slot 2 is only stored on one of them
        let mut elements = vec![
            CodeElement::Label(label(0)),
            insn(Instruction::Load(ValueKind::Int, 0)),
            CodeElement::Label(label(1)),
            insn(Instruction::If(OrdComparison::EQ, label(20))),
            CodeElement::Label(label(4)),
            insn(Instruction::IConst(0)),
            insn(Instruction::Invoke(InvokeType::Static, box_int)),
            insn(Instruction::Store(ValueKind::Reference, 1)),
            insn(Instruction::IConst(0)),
            insn(Instruction::Store(ValueKind::Int, 2)),
            insn(Instruction::Goto(label(30))),
            CodeElement::Label(label(20)),
            insn(Instruction::LConst(0)),
            insn(Instruction::Invoke(InvokeType::Static, box_long)),
            insn(Instruction::Store(ValueKind::Reference, 1)),
            CodeElement::Label(label(30)),
            insn(Instruction::Return(None)),
            CodeElement::Label(label(31)),
        ];
        let analysis = method
            .analyze(&mut elements, &mut vec![], 3, &constants)
            .unwrap();
        let (_, join) = analysis
            .frames
            .iter()
            .find(|(l, _)| *l == label(30))
            .unwrap();
        assert_eq!(
            join.locals,
            vec![Integer, VType::object("java/lang/Number"), Top]
        );
        assert_eq!(analysis.max_stack, 2);
    }

    #[test]
    fn declared_frames_decide_merges() {
        let method = Method::new("(Z)V", true);
        let mut constants = ConstantPool::new();
        let collection = constants.get_class("java/util/Collection").unwrap();
        let stack_map = StackMapTable(vec![crate::jvm::class_file::StackMapFrame::Full {
            offset_delta: 9,
            locals: vec![Integer, Object(collection)],
            stack: vec![],
        }]);
        let initial = method.context().initial_frame(2).unwrap();
        let declared = declared_frames(&stack_map, &initial, 2, &constants).unwrap();
        let hinted = &declared[&label(9)];
        assert_eq!(
            hinted.locals,
            vec![Integer, VType::object("java/util/Collection")]
        );

        let merged = merge_frames(
            &Frame {
                locals: vec![Integer, VType::object("java/util/ArrayList")],
                stack: vec![],
            },
            &Frame {
                locals: vec![Integer, VType::object("java/util/HashSet")],
                stack: vec![],
            },
            Some(hinted),
            &method.hierarchy,
        )
        .unwrap();
        assert_eq!(merged, *hinted);
    }

    #[test]
    fn stack_height_mismatch() {
        let method = Method::new("(I)V", true);
        let constants = ConstantPool::new();
        let mut elements = vec![
            CodeElement::Label(label(0)),
            insn(Instruction::IConst(1)),
            insn(Instruction::Load(ValueKind::Int, 0)),
            insn(Instruction::If(OrdComparison::EQ, label(10))),
            insn(Instruction::Pop),
            CodeElement::Label(label(10)),
            insn(Instruction::Return(None)),
            CodeElement::Label(label(11)),
        ];
        let result = method.analyze(&mut elements, &mut vec![], 1, &constants);
        assert!(matches!(
            result,
            Err(Error::VerifierError {
                kind: VerifierErrorKind::StackHeightMismatch(_, _),
                ..
            })
        ));
    }

    #[test]
    fn falling_off_the_end() {
        let method = Method::new("()V", true);
        let constants = ConstantPool::new();
        let mut elements = vec![
            CodeElement::Label(label(0)),
            insn(Instruction::Nop),
            CodeElement::Label(label(1)),
        ];
        let result = method.analyze(&mut elements, &mut vec![], 0, &constants);
        assert!(matches!(
            result,
            Err(Error::VerifierError {
                kind: VerifierErrorKind::FallsOffEnd,
                ..
            })
        ));
    }

    #[test]
    fn dead_code_is_replaced_and_handlers_split() {
        let method = Method::new("()V", true);
        let constants = ConstantPool::new();
        let mut elements = vec![
            CodeElement::Label(label(0)),
            insn(Instruction::Goto(label(5))),
            CodeElement::Label(label(3)),
            insn(Instruction::IConst(2)),
            CodeElement::Label(label(4)),
            insn(Instruction::Pop),
            CodeElement::Label(label(5)),
            insn(Instruction::Return(None)),
            CodeElement::Label(label(6)),
            insn(Instruction::AThrow),
            CodeElement::Label(label(7)),
        ];
        let mut exception_table = vec![ExceptionRange {
            start: label(0),
            end: label(6),
            handler: label(6),
            catch_type: ClassConstantIndex::NONE,
        }];
        let analysis = method
            .analyze(&mut elements, &mut exception_table, 0, &constants)
            .unwrap();

        assert_eq!(elements[3], insn(Instruction::Nop));
        assert_eq!(elements[5], insn(Instruction::AThrow));

        // The range is cut around the dead block at offsets 3..5
        let pieces: Vec<(Label, Label)> = exception_table
            .iter()
            .map(|range| (range.start, range.end))
            .collect();
        assert_eq!(pieces, vec![(label(0), label(3)), (label(5), label(6))]);

        let labels: Vec<Label> = analysis.frames.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec![label(5), label(6), label(3)]);
        let (_, dead_frame) = &analysis.frames[2];
        assert_eq!(dead_frame.stack, vec![VType::object("java/lang/Throwable")]);
    }

    #[test]
    fn new_gets_a_label() {
        let mut constants = ConstantPool::new();
        let class = constants.get_class("a/Bar").unwrap();
        let mut elements = vec![insn(Instruction::Nop), insn(Instruction::New(class))];
        let mut labels = LabelGenerator::after_code_length(2);
        let fresh = labels.clone().fresh_label();
        let new_instructions = label_new_instructions(&mut elements, &mut labels);
        assert_eq!(elements[1], CodeElement::Label(fresh));
        assert_eq!(new_instructions, HashMap::from([(fresh, class)]));
    }
}
