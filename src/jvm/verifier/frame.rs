use super::hierarchy::{array_element, array_of};
use super::*;
use crate::jvm::class_file::{ConstantPool, StackMapFrame};
use crate::jvm::code::{ArrayKind, Instruction, InvokeType, Label, NumericKind, ValueKind};
use crate::jvm::RenderDescriptor;
use crate::jvm::{
    ClassConstantIndex, Constant, ConstantIndex, FieldType, MethodDescriptor, ParseDescriptor,
    VerifierErrorKind,
};
use std::collections::HashMap;

/// Snapshot of the stack and local variables at a point in the bytecode
///
/// While analyzing, `locals` has one entry per local variable slot (the second slot of a `long`
/// or `double` holds [`VerificationType::Top`]). Stack map frames instead list one entry per
/// value; [`Frame::to_entries`] and [`Frame::from_entries`] convert between the two.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame<Cls, U> {
    /// Local variables in scope
    pub locals: Vec<VerificationType<Cls, U>>,

    /// Types of values on the stack
    pub stack: Vec<VerificationType<Cls, U>>,
}

/// Frame tracked during analysis
pub type VerifierFrame = Frame<String, Label>;

type VType = VerificationType<String, Label>;

/// Everything needed to interpret the instructions of one method
pub struct InstructionContext<'a> {
    pub constants: &'a ConstantPool,

    /// Binary name of the class declaring the method
    pub this_class: &'a str,

    /// Class instantiated by each `new`, keyed by the label right before it
    pub new_instructions: &'a HashMap<Label, ClassConstantIndex>,
}

impl<Cls: Clone, U: Clone> Frame<Cls, U> {
    /// Frame with locals listed per value (trailing `Top` locals are dropped)
    pub fn to_entries(&self) -> Frame<Cls, U> {
        let mut locals = vec![];
        let mut slot = 0;
        while slot < self.locals.len() {
            let local = &self.locals[slot];
            locals.push(local.clone());
            slot += local.width();
        }
        while let Some(VerificationType::Top) = locals.last() {
            locals.pop();
        }
        Frame {
            locals,
            stack: self.stack.clone(),
        }
    }

    /// Frame with locals listed per slot, padded with `Top` up to `slot_count`
    pub fn from_entries(entries: &Frame<Cls, U>, slot_count: usize) -> Frame<Cls, U> {
        let mut locals = vec![];
        for local in &entries.locals {
            locals.push(local.clone());
            if local.width() == 2 {
                locals.push(VerificationType::Top);
            }
        }
        while locals.len() < slot_count {
            locals.push(VerificationType::Top);
        }
        Frame {
            locals,
            stack: entries.stack.clone(),
        }
    }

    /// Total size of the operand stack, in slots
    pub fn stack_size(&self) -> usize {
        self.stack.iter().map(VerificationType::width).sum()
    }
}

impl Frame<ClassConstantIndex, u16> {
    /// Compute a stack map frame for this frame, given the previous frame
    ///
    /// Both frames must list locals per value. This will fall back to the `Full` option using
    /// [`Self::full_stack_map_frame`] only if none of the other stack map frame variants are
    /// enough to encode the transition.
    pub fn stack_map_frame(&self, offset_delta: u16, previous_frame: &Self) -> StackMapFrame {
        match self.stack.len() {
            0 => {
                let this_locals_len = self.locals.len();
                let prev_locals_len = previous_frame.locals.len();

                if this_locals_len <= prev_locals_len {
                    let len_difference = prev_locals_len - this_locals_len;
                    let this_is_prefix_of_prev = previous_frame.locals.starts_with(&self.locals);
                    if len_difference < 4 && this_is_prefix_of_prev {
                        if len_difference == 0 {
                            return StackMapFrame::SameLocalsNoStack { offset_delta };
                        } else {
                            return StackMapFrame::ChopLocalsNoStack {
                                offset_delta,
                                chopped_k: len_difference as u8,
                            };
                        }
                    }
                } else if this_locals_len - prev_locals_len < 4
                    && self.locals.starts_with(&previous_frame.locals)
                {
                    return StackMapFrame::AppendLocalsNoStack {
                        offset_delta,
                        locals: self.locals[prev_locals_len..].to_vec(),
                    };
                }
            }
            1 if self.locals == previous_frame.locals => {
                return StackMapFrame::SameLocalsOneStack {
                    offset_delta,
                    stack: self.stack[0],
                }
            }
            _ => (),
        }

        self.full_stack_map_frame(offset_delta)
    }

    /// Compute a `Full` stack map frame
    pub fn full_stack_map_frame(&self, offset_delta: u16) -> StackMapFrame {
        StackMapFrame::Full {
            offset_delta,
            stack: self.stack.clone(),
            locals: self.locals.clone(),
        }
    }
}

impl<Cls: Clone, U: Clone> Frame<Cls, U> {
    /// Frame described by a stack map frame, given the previous frame (both listed per value)
    ///
    /// `convert` turns the types found in the stack map frame into this frame's representation.
    pub fn next_frame<F>(&self, frame: &StackMapFrame, convert: F) -> Result<Self, VerifierErrorKind>
    where
        F: Fn(&VerificationType<ClassConstantIndex, u16>) -> Result<VerificationType<Cls, U>, VerifierErrorKind>,
    {
        let next = match frame {
            StackMapFrame::SameLocalsNoStack { .. } => Frame {
                locals: self.locals.clone(),
                stack: vec![],
            },
            StackMapFrame::SameLocalsOneStack { stack, .. } => Frame {
                locals: self.locals.clone(),
                stack: vec![convert(stack)?],
            },
            StackMapFrame::ChopLocalsNoStack { chopped_k, .. } => {
                let chopped_k = *chopped_k as usize;
                if chopped_k > self.locals.len() {
                    return Err(VerifierErrorKind::InvalidIndex(chopped_k as u16));
                }
                Frame {
                    locals: self.locals[..self.locals.len() - chopped_k].to_vec(),
                    stack: vec![],
                }
            }
            StackMapFrame::AppendLocalsNoStack { locals, .. } => {
                let mut all_locals = self.locals.clone();
                for local in locals {
                    all_locals.push(convert(local)?);
                }
                Frame {
                    locals: all_locals,
                    stack: vec![],
                }
            }
            StackMapFrame::Full { locals, stack, .. } => Frame {
                locals: locals.iter().map(&convert).collect::<Result<_, _>>()?,
                stack: stack.iter().map(&convert).collect::<Result<_, _>>()?,
            },
        };
        Ok(next)
    }
}

impl VerifierFrame {
    /// Frame on entry to a method
    pub fn method_entry(
        this_class: &str,
        method_name: &str,
        descriptor: &MethodDescriptor,
        is_static: bool,
        slot_count: usize,
    ) -> Result<VerifierFrame, VerifierErrorKind> {
        let mut locals = vec![];
        if !is_static {
            if method_name == "<init>" && this_class != "java/lang/Object" {
                locals.push(VType::UninitializedThis);
            } else {
                locals.push(VType::object(this_class));
            }
        }
        for parameter in &descriptor.parameters {
            locals.push(VType::from_field_type(parameter));
            if parameter.width() == 2 {
                locals.push(VType::Top);
            }
        }
        if locals.len() > slot_count {
            return Err(VerifierErrorKind::InvalidIndex(locals.len() as u16));
        }
        locals.resize(slot_count, VType::Top);
        Ok(Frame {
            locals,
            stack: vec![],
        })
    }

    /// Update the frame to reflect the effects of the given instruction
    ///
    /// `label` is the label placed right before the instruction, which identifies the values
    /// produced by `new`.
    pub fn verify_instruction(
        &mut self,
        insn: &Instruction,
        label: Option<Label>,
        context: &InstructionContext,
    ) -> Result<(), VerifierErrorKind> {
        verify_instruction(self, insn, label, context)
    }
}

fn value_kind_type(kind: ValueKind) -> Option<VType> {
    match kind {
        ValueKind::Int => Some(VType::Integer),
        ValueKind::Long => Some(VType::Long),
        ValueKind::Float => Some(VType::Float),
        ValueKind::Double => Some(VType::Double),
        ValueKind::Reference => None,
    }
}

fn numeric_kind_type(kind: NumericKind) -> VType {
    match kind {
        NumericKind::Int => VType::Integer,
        NumericKind::Long => VType::Long,
        NumericKind::Float => VType::Float,
        NumericKind::Double => VType::Double,
    }
}

fn array_kind_type(kind: ArrayKind) -> Option<VType> {
    match kind {
        ArrayKind::Int | ArrayKind::Byte | ArrayKind::Char | ArrayKind::Short => {
            Some(VType::Integer)
        }
        ArrayKind::Long => Some(VType::Long),
        ArrayKind::Float => Some(VType::Float),
        ArrayKind::Double => Some(VType::Double),
        ArrayKind::Reference => None,
    }
}

fn class_name(constants: &ConstantPool, class: ClassConstantIndex) -> Result<String, VerifierErrorKind> {
    constants
        .class_name(class)
        .map_err(|_| VerifierErrorKind::MissingConstant(class.0))
}

fn method_descriptor(descriptor: &str) -> Result<MethodDescriptor, VerifierErrorKind> {
    MethodDescriptor::parse(descriptor)
        .map_err(|_| VerifierErrorKind::BadDescriptor(descriptor.to_owned()))
}

fn field_type(descriptor: &str) -> Result<FieldType, VerifierErrorKind> {
    FieldType::parse(descriptor).map_err(|_| VerifierErrorKind::BadDescriptor(descriptor.to_owned()))
}

/// Type pushed by `ldc`/`ldc_w` (`wide` is for `ldc2_w`)
fn loadable_constant(
    constants: &ConstantPool,
    index: ConstantIndex,
    wide: bool,
) -> Result<VType, VerifierErrorKind> {
    let constant = constants
        .get(index)
        .map_err(|_| VerifierErrorKind::MissingConstant(index))?;
    let typ = match constant {
        Constant::Integer(_) => VType::Integer,
        Constant::Float(_) => VType::Float,
        Constant::Long(_) => VType::Long,
        Constant::Double(_) => VType::Double,
        Constant::String(_) => VType::object("java/lang/String"),
        Constant::Class(_) => VType::object("java/lang/Class"),
        Constant::MethodType { .. } => VType::object("java/lang/invoke/MethodType"),
        Constant::MethodHandle { .. } => VType::object("java/lang/invoke/MethodHandle"),
        Constant::Dynamic { .. } => {
            let (_, descriptor) = constants
                .dynamic_name_and_type(index)
                .map_err(|_| VerifierErrorKind::MissingConstant(index))?;
            VType::from_field_type(&field_type(&descriptor)?)
        }
        other => return Err(VerifierErrorKind::NotLoadableConstant(other.clone())),
    };
    let expected_width = if wide { 2 } else { 1 };
    if typ.width() != expected_width {
        return Err(VerifierErrorKind::InvalidWidth(typ.width()));
    }
    Ok(typ)
}

/// Replace every occurrence of an uninitialized type once its constructor has run
fn replace_all(frame: &mut VerifierFrame, original: &VType, updated: &VType) {
    for typ in frame.locals.iter_mut().chain(frame.stack.iter_mut()) {
        if typ == original {
            *typ = updated.clone();
        }
    }
}

fn verify_instruction(
    frame: &mut VerifierFrame,
    insn: &Instruction,
    label: Option<Label>,
    context: &InstructionContext,
) -> Result<(), VerifierErrorKind> {
    use Instruction::*;
    use VerificationType::*;

    let constants = context.constants;

    match insn {
        Nop => (),
        AConstNull => frame.stack.push(Null),
        IConst(_) | BiPush(_) | SiPush(_) => frame.stack.push(Integer),
        LConst(_) => frame.stack.push(Long),
        FConst(_) => frame.stack.push(Float),
        DConst(_) => frame.stack.push(Double),
        Ldc(index) => {
            let typ = loadable_constant(constants, *index, false)?;
            frame.stack.push(typ);
        }
        Ldc2(index) => {
            let typ = loadable_constant(constants, *index, true)?;
            frame.stack.push(typ);
        }

        Load(kind, index) => {
            let typ = get_local(&frame.locals, *index)?;
            match value_kind_type(*kind) {
                Some(expected) if expected != typ => return Err(VerifierErrorKind::InvalidType),
                None if !typ.is_reference() => return Err(VerifierErrorKind::InvalidType),
                _ => (),
            }
            frame.stack.push(typ);
        }
        Store(kind, index) => {
            let typ = match value_kind_type(*kind) {
                Some(expected) => {
                    pop_expecting_type(&mut frame.stack, &expected)?;
                    expected
                }
                None => pop_reference(&mut frame.stack)?,
            };
            set_local(&mut frame.locals, *index, typ)?;
        }
        IInc(index, _) => {
            if get_local(&frame.locals, *index)? != Integer {
                return Err(VerifierErrorKind::InvalidType);
            }
        }

        ArrayLoad(kind) => {
            pop_expecting_type(&mut frame.stack, &Integer)?;
            let array_type = pop_reference(&mut frame.stack)?;
            let element_type = match array_kind_type(*kind) {
                Some(typ) => typ,
                None => match array_type {
                    Null => Null,
                    Object(name) => match array_element(&name) {
                        Some(element) => Object(element),
                        None => return Err(VerifierErrorKind::NotArrayType),
                    },
                    _ => return Err(VerifierErrorKind::NotArrayType),
                },
            };
            frame.stack.push(element_type);
        }
        ArrayStore(kind) => {
            match array_kind_type(*kind) {
                Some(typ) => pop_expecting_type(&mut frame.stack, &typ)?,
                None => {
                    pop_reference(&mut frame.stack)?;
                }
            }
            pop_expecting_type(&mut frame.stack, &Integer)?;
            pop_reference(&mut frame.stack)?;
        }

        Pop => {
            pop_expecting_width(&mut frame.stack, 1)?;
        }
        Pop2 => {
            let arg1 = pop(&mut frame.stack)?;
            if arg1.width() == 1 {
                pop_expecting_width(&mut frame.stack, 1)?;
            }
        }
        Dup => {
            let arg1 = pop_expecting_width(&mut frame.stack, 1)?;
            frame.stack.push(arg1.clone());
            frame.stack.push(arg1);
        }
        DupX1 => {
            let arg1 = pop_expecting_width(&mut frame.stack, 1)?;
            let arg2 = pop_expecting_width(&mut frame.stack, 1)?;
            frame.stack.push(arg1.clone());
            frame.stack.push(arg2);
            frame.stack.push(arg1);
        }
        DupX2 => {
            let arg1 = pop_expecting_width(&mut frame.stack, 1)?;
            let arg2 = pop(&mut frame.stack)?;
            if arg2.width() == 1 {
                // Form 1
                let arg3 = pop_expecting_width(&mut frame.stack, 1)?;
                frame.stack.push(arg1.clone());
                frame.stack.push(arg3);
                frame.stack.push(arg2);
                frame.stack.push(arg1);
            } else {
                // Form 2
                frame.stack.push(arg1.clone());
                frame.stack.push(arg2);
                frame.stack.push(arg1);
            }
        }
        Dup2 => {
            let arg1 = pop(&mut frame.stack)?;
            if arg1.width() == 1 {
                // Form 1
                let arg2 = pop_expecting_width(&mut frame.stack, 1)?;
                frame.stack.push(arg2.clone());
                frame.stack.push(arg1.clone());
                frame.stack.push(arg2);
                frame.stack.push(arg1);
            } else {
                // Form 2
                frame.stack.push(arg1.clone());
                frame.stack.push(arg1);
            }
        }
        Dup2X1 => {
            let arg1 = pop(&mut frame.stack)?;
            if arg1.width() == 1 {
                // Form 1
                let arg2 = pop_expecting_width(&mut frame.stack, 1)?;
                let arg3 = pop_expecting_width(&mut frame.stack, 1)?;
                frame.stack.push(arg2.clone());
                frame.stack.push(arg1.clone());
                frame.stack.push(arg3);
                frame.stack.push(arg2);
                frame.stack.push(arg1);
            } else {
                // Form 2
                let arg2 = pop_expecting_width(&mut frame.stack, 1)?;
                frame.stack.push(arg1.clone());
                frame.stack.push(arg2);
                frame.stack.push(arg1);
            }
        }
        Dup2X2 => {
            let arg1 = pop(&mut frame.stack)?;
            let arg2 = pop(&mut frame.stack)?;
            match (arg1.width(), arg2.width()) {
                // Form 1
                (1, 1) => {
                    let arg3 = pop(&mut frame.stack)?;
                    if arg3.width() == 1 {
                        let arg4 = pop_expecting_width(&mut frame.stack, 1)?;
                        frame.stack.push(arg2.clone());
                        frame.stack.push(arg1.clone());
                        frame.stack.push(arg4);
                    } else {
                        // Form 3
                        frame.stack.push(arg2.clone());
                        frame.stack.push(arg1.clone());
                    }
                    frame.stack.push(arg3);
                    frame.stack.push(arg2);
                    frame.stack.push(arg1);
                }

                // Form 2
                (2, 1) => {
                    let arg3 = pop_expecting_width(&mut frame.stack, 1)?;
                    frame.stack.push(arg1.clone());
                    frame.stack.push(arg3);
                    frame.stack.push(arg2);
                    frame.stack.push(arg1);
                }

                // Form 4
                (2, 2) => {
                    frame.stack.push(arg1.clone());
                    frame.stack.push(arg2);
                    frame.stack.push(arg1);
                }

                (_, other) => return Err(VerifierErrorKind::InvalidWidth(other)),
            }
        }
        Swap => {
            let arg1 = pop_expecting_width(&mut frame.stack, 1)?;
            let arg2 = pop_expecting_width(&mut frame.stack, 1)?;
            frame.stack.push(arg1);
            frame.stack.push(arg2);
        }

        Add(kind) | Sub(kind) | Mul(kind) | Div(kind) | Rem(kind) | And(kind) | Or(kind)
        | Xor(kind) => {
            let typ = numeric_kind_type(*kind);
            pop_expecting_type(&mut frame.stack, &typ)?;
            pop_expecting_type(&mut frame.stack, &typ)?;
            frame.stack.push(typ);
        }
        Neg(kind) => {
            let typ = numeric_kind_type(*kind);
            pop_expecting_type(&mut frame.stack, &typ)?;
            frame.stack.push(typ);
        }
        Shift(kind, _) => {
            let typ = numeric_kind_type(*kind);
            pop_expecting_type(&mut frame.stack, &Integer)?;
            pop_expecting_type(&mut frame.stack, &typ)?;
            frame.stack.push(typ);
        }
        Convert(from, to) => {
            pop_expecting_type(&mut frame.stack, &numeric_kind_type(*from))?;
            frame.stack.push(numeric_kind_type(*to));
        }
        I2B | I2C | I2S => {
            pop_expecting_type(&mut frame.stack, &Integer)?;
            frame.stack.push(Integer);
        }
        LCmp => {
            pop_expecting_type(&mut frame.stack, &Long)?;
            pop_expecting_type(&mut frame.stack, &Long)?;
            frame.stack.push(Integer);
        }
        FCmp(_) => {
            pop_expecting_type(&mut frame.stack, &Float)?;
            pop_expecting_type(&mut frame.stack, &Float)?;
            frame.stack.push(Integer);
        }
        DCmp(_) => {
            pop_expecting_type(&mut frame.stack, &Double)?;
            pop_expecting_type(&mut frame.stack, &Double)?;
            frame.stack.push(Integer);
        }

        If(_, _) | TableSwitch { .. } | LookupSwitch { .. } => {
            pop_expecting_type(&mut frame.stack, &Integer)?;
        }
        IfICmp(_, _) => {
            pop_expecting_type(&mut frame.stack, &Integer)?;
            pop_expecting_type(&mut frame.stack, &Integer)?;
        }
        IfACmp(_, _) => {
            pop_reference(&mut frame.stack)?;
            pop_reference(&mut frame.stack)?;
        }
        IfNull(_, _) => {
            pop_reference(&mut frame.stack)?;
        }
        Goto(_) | GotoW(_) => (),
        Jsr(_) | JsrW(_) | Ret(_) => return Err(VerifierErrorKind::Subroutine),

        Return(Some(kind)) => match value_kind_type(*kind) {
            Some(typ) => pop_expecting_type(&mut frame.stack, &typ)?,
            None => {
                pop_reference(&mut frame.stack)?;
            }
        },
        Return(None) => (),
        AThrow => {
            pop_reference(&mut frame.stack)?;
        }

        GetStatic(index) | GetField(index) | PutStatic(index) | PutField(index) => {
            let member = constants
                .member_ref(*index)
                .map_err(|_| VerifierErrorKind::MissingConstant(*index))?;
            let typ = VType::from_field_type(&field_type(&member.descriptor)?);
            match insn {
                GetStatic(_) => frame.stack.push(typ),
                GetField(_) => {
                    pop_reference(&mut frame.stack)?;
                    frame.stack.push(typ);
                }
                PutStatic(_) => pop_matching(&mut frame.stack, &typ)?,
                _ => {
                    pop_matching(&mut frame.stack, &typ)?;
                    pop_reference(&mut frame.stack)?;
                }
            }
        }

        Invoke(invoke_type, index) => {
            let member = constants
                .member_ref(*index)
                .map_err(|_| VerifierErrorKind::MissingConstant(*index))?;
            let descriptor = method_descriptor(&member.descriptor)?;
            for parameter in descriptor.parameters.iter().rev() {
                pop_matching(&mut frame.stack, &VType::from_field_type(parameter))?;
            }
            if *invoke_type != InvokeType::Static {
                let receiver = pop_reference(&mut frame.stack)?;
                if member.name == "<init>" {
                    let initialized = match &receiver {
                        UninitializedThis => VType::object(context.this_class),
                        Uninitialized(new_label) => {
                            let class = context
                                .new_instructions
                                .get(new_label)
                                .ok_or(VerifierErrorKind::InvalidType)?;
                            VType::Object(class_name(constants, *class)?)
                        }
                        _ => return Err(VerifierErrorKind::InvalidType),
                    };
                    replace_all(frame, &receiver, &initialized);
                }
            }
            if let Some(return_type) = &descriptor.return_type {
                frame.stack.push(VType::from_field_type(return_type));
            }
        }
        InvokeDynamic(index) => {
            let (_, descriptor) = constants
                .dynamic_name_and_type(*index)
                .map_err(|_| VerifierErrorKind::MissingConstant(*index))?;
            let descriptor = method_descriptor(&descriptor)?;
            for parameter in descriptor.parameters.iter().rev() {
                pop_matching(&mut frame.stack, &VType::from_field_type(parameter))?;
            }
            if let Some(return_type) = &descriptor.return_type {
                frame.stack.push(VType::from_field_type(return_type));
            }
        }

        New(_) => {
            let label = label.ok_or(VerifierErrorKind::InvalidType)?;
            frame.stack.push(Uninitialized(label));
        }
        NewArray(base_type) => {
            pop_expecting_type(&mut frame.stack, &Integer)?;
            frame.stack.push(VType::object(format!("[{}", base_type.render())));
        }
        ANewArray(class) => {
            pop_expecting_type(&mut frame.stack, &Integer)?;
            frame.stack.push(VType::Object(array_of(&class_name(constants, *class)?)));
        }
        MultiANewArray(class, dimensions) => {
            for _ in 0..*dimensions {
                pop_expecting_type(&mut frame.stack, &Integer)?;
            }
            frame.stack.push(VType::Object(class_name(constants, *class)?));
        }
        ArrayLength => {
            pop_reference(&mut frame.stack)?;
            frame.stack.push(Integer);
        }
        CheckCast(class) => {
            pop_reference(&mut frame.stack)?;
            frame.stack.push(VType::Object(class_name(constants, *class)?));
        }
        InstanceOf(_) => {
            pop_reference(&mut frame.stack)?;
            frame.stack.push(Integer);
        }
        MonitorEnter | MonitorExit => {
            pop_reference(&mut frame.stack)?;
        }
    }

    Ok(())
}

fn get_local(locals: &[VType], index: u16) -> Result<VType, VerifierErrorKind> {
    locals
        .get(index as usize)
        .cloned()
        .ok_or(VerifierErrorKind::InvalidIndex(index))
}

/// Overwrite a local, invalidating any `long`/`double` it overlaps
fn set_local(locals: &mut [VType], index: u16, typ: VType) -> Result<(), VerifierErrorKind> {
    let index = index as usize;
    let width = typ.width();
    if index + width > locals.len() {
        return Err(VerifierErrorKind::InvalidIndex(index as u16));
    }
    if index > 0 && locals[index - 1].width() == 2 {
        locals[index - 1] = VType::Top;
    }
    if width == 2 {
        locals[index + 1] = VType::Top;
    } else if locals[index].width() == 2 && index + 1 < locals.len() {
        // Second half of the wide value that used to start here
        locals[index + 1] = VType::Top;
    }
    locals[index] = typ;
    Ok(())
}

fn pop(stack: &mut Vec<VType>) -> Result<VType, VerifierErrorKind> {
    stack.pop().ok_or(VerifierErrorKind::EmptyStack)
}

fn pop_expecting_width(
    stack: &mut Vec<VType>,
    expected_width: usize,
) -> Result<VType, VerifierErrorKind> {
    let typ = pop(stack)?;
    let found_width = typ.width();
    if found_width == expected_width {
        Ok(typ)
    } else {
        Err(VerifierErrorKind::InvalidWidth(found_width))
    }
}

fn pop_expecting_type(stack: &mut Vec<VType>, expected_type: &VType) -> Result<(), VerifierErrorKind> {
    let typ = pop(stack)?;
    if typ == *expected_type {
        Ok(())
    } else {
        Err(VerifierErrorKind::InvalidType)
    }
}

fn pop_reference(stack: &mut Vec<VType>) -> Result<VType, VerifierErrorKind> {
    let typ = pop(stack)?;
    if typ.is_reference() {
        Ok(typ)
    } else {
        Err(VerifierErrorKind::InvalidType)
    }
}

/// Pop a value that will be used as the given type (references are not checked for subtyping)
fn pop_matching(stack: &mut Vec<VType>, expected_type: &VType) -> Result<(), VerifierErrorKind> {
    if expected_type.is_reference() {
        pop_reference(stack).map(|_| ())
    } else {
        pop_expecting_type(stack, expected_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use VerificationType::*;

    fn new_frame<const N: usize, const M: usize>(locals: [VType; N], stack: [VType; M]) -> VerifierFrame {
        Frame {
            locals: locals.to_vec(),
            stack: stack.to_vec(),
        }
    }

    fn verify(frame: &mut VerifierFrame, insn: Instruction, constants: &ConstantPool) -> Result<(), VerifierErrorKind> {
        let new_instructions = HashMap::new();
        let context = InstructionContext {
            constants,
            this_class: "a/Foo",
            new_instructions: &new_instructions,
        };
        frame.verify_instruction(&insn, Some(Label::at_offset(0)), &context)
    }

    #[test]
    fn arithmetic() {
        let constants = ConstantPool::new();
        let kinds = [
            (Integer, NumericKind::Int),
            (Long, NumericKind::Long),
            (Float, NumericKind::Float),
            (Double, NumericKind::Double),
        ];
        for (good_typ, kind) in kinds.clone() {
            for insn in [Instruction::Add(kind), Instruction::Mul(kind), Instruction::Rem(kind)] {
                for (typ, _) in kinds.clone() {
                    let mut frame_in = new_frame([], [typ.clone(), typ.clone()]);
                    let result = verify(&mut frame_in, insn.clone(), &constants);
                    if typ == good_typ {
                        assert!(result.is_ok(), "Verification of {:?}", insn);
                        assert_eq!(frame_in, new_frame([], [typ]));
                    } else {
                        assert!(
                            matches!(result, Err(VerifierErrorKind::InvalidType)),
                            "Verification of {:?}",
                            insn
                        );
                    }
                }

                // Try with a stack that is too small
                let mut frame_in = new_frame([], [good_typ.clone()]);
                assert!(matches!(
                    verify(&mut frame_in, insn.clone(), &constants),
                    Err(VerifierErrorKind::EmptyStack)
                ));
            }
        }
    }

    #[test]
    fn stores_invalidate_wide_locals() {
        let constants = ConstantPool::new();
        let mut frame = new_frame([Long, Top, Integer], [Integer]);
        verify(&mut frame, Instruction::Store(ValueKind::Int, 1), &constants).unwrap();
        assert_eq!(frame, new_frame([Top, Integer, Integer], []));

        let mut frame = new_frame([Integer, Integer, Integer], [Double]);
        verify(&mut frame, Instruction::Store(ValueKind::Double, 0), &constants).unwrap();
        assert_eq!(frame, new_frame([Double, Top, Integer], []));

        let mut frame = new_frame([Integer, Integer], [Long]);
        assert!(matches!(
            verify(&mut frame, Instruction::Store(ValueKind::Long, 1), &constants),
            Err(VerifierErrorKind::InvalidIndex(1))
        ));
    }

    #[test]
    fn stack_shuffles_respect_width() {
        let constants = ConstantPool::new();
        let mut frame = new_frame([], [Integer, Long]);
        verify(&mut frame, Instruction::Dup2X1, &constants).unwrap();
        assert_eq!(frame, new_frame([], [Long, Integer, Long]));

        let mut frame = new_frame([], [Long]);
        assert!(matches!(
            verify(&mut frame, Instruction::Dup, &constants),
            Err(VerifierErrorKind::InvalidWidth(2))
        ));

        let mut frame = new_frame([], [Float, Integer]);
        verify(&mut frame, Instruction::Pop2, &constants).unwrap();
        assert!(frame.stack.is_empty());
    }

    #[test]
    fn constructor_initializes_all_copies() {
        let mut constants = ConstantPool::new();
        let class = constants.get_class("a/Bar").unwrap();
        let init = constants
            .get_method_ref("a/Bar", "<init>", "(I)V", false)
            .unwrap();
        let new_label = Label::at_offset(3);
        let new_instructions = HashMap::from([(new_label, class)]);
        let context = InstructionContext {
            constants: &constants,
            this_class: "a/Foo",
            new_instructions: &new_instructions,
        };

        let mut frame = new_frame([Top], []);
        frame
            .verify_instruction(&Instruction::New(class), Some(new_label), &context)
            .unwrap();
        frame.verify_instruction(&Instruction::Dup, None, &context).unwrap();
        frame
            .verify_instruction(&Instruction::IConst(1), None, &context)
            .unwrap();
        frame
            .verify_instruction(&Instruction::Invoke(InvokeType::Special, init), None, &context)
            .unwrap();
        assert_eq!(frame, new_frame([Top], [VType::object("a/Bar")]));
    }

    #[test]
    fn reference_array_loads() {
        let constants = ConstantPool::new();
        let mut frame = new_frame([], [VType::object("[[Ljava/lang/String;"), Integer]);
        verify(&mut frame, Instruction::ArrayLoad(ArrayKind::Reference), &constants).unwrap();
        assert_eq!(frame, new_frame([], [VType::object("[Ljava/lang/String;")]));

        let mut frame = new_frame([], [VType::object("[I"), Integer]);
        assert!(matches!(
            verify(&mut frame, Instruction::ArrayLoad(ArrayKind::Reference), &constants),
            Err(VerifierErrorKind::NotArrayType)
        ));
    }

    #[test]
    fn method_entry_frames() {
        let descriptor = MethodDescriptor::parse("(JLjava/lang/String;)V").unwrap();
        let frame = VerifierFrame::method_entry("a/Foo", "<init>", &descriptor, false, 6).unwrap();
        assert_eq!(
            frame.locals,
            vec![
                UninitializedThis,
                Long,
                Top,
                VType::object("java/lang/String"),
                Top,
                Top
            ]
        );
        assert!(VerifierFrame::method_entry("a/Foo", "run", &descriptor, true, 2).is_err());
    }

    #[test]
    fn entries_and_slots() {
        let frame = new_frame([Integer, Double, Top, Top, Float, Top, Top], [Integer]);
        let entries = frame.to_entries();
        assert_eq!(entries.locals, vec![Integer, Double, Top, Float]);
        assert_eq!(VerifierFrame::from_entries(&entries, 7), frame);
        assert_eq!(frame.stack_size(), 1);
    }

    #[test]
    fn compact_stack_map_frames() {
        type SFrame = Frame<ClassConstantIndex, u16>;
        let object = VerificationType::Object(ClassConstantIndex(ConstantIndex(3)));
        let previous: SFrame = Frame {
            locals: vec![object, VerificationType::Integer],
            stack: vec![],
        };

        let same = previous.clone();
        assert_eq!(
            same.stack_map_frame(4, &previous),
            StackMapFrame::SameLocalsNoStack { offset_delta: 4 }
        );

        let chopped: SFrame = Frame {
            locals: vec![object],
            stack: vec![],
        };
        assert_eq!(
            chopped.stack_map_frame(1, &previous),
            StackMapFrame::ChopLocalsNoStack {
                offset_delta: 1,
                chopped_k: 1
            }
        );

        let appended: SFrame = Frame {
            locals: vec![object, VerificationType::Integer, VerificationType::Long],
            stack: vec![],
        };
        assert_eq!(
            appended.stack_map_frame(2, &previous),
            StackMapFrame::AppendLocalsNoStack {
                offset_delta: 2,
                locals: vec![VerificationType::Long]
            }
        );

        let one_stack: SFrame = Frame {
            locals: previous.locals.clone(),
            stack: vec![object],
        };
        assert_eq!(
            one_stack.stack_map_frame(0, &previous),
            StackMapFrame::SameLocalsOneStack {
                offset_delta: 0,
                stack: object
            }
        );

        let different: SFrame = Frame {
            locals: vec![VerificationType::Float],
            stack: vec![VerificationType::Integer],
        };
        assert!(matches!(
            different.stack_map_frame(0, &previous),
            StackMapFrame::Full { .. }
        ));

        // Decoding gives back the frames
        for frame in [same, chopped, appended, one_stack, different] {
            let encoded = frame.stack_map_frame(0, &previous);
            assert_eq!(previous.next_frame(&encoded, |typ| Ok(*typ)).unwrap(), frame);
        }
    }
}
