use crate::jvm::class_file::Serialize;
use crate::jvm::code::jump_encoding::Layout;
use crate::jvm::code::{
    switch_padding, ArrayKind, CodeElement, CompareMode, EqComparison, Instruction, InvokeType,
    Label, NumericKind, OrdComparison, ShiftType, ValueKind,
};
use crate::jvm::{BaseType, ConstantIndex, Error};

/// Serialize laid out code elements into a code array
///
/// The layout must have been computed from exactly these elements, and all 16-bit jumps must
/// already fit (see [`crate::jvm::code::jump_encoding::widen_oversized_jumps`]).
pub fn encode_instructions(elements: &[CodeElement], layout: &Layout) -> Result<Vec<u8>, Error> {
    let mut code = Vec::with_capacity(layout.code_length);
    for (idx, element) in elements.iter().enumerate() {
        if let CodeElement::Instruction(insn) = element {
            let offset = layout.element_offsets[idx];
            debug_assert_eq!(offset, code.len());
            encode_instruction(&mut code, insn, offset, layout)?;
        }
    }
    Ok(code)
}

fn value_kind_ordinal(kind: ValueKind) -> u8 {
    match kind {
        ValueKind::Int => 0,
        ValueKind::Long => 1,
        ValueKind::Float => 2,
        ValueKind::Double => 3,
        ValueKind::Reference => 4,
    }
}

fn numeric_kind_ordinal(kind: NumericKind) -> u8 {
    match kind {
        NumericKind::Int => 0,
        NumericKind::Long => 1,
        NumericKind::Float => 2,
        NumericKind::Double => 3,
    }
}

fn array_kind_ordinal(kind: ArrayKind) -> u8 {
    match kind {
        ArrayKind::Int => 0,
        ArrayKind::Long => 1,
        ArrayKind::Float => 2,
        ArrayKind::Double => 3,
        ArrayKind::Reference => 4,
        ArrayKind::Byte => 5,
        ArrayKind::Char => 6,
        ArrayKind::Short => 7,
    }
}

fn ord_comparison_ordinal(comparison: OrdComparison) -> u8 {
    match comparison {
        OrdComparison::EQ => 0,
        OrdComparison::NE => 1,
        OrdComparison::LT => 2,
        OrdComparison::GE => 3,
        OrdComparison::GT => 4,
        OrdComparison::LE => 5,
    }
}

/// Opcode of an instruction only defined on `int` and `long`
fn int_or_long(base: u8, kind: NumericKind, insn: &Instruction) -> Result<u8, Error> {
    match kind {
        NumericKind::Int => Ok(base),
        NumericKind::Long => Ok(base + 1),
        _ => Err(Error::Malformed(format!("{:?} has no encoding", insn))),
    }
}

fn array_type_code(base_type: BaseType) -> u8 {
    match base_type {
        BaseType::Boolean => 4,
        BaseType::Char => 5,
        BaseType::Float => 6,
        BaseType::Double => 7,
        BaseType::Byte => 8,
        BaseType::Short => 9,
        BaseType::Int => 10,
        BaseType::Long => 11,
    }
}

fn short_jump(offset: usize, target: Label, layout: &Layout) -> Result<i16, Error> {
    let distance = layout.jump_distance(offset, target)?;
    i16::try_from(distance).map_err(|_| Error::JumpOutOfRange {
        offset,
        target: layout.label_offsets[&target],
    })
}

fn wide_jump(offset: usize, target: Label, layout: &Layout) -> Result<i32, Error> {
    let distance = layout.jump_distance(offset, target)?;
    i32::try_from(distance).map_err(|_| Error::JumpOutOfRange {
        offset,
        target: layout.label_offsets[&target],
    })
}

/// Write a local variable instruction, picking the shortest encoding
fn local_variable(code: &mut Vec<u8>, opcode: u8, short_base: Option<u8>, index: u16) {
    match short_base {
        Some(short_base) if index <= 3 => code.push(short_base + index as u8),
        _ if index <= u8::MAX as u16 => {
            code.push(opcode);
            code.push(index as u8);
        }
        _ => {
            code.push(0xc4);
            code.push(opcode);
            code.extend_from_slice(&index.to_be_bytes());
        }
    }
}

fn constant(code: &mut Vec<u8>, index: ConstantIndex) -> Result<(), Error> {
    index.serialize(code).map_err(Error::IoError)
}

fn encode_instruction(
    code: &mut Vec<u8>,
    insn: &Instruction,
    offset: usize,
    layout: &Layout,
) -> Result<(), Error> {
    use Instruction::*;

    match insn {
        Nop => code.push(0x00),
        AConstNull => code.push(0x01),
        IConst(value @ -1..=5) => code.push((0x03 + *value as i16) as u8),
        LConst(value @ 0..=1) => code.push(0x09 + *value as u8),
        FConst(value @ 0..=2) => code.push(0x0b + *value as u8),
        DConst(value @ 0..=1) => code.push(0x0e + *value as u8),
        IConst(_) | LConst(_) | FConst(_) | DConst(_) => {
            return Err(Error::Malformed(format!("{:?} has no encoding", insn)));
        }
        BiPush(value) => {
            code.push(0x10);
            code.push(*value as u8);
        }
        SiPush(value) => {
            code.push(0x11);
            code.extend_from_slice(&value.to_be_bytes());
        }
        Ldc(index) => {
            if index.0 <= u8::MAX as u16 {
                code.push(0x12);
                code.push(index.0 as u8);
            } else {
                code.push(0x13);
                constant(code, *index)?;
            }
        }
        Ldc2(index) => {
            code.push(0x14);
            constant(code, *index)?;
        }
        Load(kind, index) => {
            let ordinal = value_kind_ordinal(*kind);
            local_variable(code, 0x15 + ordinal, Some(0x1a + 4 * ordinal), *index);
        }
        Store(kind, index) => {
            let ordinal = value_kind_ordinal(*kind);
            local_variable(code, 0x36 + ordinal, Some(0x3b + 4 * ordinal), *index);
        }
        ArrayLoad(kind) => code.push(0x2e + array_kind_ordinal(*kind)),
        ArrayStore(kind) => code.push(0x4f + array_kind_ordinal(*kind)),
        Pop => code.push(0x57),
        Pop2 => code.push(0x58),
        Dup => code.push(0x59),
        DupX1 => code.push(0x5a),
        DupX2 => code.push(0x5b),
        Dup2 => code.push(0x5c),
        Dup2X1 => code.push(0x5d),
        Dup2X2 => code.push(0x5e),
        Swap => code.push(0x5f),
        Add(kind) => code.push(0x60 + numeric_kind_ordinal(*kind)),
        Sub(kind) => code.push(0x64 + numeric_kind_ordinal(*kind)),
        Mul(kind) => code.push(0x68 + numeric_kind_ordinal(*kind)),
        Div(kind) => code.push(0x6c + numeric_kind_ordinal(*kind)),
        Rem(kind) => code.push(0x70 + numeric_kind_ordinal(*kind)),
        Neg(kind) => code.push(0x74 + numeric_kind_ordinal(*kind)),
        Shift(kind, shift) => {
            let base = match shift {
                ShiftType::Left => 0x78,
                ShiftType::ArithmeticRight => 0x7a,
                ShiftType::LogicalRight => 0x7c,
            };
            code.push(int_or_long(base, *kind, insn)?);
        }
        And(kind) => code.push(int_or_long(0x7e, *kind, insn)?),
        Or(kind) => code.push(int_or_long(0x80, *kind, insn)?),
        Xor(kind) => code.push(int_or_long(0x82, *kind, insn)?),
        IInc(index, amount) => match i8::try_from(*amount) {
            Ok(small_amount) if *index <= u8::MAX as u16 => {
                code.push(0x84);
                code.push(*index as u8);
                code.push(small_amount as u8);
            }
            _ => {
                code.push(0xc4);
                code.push(0x84);
                code.extend_from_slice(&index.to_be_bytes());
                code.extend_from_slice(&amount.to_be_bytes());
            }
        },
        Convert(from, to) => {
            let from = numeric_kind_ordinal(*from);
            let to = numeric_kind_ordinal(*to);
            if from == to {
                return Err(Error::Malformed(format!("{:?} has no encoding", insn)));
            }
            let to_index = if to < from { to } else { to - 1 };
            code.push(0x85 + 3 * from + to_index);
        }
        I2B => code.push(0x91),
        I2C => code.push(0x92),
        I2S => code.push(0x93),
        LCmp => code.push(0x94),
        FCmp(CompareMode::L) => code.push(0x95),
        FCmp(CompareMode::G) => code.push(0x96),
        DCmp(CompareMode::L) => code.push(0x97),
        DCmp(CompareMode::G) => code.push(0x98),
        If(comparison, target) => {
            code.push(0x99 + ord_comparison_ordinal(*comparison));
            code.extend_from_slice(&short_jump(offset, *target, layout)?.to_be_bytes());
        }
        IfICmp(comparison, target) => {
            code.push(0x9f + ord_comparison_ordinal(*comparison));
            code.extend_from_slice(&short_jump(offset, *target, layout)?.to_be_bytes());
        }
        IfACmp(comparison, target) => {
            code.push(match comparison {
                EqComparison::EQ => 0xa5,
                EqComparison::NE => 0xa6,
            });
            code.extend_from_slice(&short_jump(offset, *target, layout)?.to_be_bytes());
        }
        IfNull(comparison, target) => {
            code.push(match comparison {
                EqComparison::EQ => 0xc6,
                EqComparison::NE => 0xc7,
            });
            code.extend_from_slice(&short_jump(offset, *target, layout)?.to_be_bytes());
        }
        Goto(target) => {
            code.push(0xa7);
            code.extend_from_slice(&short_jump(offset, *target, layout)?.to_be_bytes());
        }
        GotoW(target) => {
            code.push(0xc8);
            code.extend_from_slice(&wide_jump(offset, *target, layout)?.to_be_bytes());
        }
        Jsr(target) => {
            code.push(0xa8);
            code.extend_from_slice(&short_jump(offset, *target, layout)?.to_be_bytes());
        }
        JsrW(target) => {
            code.push(0xc9);
            code.extend_from_slice(&wide_jump(offset, *target, layout)?.to_be_bytes());
        }
        Ret(index) => local_variable(code, 0xa9, None, *index),
        TableSwitch {
            default,
            low,
            targets,
        } => {
            code.push(0xaa);
            code.extend(std::iter::repeat(0).take(switch_padding(offset)));
            code.extend_from_slice(&wide_jump(offset, *default, layout)?.to_be_bytes());
            let high = *low as i64 + targets.len() as i64 - 1;
            code.extend_from_slice(&low.to_be_bytes());
            code.extend_from_slice(&(high as i32).to_be_bytes());
            for target in targets {
                code.extend_from_slice(&wide_jump(offset, *target, layout)?.to_be_bytes());
            }
        }
        LookupSwitch { default, targets } => {
            code.push(0xab);
            code.extend(std::iter::repeat(0).take(switch_padding(offset)));
            code.extend_from_slice(&wide_jump(offset, *default, layout)?.to_be_bytes());
            code.extend_from_slice(&(targets.len() as i32).to_be_bytes());
            for (key, target) in targets {
                code.extend_from_slice(&key.to_be_bytes());
                code.extend_from_slice(&wide_jump(offset, *target, layout)?.to_be_bytes());
            }
        }
        Return(Some(kind)) => code.push(0xac + value_kind_ordinal(*kind)),
        Return(None) => code.push(0xb1),
        AThrow => code.push(0xbf),
        GetStatic(index) => {
            code.push(0xb2);
            constant(code, *index)?;
        }
        PutStatic(index) => {
            code.push(0xb3);
            constant(code, *index)?;
        }
        GetField(index) => {
            code.push(0xb4);
            constant(code, *index)?;
        }
        PutField(index) => {
            code.push(0xb5);
            constant(code, *index)?;
        }
        Invoke(invoke_type, index) => {
            code.push(match invoke_type {
                InvokeType::Virtual => 0xb6,
                InvokeType::Special => 0xb7,
                InvokeType::Static => 0xb8,
                InvokeType::Interface(_) => 0xb9,
            });
            constant(code, *index)?;
            if let InvokeType::Interface(count) = invoke_type {
                code.push(*count);
                code.push(0);
            }
        }
        InvokeDynamic(index) => {
            code.push(0xba);
            constant(code, *index)?;
            code.extend_from_slice(&[0, 0]);
        }
        New(class) => {
            code.push(0xbb);
            constant(code, class.0)?;
        }
        NewArray(base_type) => {
            code.push(0xbc);
            code.push(array_type_code(*base_type));
        }
        ANewArray(class) => {
            code.push(0xbd);
            constant(code, class.0)?;
        }
        MultiANewArray(class, dimensions) => {
            code.push(0xc5);
            constant(code, class.0)?;
            code.push(*dimensions);
        }
        ArrayLength => code.push(0xbe),
        CheckCast(class) => {
            code.push(0xc0);
            constant(code, class.0)?;
        }
        InstanceOf(class) => {
            code.push(0xc1);
            constant(code, class.0)?;
        }
        MonitorEnter => code.push(0xc2),
        MonitorExit => code.push(0xc3),
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::decode_instructions;

    /// Encode a plain sequence of instructions (each preceded by a label at its decoded offset)
    fn encode(instructions: Vec<(usize, Instruction)>) -> Vec<u8> {
        let mut elements = vec![];
        for (offset, insn) in instructions {
            elements.push(CodeElement::Label(Label::at_offset(offset)));
            elements.push(CodeElement::Instruction(insn));
        }
        let layout = Layout::compute(&elements);
        encode_instructions(&elements, &layout).unwrap()
    }

    #[test]
    fn decoded_code_encodes_identically() {
        let samples: Vec<Vec<u8>> = vec![
            // iload_1; ifeq +5; iconst_m1; ireturn; iconst_5; ireturn
            vec![0x1b, 0x99, 0x00, 0x05, 0x02, 0xac, 0x08, 0xac],
            // aload 7; astore 200; wide iload 300; pop; iinc 1 -3; return
            vec![
                0x19, 0x07, 0x3a, 0xc8, 0xc4, 0x15, 0x01, 0x2c, 0x57, 0x84, 0x01, 0xfd, 0xb1,
            ],
            // getstatic #2; ldc #3; invokevirtual #4; invokeinterface #5 2 0; return
            vec![
                0xb2, 0x00, 0x02, 0x12, 0x03, 0xb6, 0x00, 0x04, 0xb9, 0x00, 0x05, 0x02, 0x00,
                0xb1,
            ],
            // lload_2; l2i; i2d; dcmpg; newarray int; arraylength; ireturn
            vec![0x20, 0x88, 0x87, 0x98, 0xbc, 0x0a, 0xbe, 0xac],
        ];
        for sample in samples {
            let instructions = decode_instructions(&sample).unwrap();
            assert_eq!(encode(instructions), sample);
        }
    }

    #[test]
    fn compact_local_forms() {
        let code = encode(vec![
            (0, Instruction::Load(ValueKind::Reference, 0)),
            (1, Instruction::Store(ValueKind::Long, 3)),
            (2, Instruction::Load(ValueKind::Double, 4)),
            (4, Instruction::Store(ValueKind::Int, 1000)),
        ]);
        assert_eq!(code, vec![0x2a, 0x42, 0x18, 0x04, 0xc4, 0x36, 0x03, 0xe8]);
    }

    #[test]
    fn ldc_width_depends_on_index() {
        let code = encode(vec![
            (0, Instruction::Ldc(ConstantIndex(255))),
            (2, Instruction::Ldc(ConstantIndex(256))),
        ]);
        assert_eq!(code, vec![0x12, 0xff, 0x13, 0x01, 0x00]);
    }

    #[test]
    fn lookupswitch_is_padded() {
        let elements = vec![
            CodeElement::Instruction(Instruction::Load(ValueKind::Int, 0)),
            CodeElement::Instruction(Instruction::LookupSwitch {
                default: Label::at_offset(100),
                targets: vec![(7, Label::at_offset(100))],
            }),
            CodeElement::Label(Label::at_offset(100)),
            CodeElement::Instruction(Instruction::Return(None)),
        ];
        let layout = Layout::compute(&elements);
        let code = encode_instructions(&elements, &layout).unwrap();
        assert_eq!(layout.code_length, 1 + 1 + 2 + 8 + 8 + 1);
        assert_eq!(code.len(), layout.code_length);
        assert_eq!(&code[1..4], &[0xab, 0, 0]);
        // default jumps from offset 1 to offset 20
        assert_eq!(&code[4..8], &19i32.to_be_bytes());
    }

    #[test]
    fn unplaced_label_is_an_error() {
        let elements = vec![CodeElement::Instruction(Instruction::Goto(Label::at_offset(9)))];
        let layout = Layout::compute(&elements);
        assert!(matches!(
            encode_instructions(&elements, &layout),
            Err(Error::UnplacedLabel(_))
        ));
    }
}
