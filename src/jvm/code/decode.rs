use crate::jvm::class_file::Deserialize;
use crate::jvm::code::{
    switch_padding, ArrayKind, CompareMode, EqComparison, Instruction, InvokeType, Label,
    NumericKind, OrdComparison, ShiftType, ValueKind,
};
use crate::jvm::{BaseType, ClassConstantIndex, ConstantIndex, Error};

/// Decode a code array into instructions, paired with their offsets
///
/// Jump targets are checked to land inside the code, but not yet that they land on an
/// instruction boundary (that needs the full list of offsets).
pub fn decode_instructions(code: &[u8]) -> Result<Vec<(usize, Instruction)>, Error> {
    let mut reader = code;
    let mut instructions = vec![];
    while !reader.is_empty() {
        let offset = code.len() - reader.len();
        let instruction = decode_instruction(&mut reader, offset, code.len())?;
        instructions.push((offset, instruction));
    }
    Ok(instructions)
}

fn jump_target(offset: usize, relative: i32, code_length: usize) -> Result<Label, Error> {
    let target = offset as i64 + relative as i64;
    if target < 0 || target >= code_length as i64 {
        return Err(Error::Malformed(format!(
            "jump at offset {} leaves the method (target {})",
            offset, target
        )));
    }
    Ok(Label::at_offset(target as usize))
}

fn value_kind(n: u8) -> ValueKind {
    match n {
        0 => ValueKind::Int,
        1 => ValueKind::Long,
        2 => ValueKind::Float,
        3 => ValueKind::Double,
        _ => ValueKind::Reference,
    }
}

fn numeric_kind(n: u8) -> NumericKind {
    match n {
        0 => NumericKind::Int,
        1 => NumericKind::Long,
        2 => NumericKind::Float,
        _ => NumericKind::Double,
    }
}

fn array_kind(n: u8) -> ArrayKind {
    match n {
        0 => ArrayKind::Int,
        1 => ArrayKind::Long,
        2 => ArrayKind::Float,
        3 => ArrayKind::Double,
        4 => ArrayKind::Reference,
        5 => ArrayKind::Byte,
        6 => ArrayKind::Char,
        _ => ArrayKind::Short,
    }
}

fn ord_comparison(n: u8) -> OrdComparison {
    match n {
        0 => OrdComparison::EQ,
        1 => OrdComparison::NE,
        2 => OrdComparison::LT,
        3 => OrdComparison::GE,
        4 => OrdComparison::GT,
        _ => OrdComparison::LE,
    }
}

/// `i2l` .. `d2f` run through every ordered pair of distinct numeric kinds
fn conversion(n: u8) -> Instruction {
    let from = n / 3;
    let mut to = n % 3;
    if to >= from {
        to += 1;
    }
    Instruction::Convert(numeric_kind(from), numeric_kind(to))
}

fn array_type(atype: u8) -> Result<BaseType, Error> {
    let base_type = match atype {
        4 => BaseType::Boolean,
        5 => BaseType::Char,
        6 => BaseType::Float,
        7 => BaseType::Double,
        8 => BaseType::Byte,
        9 => BaseType::Short,
        10 => BaseType::Int,
        11 => BaseType::Long,
        other => {
            return Err(Error::Malformed(format!("invalid newarray type {}", other)));
        }
    };
    Ok(base_type)
}

fn skip_padding(reader: &mut &[u8], offset: usize) -> Result<(), Error> {
    for _ in 0..switch_padding(offset) {
        u8::deserialize(reader)?;
    }
    Ok(())
}

fn decode_instruction(
    reader: &mut &[u8],
    offset: usize,
    code_length: usize,
) -> Result<Instruction, Error> {
    use Instruction::*;

    let opcode = u8::deserialize(reader)?;
    let instruction = match opcode {
        0x00 => Nop,
        0x01 => AConstNull,
        0x02..=0x08 => IConst(opcode as i8 - 0x03),
        0x09..=0x0a => LConst((opcode - 0x09) as i8),
        0x0b..=0x0d => FConst((opcode - 0x0b) as i8),
        0x0e..=0x0f => DConst((opcode - 0x0e) as i8),
        0x10 => BiPush(i8::deserialize(reader)?),
        0x11 => SiPush(i16::deserialize(reader)?),
        0x12 => Ldc(ConstantIndex(u8::deserialize(reader)? as u16)),
        0x13 => Ldc(ConstantIndex::deserialize(reader)?),
        0x14 => Ldc2(ConstantIndex::deserialize(reader)?),
        0x15..=0x19 => Load(value_kind(opcode - 0x15), u8::deserialize(reader)? as u16),
        0x1a..=0x2d => {
            let n = opcode - 0x1a;
            Load(value_kind(n / 4), (n % 4) as u16)
        }
        0x2e..=0x35 => ArrayLoad(array_kind(opcode - 0x2e)),
        0x36..=0x3a => Store(value_kind(opcode - 0x36), u8::deserialize(reader)? as u16),
        0x3b..=0x4e => {
            let n = opcode - 0x3b;
            Store(value_kind(n / 4), (n % 4) as u16)
        }
        0x4f..=0x56 => ArrayStore(array_kind(opcode - 0x4f)),
        0x57 => Pop,
        0x58 => Pop2,
        0x59 => Dup,
        0x5a => DupX1,
        0x5b => DupX2,
        0x5c => Dup2,
        0x5d => Dup2X1,
        0x5e => Dup2X2,
        0x5f => Swap,
        0x60..=0x63 => Add(numeric_kind(opcode - 0x60)),
        0x64..=0x67 => Sub(numeric_kind(opcode - 0x64)),
        0x68..=0x6b => Mul(numeric_kind(opcode - 0x68)),
        0x6c..=0x6f => Div(numeric_kind(opcode - 0x6c)),
        0x70..=0x73 => Rem(numeric_kind(opcode - 0x70)),
        0x74..=0x77 => Neg(numeric_kind(opcode - 0x74)),
        0x78..=0x7d => {
            let n = opcode - 0x78;
            let shift = match n / 2 {
                0 => ShiftType::Left,
                1 => ShiftType::ArithmeticRight,
                _ => ShiftType::LogicalRight,
            };
            Shift(numeric_kind(n % 2), shift)
        }
        0x7e..=0x7f => And(numeric_kind(opcode - 0x7e)),
        0x80..=0x81 => Or(numeric_kind(opcode - 0x80)),
        0x82..=0x83 => Xor(numeric_kind(opcode - 0x82)),
        0x84 => {
            let index = u8::deserialize(reader)? as u16;
            IInc(index, i8::deserialize(reader)? as i16)
        }
        0x85..=0x90 => conversion(opcode - 0x85),
        0x91 => I2B,
        0x92 => I2C,
        0x93 => I2S,
        0x94 => LCmp,
        0x95 => FCmp(CompareMode::L),
        0x96 => FCmp(CompareMode::G),
        0x97 => DCmp(CompareMode::L),
        0x98 => DCmp(CompareMode::G),
        0x99..=0x9e => {
            let target = jump_target(offset, i16::deserialize(reader)? as i32, code_length)?;
            If(ord_comparison(opcode - 0x99), target)
        }
        0x9f..=0xa4 => {
            let target = jump_target(offset, i16::deserialize(reader)? as i32, code_length)?;
            IfICmp(ord_comparison(opcode - 0x9f), target)
        }
        0xa5..=0xa6 => {
            let target = jump_target(offset, i16::deserialize(reader)? as i32, code_length)?;
            let comparison = if opcode == 0xa5 {
                EqComparison::EQ
            } else {
                EqComparison::NE
            };
            IfACmp(comparison, target)
        }
        0xa7 => Goto(jump_target(offset, i16::deserialize(reader)? as i32, code_length)?),
        0xa8 => Jsr(jump_target(offset, i16::deserialize(reader)? as i32, code_length)?),
        0xa9 => Ret(u8::deserialize(reader)? as u16),
        0xaa => {
            skip_padding(reader, offset)?;
            let default = jump_target(offset, i32::deserialize(reader)?, code_length)?;
            let low = i32::deserialize(reader)?;
            let high = i32::deserialize(reader)?;
            if high < low {
                return Err(Error::Malformed(format!(
                    "tableswitch at offset {} has high {} below low {}",
                    offset, high, low
                )));
            }
            let count = (high as i64 - low as i64 + 1) as usize;
            if count > code_length {
                return Err(Error::Malformed(format!(
                    "tableswitch at offset {} is larger than the method",
                    offset
                )));
            }
            let mut targets = Vec::with_capacity(count);
            for _ in 0..count {
                targets.push(jump_target(offset, i32::deserialize(reader)?, code_length)?);
            }
            TableSwitch {
                default,
                low,
                targets,
            }
        }
        0xab => {
            skip_padding(reader, offset)?;
            let default = jump_target(offset, i32::deserialize(reader)?, code_length)?;
            let pairs = i32::deserialize(reader)?;
            if pairs < 0 || pairs as usize > code_length {
                return Err(Error::Malformed(format!(
                    "lookupswitch at offset {} has {} pairs",
                    offset, pairs
                )));
            }
            let mut targets = Vec::with_capacity(pairs as usize);
            for _ in 0..pairs {
                let key = i32::deserialize(reader)?;
                let target = jump_target(offset, i32::deserialize(reader)?, code_length)?;
                targets.push((key, target));
            }
            LookupSwitch { default, targets }
        }
        0xac..=0xb0 => Return(Some(value_kind(opcode - 0xac))),
        0xb1 => Return(None),
        0xb2 => GetStatic(ConstantIndex::deserialize(reader)?),
        0xb3 => PutStatic(ConstantIndex::deserialize(reader)?),
        0xb4 => GetField(ConstantIndex::deserialize(reader)?),
        0xb5 => PutField(ConstantIndex::deserialize(reader)?),
        0xb6 => Invoke(InvokeType::Virtual, ConstantIndex::deserialize(reader)?),
        0xb7 => Invoke(InvokeType::Special, ConstantIndex::deserialize(reader)?),
        0xb8 => Invoke(InvokeType::Static, ConstantIndex::deserialize(reader)?),
        0xb9 => {
            let method = ConstantIndex::deserialize(reader)?;
            let count = u8::deserialize(reader)?;
            let _zero = u8::deserialize(reader)?;
            Invoke(InvokeType::Interface(count), method)
        }
        0xba => {
            let call_site = ConstantIndex::deserialize(reader)?;
            let _zero = u16::deserialize(reader)?;
            InvokeDynamic(call_site)
        }
        0xbb => New(ClassConstantIndex::deserialize(reader)?),
        0xbc => NewArray(array_type(u8::deserialize(reader)?)?),
        0xbd => ANewArray(ClassConstantIndex::deserialize(reader)?),
        0xbe => ArrayLength,
        0xbf => AThrow,
        0xc0 => CheckCast(ClassConstantIndex::deserialize(reader)?),
        0xc1 => InstanceOf(ClassConstantIndex::deserialize(reader)?),
        0xc2 => MonitorEnter,
        0xc3 => MonitorExit,
        0xc4 => {
            let wide_opcode = u8::deserialize(reader)?;
            match wide_opcode {
                0x15..=0x19 => Load(value_kind(wide_opcode - 0x15), u16::deserialize(reader)?),
                0x36..=0x3a => Store(value_kind(wide_opcode - 0x36), u16::deserialize(reader)?),
                0xa9 => Ret(u16::deserialize(reader)?),
                0x84 => {
                    let index = u16::deserialize(reader)?;
                    IInc(index, i16::deserialize(reader)?)
                }
                other => {
                    return Err(Error::Malformed(format!(
                        "opcode {:#04x} cannot follow wide at offset {}",
                        other, offset
                    )));
                }
            }
        }
        0xc5 => {
            let class = ClassConstantIndex::deserialize(reader)?;
            MultiANewArray(class, u8::deserialize(reader)?)
        }
        0xc6 => IfNull(
            EqComparison::EQ,
            jump_target(offset, i16::deserialize(reader)? as i32, code_length)?,
        ),
        0xc7 => IfNull(
            EqComparison::NE,
            jump_target(offset, i16::deserialize(reader)? as i32, code_length)?,
        ),
        0xc8 => GotoW(jump_target(offset, i32::deserialize(reader)?, code_length)?),
        0xc9 => JsrW(jump_target(offset, i32::deserialize(reader)?, code_length)?),
        other => {
            return Err(Error::Malformed(format!(
                "unknown opcode {:#04x} at offset {}",
                other, offset
            )));
        }
    };
    Ok(instruction)
}
