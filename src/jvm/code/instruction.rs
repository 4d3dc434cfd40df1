use crate::jvm::code::Label;
use crate::jvm::{BaseType, ClassConstantIndex, ConstantIndex, FieldType};
use std::ops::Not;

/// Kind of value moved by loads, stores, and returns
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ValueKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl ValueKind {
    /// Number of local variable or operand stack slots taken by a value of this kind
    pub fn width(&self) -> usize {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }

    /// Kind of value used to load, store, or return something of type `field_type`
    pub fn of(field_type: &FieldType) -> ValueKind {
        match field_type {
            FieldType::Base(BaseType::Long) => ValueKind::Long,
            FieldType::Base(BaseType::Float) => ValueKind::Float,
            FieldType::Base(BaseType::Double) => ValueKind::Double,
            FieldType::Base(_) => ValueKind::Int,
            FieldType::Object(_) | FieldType::Array(_) => ValueKind::Reference,
        }
    }
}

/// Element type handled by array loads and stores (`Byte` is also used for `boolean[]`)
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ArrayKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
    Byte,
    Char,
    Short,
}

/// Operand type of arithmetic and conversions
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum NumericKind {
    Int,
    Long,
    Float,
    Double,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ShiftType {
    Left,
    ArithmeticRight,
    LogicalRight,
}

/// How `fcmp`/`dcmp` treat NaN
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CompareMode {
    /// NaN compares as less than anything
    L,
    /// NaN compares as greater than anything
    G,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum OrdComparison {
    EQ,
    NE,
    LT,
    GE,
    GT,
    LE,
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::NE => OrdComparison::EQ,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,

    /// The `count` operand of `invokeinterface` (argument slots, including the receiver)
    Interface(u8),
}

/// One JVM instruction
///
/// Jumps refer to [`Label`]s instead of relative offsets and local variable instructions carry
/// the index instead of having separate `_0` .. `_3` variants: the shortest encoding is picked
/// when the code is laid out. The same goes for `ldc` versus `ldc_w`.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-6.html
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    Nop,
    AConstNull,
    IConst(i8),
    LConst(i8),
    FConst(i8),
    DConst(i8),
    BiPush(i8),
    SiPush(i16),

    /// `ldc` or `ldc_w`
    Ldc(ConstantIndex),

    /// `ldc2_w`
    Ldc2(ConstantIndex),

    Load(ValueKind, u16),
    Store(ValueKind, u16),
    ArrayLoad(ArrayKind),
    ArrayStore(ArrayKind),

    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,

    Add(NumericKind),
    Sub(NumericKind),
    Mul(NumericKind),
    Div(NumericKind),
    Rem(NumericKind),
    Neg(NumericKind),

    /// Only `Int` and `Long` operands exist for shifts and bitwise operations
    Shift(NumericKind, ShiftType),
    And(NumericKind),
    Or(NumericKind),
    Xor(NumericKind),

    IInc(u16, i16),

    /// Conversion between two different numeric kinds (`i2l`, `d2f`, etc.)
    Convert(NumericKind, NumericKind),
    I2B,
    I2C,
    I2S,

    LCmp,
    FCmp(CompareMode),
    DCmp(CompareMode),

    If(OrdComparison, Label),
    IfICmp(OrdComparison, Label),
    IfACmp(EqComparison, Label),
    IfNull(EqComparison, Label),
    Goto(Label),
    GotoW(Label),
    Jsr(Label),
    JsrW(Label),
    Ret(u16),
    TableSwitch {
        default: Label,
        low: i32,
        targets: Vec<Label>,
    },
    LookupSwitch {
        default: Label,
        targets: Vec<(i32, Label)>,
    },

    /// `return` when `None`, otherwise `ireturn`, `lreturn`, ...
    Return(Option<ValueKind>),
    AThrow,

    GetStatic(ConstantIndex),
    PutStatic(ConstantIndex),
    GetField(ConstantIndex),
    PutField(ConstantIndex),
    Invoke(InvokeType, ConstantIndex),
    InvokeDynamic(ConstantIndex),

    New(ClassConstantIndex),
    NewArray(BaseType),
    ANewArray(ClassConstantIndex),
    MultiANewArray(ClassConstantIndex, u8),
    ArrayLength,
    CheckCast(ClassConstantIndex),
    InstanceOf(ClassConstantIndex),
    MonitorEnter,
    MonitorExit,
}

impl Instruction {
    /// Labels this instruction may transfer control to (not including fall through)
    pub fn jump_targets(&self) -> Vec<Label> {
        match self {
            Instruction::If(_, target)
            | Instruction::IfICmp(_, target)
            | Instruction::IfACmp(_, target)
            | Instruction::IfNull(_, target)
            | Instruction::Goto(target)
            | Instruction::GotoW(target)
            | Instruction::Jsr(target)
            | Instruction::JsrW(target) => vec![*target],
            Instruction::TableSwitch {
                default, targets, ..
            } => {
                let mut labels = vec![*default];
                labels.extend(targets.iter().copied());
                labels
            }
            Instruction::LookupSwitch { default, targets } => {
                let mut labels = vec![*default];
                labels.extend(targets.iter().map(|(_, target)| *target));
                labels
            }
            _ => vec![],
        }
    }

    /// Can control proceed to the next instruction?
    pub fn falls_through(&self) -> bool {
        !matches!(
            self,
            Instruction::Goto(_)
                | Instruction::GotoW(_)
                | Instruction::Ret(_)
                | Instruction::TableSwitch { .. }
                | Instruction::LookupSwitch { .. }
                | Instruction::Return(_)
                | Instruction::AThrow
        )
    }

    /// Is this a `return` or `athrow`?
    pub fn is_exit(&self) -> bool {
        matches!(self, Instruction::Return(_) | Instruction::AThrow)
    }

    /// Number of bytes the instruction takes when placed at `offset`
    ///
    /// Only the switch instructions care about the offset (they are padded so that their operands
    /// are 4-byte aligned).
    pub fn width(&self, offset: usize) -> usize {
        match self {
            Instruction::BiPush(_) | Instruction::NewArray(_) => 2,
            Instruction::SiPush(_) => 3,
            Instruction::Ldc(ConstantIndex(idx)) => {
                if *idx <= u8::MAX as u16 {
                    2
                } else {
                    3
                }
            }
            Instruction::Ldc2(_) => 3,
            Instruction::Load(_, idx) | Instruction::Store(_, idx) => {
                if *idx <= 3 {
                    1
                } else if *idx <= u8::MAX as u16 {
                    2
                } else {
                    4
                }
            }
            Instruction::Ret(idx) => {
                if *idx <= u8::MAX as u16 {
                    2
                } else {
                    4
                }
            }
            Instruction::IInc(idx, amount) => {
                if *idx <= u8::MAX as u16 && i8::try_from(*amount).is_ok() {
                    3
                } else {
                    6
                }
            }
            Instruction::If(..)
            | Instruction::IfICmp(..)
            | Instruction::IfACmp(..)
            | Instruction::IfNull(..)
            | Instruction::Goto(_)
            | Instruction::Jsr(_) => 3,
            Instruction::GotoW(_) | Instruction::JsrW(_) => 5,
            Instruction::TableSwitch { targets, .. } => {
                1 + switch_padding(offset) + 12 + 4 * targets.len()
            }
            Instruction::LookupSwitch { targets, .. } => {
                1 + switch_padding(offset) + 8 + 8 * targets.len()
            }
            Instruction::GetStatic(_)
            | Instruction::PutStatic(_)
            | Instruction::GetField(_)
            | Instruction::PutField(_)
            | Instruction::New(_)
            | Instruction::ANewArray(_)
            | Instruction::CheckCast(_)
            | Instruction::InstanceOf(_) => 3,
            Instruction::Invoke(InvokeType::Interface(_), _) | Instruction::InvokeDynamic(_) => 5,
            Instruction::Invoke(_, _) => 3,
            Instruction::MultiANewArray(_, _) => 4,
            _ => 1,
        }
    }
}

/// Padding bytes after a switch opcode at `offset`, so that the operands start on a multiple of
/// four from the start of the code
pub fn switch_padding(offset: usize) -> usize {
    (4 - (offset + 1) % 4) % 4
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn local_instruction_widths() {
        assert_eq!(Instruction::Load(ValueKind::Int, 2).width(0), 1);
        assert_eq!(Instruction::Store(ValueKind::Long, 4).width(0), 2);
        assert_eq!(Instruction::Load(ValueKind::Reference, 256).width(0), 4);
        assert_eq!(Instruction::IInc(3, 1).width(0), 3);
        assert_eq!(Instruction::IInc(3, 200).width(0), 6);
    }

    #[test]
    fn switch_widths_depend_on_alignment() {
        let switch = Instruction::TableSwitch {
            default: Label::at_offset(0),
            low: 0,
            targets: vec![Label::at_offset(0); 2],
        };
        assert_eq!(switch.width(0), 1 + 3 + 12 + 8);
        assert_eq!(switch.width(3), 1 + 12 + 8);
        assert_eq!(switch.width(5), 1 + 2 + 12 + 8);
    }

    #[test]
    fn negated_comparisons() {
        assert_eq!(!OrdComparison::LT, OrdComparison::GE);
        assert_eq!(!OrdComparison::GE, OrdComparison::LT);
        assert_eq!(!EqComparison::EQ, EqComparison::NE);
    }
}
