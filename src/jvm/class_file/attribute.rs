use crate::jvm::class_file::{read_bytes, ConstantPool, Deserialize, Serialize};
use crate::jvm::verifier::VerificationType;
use crate::jvm::{ClassConstantIndex, Error, Utf8ConstantIndex};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io;

/// Attributes (used in classes, fields, methods, and even on some attributes)
///
/// Attributes are kept as opaque bytes until something needs to look inside them. Decoding and
/// re-encoding a class therefore leaves every attribute we don't touch exactly as it was.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name_index: Utf8ConstantIndex,
    pub info: Vec<u8>,
}

impl Attribute {
    /// Name of the attribute, as found in the constant pool
    pub fn name(&self, constants: &ConstantPool) -> Result<String, Error> {
        constants.utf8(self.name_index)
    }

    /// Decode the attribute payload as some concrete attribute type
    pub fn decode<A: AttributeLike + Deserialize>(&self) -> Result<A, Error> {
        let mut reader = self.info.as_slice();
        let attribute = A::deserialize(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::Malformed(format!(
                "{} attribute has {} trailing bytes",
                A::NAME,
                reader.len()
            )));
        }
        Ok(attribute)
    }
}

impl Serialize for Attribute {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.name_index.serialize(writer)?;

        // Attribute info length is 4 bytes
        (self.info.len() as u32).serialize(writer)?;
        writer.write_all(&self.info)?;

        Ok(())
    }
}

impl Deserialize for Attribute {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        let name_index = Utf8ConstantIndex::deserialize(reader)?;
        let len = u32::deserialize(reader)?;
        let info = read_bytes(reader, len as usize)?;
        Ok(Attribute { name_index, info })
    }
}

/// Attributes are all stored in the same way (see `Attribute`), but internally
/// they represent very different things. This trait is implemented by things
/// which can be turned into attributes.
pub trait AttributeLike: Serialize {
    /// Name of the attribute
    const NAME: &'static str;
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.3
#[derive(Debug, Clone)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code_array: BytecodeArray,
    pub exception_table: Vec<ExceptionHandler>,
    pub attributes: Vec<Attribute>,
}

impl Serialize for Code {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.max_stack.serialize(writer)?;
        self.max_locals.serialize(writer)?;
        self.code_array.serialize(writer)?;
        self.exception_table.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Code {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Ok(Code {
            max_stack: u16::deserialize(reader)?,
            max_locals: u16::deserialize(reader)?,
            code_array: BytecodeArray::deserialize(reader)?,
            exception_table: Vec::deserialize(reader)?,
            attributes: Vec::deserialize(reader)?,
        })
    }
}

impl AttributeLike for Code {
    const NAME: &'static str = "Code";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Start of exception handler range (inclusive)
    pub start_pc: u16,

    /// End of exception handler range (exclusive)
    pub end_pc: u16,

    /// Start of the exception handler
    pub handler_pc: u16,

    /// Caught class, or [`ClassConstantIndex::NONE`] for any throwable
    pub catch_type: ClassConstantIndex,
}

impl Serialize for ExceptionHandler {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.end_pc.serialize(writer)?;
        self.handler_pc.serialize(writer)?;
        self.catch_type.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for ExceptionHandler {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Ok(ExceptionHandler {
            start_pc: u16::deserialize(reader)?,
            end_pc: u16::deserialize(reader)?,
            handler_pc: u16::deserialize(reader)?,
            catch_type: ClassConstantIndex::deserialize(reader)?,
        })
    }
}

/// Encoded bytecode instructions
#[derive(Debug, Clone)]
pub struct BytecodeArray(pub Vec<u8>);

impl Serialize for BytecodeArray {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        let len = self.0.len() as u32;
        len.serialize(writer)?;
        writer.write_all(&self.0)?;
        Ok(())
    }
}

impl Deserialize for BytecodeArray {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        let len = u32::deserialize(reader)?;
        read_bytes(reader, len as usize).map(BytecodeArray)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.7.4
#[derive(Debug, Clone)]
pub struct StackMapTable(pub Vec<StackMapFrame>);

impl AttributeLike for StackMapTable {
    const NAME: &'static str = "StackMapTable";
}

impl Serialize for StackMapTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for StackMapTable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Vec::deserialize(reader).map(StackMapTable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
    /// Frame has the same locals as the previous frame and number of stack items is zero
    /// Tags: 0-63 or 251
    SameLocalsNoStack { offset_delta: u16 },

    /// Frame has the same locals as the previous frame and number of stack items is one
    /// Tags: 64-127 or 247
    SameLocalsOneStack {
        offset_delta: u16,
        stack: VerificationType<ClassConstantIndex, u16>,
    },

    /// Frame is like the previous frame, but without the last `chopped_k` locals
    ///
    /// Note: `chopped_k` must be in the range 1 to 3 inclusive
    /// Tags: 248-250
    ChopLocalsNoStack { offset_delta: u16, chopped_k: u8 },

    /// Frame is like the previous frame, but with extra locals
    /// Tags: 252-254
    AppendLocalsNoStack {
        offset_delta: u16,
        locals: Vec<VerificationType<ClassConstantIndex, u16>>,
    },

    /// Frame has exactly the locals and stack specified
    /// Tag: 255
    Full {
        offset_delta: u16,
        locals: Vec<VerificationType<ClassConstantIndex, u16>>,
        stack: Vec<VerificationType<ClassConstantIndex, u16>>,
    },
}

impl StackMapFrame {
    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::SameLocalsNoStack { offset_delta }
            | StackMapFrame::SameLocalsOneStack { offset_delta, .. }
            | StackMapFrame::ChopLocalsNoStack { offset_delta, .. }
            | StackMapFrame::AppendLocalsNoStack { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }
}

impl Serialize for StackMapFrame {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            // `same_frame` and `same_frame_extended`
            StackMapFrame::SameLocalsNoStack { offset_delta } => {
                if *offset_delta <= 63 {
                    (*offset_delta as u8).serialize(writer)?;
                } else {
                    251u8.serialize(writer)?;
                    offset_delta.serialize(writer)?;
                }
            }

            // `same_locals_1_stack_item_frame` and `same_locals_1_stack_item_frame_extended`
            StackMapFrame::SameLocalsOneStack {
                offset_delta,
                stack,
            } => {
                if *offset_delta <= 63 {
                    (*offset_delta as u8 + 64).serialize(writer)?;
                } else {
                    247u8.serialize(writer)?;
                    offset_delta.serialize(writer)?;
                }
                stack.serialize(writer)?;
            }

            // `chop_frame`
            StackMapFrame::ChopLocalsNoStack {
                offset_delta,
                chopped_k,
            } => {
                if !(1..=3).contains(chopped_k) {
                    let msg = "ChopLocalsNoStack chops 1-3 locals";
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, msg));
                }
                (251 - chopped_k).serialize(writer)?;
                offset_delta.serialize(writer)?;
            }

            // `append_frame`
            StackMapFrame::AppendLocalsNoStack {
                offset_delta,
                locals,
            } => {
                let added_k = locals.len();
                if !(1..=3).contains(&added_k) {
                    let msg = "AppendLocalsNoStack adds 1-3 locals";
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, msg));
                }
                (251 + added_k as u8).serialize(writer)?;
                offset_delta.serialize(writer)?;
                for local in locals {
                    local.serialize(writer)?;
                }
            }

            // `full_frame`
            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            } => {
                255u8.serialize(writer)?;
                offset_delta.serialize(writer)?;
                locals.serialize(writer)?;
                stack.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for StackMapFrame {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        let tag = u8::deserialize(reader)?;
        let frame = match tag {
            0..=63 => StackMapFrame::SameLocalsNoStack {
                offset_delta: tag as u16,
            },
            64..=127 => StackMapFrame::SameLocalsOneStack {
                offset_delta: (tag - 64) as u16,
                stack: VerificationType::deserialize(reader)?,
            },
            247 => StackMapFrame::SameLocalsOneStack {
                offset_delta: u16::deserialize(reader)?,
                stack: VerificationType::deserialize(reader)?,
            },
            248..=250 => StackMapFrame::ChopLocalsNoStack {
                offset_delta: u16::deserialize(reader)?,
                chopped_k: 251 - tag,
            },
            251 => StackMapFrame::SameLocalsNoStack {
                offset_delta: u16::deserialize(reader)?,
            },
            252..=254 => {
                let offset_delta = u16::deserialize(reader)?;
                let mut locals = vec![];
                for _ in 0..(tag - 251) {
                    locals.push(VerificationType::deserialize(reader)?);
                }
                StackMapFrame::AppendLocalsNoStack {
                    offset_delta,
                    locals,
                }
            }
            255 => StackMapFrame::Full {
                offset_delta: u16::deserialize(reader)?,
                locals: Vec::deserialize(reader)?,
                stack: Vec::deserialize(reader)?,
            },
            other => {
                let msg = format!("reserved stack map frame tag {}", other);
                return Err(io::Error::new(io::ErrorKind::InvalidData, msg));
            }
        };
        Ok(frame)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.12
#[derive(Debug, Clone)]
pub struct LineNumberTable(pub Vec<LineNumber>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

impl AttributeLike for LineNumberTable {
    const NAME: &'static str = "LineNumberTable";
}

impl Serialize for LineNumberTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for LineNumberTable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Vec::deserialize(reader).map(LineNumberTable)
    }
}

impl Serialize for LineNumber {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.line_number.serialize(writer)
    }
}

impl Deserialize for LineNumber {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Ok(LineNumber {
            start_pc: u16::deserialize(reader)?,
            line_number: u16::deserialize(reader)?,
        })
    }
}

/// Entry shared by `LocalVariableTable` and `LocalVariableTypeTable` (the last field is either a
/// descriptor or a generic signature)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: Utf8ConstantIndex,
    pub descriptor_index: Utf8ConstantIndex,
    pub index: u16,
}

impl Serialize for LocalVariable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.start_pc.serialize(writer)?;
        self.length.serialize(writer)?;
        self.name_index.serialize(writer)?;
        self.descriptor_index.serialize(writer)?;
        self.index.serialize(writer)
    }
}

impl Deserialize for LocalVariable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Ok(LocalVariable {
            start_pc: u16::deserialize(reader)?,
            length: u16::deserialize(reader)?,
            name_index: Utf8ConstantIndex::deserialize(reader)?,
            descriptor_index: Utf8ConstantIndex::deserialize(reader)?,
            index: u16::deserialize(reader)?,
        })
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.13
#[derive(Debug, Clone)]
pub struct LocalVariableTable(pub Vec<LocalVariable>);

impl AttributeLike for LocalVariableTable {
    const NAME: &'static str = "LocalVariableTable";
}

impl Serialize for LocalVariableTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for LocalVariableTable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Vec::deserialize(reader).map(LocalVariableTable)
    }
}

/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.14
#[derive(Debug, Clone)]
pub struct LocalVariableTypeTable(pub Vec<LocalVariable>);

impl AttributeLike for LocalVariableTypeTable {
    const NAME: &'static str = "LocalVariableTypeTable";
}

impl Serialize for LocalVariableTypeTable {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for LocalVariableTypeTable {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        Vec::deserialize(reader).map(LocalVariableTypeTable)
    }
}
