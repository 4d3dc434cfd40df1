use crate::jvm::class_file::{Deserialize, Serialize};
use crate::jvm::{BaseType, ClassConstantIndex, FieldType};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io;

/// These types are from [this hierarchy][0]
///
/// `Cls` is how object types are named (class constants in the class file, binary names while
/// analyzing) and `U` identifies the `new` instruction that created an uninitialized value.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se7/html/jvms-4.html#jvms-4.10.1.2
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
pub enum VerificationType<Cls, U> {
    /// Unusable local variable (never on the stack)
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,

    /// In the constructor, the `this` parameter starts with this type then turns into an object
    /// type after `<init>` is called
    UninitializedThis,

    /// Object type
    Object(Cls),

    /// State of an object after `new` has been called by `<init>` has not been called
    ///
    ///   - while analyzing a method body, `U` is the label placed right before the `new`
    ///   - when serializing into a classfile, we use `u16` for `U`, corresponding to the offset of
    ///     the `new` instruction from the start of the method body
    Uninitialized(U),
}

impl<Cls, U> VerificationType<Cls, U> {
    /// Is this type is a reference type?
    pub fn is_reference(&self) -> bool {
        match self {
            VerificationType::Top
            | VerificationType::Integer
            | VerificationType::Float
            | VerificationType::Double
            | VerificationType::Long => false,

            VerificationType::Null
            | VerificationType::UninitializedThis
            | VerificationType::Object(_)
            | VerificationType::Uninitialized(_) => true,
        }
    }

    /// Number of local variable or operand stack slots taken by a value of this type
    pub fn width(&self) -> usize {
        match self {
            VerificationType::Double | VerificationType::Long => 2,
            _ => 1,
        }
    }

    pub fn map<C2, U2>(
        &self,
        map_class: impl Fn(&Cls) -> C2,
        map_uninitialized: impl Fn(&U) -> U2,
    ) -> VerificationType<C2, U2> {
        match self {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(cls) => VerificationType::Object(map_class(cls)),
            VerificationType::Uninitialized(uninit) => {
                VerificationType::Uninitialized(map_uninitialized(uninit))
            }
        }
    }

    /// Same as [`Self::map`], but the mappings may fail
    pub fn try_map<C2, U2, E>(
        &self,
        map_class: impl FnOnce(&Cls) -> Result<C2, E>,
        map_uninitialized: impl FnOnce(&U) -> Result<U2, E>,
    ) -> Result<VerificationType<C2, U2>, E> {
        Ok(match self {
            VerificationType::Top => VerificationType::Top,
            VerificationType::Integer => VerificationType::Integer,
            VerificationType::Float => VerificationType::Float,
            VerificationType::Long => VerificationType::Long,
            VerificationType::Double => VerificationType::Double,
            VerificationType::Null => VerificationType::Null,
            VerificationType::UninitializedThis => VerificationType::UninitializedThis,
            VerificationType::Object(cls) => VerificationType::Object(map_class(cls)?),
            VerificationType::Uninitialized(uninit) => {
                VerificationType::Uninitialized(map_uninitialized(uninit)?)
            }
        })
    }
}

impl<U> VerificationType<String, U> {
    /// Verification type of a value having some field type
    pub fn from_field_type(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::Base(BaseType::Int)
            | FieldType::Base(BaseType::Char)
            | FieldType::Base(BaseType::Short)
            | FieldType::Base(BaseType::Byte)
            | FieldType::Base(BaseType::Boolean) => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(BaseType::Double) => VerificationType::Double,
            FieldType::Object(_) | FieldType::Array(_) => {
                VerificationType::Object(field_type.class_name().unwrap_or_default())
            }
        }
    }

    pub fn object<S: Into<String>>(class_name: S) -> Self {
        VerificationType::Object(class_name.into())
    }
}

impl Serialize for VerificationType<ClassConstantIndex, u16> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            VerificationType::Top => 0u8.serialize(writer)?,
            VerificationType::Integer => 1u8.serialize(writer)?,
            VerificationType::Float => 2u8.serialize(writer)?,
            VerificationType::Double => 3u8.serialize(writer)?,
            VerificationType::Long => 4u8.serialize(writer)?,
            VerificationType::Null => 5u8.serialize(writer)?,
            VerificationType::UninitializedThis => 6u8.serialize(writer)?,
            VerificationType::Object(cls) => {
                7u8.serialize(writer)?;
                cls.serialize(writer)?;
            }
            VerificationType::Uninitialized(off) => {
                8u8.serialize(writer)?;
                off.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for VerificationType<ClassConstantIndex, u16> {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        let verification_type = match u8::deserialize(reader)? {
            0 => VerificationType::Top,
            1 => VerificationType::Integer,
            2 => VerificationType::Float,
            3 => VerificationType::Double,
            4 => VerificationType::Long,
            5 => VerificationType::Null,
            6 => VerificationType::UninitializedThis,
            7 => VerificationType::Object(ClassConstantIndex::deserialize(reader)?),
            8 => VerificationType::Uninitialized(u16::deserialize(reader)?),
            other => {
                let msg = format!("invalid verification type tag {}", other);
                return Err(io::Error::new(io::ErrorKind::InvalidData, msg));
            }
        };
        Ok(verification_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::ParseDescriptor;

    type VType = VerificationType<String, u16>;

    #[test]
    fn from_field_types() {
        let cases = [
            ("Z", VType::Integer),
            ("C", VType::Integer),
            ("J", VType::Long),
            ("D", VType::Double),
            ("Ljava/lang/String;", VType::object("java/lang/String")),
            ("[[I", VType::object("[[I")),
        ];
        for (descriptor, expected) in cases {
            let field_type = FieldType::parse(descriptor).unwrap();
            assert_eq!(VType::from_field_type(&field_type), expected);
        }
    }

    #[test]
    fn widths() {
        assert_eq!(VType::Long.width(), 2);
        assert_eq!(VType::Top.width(), 1);
        assert!(VType::Null.is_reference());
        assert!(!VType::Top.is_reference());
    }
}
