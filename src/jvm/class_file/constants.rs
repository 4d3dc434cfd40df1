use crate::jvm::class_file::{read_bytes, Attribute, AttributeLike, Deserialize, Serialize};
use crate::jvm::Error;
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::collections::HashMap;
use std::io;

/// Class file constants pool
///
/// The pool is append only: decoding a class file yields the exact pool that was in the file and
/// the `get_*` methods only ever add entries at the end. This means every index that appears
/// somewhere in the original class (in instructions, attributes, other constants) stays valid and
/// the pool serializes back to the same bytes when nothing was added.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    /// Index `0` and the slot following each `Long`/`Double` are unusable and stored as `None`
    constants: Vec<Option<Constant>>,

    /// First index of each distinct constant
    lookup: HashMap<Constant, ConstantIndex>,
}

impl Default for ConstantPool {
    fn default() -> Self {
        ConstantPool::new()
    }
}

impl ConstantPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantPool {
        ConstantPool {
            constants: vec![None],
            lookup: HashMap::new(),
        }
    }

    /// Value of `constant_pool_count` (one more than the largest index)
    pub fn count(&self) -> usize {
        self.constants.len()
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let offset = self.constants.len();
        if offset + constant.width() > u16::MAX as usize {
            return Err(Error::ConstantPoolOverflow {
                offset: offset as u16,
            });
        }

        let index = ConstantIndex(offset as u16);
        let width = constant.width();
        self.lookup.entry(constant.clone()).or_insert(index);
        self.constants.push(Some(constant));
        if width == 2 {
            self.constants.push(None);
        }
        Ok(index)
    }

    /// Get or insert a constant
    pub fn get_constant(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        match self.lookup.get(&constant) {
            Some(idx) => Ok(*idx),
            None => self.push_constant(constant),
        }
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8(&mut self, utf8: &str) -> Result<Utf8ConstantIndex, Error> {
        let bytes = encode_modified_utf8(utf8);
        if bytes.len() > u16::MAX as usize {
            return Err(Error::Utf8ConstantTooLong(bytes.len()));
        }
        self.get_constant(Constant::Utf8(bytes))
            .map(Utf8ConstantIndex)
    }

    /// Get or insert a class constant (`name` is either a binary name or an array descriptor)
    pub fn get_class(&mut self, name: &str) -> Result<ClassConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        self.get_constant(Constant::Class(name))
            .map(ClassConstantIndex)
    }

    /// Get or insert a string constant from the constant pool
    pub fn get_string(&mut self, string: &str) -> Result<ConstantIndex, Error> {
        let utf8 = self.get_utf8(string)?;
        self.get_constant(Constant::String(utf8))
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: &str,
        descriptor: &str,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        let name = self.get_utf8(name)?;
        let descriptor = self.get_utf8(descriptor)?;
        self.get_constant(Constant::NameAndType { name, descriptor })
            .map(NameAndTypeConstantIndex)
    }

    /// Get or insert a field reference
    pub fn get_field_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Result<ConstantIndex, Error> {
        let class = self.get_class(class)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        self.get_constant(Constant::FieldRef(class, name_and_type))
    }

    /// Get or insert a method reference (`is_interface` picks `InterfaceMethodref`)
    pub fn get_method_ref(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        is_interface: bool,
    ) -> Result<ConstantIndex, Error> {
        let class = self.get_class(class)?;
        let name_and_type = self.get_name_and_type(name, descriptor)?;
        self.get_constant(Constant::MethodRef {
            class,
            name_and_type,
            is_interface,
        })
    }

    /// Add an attribute to the constant pool
    pub fn get_attribute<A: AttributeLike>(&mut self, attribute: A) -> Result<Attribute, Error> {
        let name_index = self.get_utf8(A::NAME)?;
        let mut info = vec![];

        attribute.serialize(&mut info).map_err(Error::IoError)?;

        Ok(Attribute { name_index, info })
    }

    /// Look up a constant
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        match self.constants.get(index.0 as usize) {
            Some(Some(constant)) => Ok(constant),
            _ => Err(Error::Malformed(format!(
                "invalid constant pool index {}",
                index.0
            ))),
        }
    }

    /// Decode a utf8 constant
    pub fn utf8(&self, index: Utf8ConstantIndex) -> Result<String, Error> {
        match self.get(index.0)? {
            Constant::Utf8(bytes) => Ok(decode_modified_utf8(bytes)),
            other => Err(unexpected_constant(index.0, "Utf8", other)),
        }
    }

    /// Name of a class constant (binary name or array descriptor)
    pub fn class_name(&self, index: ClassConstantIndex) -> Result<String, Error> {
        match self.get(index.0)? {
            Constant::Class(name) => self.utf8(*name),
            other => Err(unexpected_constant(index.0, "Class", other)),
        }
    }

    /// Name and descriptor of a name & type constant
    pub fn name_and_type(
        &self,
        index: NameAndTypeConstantIndex,
    ) -> Result<(String, String), Error> {
        match self.get(index.0)? {
            Constant::NameAndType { name, descriptor } => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            other => Err(unexpected_constant(index.0, "NameAndType", other)),
        }
    }

    /// Owner, name, and descriptor of a field or method reference
    pub fn member_ref(&self, index: ConstantIndex) -> Result<MemberRef, Error> {
        let (class, name_and_type) = match self.get(index)? {
            Constant::FieldRef(class, name_and_type) => (*class, *name_and_type),
            Constant::MethodRef {
                class,
                name_and_type,
                ..
            } => (*class, *name_and_type),
            other => return Err(unexpected_constant(index, "Fieldref or Methodref", other)),
        };
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok(MemberRef {
            class: self.class_name(class)?,
            name,
            descriptor,
        })
    }

    /// Name and descriptor of an `invokedynamic` call site or dynamic constant
    pub fn dynamic_name_and_type(&self, index: ConstantIndex) -> Result<(String, String), Error> {
        match self.get(index)? {
            Constant::InvokeDynamic {
                method_descriptor, ..
            } => self.name_and_type(*method_descriptor),
            Constant::Dynamic { name_and_type, .. } => self.name_and_type(*name_and_type),
            other => Err(unexpected_constant(index, "InvokeDynamic or Dynamic", other)),
        }
    }
}

fn unexpected_constant(index: ConstantIndex, expected: &str, found: &Constant) -> Error {
    Error::Malformed(format!(
        "constant #{} should be {} but is {:?}",
        index.0, expected, found
    ))
}

impl Serialize for ConstantPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        (self.constants.len() as u16).serialize(writer)?;
        for constant in self.constants.iter().flatten() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl Deserialize for ConstantPool {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        let count = u16::deserialize(reader)? as usize;
        let mut pool = ConstantPool::new();
        while pool.constants.len() < count {
            let constant = Constant::deserialize(reader)?;
            if pool.constants.len() + constant.width() > count {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "8-byte constant overruns the constant pool",
                ));
            }
            pool.push_constant(constant)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        }
        Ok(pool)
    }
}

/// Fully resolved field or method reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub class: String,
    pub name: String,
    pub descriptor: String,
}

/// Constants as in the constant pool
///
/// `Utf8` keeps the raw modified UTF-8 bytes and `Float`/`Double` keep raw bits, so that a
/// decoded pool always writes back out unchanged (Java strings may contain unpaired surrogates,
/// which a Rust `String` cannot hold, and NaN payloads must survive).
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`, as raw IEEE 754 bits
    Float(u32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`, as raw IEEE 754 bits
    Double(u64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant UTF-8 encoded raw string value
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the
    /// null character `\u{0000}` and the encoding of supplementary characters
    /// is different).
    Utf8(Vec<u8>),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// Depending on the method kind, this points to different things:
        ///
        ///   - `FieldRef` for `GetField`, `GetStatic`, `PutField`, `PutStatic`
        ///   - `MethodRef` for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },

    Module(Utf8ConstantIndex),
    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`.
    /// Quoting the spec:
    ///
    /// > All 8-byte constants take up two entries in the constant_pool table of the class file.
    /// > If a CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the
    /// > constant_pool table at index n, then the next usable item in the pool is located at index
    /// > n+2. The constant_pool index n+1 must be valid but is considered unusable.
    pub fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Constant::Utf8(bytes) => {
                let len = u16::try_from(bytes.len())
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "utf8 too long"))?;
                1u8.serialize(writer)?;
                len.serialize(writer)?;
                writer.write_all(bytes)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(bits) => {
                4u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(bits) => {
                6u8.serialize(writer)?;
                bits.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(bytes) => {
                8u8.serialize(writer)?;
                bytes.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if !is_interface { 10u8 } else { 11u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            } => {
                17u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                method_descriptor.serialize(writer)?;
            }
            Constant::Module(name) => {
                19u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::Package(name) => {
                20u8.serialize(writer)?;
                name.serialize(writer)?;
            }
        };
        Ok(())
    }
}

impl Deserialize for Constant {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        let tag = u8::deserialize(reader)?;
        let constant = match tag {
            1 => {
                let len = u16::deserialize(reader)?;
                Constant::Utf8(read_bytes(reader, len as usize)?)
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(u32::deserialize(reader)?),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(u64::deserialize(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
            8 => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
            9 => Constant::FieldRef(
                ClassConstantIndex::deserialize(reader)?,
                NameAndTypeConstantIndex::deserialize(reader)?,
            ),
            10 | 11 => Constant::MethodRef {
                class: ClassConstantIndex::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: HandleKind::deserialize(reader)?,
                member: ConstantIndex::deserialize(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::deserialize(reader)?,
                method_descriptor: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            19 => Constant::Module(Utf8ConstantIndex::deserialize(reader)?),
            20 => Constant::Package(Utf8ConstantIndex::deserialize(reader)?),
            other => {
                let msg = format!("unknown constant pool tag {}", other);
                return Err(io::Error::new(io::ErrorKind::InvalidData, msg));
            }
        };
        Ok(constant)
    }
}

/// Modified UTF-8 format used in class files.
///
/// See [this `DataInput` section for details][0]. Quoting from that section:
///
/// > The differences between this format and the standard UTF-8 format are the following:
/// >
/// >  * The null byte `\u0000` is encoded in 2-byte format rather than 1-byte, so that the encoded
/// >    strings never have embedded nulls.
/// >  * Only the 1-byte, 2-byte, and 3-byte formats are used.
/// >  * Supplementary characters are represented in the form of surrogate pairs.
///
/// [0]: https://docs.oracle.com/en/java/javase/17/docs/api/java.base/java/io/DataInput.html#modified-utf-8
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer: Vec<u8> = vec![];
    for c in string.chars() {
        // Handle the exception for how `\u{0000}` is represented
        let len: usize = if c == '\u{0000}' { 2 } else { c.len_utf8() };
        let code: u32 = c as u32;

        match len {
            1 => buffer.push(code as u8),
            2 => {
                buffer.push((code >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
            3 => {
                buffer.push((code >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((code >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }

            // Supplementary characters: main divergence from unicode
            _ => {
                buffer.push(0b1110_1101);
                buffer.push(((code >> 16 & 0x0F) as u8).wrapping_sub(1) & 0x0F | 0b1010_0000);
                buffer.push((code >> 10 & 0x3F) as u8 | 0b1000_0000);

                buffer.push(0b1110_1101);
                buffer.push(((code >> 6 & 0x1F) as u8) | 0b1011_0000);
                buffer.push((code & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

/// Inverse of [`encode_modified_utf8`]
///
/// Decoding goes through UTF-16 code units, which is what the encoding really describes. Invalid
/// byte sequences and unpaired surrogates become `U+FFFD`.
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = bytes[i];
        if b0 & 0x80 == 0 {
            units.push(b0 as u16);
            i += 1;
        } else if b0 & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            let b1 = bytes[i + 1];
            units.push(((b0 & 0x1F) as u16) << 6 | (b1 & 0x3F) as u16);
            i += 2;
        } else if b0 & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            let b1 = bytes[i + 1];
            let b2 = bytes[i + 2];
            units.push(((b0 & 0x0F) as u16) << 12 | ((b1 & 0x3F) as u16) << 6 | (b2 & 0x3F) as u16);
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod modified_utf8_tests {
    use super::*;

    #[test]
    fn containing_null_byte() {
        assert_eq!(encode_modified_utf8("a\x00a"), vec![97, 192, 128, 97]);
        assert_eq!(decode_modified_utf8(&[97, 192, 128, 97]), "a\x00a");
    }

    #[test]
    fn simple_ascii() {
        assert_eq!(encode_modified_utf8("foo"), vec![102, 111, 111]);
        assert_eq!(decode_modified_utf8(b"java/lang/Object"), "java/lang/Object");
    }

    #[test]
    fn two_and_three_byte_encodings() {
        assert_eq!(
            encode_modified_utf8("ĄǍǞ"),
            vec![196, 132, 199, 141, 199, 158]
        );
        assert_eq!(
            decode_modified_utf8(&[224, 164, 132, 224, 164, 133]),
            "ऄअ"
        );
    }

    #[test]
    fn supplementary_characters() {
        let encoded = vec![237, 160, 128, 237, 176, 128];
        assert_eq!(encode_modified_utf8("\u{10000}"), encoded);
        assert_eq!(decode_modified_utf8(&encoded), "\u{10000}");
    }

    #[test]
    fn unpaired_surrogate_is_replaced() {
        // A lone high surrogate (U+D800) is legal in a class file
        assert_eq!(decode_modified_utf8(&[237, 160, 128, 97]), "\u{FFFD}a");
    }
}

#[cfg(test)]
mod pool_tests {
    use super::*;

    #[test]
    fn existing_constants_are_reused() {
        let mut pool = ConstantPool::new();
        let first = pool.get_method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V", false);
        let count = pool.count();
        let second = pool.get_method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V", false);
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(pool.count(), count);
    }

    #[test]
    fn oversized_utf8_is_rejected() {
        let mut pool = ConstantPool::new();
        let count = pool.count();
        let longest = "X".repeat(u16::MAX as usize);
        assert!(pool.get_utf8(&longest).is_ok());

        let too_long = "X".repeat(u16::MAX as usize + 1);
        match pool.get_utf8(&too_long) {
            Err(Error::Utf8ConstantTooLong(len)) => assert_eq!(len, 65536),
            other => panic!("expected an oversized constant error, got {:?}", other),
        }
        // Two-byte encodings count, not characters
        let nulls = "\u{0}".repeat(40_000);
        assert!(matches!(pool.get_utf8(&nulls), Err(Error::Utf8ConstantTooLong(80_000))));
        assert_eq!(pool.count(), count + 1);
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut pool = ConstantPool::new();
        let long = pool.get_constant(Constant::Long(42)).unwrap();
        let utf8 = pool.get_utf8("x").unwrap();
        assert_eq!(long, ConstantIndex(1));
        assert_eq!(utf8, Utf8ConstantIndex(ConstantIndex(3)));
        assert!(pool.get(ConstantIndex(2)).is_err());
    }

    #[test]
    fn decoded_pool_serializes_back_unchanged() {
        let mut pool = ConstantPool::new();
        pool.get_field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")
            .unwrap();
        pool.get_constant(Constant::Double(f64::NAN.to_bits() | 1)).unwrap();
        pool.get_string("hello").unwrap();

        let mut bytes = vec![];
        pool.serialize(&mut bytes).unwrap();
        let decoded = ConstantPool::deserialize(&mut bytes.as_slice()).unwrap();
        let mut again = vec![];
        decoded.serialize(&mut again).unwrap();
        assert_eq!(bytes, again);
        assert_eq!(decoded.count(), pool.count());
    }

    #[test]
    fn member_refs_resolve() {
        let mut pool = ConstantPool::new();
        let idx = pool
            .get_method_ref("org/slf4j/Logger", "info", "(Ljava/lang/String;)V", true)
            .unwrap();
        let member = pool.member_ref(idx).unwrap();
        assert_eq!(member.class, "org/slf4j/Logger");
        assert_eq!(member.name, "info");
        assert_eq!(member.descriptor, "(Ljava/lang/String;)V");
    }
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct Utf8ConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct NameAndTypeConstantIndex(pub ConstantIndex);

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct ClassConstantIndex(pub ConstantIndex);

impl ClassConstantIndex {
    /// `catch_type` and `super_class` use index zero for "any" / "none"
    pub const NONE: ClassConstantIndex = ClassConstantIndex(ConstantIndex(0));
}

impl From<Utf8ConstantIndex> for ConstantIndex {
    fn from(index: Utf8ConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<NameAndTypeConstantIndex> for ConstantIndex {
    fn from(index: NameAndTypeConstantIndex) -> ConstantIndex {
        index.0
    }
}
impl From<ClassConstantIndex> for ConstantIndex {
    fn from(index: ClassConstantIndex) -> ConstantIndex {
        index.0
    }
}

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for Utf8ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for NameAndTypeConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}
impl Serialize for ClassConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        u16::deserialize(reader).map(ConstantIndex)
    }
}
impl Deserialize for Utf8ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        ConstantIndex::deserialize(reader).map(Utf8ConstantIndex)
    }
}
impl Deserialize for NameAndTypeConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        ConstantIndex::deserialize(reader).map(NameAndTypeConstantIndex)
    }
}
impl Deserialize for ClassConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        ConstantIndex::deserialize(reader).map(ClassConstantIndex)
    }
}

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> io::Result<()> {
        let byte: u8 = match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        };
        byte.serialize(writer)
    }
}

impl Deserialize for HandleKind {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> io::Result<Self> {
        let kind = match u8::deserialize(reader)? {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            other => {
                let msg = format!("unknown method handle kind {}", other);
                return Err(io::Error::new(io::ErrorKind::InvalidData, msg));
            }
        };
        Ok(kind)
    }
}
