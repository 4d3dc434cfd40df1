use crate::jvm::class_file::{
    Attribute, ClassConstantIndex, ConstantPool, Deserialize, Field, Method, Serialize, Version,
};
use crate::jvm::{ClassAccessFlags, Error};
use byteorder::WriteBytesExt;

/// Representation of the [`class` file format of the JVM][0]
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: Version,
    pub constants: ConstantPool,
    pub access_flags: ClassAccessFlags,
    pub this_class: ClassConstantIndex,
    pub super_class: ClassConstantIndex,
    pub interfaces: Vec<ClassConstantIndex>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// Magic header bytes that go at the front of the serialized class file
    const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

    /// Parse a class file
    pub fn decode(bytes: &[u8]) -> Result<ClassFile, Error> {
        let mut reader = bytes;

        let mut magic = [0u8; 4];
        std::io::Read::read_exact(&mut reader, &mut magic)?;
        if magic != ClassFile::MAGIC {
            return Err(Error::malformed("bad magic number"));
        }

        let version = Version::deserialize(&mut reader)?;
        let constants = ConstantPool::deserialize(&mut reader)?;
        let access_flags = ClassAccessFlags::deserialize(&mut reader)?;
        let this_class = ClassConstantIndex::deserialize(&mut reader)?;
        let super_class = ClassConstantIndex::deserialize(&mut reader)?;
        let interfaces = Vec::deserialize(&mut reader)?;
        let fields = Vec::deserialize(&mut reader)?;
        let methods = Vec::deserialize(&mut reader)?;
        let attributes = Vec::deserialize(&mut reader)?;

        if !reader.is_empty() {
            return Err(Error::Malformed(format!(
                "{} trailing bytes after class file",
                reader.len()
            )));
        }

        Ok(ClassFile {
            version,
            constants,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Serialize the class file into a fresh buffer
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = vec![];
        self.serialize(&mut bytes).map_err(Error::IoError)?;
        Ok(bytes)
    }

    /// Binary name of the class (eg. `com/acme/Foo`)
    pub fn name(&self) -> Result<String, Error> {
        self.constants.class_name(self.this_class)
    }

    /// Binary name of the superclass (only `java/lang/Object` has none)
    pub fn super_name(&self) -> Result<Option<String>, Error> {
        if self.super_class == ClassConstantIndex::NONE {
            Ok(None)
        } else {
            self.constants.class_name(self.super_class).map(Some)
        }
    }

    /// Binary names of the implemented interfaces
    pub fn interface_names(&self) -> Result<Vec<String>, Error> {
        self.interfaces
            .iter()
            .map(|interface| self.constants.class_name(*interface))
            .collect()
    }
}

impl Serialize for ClassFile {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&ClassFile::MAGIC)?;
        self.version.serialize(writer)?;
        self.constants.serialize(writer)?;
        self.access_flags.serialize(writer)?;
        self.this_class.serialize(writer)?;
        self.super_class.serialize(writer)?;
        self.interfaces.serialize(writer)?;
        self.fields.serialize(writer)?;
        self.methods.serialize(writer)?;
        self.attributes.serialize(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{MethodAccessFlags, ConstantIndex};

    fn sample_class() -> ClassFile {
        let mut constants = ConstantPool::new();
        let this_class = constants.get_class("a/Foo").unwrap();
        let super_class = constants.get_class("java/lang/Object").unwrap();
        let interface = constants.get_class("java/lang/Runnable").unwrap();
        let name_index = constants.get_utf8("qux").unwrap();
        let descriptor_index = constants.get_utf8("()V").unwrap();
        ClassFile {
            version: Version::JAVA8,
            constants,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class,
            super_class,
            interfaces: vec![interface],
            fields: vec![],
            methods: vec![Method {
                access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE,
                name_index,
                descriptor_index,
                attributes: vec![],
            }],
            attributes: vec![],
        }
    }

    #[test]
    fn decode_reads_back_names() {
        let bytes = sample_class().encode().unwrap();
        let class = ClassFile::decode(&bytes).unwrap();
        assert_eq!(class.name().unwrap(), "a/Foo");
        assert_eq!(class.super_name().unwrap().as_deref(), Some("java/lang/Object"));
        assert_eq!(class.interface_names().unwrap(), vec!["java/lang/Runnable"]);
        assert_eq!(class.encode().unwrap(), bytes);
    }

    #[test]
    fn bad_magic_is_malformed() {
        let mut bytes = sample_class().encode().unwrap();
        bytes[0] = 0xCB;
        assert!(ClassFile::decode(&bytes).unwrap_err().is_malformed_input());
    }

    #[test]
    fn truncated_class_is_malformed() {
        let bytes = sample_class().encode().unwrap();
        for len in [3, 9, 20, bytes.len() - 1] {
            let err = ClassFile::decode(&bytes[..len]).unwrap_err();
            assert!(err.is_malformed_input(), "length {} gave {:?}", len, err);
        }
    }

    #[test]
    fn dangling_constant_index_is_malformed() {
        let mut class = sample_class();
        class.this_class = ClassConstantIndex(ConstantIndex(400));
        assert!(class.name().unwrap_err().is_malformed_input());
    }
}
