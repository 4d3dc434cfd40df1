use crate::jvm::class_file::{Attribute, ConstantPool, Deserialize};
use crate::jvm::{Error, Utf8ConstantIndex};
use byteorder::ReadBytesExt;
use std::io;

/// Names of the attributes holding declaration annotations
pub const ANNOTATION_ATTRIBUTES: [&str; 2] =
    ["RuntimeVisibleAnnotations", "RuntimeInvisibleAnnotations"];

/// Collect the type descriptors (eg. `Lcom/acme/Trace;`) of all the annotations declared through
/// `RuntimeVisibleAnnotations` or `RuntimeInvisibleAnnotations` in a list of attributes
///
/// Only the outermost annotation types matter here, but element values still need to be walked
/// since they have variable length.
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.7.16
pub fn annotation_descriptors(
    attributes: &[Attribute],
    constants: &ConstantPool,
) -> Result<Vec<String>, Error> {
    let mut descriptors = vec![];
    for attribute in attributes {
        let name = attribute.name(constants)?;
        if !ANNOTATION_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }

        let mut reader = attribute.info.as_slice();
        let count = u16::deserialize(&mut reader)?;
        for _ in 0..count {
            let type_index = read_annotation(&mut reader)?;
            descriptors.push(constants.utf8(type_index)?);
        }
    }
    Ok(descriptors)
}

/// Read one `annotation` structure, returning its type index
fn read_annotation<R: ReadBytesExt>(reader: &mut R) -> io::Result<Utf8ConstantIndex> {
    let type_index = Utf8ConstantIndex::deserialize(reader)?;
    let pairs = u16::deserialize(reader)?;
    for _ in 0..pairs {
        let _element_name = u16::deserialize(reader)?;
        skip_element_value(reader)?;
    }
    Ok(type_index)
}

fn skip_element_value<R: ReadBytesExt>(reader: &mut R) -> io::Result<()> {
    match u8::deserialize(reader)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => {
            u16::deserialize(reader)?;
        }
        b'e' => {
            u16::deserialize(reader)?;
            u16::deserialize(reader)?;
        }
        b'@' => {
            read_annotation(reader)?;
        }
        b'[' => {
            let values = u16::deserialize(reader)?;
            for _ in 0..values {
                skip_element_value(reader)?;
            }
        }
        other => {
            let msg = format!("unknown annotation element tag {:?}", other as char);
            return Err(io::Error::new(io::ErrorKind::InvalidData, msg));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::Serialize;

    #[test]
    fn collects_visible_and_invisible_annotations() {
        let mut constants = ConstantPool::new();
        let trace = constants.get_utf8("Lcom/acme/Trace;").unwrap();
        let value = constants.get_utf8("value").unwrap();
        let nested = constants.get_utf8("Lcom/acme/Nested;").unwrap();

        // @Trace(value = { @Nested, 3 })
        let mut visible = vec![];
        1u16.serialize(&mut visible).unwrap();
        trace.serialize(&mut visible).unwrap();
        1u16.serialize(&mut visible).unwrap();
        value.serialize(&mut visible).unwrap();
        b'['.serialize(&mut visible).unwrap();
        2u16.serialize(&mut visible).unwrap();
        b'@'.serialize(&mut visible).unwrap();
        nested.serialize(&mut visible).unwrap();
        0u16.serialize(&mut visible).unwrap();
        b'I'.serialize(&mut visible).unwrap();
        1u16.serialize(&mut visible).unwrap();

        let mut invisible = vec![];
        1u16.serialize(&mut invisible).unwrap();
        nested.serialize(&mut invisible).unwrap();
        0u16.serialize(&mut invisible).unwrap();

        let attributes = vec![
            Attribute {
                name_index: constants.get_utf8("RuntimeVisibleAnnotations").unwrap(),
                info: visible,
            },
            Attribute {
                name_index: constants.get_utf8("Signature").unwrap(),
                info: vec![0, 1],
            },
            Attribute {
                name_index: constants.get_utf8("RuntimeInvisibleAnnotations").unwrap(),
                info: invisible,
            },
        ];

        let descriptors = annotation_descriptors(&attributes, &constants).unwrap();
        assert_eq!(descriptors, vec!["Lcom/acme/Trace;", "Lcom/acme/Nested;"]);
    }
}
