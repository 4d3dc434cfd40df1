//! Builders for the class files and jars used by the integration tests

#![allow(dead_code)]

use bctransform::jvm::class_file::{Attribute, BytecodeArray, ClassFile, Code, Method, Version};
use bctransform::jvm::{ClassAccessFlags, ConstantPool, MethodAccessFlags};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// `iconst_0; ifeq +4; return; return`
pub const TWO_RETURNS: &[u8] = &[0x03, 0x99, 0x00, 0x04, 0xb1, 0xb1];

/// `aconst_null; athrow`
pub const THROWS: &[u8] = &[0x01, 0xbf];

/// `iload_0; ifeq +5; iconst_1; ireturn; iconst_0; ireturn; aconst_null; athrow` (the last two
/// are unreachable)
pub const PICK: &[u8] = &[0x1a, 0x99, 0x00, 0x05, 0x04, 0xac, 0x03, 0xac, 0x01, 0xbf];

pub struct TestMethod {
    pub name: &'static str,
    pub descriptor: &'static str,
    pub flags: MethodAccessFlags,
    pub code: Option<&'static [u8]>,
    pub annotations: Vec<&'static str>,
}

impl TestMethod {
    pub fn new(name: &'static str, descriptor: &'static str, code: &'static [u8]) -> TestMethod {
        TestMethod {
            name,
            descriptor,
            flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
            code: Some(code),
            annotations: vec![],
        }
    }

    pub fn native(name: &'static str, descriptor: &'static str) -> TestMethod {
        TestMethod {
            name,
            descriptor,
            flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::NATIVE,
            code: None,
            annotations: vec![],
        }
    }

    pub fn annotated(mut self, descriptor: &'static str) -> TestMethod {
        self.annotations.push(descriptor);
        self
    }
}

/// Serialize a class extending `java/lang/Object`
pub fn class_bytes(name: &str, version: Version, methods: &[TestMethod]) -> Vec<u8> {
    let mut constants = ConstantPool::new();
    let this_class = constants.get_class(name).unwrap();
    let super_class = constants.get_class("java/lang/Object").unwrap();

    let methods = methods
        .iter()
        .map(|method| {
            let mut attributes = vec![];
            if let Some(code) = method.code {
                let code = Code {
                    max_stack: 2,
                    max_locals: 2,
                    code_array: BytecodeArray(code.to_vec()),
                    exception_table: vec![],
                    attributes: vec![],
                };
                attributes.push(constants.get_attribute(code).unwrap());
            }
            if !method.annotations.is_empty() {
                let mut info = (method.annotations.len() as u16).to_be_bytes().to_vec();
                for annotation in &method.annotations {
                    let type_index = constants.get_utf8(annotation).unwrap();
                    info.extend_from_slice(&type_index.0 .0.to_be_bytes());
                    info.extend_from_slice(&[0x00, 0x00]);
                }
                attributes.push(Attribute {
                    name_index: constants.get_utf8("RuntimeInvisibleAnnotations").unwrap(),
                    info,
                });
            }
            Method {
                access_flags: method.flags,
                name_index: constants.get_utf8(method.name).unwrap(),
                descriptor_index: constants.get_utf8(method.descriptor).unwrap(),
                attributes,
            }
        })
        .collect();

    ClassFile {
        version,
        constants,
        access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        this_class,
        super_class,
        interfaces: vec![],
        fields: vec![],
        methods,
        attributes: vec![],
    }
    .encode()
    .unwrap()
}

/// Write a jar with the given entries (in order)
pub fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, bytes) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes).unwrap();
        }
    }
    writer.finish().unwrap();
}

/// Names and contents of every entry, in order
pub fn read_jar(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|index| {
            let mut entry = archive.by_index(index).unwrap();
            let mut bytes = vec![];
            entry.read_to_end(&mut bytes).unwrap();
            (entry.name().to_string(), bytes)
        })
        .collect()
}

pub fn entry<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> &'a [u8] {
    entries
        .iter()
        .find(|(entry_name, _)| entry_name == name)
        .map(|(_, bytes)| bytes.as_slice())
        .unwrap_or_else(|| panic!("no entry {}", name))
}
