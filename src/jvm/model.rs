use crate::jvm::class_file::{annotation_descriptors, ClassFile, Code, ConstantPool, Version};
use crate::jvm::code::MethodCode;
use crate::jvm::verifier::{ClassHierarchy, MethodContext};
use crate::jvm::{ClassAccessFlags, Error, MethodAccessFlags, MethodDescriptor, ParseDescriptor};

/// Editable view of one class file
///
/// Names and annotations are decoded up front, while method bodies are only decoded into
/// instructions on demand (see [`ClassModel::decode_code`]). Anything that isn't explicitly
/// replaced is written back exactly as it was read.
#[derive(Debug, Clone)]
pub struct ClassModel {
    class_file: ClassFile,

    /// Binary name (eg. `com/acme/Foo`)
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,

    /// Descriptors of the annotations declared on the class
    pub annotations: Vec<String>,
    pub methods: Vec<MethodModel>,
}

#[derive(Debug, Clone)]
pub struct MethodModel {
    pub name: String,
    pub descriptor: String,
    pub parsed_descriptor: MethodDescriptor,
    pub access_flags: MethodAccessFlags,

    /// Descriptors of the annotations declared on the method (visible or not)
    pub annotations: Vec<String>,

    /// Body of the method, absent for `abstract` and `native` methods
    code: Option<Code>,

    /// Position of the `Code` attribute among the method attributes
    code_index: Option<usize>,
}

impl ClassModel {
    pub fn decode(bytes: &[u8]) -> Result<ClassModel, Error> {
        let class_file = ClassFile::decode(bytes)?;
        let constants = &class_file.constants;

        let mut methods = Vec::with_capacity(class_file.methods.len());
        for method in &class_file.methods {
            let name = constants.utf8(method.name_index)?;
            let descriptor = constants.utf8(method.descriptor_index)?;
            let parsed_descriptor = MethodDescriptor::parse(&descriptor).map_err(|_| {
                Error::Malformed(format!("bad descriptor {:?} for method {}", descriptor, name))
            })?;
            let code_index = method.code_attribute_index(constants)?;
            let code = match code_index {
                Some(idx) => Some(method.attributes[idx].decode::<Code>()?),
                None => None,
            };
            methods.push(MethodModel {
                name,
                descriptor,
                parsed_descriptor,
                access_flags: method.access_flags,
                annotations: annotation_descriptors(&method.attributes, constants)?,
                code,
                code_index,
            });
        }

        Ok(ClassModel {
            name: class_file.name()?,
            super_name: class_file.super_name()?,
            interfaces: class_file.interface_names()?,
            annotations: annotation_descriptors(&class_file.attributes, constants)?,
            methods,
            class_file,
        })
    }

    /// Serialize the class, including any replaced method bodies
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        self.class_file.encode()
    }

    /// Class name with dots instead of slashes (eg. `com.acme.Foo`)
    pub fn dotted_name(&self) -> String {
        self.name.replace('/', ".")
    }

    /// Constant pool shared by every method of the class
    pub fn constants_mut(&mut self) -> &mut ConstantPool {
        &mut self.class_file.constants
    }

    pub fn version(&self) -> Version {
        self.class_file.version
    }

    pub fn is_interface(&self) -> bool {
        self.class_file
            .access_flags
            .contains(ClassAccessFlags::INTERFACE)
    }

    /// Decode the body of a method into editable form
    pub fn decode_code(&self, method_index: usize) -> Result<Option<MethodCode>, Error> {
        match self.methods.get(method_index).and_then(|method| method.code.as_ref()) {
            Some(code) => MethodCode::decode(code, &self.class_file.constants).map(Some),
            None => Ok(None),
        }
    }

    /// Lay out an edited method body and put it in place of the method's current code
    ///
    /// This is where frames get recomputed, so `hierarchy` must know about the classes that may
    /// meet at join points in the method.
    pub fn replace_code(
        &mut self,
        method_index: usize,
        code: MethodCode,
        hierarchy: &ClassHierarchy,
    ) -> Result<(), Error> {
        let method = self
            .methods
            .get_mut(method_index)
            .ok_or_else(|| Error::malformed(format!("no method at index {}", method_index)))?;
        let code_index = method
            .code_index
            .ok_or_else(|| Error::malformed(format!("method {} has no code", method.name)))?;

        let context = MethodContext {
            hierarchy,
            this_class: &self.name,
            method_name: &method.name,
            descriptor: &method.parsed_descriptor,
            is_static: method.is_static(),
        };
        let version = self.class_file.version;
        let assembled = code.assemble(&mut self.class_file.constants, version, &context)?;

        let attribute = self.class_file.constants.get_attribute(assembled.clone())?;
        self.class_file.methods[method_index].attributes[code_index] = attribute;
        method.code = Some(assembled);
        Ok(())
    }
}

impl MethodModel {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Whether the method has no body (`abstract` or `native`)
    pub fn is_bodiless(&self) -> bool {
        self.access_flags
            .intersects(MethodAccessFlags::ABSTRACT | MethodAccessFlags::NATIVE)
    }

    /// Method with no body or annotations, only useful for exercising name based checks
    #[cfg(test)]
    pub(crate) fn without_code(
        name: &str,
        descriptor: &str,
        access_flags: MethodAccessFlags,
    ) -> MethodModel {
        MethodModel {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            parsed_descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            access_flags,
            annotations: vec![],
            code: None,
            code_index: None,
        }
    }

    /// Raw body of the method
    pub fn code(&self) -> Option<&Code> {
        self.code.as_ref()
    }

    /// Number of local variable slots used by the body
    pub fn max_locals(&self) -> Option<u16> {
        self.code.as_ref().map(|code| code.max_locals)
    }

    /// Name followed by descriptor (eg. `run(I)V`)
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}
