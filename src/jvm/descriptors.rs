use std::io::{Error, ErrorKind, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to and from string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string
    fn parse(source: &str) -> Result<Self> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => {
                let msg = format!("Unexpected leftover input '{}'", c);
                Err(Error::new(ErrorKind::InvalidInput, msg))
            }
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Number of local variable or operand stack slots taken by a value of this type
    pub fn width(&self) -> usize {
        match self {
            BaseType::Byte
            | BaseType::Char
            | BaseType::Float
            | BaseType::Int
            | BaseType::Short
            | BaseType::Boolean => 1,
            BaseType::Double | BaseType::Long => 2,
        }
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        let c = match self {
            BaseType::Byte => 'B',
            BaseType::Char => 'C',
            BaseType::Double => 'D',
            BaseType::Float => 'F',
            BaseType::Int => 'I',
            BaseType::Long => 'J',
            BaseType::Short => 'S',
            BaseType::Boolean => 'Z',
        };
        write_to.push(c);
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        let typ = match source.next() {
            Some('B') => BaseType::Byte,
            Some('C') => BaseType::Char,
            Some('D') => BaseType::Double,
            Some('F') => BaseType::Float,
            Some('I') => BaseType::Int,
            Some('J') => BaseType::Long,
            Some('S') => BaseType::Short,
            Some('Z') => BaseType::Boolean,
            Some(c) => {
                let msg = format!("Invalid base type character '{}'", c);
                return Err(Error::new(ErrorKind::InvalidInput, msg));
            }
            None => {
                let msg = "Missing base type character";
                return Err(Error::new(ErrorKind::UnexpectedEof, msg));
            }
        };
        Ok(typ)
    }
}

/// Type of a class, instance, or local variable
///
/// Class names are binary names (eg. `java/lang/String`).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn object<S: Into<String>>(class_name: S) -> FieldType {
        FieldType::Object(class_name.into())
    }

    pub fn array(element_type: FieldType) -> FieldType {
        FieldType::Array(Box::new(element_type))
    }

    /// Number of local variable or operand stack slots taken by a value of this type
    pub fn width(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.width(),
            FieldType::Object(_) | FieldType::Array(_) => 1,
        }
    }

    /// For reference types, the name used by `CONSTANT_Class` entries and verification types:
    /// binary names for classes, full descriptors for arrays
    pub fn class_name(&self) -> Option<String> {
        match self {
            FieldType::Base(_) => None,
            FieldType::Object(name) => Some(name.clone()),
            FieldType::Array(_) => Some(self.render()),
        }
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Object(name) => {
                write_to.push('L');
                write_to.push_str(name);
                write_to.push(';');
            }
            FieldType::Array(element_type) => {
                write_to.push('[');
                element_type.render_to(write_to);
            }
        }
    }
}

impl ParseDescriptor for FieldType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        match source.peek().copied() {
            None => Err(Error::new(ErrorKind::UnexpectedEof, "Missing field type")),
            Some('B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z') => {
                BaseType::parse_from(source).map(FieldType::Base)
            }
            Some('L') => {
                source.next();
                let mut class_name = String::new();
                loop {
                    let c: char = source.next().ok_or_else(|| {
                        let msg = format!("Missing terminator for 'L{}'", class_name);
                        Error::new(ErrorKind::UnexpectedEof, msg)
                    })?;
                    if c == ';' {
                        break;
                    }
                    class_name.push(c);
                }
                if class_name.is_empty() {
                    let msg = "Empty class name in object type";
                    return Err(Error::new(ErrorKind::InvalidInput, msg));
                }
                Ok(FieldType::Object(class_name))
            }
            Some('[') => {
                source.next();
                FieldType::parse_from(source).map(FieldType::array)
            }
            Some(c) => {
                let msg = format!("Invalid field type character '{}'", c);
                Err(Error::new(ErrorKind::InvalidInput, msg))
            }
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>, // `None` is for `void` (ie. no return)
}

impl MethodDescriptor {
    /// Total length of parameters (not the same as the length of the vector),
    /// which must be 255 or less for it to be valid
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_len = if has_this_param { 1 } else { 0 };
        this_len + self.parameters.iter().map(FieldType::width).sum::<usize>()
    }
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl ParseDescriptor for MethodDescriptor {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self> {
        // Assert open paren
        if source.next() != Some('(') {
            let msg = "Expected '(' for method";
            return Err(Error::new(ErrorKind::InvalidInput, msg));
        }

        // Parse parameters
        let mut parameters = vec![];
        loop {
            match source.peek().copied() {
                Some(')') => {
                    source.next();
                    break;
                }
                Some(_) => parameters.push(FieldType::parse_from(source)?),
                None => {
                    let msg = "Missing ')' in method descriptor";
                    return Err(Error::new(ErrorKind::UnexpectedEof, msg));
                }
            }
        }

        // Parse return type
        let return_type = if source.next_if_eq(&'V').is_some() {
            None
        } else {
            Some(FieldType::parse_from(source)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}
