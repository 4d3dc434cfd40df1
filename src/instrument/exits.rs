use crate::jvm::code::{CodeElement, Instruction, Label, MethodCode, ValueKind};
use crate::jvm::{Error, MethodDescriptor};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ExitKind {
    /// One of the `return` instructions
    NormalReturn,

    /// `athrow`
    ExceptionalReturn,
}

/// Place where control leaves the method
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ExitPoint {
    /// Label placed right before the exiting instruction
    pub label: Label,
    pub kind: ExitKind,

    /// What is on top of the stack when leaving (`None` for `void` returns)
    pub value: Option<ValueKind>,
}

/// Find every `return` and `athrow` in the method, in code order
///
/// Every exit ends up directly preceded by its label (decoded code already has one before every
/// instruction, anything else gets a fresh one).
pub fn find_exits(
    code: &mut MethodCode,
    descriptor: &MethodDescriptor,
) -> Result<Vec<ExitPoint>, Error> {
    let expected = descriptor.return_type.as_ref().map(ValueKind::of);

    let mut exits = vec![];
    let mut idx = 0;
    while idx < code.elements.len() {
        let (kind, value) = match &code.elements[idx] {
            CodeElement::Instruction(Instruction::Return(returned)) => {
                if *returned != expected {
                    return Err(Error::Malformed(format!(
                        "return of {:?} in a method returning {:?}",
                        returned, expected
                    )));
                }
                (ExitKind::NormalReturn, *returned)
            }
            CodeElement::Instruction(Instruction::AThrow) => {
                (ExitKind::ExceptionalReturn, Some(ValueKind::Reference))
            }
            _ => {
                idx += 1;
                continue;
            }
        };

        let preceding = idx
            .checked_sub(1)
            .and_then(|prev| code.elements[prev].label());
        let label = match preceding {
            Some(label) => label,
            None => {
                let label = code.fresh_label();
                code.elements.insert(idx, CodeElement::Label(label));
                idx += 1;
                label
            }
        };

        exits.push(ExitPoint { label, kind, value });
        idx += 1;
    }

    Ok(exits)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::class_file::{BytecodeArray, Code, ConstantPool};
    use crate::jvm::ParseDescriptor;

    fn method_code(bytes: &[u8]) -> MethodCode {
        let code = Code {
            max_stack: 2,
            max_locals: 1,
            code_array: BytecodeArray(bytes.to_vec()),
            exception_table: vec![],
            attributes: vec![],
        };
        MethodCode::decode(&code, &ConstantPool::new()).unwrap()
    }

    #[test]
    fn every_return_is_an_exit() {
        // iload_0; ifeq +5; iconst_1; ireturn; iconst_0; ireturn
        let mut code = method_code(&[0x1a, 0x99, 0, 5, 0x04, 0xac, 0x03, 0xac]);
        let exits = find_exits(&mut code, &MethodDescriptor::parse("(I)I").unwrap()).unwrap();
        assert_eq!(
            exits,
            vec![
                ExitPoint {
                    label: Label::at_offset(5),
                    kind: ExitKind::NormalReturn,
                    value: Some(ValueKind::Int),
                },
                ExitPoint {
                    label: Label::at_offset(7),
                    kind: ExitKind::NormalReturn,
                    value: Some(ValueKind::Int),
                },
            ]
        );
    }

    #[test]
    fn throws_are_exceptional() {
        // aload_0; ifnull +4; return; aconst_null; athrow
        let mut code = method_code(&[0x2a, 0xc6, 0, 4, 0xb1, 0x01, 0xbf]);
        let descriptor = MethodDescriptor::parse("(Ljava/lang/Object;)V").unwrap();
        let exits = find_exits(&mut code, &descriptor).unwrap();
        let kinds: Vec<_> = exits.iter().map(|exit| (exit.kind, exit.value)).collect();
        assert_eq!(
            kinds,
            vec![
                (ExitKind::NormalReturn, None),
                (ExitKind::ExceptionalReturn, Some(ValueKind::Reference)),
            ]
        );
        assert_eq!(exits[1].label, Label::at_offset(6));
    }

    #[test]
    fn return_must_match_descriptor() {
        let mut code = method_code(&[0x04, 0xac]);
        let result = find_exits(&mut code, &MethodDescriptor::parse("()V").unwrap());
        assert!(matches!(result, Err(Error::Malformed(_))));

        let mut code = method_code(&[0x04, 0xac]);
        let result = find_exits(&mut code, &MethodDescriptor::parse("()Z").unwrap());
        assert!(result.is_ok());
    }

    #[test]
    fn unlabelled_exits_get_a_label() {
        let mut code = method_code(&[0xb1]);
        code.elements.retain(|element| element.label().is_none());
        let exits = find_exits(&mut code, &MethodDescriptor::parse("()V").unwrap()).unwrap();
        assert_eq!(exits.len(), 1);
        assert_eq!(code.elements[0], CodeElement::Label(exits[0].label));
        assert_eq!(
            code.elements[1],
            CodeElement::Instruction(Instruction::Return(None))
        );
    }
}
