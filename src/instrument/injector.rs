use super::exits::{ExitKind, ExitPoint};
use super::sink::LoggerSink;
use crate::jvm::code::{CodeElement, Instruction, InvokeType, MethodCode, NumericKind, ValueKind};
use crate::jvm::{ConstantPool, Error};
use std::fmt;

/// Most operand stack slots any injected sequence needs on top of what is already there
///
/// The deepest point is an exit message being built: receiver, message, and a `long` duration.
const INJECTED_STACK: u16 = 4;

/// Emits the entry and exit sequences
///
/// Entry code goes in front of the label of the original first instruction, so that jumps back
/// to the start of the method (and exception ranges or local variable scopes starting there) do
/// not cover it. Exit code goes right after the label of each exit, so that every jump to a
/// `return` or `athrow` also goes through it.
#[derive(Debug, Clone)]
pub struct Injector {
    pub sink: LoggerSink,
    pub prefix: String,
    pub entry_log: bool,
    pub timing: bool,
}

/// Method being instrumented, as it appears in messages
#[derive(Debug, Clone, Copy)]
pub struct InjectionTarget<'a> {
    /// Dotted name of the class declaring the method
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

impl<'a> fmt::Display for InjectionTarget<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// What ended up in a method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Injection {
    pub entry_log: bool,
    pub timing: bool,

    /// Number of exits that got timing code
    pub exits: usize,
}

impl Injection {
    pub fn is_empty(&self) -> bool {
        !self.entry_log && !self.timing
    }
}

/// Slots allocated while instrumenting one method
#[derive(Debug, Default)]
struct MethodSlots {
    /// Holds the `System.nanoTime()` read on entry
    start: Option<u16>,
}

impl Injector {
    /// Inject into a decoded method body
    ///
    /// `exits` must come from [`super::find_exits`] on the same body, before anything was injected.
    pub fn inject(
        &self,
        code: &mut MethodCode,
        exits: &[ExitPoint],
        target: InjectionTarget,
        constants: &mut ConstantPool,
    ) -> Result<Injection, Error> {
        let mut injection = Injection::default();
        if !self.entry_log && !self.timing {
            return Ok(injection);
        }

        let mut slots = MethodSlots::default();
        let mut entry = vec![];
        if self.entry_log {
            let message = format!("{} enter {}", self.prefix, target);
            let message = vec![Instruction::Ldc(constants.get_string(&message)?)];
            entry.extend(self.sink.log(constants, target.owner, message)?);
            injection.entry_log = true;
        }
        if self.timing {
            let start = code.fresh_local(2)?;
            entry.push(Instruction::Invoke(InvokeType::Static, nano_time(constants)?));
            entry.push(Instruction::Store(ValueKind::Long, start));
            slots.start = Some(start);
            injection.timing = true;
        }
        code.elements
            .splice(0..0, entry.into_iter().map(CodeElement::Instruction));

        if let Some(start) = slots.start {
            for exit in exits {
                let sequence = self.exit_sequence(code, exit, start, target, constants)?;
                let position = code
                    .label_position(exit.label)
                    .ok_or(Error::UnplacedLabel(exit.label))?;
                code.elements.splice(
                    position + 1..position + 1,
                    sequence.into_iter().map(CodeElement::Instruction),
                );
                injection.exits += 1;
            }
        }

        code.max_stack = code
            .max_stack
            .checked_add(INJECTED_STACK)
            .ok_or(Error::MethodCodeMaxStackOverflow(
                code.max_stack as usize + INJECTED_STACK as usize,
            ))?;
        Ok(injection)
    }

    /// Compute the elapsed time into a fresh slot, then log it
    fn exit_sequence(
        &self,
        code: &mut MethodCode,
        exit: &ExitPoint,
        start: u16,
        target: InjectionTarget,
        constants: &mut ConstantPool,
    ) -> Result<Vec<Instruction>, Error> {
        let duration = code.fresh_local(2)?;
        let mut sequence = vec![
            Instruction::Invoke(InvokeType::Static, nano_time(constants)?),
            Instruction::Load(ValueKind::Long, start),
            Instruction::Sub(NumericKind::Long),
            Instruction::Store(ValueKind::Long, duration),
        ];

        let phase = match exit.kind {
            ExitKind::NormalReturn => "exit",
            ExitKind::ExceptionalReturn => "throw",
        };
        let message = format!("{} {} {} durationNs=", self.prefix, phase, target);
        let long_to_string = constants.get_method_ref(
            "java/lang/Long",
            "toString",
            "(J)Ljava/lang/String;",
            false,
        )?;
        let concat = constants.get_method_ref(
            "java/lang/String",
            "concat",
            "(Ljava/lang/String;)Ljava/lang/String;",
            false,
        )?;
        let message = vec![
            Instruction::Ldc(constants.get_string(&message)?),
            Instruction::Load(ValueKind::Long, duration),
            Instruction::Invoke(InvokeType::Static, long_to_string),
            Instruction::Invoke(InvokeType::Virtual, concat),
        ];
        sequence.extend(self.sink.log(constants, target.owner, message)?);
        Ok(sequence)
    }
}

fn nano_time(constants: &mut ConstantPool) -> Result<crate::jvm::ConstantIndex, Error> {
    constants.get_method_ref("java/lang/System", "nanoTime", "()J", false)
}
