use crate::jvm::code::{Instruction, InvokeType};
use crate::jvm::{ConstantPool, Error};
use std::fmt;
use std::str::FromStr;

/// Where injected log messages end up at runtime
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum LoggerSink {
    /// `System.out.println`
    Console,

    /// SLF4J `info` on a logger named after the class
    Structured,
}

impl Default for LoggerSink {
    fn default() -> LoggerSink {
        LoggerSink::Console
    }
}

impl FromStr for LoggerSink {
    type Err = String;

    fn from_str(name: &str) -> Result<LoggerSink, String> {
        match name.to_ascii_lowercase().as_str() {
            "stdout" | "console" => Ok(LoggerSink::Console),
            "structured" | "slf4j" => Ok(LoggerSink::Structured),
            other => Err(format!(
                "unknown logger {:?} (expected stdout or structured)",
                other
            )),
        }
    }
}

impl fmt::Display for LoggerSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerSink::Console => f.write_str("stdout"),
            LoggerSink::Structured => f.write_str("structured"),
        }
    }
}

impl LoggerSink {
    /// Instructions that log the string pushed by `message`
    ///
    /// `message` must push exactly one `java/lang/String` and may use the stack above it. The
    /// whole sequence is stack neutral.
    pub fn log(
        &self,
        constants: &mut ConstantPool,
        owner: &str,
        message: Vec<Instruction>,
    ) -> Result<Vec<Instruction>, Error> {
        let mut code = Vec::with_capacity(message.len() + 3);
        match self {
            LoggerSink::Console => {
                let out =
                    constants.get_field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")?;
                let println = constants.get_method_ref(
                    "java/io/PrintStream",
                    "println",
                    "(Ljava/lang/String;)V",
                    false,
                )?;
                code.push(Instruction::GetStatic(out));
                code.extend(message);
                code.push(Instruction::Invoke(InvokeType::Virtual, println));
            }
            LoggerSink::Structured => {
                let logger_name = constants.get_string(owner)?;
                let get_logger = constants.get_method_ref(
                    "org/slf4j/LoggerFactory",
                    "getLogger",
                    "(Ljava/lang/String;)Lorg/slf4j/Logger;",
                    false,
                )?;
                let info = constants.get_method_ref(
                    "org/slf4j/Logger",
                    "info",
                    "(Ljava/lang/String;)V",
                    true,
                )?;
                code.push(Instruction::Ldc(logger_name));
                code.push(Instruction::Invoke(InvokeType::Static, get_logger));
                code.extend(message);
                code.push(Instruction::Invoke(InvokeType::Interface(2), info));
            }
        }
        Ok(code)
    }
}
