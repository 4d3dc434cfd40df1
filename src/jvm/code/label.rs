use std::fmt;

/// Opaque position in a method body
///
/// Decoding places one label in front of every instruction (named after the instruction's
/// offset) and one at the very end of the code. Labels made afterwards come from a
/// [`LabelGenerator`] and never collide with those.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(u32);

impl Label {
    /// Label for a byte offset in the decoded code array
    pub fn at_offset(offset: usize) -> Label {
        Label(offset as u32)
    }
}

/// Generates new labels
///
/// Cloning does not split the generator source - the cloned generator will produce the same
/// sequence of labels as the original.
#[derive(Clone, Debug)]
pub struct LabelGenerator(u32);

impl LabelGenerator {
    /// Generator whose labels don't overlap with those of a code array of length `code_length`
    pub fn after_code_length(code_length: usize) -> LabelGenerator {
        LabelGenerator(code_length as u32 + 1)
    }

    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        let to_return = Label(self.0);
        self.0 += 1;
        to_return
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("l{}", self.0))
    }
}
