use super::{Deserialize, Serialize};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::Result;

/// Version of the class file, which is used to verify that the JVM has the
/// necessary features to interpret the class
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Version {
    pub minor_version: u16,
    pub major_version: u16,
}

impl Version {
    /// JVM class file version corresponding to Java SE 5
    pub const JAVA5: Version = Version {
        minor_version: 0,
        major_version: 49,
    };

    /// JVM class file version corresponding to Java SE 6, the first with `StackMapTable`
    pub const JAVA6: Version = Version {
        minor_version: 0,
        major_version: 50,
    };

    /// JVM class file version corresponding to Java SE 8 (released March 2014)
    pub const JAVA8: Version = Version {
        minor_version: 0,
        major_version: 52,
    };

    /// Whether method bodies in this class must carry a `StackMapTable` (or at least may, in the
    /// case of version 50 where the old type-inferencing verifier is still a fallback)
    pub fn uses_stack_map_frames(&self) -> bool {
        self.major_version >= Version::JAVA6.major_version
    }

    /// From version 51 onwards, `jsr`/`ret` are rejected outright by the verifier
    pub fn forbids_subroutines(&self) -> bool {
        self.major_version >= 51
    }
}

impl Serialize for Version {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        self.minor_version.serialize(writer)?;
        self.major_version.serialize(writer)?;
        Ok(())
    }
}

impl Deserialize for Version {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        let minor_version = u16::deserialize(reader)?;
        let major_version = u16::deserialize(reader)?;
        Ok(Version {
            minor_version,
            major_version,
        })
    }
}
