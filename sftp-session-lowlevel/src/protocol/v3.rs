use super::*;

/// Adds READLINK, SYMLINK, EXTENDED and messages in STATUS.
///
/// This is the version spoken by openssh.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProtocolV3;

impl Protocol for ProtocolV3 {
    fn version(&self) -> u32 {
        3
    }
}
