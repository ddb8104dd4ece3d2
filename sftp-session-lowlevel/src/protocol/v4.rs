use super::*;

/// Switches to the V4 attributes, STAT family requests ask for specific
/// attributes and NAME entries lose their longname.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProtocolV4;

impl Protocol for ProtocolV4 {
    fn version(&self) -> u32 {
        4
    }

    fn encode_lstat(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        stat_request(SSH_FXP_LSTAT, id, path, self.attrs_layout())
    }

    fn encode_fstat(&self, id: u32, handle: &Handle) -> Result<Bytes, Error> {
        stat_request(SSH_FXP_FSTAT, id, handle.as_bytes(), self.attrs_layout())
    }

    fn encode_stat(&self, id: u32, path: &[u8]) -> Result<Bytes, Error> {
        stat_request(SSH_FXP_STAT, id, path, self.attrs_layout())
    }
}
