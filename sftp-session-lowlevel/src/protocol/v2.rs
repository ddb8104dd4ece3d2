use super::*;

/// Adds RENAME.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProtocolV2;

impl Protocol for ProtocolV2 {
    fn version(&self) -> u32 {
        2
    }

    fn encode_readlink(&self, _id: u32, _path: &[u8]) -> Result<Bytes, Error> {
        Err(unsupported("readlink", self.version()))
    }

    fn encode_symlink(&self, _id: u32, _link: &[u8], _target: &[u8]) -> Result<Bytes, Error> {
        Err(unsupported("symlink", self.version()))
    }

    fn encode_extended(&self, _id: u32, _request: &str, _data: &[u8]) -> Result<Bytes, Error> {
        Err(unsupported("extended", self.version()))
    }

    fn parse_status(&self, reader: &mut WireReader) -> Result<Status, Error> {
        v1::parse_status_code_only(reader)
    }
}
