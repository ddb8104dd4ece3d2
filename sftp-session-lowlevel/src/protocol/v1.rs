use super::*;

/// The first protocol version: no rename, no links, no extensions.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProtocolV1;

impl Protocol for ProtocolV1 {
    fn version(&self) -> u32 {
        1
    }

    fn encode_rename(
        &self,
        _id: u32,
        _old_path: &[u8],
        _new_path: &[u8],
        _flags: RenameFlags,
    ) -> Result<Bytes, Error> {
        Err(unsupported("rename", self.version()))
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
        parse_status_code_only(reader)
    }
}

/// STATUS of protocol 1 and 2 carries nothing but the code.
pub(super) fn parse_status_code_only(reader: &mut WireReader) -> Result<Status, Error> {
    Ok(Status {
        code: StatusCode::from_code(reader.read_u32()?),
        message: None,
        language_tag: None,
    })
}
