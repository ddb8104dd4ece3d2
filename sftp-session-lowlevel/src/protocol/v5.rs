use super::*;

/// OPEN takes desired access and a disposition, RENAME takes flags.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProtocolV5;

impl Protocol for ProtocolV5 {
    fn version(&self) -> u32 {
        5
    }

    fn encode_open(
        &self,
        id: u32,
        path: &[u8],
        options: OpenOptions,
        attrs: &FileAttrs,
    ) -> Result<Bytes, Error> {
        encode_open_v5(self.attrs_layout(), id, path, options, attrs)
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

    fn encode_rename(
        &self,
        id: u32,
        old_path: &[u8],
        new_path: &[u8],
        flags: RenameFlags,
    ) -> Result<Bytes, Error> {
        encode_rename_v5(id, old_path, new_path, flags)
    }
}

pub(super) fn encode_open_v5(
    layout: AttrsLayout,
    id: u32,
    path: &[u8],
    options: OpenOptions,
    attrs: &FileAttrs,
) -> Result<Bytes, Error> {
    let mut writer = WireWriter::request(SSH_FXP_OPEN, id);
    writer
        .put_string(path)?
        .put_u32(options.desired_access())
        .put_u32(options.v5_flags());
    layout.encode(attrs, &mut writer)?;
    writer.finish()
}

pub(super) fn encode_rename_v5(
    id: u32,
    old_path: &[u8],
    new_path: &[u8],
    flags: RenameFlags,
) -> Result<Bytes, Error> {
    let mut writer = WireWriter::request(SSH_FXP_RENAME, id);
    writer
        .put_string(old_path)?
        .put_string(new_path)?
        .put_u32(flags.bits());
    writer.finish()
}
