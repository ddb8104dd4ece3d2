use super::*;

/// SYMLINK is replaced by LINK, DATA and NAME may end with an end of
/// file / end of list flag.
#[derive(Debug, Copy, Clone, Default)]
pub struct ProtocolV6;

impl Protocol for ProtocolV6 {
    fn version(&self) -> u32 {
        6
    }

    fn encode_open(
        &self,
        id: u32,
        path: &[u8],
        options: OpenOptions,
        attrs: &FileAttrs,
    ) -> Result<Bytes, Error> {
        v5::encode_open_v5(self.attrs_layout(), id, path, options, attrs)
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
        v5::encode_rename_v5(id, old_path, new_path, flags)
    }

    fn encode_symlink(&self, id: u32, link_path: &[u8], target_path: &[u8]) -> Result<Bytes, Error> {
        let mut writer = WireWriter::request(SSH_FXP_LINK, id);
        writer
            .put_string(link_path)?
            .put_string(target_path)?
            .put_bool(true);
        writer.finish()
    }

    fn parse_data(&self, reader: &mut WireReader) -> Result<ResponsePayload, Error> {
        Ok(ResponsePayload::Data {
            data: reader.read_string()?,
            end_of_file: read_trailing_bool(reader)?,
        })
    }

    fn parse_name(&self, reader: &mut WireReader) -> Result<ResponsePayload, Error> {
        let layout = self.attrs_layout();

        let count = reader.read_u32()?;
        let mut entries = Vec::with_capacity(count.min(64) as usize);

        for _ in 0..count {
            entries.push(NameEntry {
                filename: reader.read_string()?,
                longname: None,
                attrs: layout.decode(reader)?,
            });
        }

        Ok(ResponsePayload::Name {
            entries,
            end_of_list: read_trailing_bool(reader)?,
        })
    }
}
