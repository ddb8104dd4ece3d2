#![forbid(unsafe_code)]

use super::{constants::*, Error, FileAttrs, SftpErrMsg, SftpErrorKind, WireReader};

use std::collections::HashMap;

use bytes::Bytes;

/// Status code of a STATUS response.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StatusCode {
    Success,
    Failure(SftpErrorKind),
}

impl StatusCode {
    pub fn from_code(code: u32) -> Self {
        match code {
            SSH_FX_OK => StatusCode::Success,
            code => StatusCode::Failure(SftpErrorKind::from_code(code)),
        }
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

/// A decoded STATUS response.
///
/// `message` and `language_tag` are only sent from protocol 3 on.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Status {
    pub code: StatusCode,
    pub message: Option<Box<str>>,
    pub language_tag: Option<Box<str>>,
}

/// Opaque handle of an opened file or directory.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Handle(Bytes);

impl Handle {
    /// Max length of handle specified in sftp v3.
    pub const MAX_LEN: usize = 256;

    pub fn new(bytes: Bytes) -> Result<Self, Error> {
        if bytes.len() > Self::MAX_LEN {
            Err(Error::HandleTooLong)
        } else {
            Ok(Self(bytes))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

/// One entry of a NAME response.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NameEntry {
    pub filename: Bytes,

    /// `ls -l` like description of the file, only sent by protocol 1 to 3.
    pub longname: Option<Bytes>,

    pub attrs: FileAttrs,
}

/// Extensions announced by the server in its VERSION packet.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Extensions(HashMap<Bytes, Bytes>);

impl Extensions {
    /// A later pair with the same name overwrites an earlier one.
    pub fn insert(&mut self, name: Bytes, value: Bytes) {
        self.0.insert(name, value);
    }

    /// Return the value of extension `name`, e.g. `b"1"` for
    /// `posix-rename@openssh.com`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.0.get(name.as_bytes()).map(|value| &**value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.0.iter().map(|(name, value)| (&**name, &**value))
    }
}

/// Content of a VERSION packet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ServerVersion {
    pub version: u32,
    pub extensions: Extensions,
}

impl ServerVersion {
    /// * `reader` - payload of the VERSION packet, i.e. without the length
    ///   and the type.
    pub fn parse(reader: &mut WireReader) -> Result<Self, Error> {
        let version = reader.read_u32()?;

        let mut extensions = Extensions::default();
        while !reader.is_empty() {
            let name = reader.read_string()?;
            let value = reader.read_string()?;
            extensions.insert(name, value);
        }

        Ok(Self {
            version,
            extensions,
        })
    }
}

/// Return the version both sides speak, which is the lower of the two.
pub fn negotiate_version(server_version: u32, client_max_version: u32) -> Result<u32, Error> {
    let version = server_version.min(client_max_version);

    if version < SSH2_FILEXFER_MIN_VERSION {
        Err(Error::UnsupportedSftpProtocol {
            version: server_version,
        })
    } else {
        Ok(version)
    }
}

/// Type specific part of a [`Response`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResponsePayload {
    /// The response is a STATUS.
    None,

    Handle(Handle),

    Data {
        data: Bytes,
        /// Only sent by protocol 6 servers, and optional there.
        end_of_file: Option<bool>,
    },

    Name {
        entries: Vec<NameEntry>,
        /// Only sent by protocol 6 servers, and optional there.
        end_of_list: Option<bool>,
    },

    Attrs(FileAttrs),

    /// Raw payload of an EXTENDED_REPLY, after the request id.
    ExtendedReply(Bytes),
}

/// The response to one request.
///
/// A failed STATUS is a normal response, it is up to the caller to turn
/// it into an error, e.g. with one of the `into_*` methods.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Response {
    pub id: u32,
    pub status: StatusCode,
    pub message: Option<Box<str>>,
    pub language_tag: Option<Box<str>>,
    pub payload: ResponsePayload,
}

impl Response {
    pub fn from_status(id: u32, status: Status) -> Self {
        Self {
            id,
            status: status.code,
            message: status.message,
            language_tag: status.language_tag,
            payload: ResponsePayload::None,
        }
    }

    pub fn with_payload(id: u32, payload: ResponsePayload) -> Self {
        Self {
            id,
            status: StatusCode::Success,
            message: None,
            language_tag: None,
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Return the failure kind if this is a failed STATUS.
    pub fn failure(&self) -> Option<SftpErrorKind> {
        match self.status {
            StatusCode::Success => None,
            StatusCode::Failure(kind) => Some(kind),
        }
    }

    fn into_payload(self) -> Result<ResponsePayload, Error> {
        match self.status {
            StatusCode::Success => Ok(self.payload),
            StatusCode::Failure(kind) => Err(Error::SftpError(
                kind,
                SftpErrMsg {
                    message: self.message.unwrap_or_default(),
                    language_tag: self.language_tag.unwrap_or_default(),
                },
            )),
        }
    }

    fn is_eof(&self) -> bool {
        self.status == StatusCode::Failure(SftpErrorKind::Eof)
    }

    /// Expect a successful STATUS.
    pub fn into_status(self) -> Result<(), Error> {
        match self.into_payload()? {
            ResponsePayload::None => Ok(()),
            _ => Err(Error::InvalidResponse(&"Expected Status response")),
        }
    }

    pub fn into_handle(self) -> Result<Handle, Error> {
        match self.into_payload()? {
            ResponsePayload::Handle(handle) => Ok(handle),
            _ => Err(Error::InvalidResponse(
                &"Expected Handle or err Status response",
            )),
        }
    }

    /// Return `None` on end of file.
    pub fn into_data(self) -> Result<Option<Bytes>, Error> {
        if self.is_eof() {
            return Ok(None);
        }

        match self.into_payload()? {
            ResponsePayload::Data { data, .. } => Ok(Some(data)),
            _ => Err(Error::InvalidResponse(&"Expected Data or err Status response")),
        }
    }

    /// Return an empty list once the end of the directory is reached.
    pub fn into_names(self) -> Result<Vec<NameEntry>, Error> {
        if self.is_eof() {
            return Ok(Vec::new());
        }

        match self.into_payload()? {
            ResponsePayload::Name { entries, .. } => Ok(entries),
            _ => Err(Error::InvalidResponse(&"Expected Name or err Status response")),
        }
    }

    /// Expect a NAME response with exactly one entry, as returned by
    /// realpath and readlink.
    pub fn into_name(self) -> Result<NameEntry, Error> {
        match self.into_payload()? {
            ResponsePayload::Name { entries, .. } => {
                let mut entries = entries.into_iter();
                match (entries.next(), entries.next()) {
                    (Some(entry), None) => Ok(entry),
                    _ => Err(Error::InvalidResponse(
                        &"Expected Name response with exactly one entry",
                    )),
                }
            }
            _ => Err(Error::InvalidResponse(&"Expected Name or err Status response")),
        }
    }

    pub fn into_attrs(self) -> Result<FileAttrs, Error> {
        match self.into_payload()? {
            ResponsePayload::Attrs(attrs) => Ok(attrs),
            _ => Err(Error::InvalidResponse(
                &"Expected Attrs or err Status response",
            )),
        }
    }

    pub fn into_extended_reply(self) -> Result<Bytes, Error> {
        match self.into_payload()? {
            ResponsePayload::ExtendedReply(reply) => Ok(reply),
            _ => Err(Error::InvalidResponse(
                &"Expected ExtendedReply or err Status response",
            )),
        }
    }
}
