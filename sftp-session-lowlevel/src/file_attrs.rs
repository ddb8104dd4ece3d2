#![forbid(unsafe_code)]

use super::{constants::*, Error, IdResolver, WireReader, WireWriter};

use std::convert::TryFrom;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bitflags::bitflags;
use bytes::Bytes;

/// Type of a file.
///
/// Protocol 1 to 3 carry the type in the `S_IFMT` bits of the permissions,
/// later versions send it as a separate byte.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Special,
    Unknown,
    Socket,
    CharDevice,
    BlockDevice,
    Fifo,
}

impl FileType {
    pub fn from_tag(tag: u8) -> Result<Self, Error> {
        use FileType::*;

        Ok(match tag {
            SSH_FILEXFER_TYPE_REGULAR => Regular,
            SSH_FILEXFER_TYPE_DIRECTORY => Directory,
            SSH_FILEXFER_TYPE_SYMLINK => Symlink,
            SSH_FILEXFER_TYPE_SPECIAL => Special,
            SSH_FILEXFER_TYPE_UNKNOWN => Unknown,
            SSH_FILEXFER_TYPE_SOCKET => Socket,
            SSH_FILEXFER_TYPE_CHAR_DEVICE => CharDevice,
            SSH_FILEXFER_TYPE_BLOCK_DEVICE => BlockDevice,
            SSH_FILEXFER_TYPE_FIFO => Fifo,
            _ => return Err(Error::InvalidResponse(&"Unknown file type")),
        })
    }

    pub const fn tag(self) -> u8 {
        use FileType::*;

        match self {
            Regular => SSH_FILEXFER_TYPE_REGULAR,
            Directory => SSH_FILEXFER_TYPE_DIRECTORY,
            Symlink => SSH_FILEXFER_TYPE_SYMLINK,
            Special => SSH_FILEXFER_TYPE_SPECIAL,
            Unknown => SSH_FILEXFER_TYPE_UNKNOWN,
            Socket => SSH_FILEXFER_TYPE_SOCKET,
            CharDevice => SSH_FILEXFER_TYPE_CHAR_DEVICE,
            BlockDevice => SSH_FILEXFER_TYPE_BLOCK_DEVICE,
            Fifo => SSH_FILEXFER_TYPE_FIFO,
        }
    }

    /// Extract the type from the `S_IFMT` bits of a unix mode.
    pub fn from_mode(mode: u32) -> Self {
        match mode & 0o170000 {
            0o100000 => FileType::Regular,
            0o040000 => FileType::Directory,
            0o120000 => FileType::Symlink,
            0o140000 => FileType::Socket,
            0o020000 => FileType::CharDevice,
            0o060000 => FileType::BlockDevice,
            0o010000 => FileType::Fifo,
            _ => FileType::Unknown,
        }
    }

    pub fn is_dir(self) -> bool {
        self == FileType::Directory
    }

    pub fn is_file(self) -> bool {
        self == FileType::Regular
    }

    pub fn is_symlink(self) -> bool {
        self == FileType::Symlink
    }
}

bitflags! {
    /// Unix permission bits, without the file type.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct Permissions: u32 {
        const SET_UID = 0o4000;
        const SET_GID = 0o2000;
        const STICKY = 0o1000;

        const READ_BY_OWNER = 0o400;
        const WRITE_BY_OWNER = 0o200;
        const EXECUTE_BY_OWNER = 0o100;

        const READ_BY_GROUP = 0o040;
        const WRITE_BY_GROUP = 0o020;
        const EXECUTE_BY_GROUP = 0o010;

        const READ_BY_OTHER = 0o004;
        const WRITE_BY_OTHER = 0o002;
        const EXECUTE_BY_OTHER = 0o001;
    }
}

/// Seconds since the unix epoch, optionally with nanoseconds.
///
/// Protocol 1 to 3 only have unsigned 32-bit seconds, protocol 4 and later
/// use signed 64-bit seconds and may add nanoseconds.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct FileTime {
    pub secs: i64,
    pub nanos: Option<u32>,
}

impl FileTime {
    pub const fn new(secs: i64) -> Self {
        Self { secs, nanos: None }
    }

    pub const fn with_nanos(secs: i64, nanos: u32) -> Self {
        Self {
            secs,
            nanos: Some(nanos),
        }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let saturate = |secs: u64| i64::try_from(secs).unwrap_or(i64::MAX);

        match time.duration_since(UNIX_EPOCH) {
            Ok(duration) => Self::with_nanos(saturate(duration.as_secs()), duration.subsec_nanos()),
            Err(err) => {
                let duration = err.duration();
                let secs = -saturate(duration.as_secs());
                match duration.subsec_nanos() {
                    0 => Self::with_nanos(secs, 0),
                    nanos => Self::with_nanos(secs - 1, 1_000_000_000 - nanos),
                }
            }
        }
    }

    /// Return `None` if the time cannot be represented by [`SystemTime`].
    pub fn to_system_time(self) -> Option<SystemTime> {
        let secs = Duration::from_secs(self.secs.unsigned_abs());
        let nanos = Duration::from_nanos(self.nanos.unwrap_or(0).into());

        let time = if self.secs >= 0 {
            UNIX_EPOCH.checked_add(secs)
        } else {
            UNIX_EPOCH.checked_sub(secs)
        };
        time?.checked_add(nanos)
    }
}

impl From<u32> for FileTime {
    fn from(secs: u32) -> Self {
        Self::new(secs.into())
    }
}

/// One access control entry.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Ace {
    pub ace_type: u32,
    pub ace_flag: u32,
    pub ace_mask: u32,
    pub who: Box<str>,
}

/// Access control list, available in protocol 4 and later.
///
/// `flags` only exists on the wire in protocol 6 and is ignored otherwise.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash)]
pub struct Acl {
    pub flags: u32,
    pub aces: Vec<Ace>,
}

/// Attributes of a file, as a superset of every protocol version.
///
/// Every field is optional and an absent field is distinct from a zero
/// one. The layout used on the wire is chosen by [`AttrsLayout`], fields
/// the layout has no room for are left out when encoding.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FileAttrs {
    size: Option<u64>,
    allocation_size: Option<u64>,
    id: Option<(u32, u32)>,
    owner_group: Option<(Box<str>, Box<str>)>,
    permissions: Option<u32>,
    atime: Option<FileTime>,
    createtime: Option<FileTime>,
    mtime: Option<FileTime>,
    ctime: Option<FileTime>,
    file_type: Option<FileType>,
    acl: Option<Acl>,
    attrib_bits: Option<u32>,
    attrib_bits_valid: Option<u32>,
    text_hint: Option<u8>,
    mime_type: Option<Box<str>>,
    link_count: Option<u32>,
    untranslated_name: Option<Bytes>,
    extended: Option<Vec<(Bytes, Bytes)>>,
}

macro_rules! def_copy_accessors {
    ( $( $(#[$meta:meta])* $field:ident: $ty:ty => $getter:ident, $setter:ident; )* ) => {
        impl FileAttrs {
            $(
                $(#[$meta])*
                pub fn $getter(&self) -> Option<$ty> {
                    self.$field
                }

                $(#[$meta])*
                pub fn $setter(&mut self, value: $ty) -> &mut Self {
                    self.$field = Some(value);
                    self
                }
            )*
        }
    };
}

def_copy_accessors! {
    size: u64 => get_size, set_size;

    /// Number of bytes the file occupies on disk, protocol 6 only.
    allocation_size: u64 => get_allocation_size, set_allocation_size;

    /// Numeric `(uid, gid)`, protocol 1 to 3 only.
    id: (u32, u32) => get_id, set_id;

    /// The raw unix mode, including the file type bits.
    permissions: u32 => get_mode, set_mode;

    atime: FileTime => get_atime, set_atime;

    /// Protocol 4 and later only.
    createtime: FileTime => get_createtime, set_createtime;

    mtime: FileTime => get_mtime, set_mtime;

    /// Time of last attribute change, protocol 6 only.
    ctime: FileTime => get_ctime, set_ctime;

    /// Protocol 5 and later only.
    attrib_bits: u32 => get_attrib_bits, set_attrib_bits;

    /// Protocol 6 only.
    attrib_bits_valid: u32 => get_attrib_bits_valid, set_attrib_bits_valid;

    /// Protocol 6 only.
    text_hint: u8 => get_text_hint, set_text_hint;

    /// Protocol 6 only.
    link_count: u32 => get_link_count, set_link_count;
}

impl FileAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both access and modification time, the only way protocol 1 to 3
    /// can transmit them.
    pub fn set_time(&mut self, atime: FileTime, mtime: FileTime) -> &mut Self {
        self.atime = Some(atime);
        self.mtime = Some(mtime);
        self
    }

    pub fn get_permissions(&self) -> Option<Permissions> {
        self.permissions.map(Permissions::from_bits_truncate)
    }

    /// Replace the permission bits while keeping the file type bits.
    pub fn set_permissions(&mut self, permissions: Permissions) -> &mut Self {
        let type_bits = self.permissions.unwrap_or(0) & 0o170000;
        self.permissions = Some(type_bits | permissions.bits());
        self
    }

    /// Explicit type sent by protocol 4 and later, or the type encoded in
    /// the mode otherwise.
    pub fn get_filetype(&self) -> Option<FileType> {
        self.file_type
            .or_else(|| self.permissions.map(FileType::from_mode))
    }

    pub fn set_filetype(&mut self, file_type: FileType) -> &mut Self {
        self.file_type = Some(file_type);
        self
    }

    /// Owner and group names, protocol 4 and later only.
    pub fn get_owner_group(&self) -> Option<(&str, &str)> {
        self.owner_group
            .as_ref()
            .map(|(owner, group)| (&**owner, &**group))
    }

    pub fn set_owner_group(&mut self, owner: Box<str>, group: Box<str>) -> &mut Self {
        self.owner_group = Some((owner, group));
        self
    }

    pub fn get_acl(&self) -> Option<&Acl> {
        self.acl.as_ref()
    }

    pub fn set_acl(&mut self, acl: Acl) -> &mut Self {
        self.acl = Some(acl);
        self
    }

    pub fn get_mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn set_mime_type(&mut self, mime_type: Box<str>) -> &mut Self {
        self.mime_type = Some(mime_type);
        self
    }

    pub fn get_untranslated_name(&self) -> Option<&[u8]> {
        self.untranslated_name.as_deref()
    }

    pub fn set_untranslated_name(&mut self, name: Bytes) -> &mut Self {
        self.untranslated_name = Some(name);
        self
    }

    /// Extended name/value pairs, in the order they were received.
    pub fn get_extended(&self) -> Option<&[(Bytes, Bytes)]> {
        self.extended.as_deref()
    }

    /// Append one extended pair.
    pub fn push_extended(&mut self, name: Bytes, value: Bytes) -> &mut Self {
        self.extended.get_or_insert_with(Vec::new).push((name, value));
        self
    }
}

/// The wire layout of [`FileAttrs`], which is fixed by the negotiated
/// protocol version.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttrsLayout {
    /// Protocol 1 to 3.
    V1,
    V4,
    V5,
    V6,
}

impl AttrsLayout {
    pub const fn for_version(version: u32) -> Self {
        match version {
            0..=3 => AttrsLayout::V1,
            4 => AttrsLayout::V4,
            5 => AttrsLayout::V5,
            _ => AttrsLayout::V6,
        }
    }

    /// Every flag bit this layout defines.
    pub const fn supported_flags(self) -> u32 {
        const V4: u32 = SSH_FILEXFER_ATTR_SIZE
            | SSH_FILEXFER_ATTR_PERMISSIONS
            | SSH_FILEXFER_ATTR_ACCESSTIME
            | SSH_FILEXFER_ATTR_CREATETIME
            | SSH_FILEXFER_ATTR_MODIFYTIME
            | SSH_FILEXFER_ATTR_ACL
            | SSH_FILEXFER_ATTR_OWNERGROUP
            | SSH_FILEXFER_ATTR_SUBSECOND_TIMES
            | SSH_FILEXFER_ATTR_EXTENDED;
        const V5: u32 = V4 | SSH_FILEXFER_ATTR_BITS;

        match self {
            AttrsLayout::V1 => {
                SSH_FILEXFER_ATTR_SIZE
                    | SSH_FILEXFER_ATTR_UIDGID
                    | SSH_FILEXFER_ATTR_PERMISSIONS
                    | SSH_FILEXFER_ATTR_ACMODTIME
                    | SSH_FILEXFER_ATTR_EXTENDED
            }
            AttrsLayout::V4 => V4,
            AttrsLayout::V5 => V5,
            AttrsLayout::V6 => {
                V5 | SSH_FILEXFER_ATTR_ALLOCATION_SIZE
                    | SSH_FILEXFER_ATTR_TEXT_HINT
                    | SSH_FILEXFER_ATTR_MIME_TYPE
                    | SSH_FILEXFER_ATTR_LINK_COUNT
                    | SSH_FILEXFER_ATTR_UNTRANSLATED_NAME
                    | SSH_FILEXFER_ATTR_CTIME
            }
        }
    }

    pub fn encode(self, attrs: &FileAttrs, writer: &mut WireWriter) -> Result<(), Error> {
        match self {
            AttrsLayout::V1 => encode_v1(attrs, writer),
            layout => encode_v4(layout, attrs, writer),
        }
    }

    pub fn decode(self, reader: &mut WireReader) -> Result<FileAttrs, Error> {
        let flags = reader.read_u32()?;
        if flags & !self.supported_flags() != 0 {
            return Err(Error::InvalidResponse(&"Unknown bits set in attribute flags"));
        }

        match self {
            AttrsLayout::V1 => decode_v1(flags, reader),
            layout => decode_v4(layout, flags, reader),
        }
    }
}

fn encode_v1(attrs: &FileAttrs, writer: &mut WireWriter) -> Result<(), Error> {
    let mut flags = 0;

    if attrs.size.is_some() {
        flags |= SSH_FILEXFER_ATTR_SIZE;
    }
    if attrs.id.is_some() {
        flags |= SSH_FILEXFER_ATTR_UIDGID;
    } else if attrs.owner_group.is_some() {
        return Err(Error::InvalidAttrs(
            &"Protocol 1 to 3 need numeric uid and gid instead of names",
        ));
    }
    if attrs.permissions.is_some() {
        flags |= SSH_FILEXFER_ATTR_PERMISSIONS;
    }
    let times = match (attrs.atime, attrs.mtime) {
        (Some(atime), Some(mtime)) => {
            flags |= SSH_FILEXFER_ATTR_ACMODTIME;
            let to_u32 = |time: FileTime| {
                u32::try_from(time.secs)
                    .map_err(|_| Error::InvalidAttrs(&"Time does not fit into 32 bits"))
            };
            Some((to_u32(atime)?, to_u32(mtime)?))
        }
        (None, None) => None,
        _ => {
            return Err(Error::InvalidAttrs(
                &"Access and modification time must be set together",
            ))
        }
    };
    if attrs.extended.is_some() {
        flags |= SSH_FILEXFER_ATTR_EXTENDED;
    }

    writer.put_u32(flags);

    if let Some(size) = attrs.size {
        writer.put_u64(size);
    }
    if let Some((uid, gid)) = attrs.id {
        writer.put_u32(uid).put_u32(gid);
    }
    if let Some(permissions) = attrs.permissions {
        writer.put_u32(permissions);
    }
    if let Some((atime, mtime)) = times {
        writer.put_u32(atime).put_u32(mtime);
    }
    if let Some(extended) = &attrs.extended {
        encode_extended(extended, writer)?;
    }

    Ok(())
}

fn encode_v4(layout: AttrsLayout, attrs: &FileAttrs, writer: &mut WireWriter) -> Result<(), Error> {
    let is_v6 = layout == AttrsLayout::V6;
    let has_bits = layout != AttrsLayout::V4;

    let ctime = attrs.ctime.filter(|_| is_v6);
    let times = [attrs.atime, attrs.createtime, attrs.mtime, ctime];
    let subsecond = times.iter().flatten().any(|time| time.nanos.is_some());

    let mut flags = 0;
    let mut set = |cond: bool, flag: u32| {
        if cond {
            flags |= flag;
        }
    };

    set(attrs.size.is_some(), SSH_FILEXFER_ATTR_SIZE);
    set(
        is_v6 && attrs.allocation_size.is_some(),
        SSH_FILEXFER_ATTR_ALLOCATION_SIZE,
    );
    set(attrs.owner_group.is_some(), SSH_FILEXFER_ATTR_OWNERGROUP);
    set(attrs.permissions.is_some(), SSH_FILEXFER_ATTR_PERMISSIONS);
    set(attrs.atime.is_some(), SSH_FILEXFER_ATTR_ACCESSTIME);
    set(attrs.createtime.is_some(), SSH_FILEXFER_ATTR_CREATETIME);
    set(attrs.mtime.is_some(), SSH_FILEXFER_ATTR_MODIFYTIME);
    set(ctime.is_some(), SSH_FILEXFER_ATTR_CTIME);
    set(subsecond, SSH_FILEXFER_ATTR_SUBSECOND_TIMES);
    set(attrs.acl.is_some(), SSH_FILEXFER_ATTR_ACL);
    set(has_bits && attrs.attrib_bits.is_some(), SSH_FILEXFER_ATTR_BITS);
    set(is_v6 && attrs.text_hint.is_some(), SSH_FILEXFER_ATTR_TEXT_HINT);
    set(is_v6 && attrs.mime_type.is_some(), SSH_FILEXFER_ATTR_MIME_TYPE);
    set(is_v6 && attrs.link_count.is_some(), SSH_FILEXFER_ATTR_LINK_COUNT);
    set(
        is_v6 && attrs.untranslated_name.is_some(),
        SSH_FILEXFER_ATTR_UNTRANSLATED_NAME,
    );
    set(attrs.extended.is_some(), SSH_FILEXFER_ATTR_EXTENDED);

    if attrs.id.is_some() && attrs.owner_group.is_none() {
        return Err(Error::InvalidAttrs(
            &"Protocol 4 and later need owner and group names instead of numeric ids",
        ));
    }

    writer
        .put_u32(flags)
        .put_u8(attrs.file_type.unwrap_or(FileType::Unknown).tag());

    if let Some(size) = attrs.size {
        writer.put_u64(size);
    }
    if flags & SSH_FILEXFER_ATTR_ALLOCATION_SIZE != 0 {
        writer.put_u64(attrs.allocation_size.unwrap_or(0));
    }
    if let Some((owner, group)) = &attrs.owner_group {
        writer.put_string(owner.as_bytes())?;
        writer.put_string(group.as_bytes())?;
    }
    if let Some(permissions) = attrs.permissions {
        writer.put_u32(permissions);
    }
    for time in times.into_iter().flatten() {
        writer.put_i64(time.secs);
        if subsecond {
            writer.put_u32(time.nanos.unwrap_or(0));
        }
    }
    if let Some(acl) = &attrs.acl {
        encode_acl(is_v6, acl, writer)?;
    }
    if let (true, Some(bits)) = (has_bits, attrs.attrib_bits) {
        writer.put_u32(bits);
        if is_v6 {
            writer.put_u32(attrs.attrib_bits_valid.unwrap_or(u32::MAX));
        }
    }
    if is_v6 {
        if let Some(text_hint) = attrs.text_hint {
            writer.put_u8(text_hint);
        }
        if let Some(mime_type) = &attrs.mime_type {
            writer.put_string(mime_type.as_bytes())?;
        }
        if let Some(link_count) = attrs.link_count {
            writer.put_u32(link_count);
        }
        if let Some(name) = &attrs.untranslated_name {
            writer.put_string(name)?;
        }
    }
    if let Some(extended) = &attrs.extended {
        encode_extended(extended, writer)?;
    }

    Ok(())
}

fn encode_acl(is_v6: bool, acl: &Acl, writer: &mut WireWriter) -> Result<(), Error> {
    let mut inner = WireWriter::new();

    if is_v6 {
        inner.put_u32(acl.flags);
    }
    inner.put_u32(u32::try_from(acl.aces.len())?);

    for ace in &acl.aces {
        inner
            .put_u32(ace.ace_type)
            .put_u32(ace.ace_flag)
            .put_u32(ace.ace_mask)
            .put_string(ace.who.as_bytes())?;
    }

    writer.put_string(&inner.into_bytes())?;
    Ok(())
}

fn encode_extended(extended: &[(Bytes, Bytes)], writer: &mut WireWriter) -> Result<(), Error> {
    writer.put_u32(u32::try_from(extended.len())?);
    for (name, value) in extended {
        writer.put_string(name)?.put_string(value)?;
    }
    Ok(())
}

fn decode_v1(flags: u32, reader: &mut WireReader) -> Result<FileAttrs, Error> {
    let mut attrs = FileAttrs::default();

    if flags & SSH_FILEXFER_ATTR_SIZE != 0 {
        attrs.size = Some(reader.read_u64()?);
    }
    if flags & SSH_FILEXFER_ATTR_UIDGID != 0 {
        attrs.id = Some((reader.read_u32()?, reader.read_u32()?));
    }
    if flags & SSH_FILEXFER_ATTR_PERMISSIONS != 0 {
        attrs.permissions = Some(reader.read_u32()?);
    }
    if flags & SSH_FILEXFER_ATTR_ACMODTIME != 0 {
        attrs.atime = Some(reader.read_u32()?.into());
        attrs.mtime = Some(reader.read_u32()?.into());
    }
    if flags & SSH_FILEXFER_ATTR_EXTENDED != 0 {
        attrs.extended = Some(decode_extended(reader)?);
    }

    Ok(attrs)
}

fn decode_v4(layout: AttrsLayout, flags: u32, reader: &mut WireReader) -> Result<FileAttrs, Error> {
    let is_v6 = layout == AttrsLayout::V6;
    let has = |flag: u32| flags & flag != 0;
    let subsecond = has(SSH_FILEXFER_ATTR_SUBSECOND_TIMES);

    let read_time = |reader: &mut WireReader| -> Result<FileTime, Error> {
        let secs = reader.read_i64()?;
        let nanos = if subsecond {
            Some(reader.read_u32()?)
        } else {
            None
        };
        Ok(FileTime { secs, nanos })
    };

    let mut attrs = FileAttrs {
        file_type: Some(FileType::from_tag(reader.read_u8()?)?),
        ..FileAttrs::default()
    };

    if has(SSH_FILEXFER_ATTR_SIZE) {
        attrs.size = Some(reader.read_u64()?);
    }
    if has(SSH_FILEXFER_ATTR_ALLOCATION_SIZE) {
        attrs.allocation_size = Some(reader.read_u64()?);
    }
    if has(SSH_FILEXFER_ATTR_OWNERGROUP) {
        attrs.owner_group = Some((reader.read_str()?, reader.read_str()?));
    }
    if has(SSH_FILEXFER_ATTR_PERMISSIONS) {
        attrs.permissions = Some(reader.read_u32()?);
    }
    if has(SSH_FILEXFER_ATTR_ACCESSTIME) {
        attrs.atime = Some(read_time(reader)?);
    }
    if has(SSH_FILEXFER_ATTR_CREATETIME) {
        attrs.createtime = Some(read_time(reader)?);
    }
    if has(SSH_FILEXFER_ATTR_MODIFYTIME) {
        attrs.mtime = Some(read_time(reader)?);
    }
    if has(SSH_FILEXFER_ATTR_CTIME) {
        attrs.ctime = Some(read_time(reader)?);
    }
    if has(SSH_FILEXFER_ATTR_ACL) {
        attrs.acl = Some(decode_acl(is_v6, reader.read_string()?)?);
    }
    if has(SSH_FILEXFER_ATTR_BITS) {
        attrs.attrib_bits = Some(reader.read_u32()?);
        if is_v6 {
            attrs.attrib_bits_valid = Some(reader.read_u32()?);
        }
    }
    if has(SSH_FILEXFER_ATTR_TEXT_HINT) {
        attrs.text_hint = Some(reader.read_u8()?);
    }
    if has(SSH_FILEXFER_ATTR_MIME_TYPE) {
        attrs.mime_type = Some(reader.read_str()?);
    }
    if has(SSH_FILEXFER_ATTR_LINK_COUNT) {
        attrs.link_count = Some(reader.read_u32()?);
    }
    if has(SSH_FILEXFER_ATTR_UNTRANSLATED_NAME) {
        attrs.untranslated_name = Some(reader.read_string()?);
    }
    if has(SSH_FILEXFER_ATTR_EXTENDED) {
        attrs.extended = Some(decode_extended(reader)?);
    }

    Ok(attrs)
}

fn decode_acl(is_v6: bool, bytes: Bytes) -> Result<Acl, Error> {
    let mut reader = WireReader::new(bytes);

    let flags = if is_v6 { reader.read_u32()? } else { 0 };
    let count = reader.read_u32()?;

    let mut aces = Vec::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        aces.push(Ace {
            ace_type: reader.read_u32()?,
            ace_flag: reader.read_u32()?,
            ace_mask: reader.read_u32()?,
            who: reader.read_str()?,
        });
    }

    Ok(Acl { flags, aces })
}

fn decode_extended(reader: &mut WireReader) -> Result<Vec<(Bytes, Bytes)>, Error> {
    let count = reader.read_u32()?;

    // The count comes from the server, do not trust it for preallocation.
    let mut extended = Vec::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        extended.push((reader.read_string()?, reader.read_string()?));
    }

    Ok(extended)
}

#[derive(Debug, Clone)]
enum Principal {
    Name(Box<str>),
    Id(u32),
}

/// Build [`FileAttrs`] to send to the server, resolving owner and group
/// through an [`IdResolver`].
///
/// Names are resolved to ids and ids to names in [`FileAttrsBuilder::build`],
/// so that the result can be encoded for any protocol version.
#[derive(Debug, Clone, Default)]
pub struct FileAttrsBuilder {
    attrs: FileAttrs,
    owner: Option<Principal>,
    group: Option<Principal>,
}

impl FileAttrsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing attributes, e.g. ones returned by the server.
    pub fn from_attrs(attrs: FileAttrs) -> Self {
        Self {
            attrs,
            ..Self::default()
        }
    }

    pub fn size(mut self, size: u64) -> Self {
        self.attrs.set_size(size);
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.attrs.set_permissions(permissions);
        self
    }

    pub fn times(mut self, atime: FileTime, mtime: FileTime) -> Self {
        self.attrs.set_time(atime, mtime);
        self
    }

    pub fn owner(mut self, name: &str) -> Self {
        self.owner = Some(Principal::Name(name.into()));
        self
    }

    pub fn group(mut self, name: &str) -> Self {
        self.group = Some(Principal::Name(name.into()));
        self
    }

    pub fn uid(mut self, uid: u32) -> Self {
        self.owner = Some(Principal::Id(uid));
        self
    }

    pub fn gid(mut self, gid: u32) -> Self {
        self.group = Some(Principal::Id(gid));
        self
    }

    pub fn extended(mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.attrs.push_extended(name.into(), value.into());
        self
    }

    /// An owner or group name that cannot be resolved is an error.
    ///
    /// A numeric id whose name is unknown is kept as is, in which case the
    /// attributes can only be sent with protocol 1 to 3.
    pub fn build(self, resolver: &dyn IdResolver) -> Result<FileAttrs, Error> {
        let Self {
            mut attrs,
            owner,
            group,
        } = self;

        match (owner, group) {
            (None, None) => (),
            (Some(owner), Some(group)) => {
                let (uid, owner) = resolve(
                    owner,
                    |name| resolver.uid_of(name),
                    |uid| resolver.owner_of(uid),
                    Error::UnknownOwner,
                )?;
                let (gid, group) = resolve(
                    group,
                    |name| resolver.gid_of(name),
                    |gid| resolver.group_of(gid),
                    Error::UnknownGroup,
                )?;

                attrs.set_id((uid, gid));
                if let (Some(owner), Some(group)) = (owner, group) {
                    attrs.set_owner_group(owner, group);
                }
            }
            _ => return Err(Error::InvalidAttrs(&"Owner and group must be set together")),
        }

        Ok(attrs)
    }
}

fn resolve(
    principal: Principal,
    id_of: impl FnOnce(&str) -> Option<u32>,
    name_of: impl FnOnce(u32) -> Option<Box<str>>,
    unknown: fn(Box<str>) -> Error,
) -> Result<(u32, Option<Box<str>>), Error> {
    match principal {
        Principal::Name(name) => match id_of(&name) {
            Some(id) => Ok((id, Some(name))),
            None => Err(unknown(name)),
        },
        Principal::Id(id) => Ok((id, name_of(id))),
    }
}
