#![forbid(unsafe_code)]

use super::constants::*;

use bitflags::bitflags;

bitflags! {
    /// `pflags` of an open request in protocol 1 to 4.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open the file for reading.
        const READ = SSH_FXF_READ;

        /// Open the file for writing.
        /// If both this and READ are specified, the file is opened for both
        /// reading and writing.
        const WRITE = SSH_FXF_WRITE;

        /// Force all writes to append data at the end of the file.
        const APPEND = SSH_FXF_APPEND;

        /// Create the file if it does not exist yet.
        const CREAT = SSH_FXF_CREAT;

        /// Truncate an existing file to zero length.
        /// CREAT MUST also be specified if this flag is used.
        const TRUNC = SSH_FXF_TRUNC;

        /// Fail if the file already exists.
        /// CREAT MUST also be specified if this flag is used.
        const EXCL = SSH_FXF_EXCL;

        /// Open in text mode, protocol 4 only.
        const TEXT = SSH_FXF_TEXT;
    }
}

bitflags! {
    /// Flags of a rename request, protocol 5 and later.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct RenameFlags: u32 {
        /// Replace the target if it exists.
        const OVERWRITE = SSH_FXF_RENAME_OVERWRITE;

        /// The target is replaced atomically, implies OVERWRITE.
        const ATOMIC = SSH_FXF_RENAME_ATOMIC;

        /// Use whatever semantics the server's filesystem has natively.
        const NATIVE = SSH_FXF_RENAME_NATIVE;
    }
}

/// Options and flags which can be used to configure how a file is opened.
///
/// The same options are translated to `pflags` for protocol 1 to 4, and to
/// desired access plus disposition for protocol 5 and later.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct OpenOptions {
    read: bool,
    write: bool,
    append: bool,
    create: bool,
    truncate: bool,
    exclusive: bool,
    text: bool,
}

impl OpenOptions {
    pub const fn new() -> Self {
        Self {
            read: false,
            write: false,
            append: false,
            create: false,
            truncate: false,
            exclusive: false,
            text: false,
        }
    }

    pub const fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    pub const fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Writes always go to the end of the file.
    pub const fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub const fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Only takes effect together with [`OpenOptions::create`].
    pub const fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Fail if the file exists. Only takes effect together with
    /// [`OpenOptions::create`].
    pub const fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Ignored by protocol 1 to 3.
    pub const fn text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    pub fn pflags(self) -> OpenFlags {
        let mut flags = OpenFlags::empty();

        flags.set(OpenFlags::READ, self.read);
        flags.set(OpenFlags::WRITE, self.write || self.append);
        flags.set(OpenFlags::APPEND, self.append);
        flags.set(OpenFlags::TEXT, self.text);

        if self.create {
            flags |= OpenFlags::CREAT;
            flags.set(OpenFlags::TRUNC, self.truncate);
            flags.set(OpenFlags::EXCL, self.exclusive);
        }

        flags
    }

    /// ACE4 mask of a protocol 5 open request.
    pub fn desired_access(self) -> u32 {
        let mut access = 0;

        if self.read {
            access |= ACE4_READ_DATA | ACE4_READ_ATTRIBUTES;
        }
        if self.write {
            access |= ACE4_WRITE_DATA | ACE4_WRITE_ATTRIBUTES;
        }
        if self.append {
            access |= ACE4_APPEND_DATA | ACE4_WRITE_ATTRIBUTES;
        }

        access
    }

    /// Disposition and flags of a protocol 5 open request.
    pub fn v5_flags(self) -> u32 {
        let disposition = match (self.create, self.exclusive, self.truncate) {
            (true, true, _) => SSH_FXF_CREATE_NEW,
            (true, false, true) => SSH_FXF_CREATE_TRUNCATE,
            (true, false, false) => SSH_FXF_OPEN_OR_CREATE,
            (false, _, _) => SSH_FXF_OPEN_EXISTING,
        };

        let mut flags = disposition;
        if self.append {
            flags |= SSH_FXF_APPEND_DATA;
        }
        if self.text {
            flags |= SSH_FXF_TEXT_MODE;
        }

        flags
    }
}
