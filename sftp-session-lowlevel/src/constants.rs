macro_rules! def_constants {
    ( $ty:ty, $( $name:ident = $val:literal ),* $(,)? ) => {
        $( pub const $name: $ty = $val; )*
    };
}

// version
def_constants!(u32, SSH2_FILEXFER_MIN_VERSION = 1, SSH2_FILEXFER_MAX_VERSION = 6);

// client to server
def_constants!(
    u8,
    SSH_FXP_INIT = 1,
    SSH_FXP_OPEN = 3,
    SSH_FXP_CLOSE = 4,
    SSH_FXP_READ = 5,
    SSH_FXP_WRITE = 6,
    SSH_FXP_LSTAT = 7,
    SSH_FXP_FSTAT = 8,
    SSH_FXP_SETSTAT = 9,
    SSH_FXP_FSETSTAT = 10,
    SSH_FXP_OPENDIR = 11,
    SSH_FXP_READDIR = 12,
    SSH_FXP_REMOVE = 13,
    SSH_FXP_MKDIR = 14,
    SSH_FXP_RMDIR = 15,
    SSH_FXP_REALPATH = 16,
    SSH_FXP_STAT = 17,
    SSH_FXP_RENAME = 18,
    SSH_FXP_READLINK = 19,
    SSH_FXP_SYMLINK = 20,
    SSH_FXP_LINK = 21,
    SSH_FXP_BLOCK = 22,
    SSH_FXP_UNBLOCK = 23,
);

// server to client
def_constants!(
    u8,
    SSH_FXP_VERSION = 2,
    SSH_FXP_STATUS = 101,
    SSH_FXP_HANDLE = 102,
    SSH_FXP_DATA = 103,
    SSH_FXP_NAME = 104,
    SSH_FXP_ATTRS = 105,
);

def_constants!(u8, SSH_FXP_EXTENDED = 200, SSH_FXP_EXTENDED_REPLY = 201);

// status messages
def_constants!(u32, SSH_FX_OK = 0, SSH_FX_EOF = 1);

// attributes, protocol 1 to 3
def_constants!(
    u32,
    SSH_FILEXFER_ATTR_SIZE = 0x00000001,
    SSH_FILEXFER_ATTR_UIDGID = 0x00000002,
    SSH_FILEXFER_ATTR_PERMISSIONS = 0x00000004,
    SSH_FILEXFER_ATTR_ACMODTIME = 0x00000008,
    SSH_FILEXFER_ATTR_EXTENDED = 0x80000000,
);

// attributes, protocol 4 and later
def_constants!(
    u32,
    SSH_FILEXFER_ATTR_ACCESSTIME = 0x00000008,
    SSH_FILEXFER_ATTR_CREATETIME = 0x00000010,
    SSH_FILEXFER_ATTR_MODIFYTIME = 0x00000020,
    SSH_FILEXFER_ATTR_ACL = 0x00000040,
    SSH_FILEXFER_ATTR_OWNERGROUP = 0x00000080,
    SSH_FILEXFER_ATTR_SUBSECOND_TIMES = 0x00000100,
    SSH_FILEXFER_ATTR_BITS = 0x00000200,
    SSH_FILEXFER_ATTR_ALLOCATION_SIZE = 0x00000400,
    SSH_FILEXFER_ATTR_TEXT_HINT = 0x00000800,
    SSH_FILEXFER_ATTR_MIME_TYPE = 0x00001000,
    SSH_FILEXFER_ATTR_LINK_COUNT = 0x00002000,
    SSH_FILEXFER_ATTR_UNTRANSLATED_NAME = 0x00004000,
    SSH_FILEXFER_ATTR_CTIME = 0x00008000,
);

// file types, protocol 4 and later
def_constants!(
    u8,
    SSH_FILEXFER_TYPE_REGULAR = 1,
    SSH_FILEXFER_TYPE_DIRECTORY = 2,
    SSH_FILEXFER_TYPE_SYMLINK = 3,
    SSH_FILEXFER_TYPE_SPECIAL = 4,
    SSH_FILEXFER_TYPE_UNKNOWN = 5,
    SSH_FILEXFER_TYPE_SOCKET = 6,
    SSH_FILEXFER_TYPE_CHAR_DEVICE = 7,
    SSH_FILEXFER_TYPE_BLOCK_DEVICE = 8,
    SSH_FILEXFER_TYPE_FIFO = 9,
);

// open modes, protocol 1 to 4
def_constants!(
    u32,
    SSH_FXF_READ = 0x00000001,
    SSH_FXF_WRITE = 0x00000002,
    SSH_FXF_APPEND = 0x00000004,
    SSH_FXF_CREAT = 0x00000008,
    SSH_FXF_TRUNC = 0x00000010,
    SSH_FXF_EXCL = 0x00000020,
    SSH_FXF_TEXT = 0x00000040,
);

// open dispositions and flags, protocol 5 and later
def_constants!(
    u32,
    SSH_FXF_CREATE_NEW = 0x00000000,
    SSH_FXF_CREATE_TRUNCATE = 0x00000001,
    SSH_FXF_OPEN_EXISTING = 0x00000002,
    SSH_FXF_OPEN_OR_CREATE = 0x00000003,
    SSH_FXF_TRUNCATE_EXISTING = 0x00000004,
    SSH_FXF_APPEND_DATA = 0x00000008,
    SSH_FXF_TEXT_MODE = 0x00000020,
);

// desired access, protocol 5 and later
def_constants!(
    u32,
    ACE4_READ_DATA = 0x00000001,
    ACE4_WRITE_DATA = 0x00000002,
    ACE4_APPEND_DATA = 0x00000004,
    ACE4_READ_ATTRIBUTES = 0x00000080,
    ACE4_WRITE_ATTRIBUTES = 0x00000100,
);

// rename flags, protocol 5 and later
def_constants!(
    u32,
    SSH_FXF_RENAME_OVERWRITE = 0x00000001,
    SSH_FXF_RENAME_ATOMIC = 0x00000002,
    SSH_FXF_RENAME_NATIVE = 0x00000004,
);
