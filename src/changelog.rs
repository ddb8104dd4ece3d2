#[allow(unused_imports)]
use crate::*;

#[doc(hidden)]
/// ## Added
///  - [`Session::reconnect`]
///  - [`DEFAULT_MAX_PACKET_LEN`]
///
/// ## Fixed
///  - The default packet limit leaves room for the header of a `DATA`
///    response to a read of [`OPENSSH_PORTABLE_MAX_MSG_LENGTH`] bytes
///  - Requests made after [`Session::close_channel`] fail with
///    [`Error::ChannelClosed`] instead of waiting for the close
pub mod unreleased {}

/// This is the first release!
///
/// ## Added
///  - [`Session`] and its drive loop [`Session::run_until`]
///  - [`Transport`] and [`PipeTransport`]
///  - [`SessionOptions`]
///  - Feature `openssh`
pub mod v0_1_0 {}
