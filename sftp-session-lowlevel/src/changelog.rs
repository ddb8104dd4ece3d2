#[allow(unused_imports)]
use crate::*;

#[doc(hidden)]
/// ## Added
///  - [`FileAttrsBuilder`] to resolve owner and group names through an
///    [`IdResolver`]
pub mod unreleased {}

/// This is the first release!
///
/// ## Added
///  - [`ReaderBuffered`], [`WireReader`] and [`WireWriter`]
///  - [`Protocol`] implementations for sftp protocol 1 to 6
///  - [`FileAttrs`] with [`AttrsLayout`] V1, V4, V5 and V6
///  - [`AwaitableResponses`] and [`AwaitableResponse`]
pub mod v0_1_0 {}
