//! Internal implementation details.

pub(crate) mod frame;
pub(crate) mod release_bag;

pub(crate) use frame::Frame;
pub(crate) use release_bag::{BoxFutureUnit, Drained, ReleaseBag};
