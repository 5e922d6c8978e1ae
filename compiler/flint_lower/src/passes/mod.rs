//! The compile passes, in the order they run.

pub(crate) mod lower;
pub(crate) mod resolve;
pub(crate) mod scan;
pub(crate) mod transform;
