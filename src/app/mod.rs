//! Run orchestration for the `sitemirror` binary.

pub(crate) mod exit_handler;
pub(crate) mod progress_manager;
pub(crate) mod runtime;
pub(crate) mod validation;
