//! Sync Handlers

pub(crate) mod cancel;
pub(crate) mod connectivity;
pub(crate) mod history;
pub(crate) mod manual;
pub(crate) mod mappings;
pub(crate) mod preview;
pub(crate) mod queue;
pub(crate) mod ranks;
pub(crate) mod retry_failed;
pub(crate) mod status;

