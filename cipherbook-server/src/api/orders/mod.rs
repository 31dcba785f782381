//! Order endpoints.

pub(super) mod query;
pub(super) mod status;
pub(super) mod submit;
pub(super) mod ws;
