pub mod diag;
pub mod nsx;

#[cfg(test)]
pub mod mock;

pub use diag::DiagnosticLog;
pub use nsx::{
    api_root, backoff_delay, is_mutating, page_items, ApiError, NsxClient, PolicyApi,
    OVERWRITE_HEADER,
};
