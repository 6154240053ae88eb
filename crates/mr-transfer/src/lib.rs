// mr-transfer: cross-node data movement.
//
// `fetch` pulls an input or output archive over HTTP, streamed to disk
// with a fixed timeout; `zipdir`/`unzip` pack and unpack a job's working
// directory.

pub mod archive;
pub mod error;
pub mod fetch;

pub use archive::{unzip, zipdir};
pub use error::TransferError;
pub use fetch::fetch;
