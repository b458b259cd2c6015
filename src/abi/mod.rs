//! Decoding helpers for the small, opted-in set of ABIs chainidx
//! understands. Not a general-purpose ABI decoder.

mod error;
mod logs;
mod selector;

pub use error::Error;
pub use logs::{decode_transfer_log, decode_word_at, transfer_topic0, TransferLog};
pub use selector::decode_function_name;
