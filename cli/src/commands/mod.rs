mod create;
mod delete;
mod list;

pub use create::Create;
pub use delete::Delete;
pub use list::List;

use anyhow::anyhow;
use posts_core::DispatchError;

/// Turn a dispatch failure into a message that says which side failed.
pub fn describe(err: DispatchError) -> anyhow::Error {
    match err {
        DispatchError::Network(reason) => anyhow!("could not reach the server: {reason}"),
        DispatchError::Application {
            status,
            diagnostic: Some(diagnostic),
            ..
        } => anyhow!("server rejected the request with status {status}: {diagnostic}"),
        DispatchError::Application {
            status,
            decode_error: Some(decode_error),
            ..
        } => anyhow!("server rejected the request with status {status}; its response could not be understood: {decode_error}"),
        DispatchError::Application { status, .. } => anyhow!("server rejected the request with status {status}"),
        DispatchError::Parse(reason) => anyhow!("server response could not be understood: {reason}"),
        other => anyhow!(other),
    }
}
