//! Status code classification.

/// Outcome of classifying a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    ApplicationError,
}

/// `[200, 300)` is success; every other status is an application error.
pub fn classify(status: u16) -> Classification {
    if (200..300).contains(&status) {
        Classification::Success
    } else {
        Classification::ApplicationError
    }
}
