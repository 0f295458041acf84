use thiserror::Error;

/// A failure raised by the object graph itself: a getter, a native function,
/// or an external asynchronous source.
///
/// Faults travel through chains without being rewritten, so an observer at
/// the end of a chain sees exactly the message the graph produced.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct Fault {
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Fault {
            message: message.into(),
        }
    }
}
