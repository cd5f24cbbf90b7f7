use stratus_derive::stratus_error;
use std::borrow::Cow;

#[stratus_error]
#[derive(Debug)]
pub enum QueueError {
    #[error("Queue full")]
    Full { capacity: usize },

    #[error("Queue closed{}", format_context(.context))]
    Closed { context: Option<Cow<'static, std::primitive::str>> },
}

fn main() {
    let full = QueueError::Full { capacity: 4 };
    assert_eq!(full.kind(), "Full");
    assert!(full.context_str().is_none());
}
