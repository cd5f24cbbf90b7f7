use std::borrow::Cow;

/// Errors reported by the diagnostic and construction APIs of the [`EventBus`](crate::EventBus).
///
/// Plain dispatch never surfaces these; they only come back from the `try_*` family,
/// [`EventBus::with_config`](crate::EventBus::with_config) and [`SceneGraph`](crate::SceneGraph)
/// edits.
#[stratus_derive::stratus_error]
pub enum EventBusError {
    /// The receiver has no registry entry and strict receivers are enabled.
    #[error("Unknown receiver{}: {message}", format_context(.context))]
    UnknownReceiver { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The bus has been shut down and no longer accepts work.
    #[error("Event bus shutting down{}: {message}", format_context(.context))]
    ShuttingDown { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The next-tick queue reached its configured capacity.
    #[error("Deferred queue full{}: {message}", format_context(.context))]
    QueueFull { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Capacity must be greater than zero for the deferred queue.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Occurs when an internal dynamic cast fails.
    /// This indicates an invariant violation in the per-type subscription table.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A scene graph edit would create a cycle or self-parenting.
    #[error("Invalid hierarchy{}: {message}", format_context(.context))]
    InvalidHierarchy { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
