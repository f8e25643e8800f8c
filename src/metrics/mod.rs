//! Metrics and observability infrastructure for borealis.
//!
//! Groups the internal-event types behind the `emit!` macro. Events record
//! counters through the `metrics` crate; whether a recorder is installed is
//! the embedding process's concern.

pub mod events;

/// Emit an internal event.
///
/// Calls the `InternalEvent::emit()` method on the given event, which
/// records the corresponding counter metric.
///
/// # Example
///
/// ```ignore
/// use borealis::metrics::events::SourceScanned;
///
/// emit!(SourceScanned { files: 12 });
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
