//! Execution context detection.
//!
//! The async adapter picks its producer path from a single question: are we
//! running inside an interrupt handler? The host platform answers it.

/// Reports whether the caller runs in interrupt context.
pub trait ExecutionContext: Send + Sync {
    /// True when called from an interrupt handler.
    fn in_interrupt(&self) -> bool;
}

/// Plain thread context: never in an interrupt.
///
/// Correct for hosted targets where all producers are threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskContext;

impl ExecutionContext for TaskContext {
    #[inline]
    fn in_interrupt(&self) -> bool {
        false
    }
}

/// ESP-IDF context check (`xPortInIsrContext`).
#[cfg(target_os = "espidf")]
#[derive(Clone, Copy, Debug, Default)]
pub struct IsrAwareContext;

#[cfg(target_os = "espidf")]
impl ExecutionContext for IsrAwareContext {
    #[inline]
    fn in_interrupt(&self) -> bool {
        esp_idf_svc::hal::interrupt::active()
    }
}

/// Context check for the current target.
#[cfg(target_os = "espidf")]
pub type DefaultContext = IsrAwareContext;

/// Context check for the current target.
#[cfg(not(target_os = "espidf"))]
pub type DefaultContext = TaskContext;

impl<C: ExecutionContext + ?Sized> ExecutionContext for &C {
    #[inline]
    fn in_interrupt(&self) -> bool {
        (**self).in_interrupt()
    }
}

impl<C: ExecutionContext + ?Sized> ExecutionContext for std::sync::Arc<C> {
    #[inline]
    fn in_interrupt(&self) -> bool {
        (**self).in_interrupt()
    }
}
