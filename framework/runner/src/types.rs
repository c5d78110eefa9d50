/// Recommended error type for your scenario `main` function and any shared behaviour code that you
/// write for hooks. This type is compatible with the [crate::definition::HookResult] type so you can
/// use `?` to propagate errors.
///
/// Return a [canary_core::prelude::StepAbortError] to report the target as unhealthy. Anything else
/// is a harness failure.
pub type CanaryResult<T> = anyhow::Result<T>;
