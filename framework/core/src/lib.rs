mod abort;
mod shutdown;

pub mod prelude {
    pub use crate::abort::StepAbortError;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
