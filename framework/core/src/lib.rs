mod interrupted;
mod shutdown;

pub mod prelude {
    pub use crate::interrupted::InterruptedError;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle};
}
