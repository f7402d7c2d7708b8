pub mod supervisor;

pub use supervisor::{ProcessSupervisor, ServerProcessHandle, ServerStatus, STOP_GRACE_PERIOD};
