pub mod hooks;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod store;

pub use hooks::*;
pub use retry::*;
pub use runner::*;
pub use scheduler::*;
pub use store::*;
