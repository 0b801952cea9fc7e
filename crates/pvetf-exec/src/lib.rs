//! pvetf-exec: Command execution abstraction
//!
//! Provides the executor trait used to drive external tools and a local
//! implementation backed by `tokio::process`

pub mod error;
pub mod local;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::{CommandResult, Invocation};
pub use traits::CommandExecutor;
