pub mod command_executor;
pub mod token_manager;

pub use command_executor::{CommandError, DryRunExecutor, SafeCommandExecutor};
pub use token_manager::{CredentialSource, SecureTokenManager};
