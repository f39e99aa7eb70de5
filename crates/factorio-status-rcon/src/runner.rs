//! CommandRunner trait: the seam pollers use to issue console commands.
//! Implemented by [`SharedRcon`](crate::SharedRcon); tests inject mocks.

use std::future::Future;
use std::sync::Arc;

use crate::error::RconError;

pub trait CommandRunner: Send + Sync {
    /// Run one console command and return its trimmed payload.
    fn run_command(&self, command: &str)
    -> impl Future<Output = Result<Vec<u8>, RconError>> + Send;
}

impl<T: CommandRunner> CommandRunner for Arc<T> {
    fn run_command(
        &self,
        command: &str,
    ) -> impl Future<Output = Result<Vec<u8>, RconError>> + Send {
        (**self).run_command(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl CommandRunner for Echo {
        async fn run_command(&self, command: &str) -> Result<Vec<u8>, RconError> {
            Ok(command.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn arc_forwards_to_inner() {
        let runner = Arc::new(Echo);
        let body = runner.run_command("/players").await.expect("ok");
        assert_eq!(body, b"/players".to_vec());
    }
}
