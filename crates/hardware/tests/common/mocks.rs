//! Mock tool runner.

use colorlight_soc::Result;
use colorlight_soc::build::{ToolInvocation, ToolRunner, ToolStatus};
use mockall::mock;

mock! {
    pub Runner {}
    impl ToolRunner for Runner {
        fn run(&self, invocation: &ToolInvocation) -> Result<ToolStatus>;
    }
}

/// Exit status with `code`.
pub const fn exited(code: i32) -> ToolStatus {
    ToolStatus { code: Some(code) }
}

/// A runner that must never be called.
pub fn idle_runner() -> MockRunner {
    let mut runner = MockRunner::new();
    let _ = runner.expect_run().never();
    runner
}
