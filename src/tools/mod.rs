mod mock;
mod runner;
pub mod templates;

pub use mock::MockToolRunner;
pub use runner::{find_in_path, ShellToolRunner, ToolInvocation, ToolOutput, ToolRunner};
