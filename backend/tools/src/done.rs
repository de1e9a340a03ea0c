use async_trait::async_trait;
use devclaw_core::{CancellationToken, Tool, ToolArgs, ToolResult};

/// `done{summary}`. The agent loop intercepts `done` itself; this handler
/// keeps the command resolvable through the registry.
pub struct DoneTool;

#[async_trait]
impl Tool for DoneTool {
    fn name(&self) -> &str {
        "done"
    }

    async fn execute(&self, args: &ToolArgs, _cancel: &CancellationToken) -> ToolResult {
        let summary = args.get("summary").map(|s| s.trim()).unwrap_or("");
        if summary.is_empty() {
            ToolResult::success("Task completed.")
        } else {
            ToolResult::success(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_summary() {
        let res = DoneTool.execute(&ToolArgs::new(), &CancellationToken::new()).await;
        assert_eq!(res.output, "Task completed.");
    }
}
