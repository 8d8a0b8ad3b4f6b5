// ABOUTME: Echo tool returning its message parameter unchanged
// ABOUTME: Useful for seeding the execution context from a document

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{parse_params, Result, Tool, ToolParams};

pub struct EchoTool;

#[derive(Debug, Deserialize)]
struct EchoParams {
    message: Value,
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Return the `message` parameter unchanged"
    }

    async fn invoke(&self, params: ToolParams) -> Result<Value> {
        let params: EchoParams = parse_params(self.name(), params)?;
        debug!("echo: {}", params.message);
        Ok(params.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_returns_message() {
        let mut params = ToolParams::new();
        params.insert("message".to_string(), json!({"n": 1}));

        assert_eq!(EchoTool.invoke(params).await.unwrap(), json!({"n": 1}));
    }

    #[tokio::test]
    async fn test_echo_requires_message() {
        let result = EchoTool.invoke(ToolParams::new()).await;
        assert!(matches!(result, Err(ToolError::InvalidParams { .. })));
    }
}
