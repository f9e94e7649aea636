use anyhow::Result;
use async_trait::async_trait;

use crate::schema::StructuredOutput;

/// Object-safe seam for the language-model call: prompt in, text or
/// schema-forced structured value out. Retry and fallback policy belong to
/// the caller.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Free-text completion.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Structured completion. The returned value conforms to `schema` as far
    /// as the provider enforces it; callers deserialize into their own types.
    async fn extract_value(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
    ) -> Result<serde_json::Value>;
}

/// Typed wrapper over [`ModelClient::extract_value`].
pub async fn extract<T: StructuredOutput>(
    client: &dyn ModelClient,
    system: &str,
    user: &str,
) -> Result<T> {
    let value = client
        .extract_value(system, user, T::output_schema())
        .await?;
    serde_json::from_value(value)
        .map_err(|e| anyhow::anyhow!("failed to deserialize structured response: {e}"))
}
