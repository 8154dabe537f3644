//! # Document Rendering Ports
//!
//! The core never touches DOCX templates or PDF engines. It assembles a
//! bindings document (buyers, schedule, totals, DP breakdown, localized
//! strings) and hands it to the renderer behind this port. Renders carry a
//! hard timeout; on expiry the call fails `RENDER_TIMEOUT` and no state is
//! mutated.
//!
//! Number-to-words is a separate port because it is called once per
//! monetary cell, in the document's language.

use std::time::Duration;

use async_trait::async_trait;

use aqar_core::{DomainError, DomainResult, Language, Money};

/// Hard ceiling on a single render.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Opaque template-driven document renderer.
#[async_trait]
pub trait DocRenderer: Send + Sync {
    /// Render `template_key` with the supplied bindings into final bytes
    /// (DOCX or PDF, the adapter decides).
    async fn render(&self, template_key: &str, bindings: &serde_json::Value)
        -> DomainResult<Vec<u8>>;
}

/// Run a render under the hard timeout.
pub async fn render_with_timeout(
    renderer: &dyn DocRenderer,
    template_key: &str,
    bindings: &serde_json::Value,
    timeout: Duration,
) -> DomainResult<Vec<u8>> {
    match tokio::time::timeout(timeout, renderer.render(template_key, bindings)).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::RenderTimeout(timeout)),
    }
}

/// Words-for-amount conversion in the document language.
#[async_trait]
pub trait AmountWords: Send + Sync {
    async fn to_words(&self, amount: Money, language: Language) -> DomainResult<String>;
}

/// Echo renderer: returns the bindings as pretty JSON bytes. Serves tests
/// and the CLI's dry-run output.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonEchoRenderer;

#[async_trait]
impl DocRenderer for JsonEchoRenderer {
    async fn render(
        &self,
        template_key: &str,
        bindings: &serde_json::Value,
    ) -> DomainResult<Vec<u8>> {
        let doc = serde_json::json!({ "template": template_key, "bindings": bindings });
        serde_json::to_vec_pretty(&doc)
            .map_err(|e| DomainError::UpstreamUnavailable(format!("render encode: {e}")))
    }
}

/// Digit-echo words adapter: renders the rounded amount as digits with a
/// language marker. Real wiring calls the external number-to-words
/// service.
#[derive(Debug, Default, Clone, Copy)]
pub struct DigitWords;

#[async_trait]
impl AmountWords for DigitWords {
    async fn to_words(&self, amount: Money, language: Language) -> DomainResult<String> {
        let tag = match language {
            Language::En => "EGP",
            Language::Ar => "جنيه",
        };
        Ok(format!("{amount} {tag}"))
    }
}
