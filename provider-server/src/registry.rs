//! Built-in providers and their startup sequence

use crate::config::ProviderBlock;
use crate::error::ServerConfigError;
use crate::NullProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tfengine::{Context, ProviderMap, RawConfig, ResourceConfig, ResourceProvider};
use tracing::{debug, info, warn};

/// Instantiate a built-in provider by kind
pub fn builtin(kind: &str) -> Result<Box<dyn ResourceProvider>, ServerConfigError> {
    match kind {
        "null" => Ok(Box::new(NullProvider::new())),
        other => Err(ServerConfigError::UnknownBuiltin(other.to_string())),
    }
}

/// Validate and configure every declared provider.
///
/// Warnings are logged, the first validation error aborts startup. The
/// returned map is never modified afterwards.
pub async fn initialize_providers(
    blocks: &[ProviderBlock],
) -> Result<ProviderMap, ServerConfigError> {
    let mut providers: ProviderMap = HashMap::new();

    for block in blocks {
        if providers.contains_key(&block.name) {
            return Err(ServerConfigError::DuplicateProvider(block.name.clone()));
        }

        let mut provider = builtin(&block.builtin)?;
        let raw = RawConfig::new(block.config.clone())?;
        let config = ResourceConfig::new(&raw)?;
        debug!("Configuring provider {} ({})", block.name, block.builtin);

        let diags = provider.validate(Context::new(), &config).await;
        for warning in diags.warning_messages() {
            warn!("Provider {}: {}", block.name, warning);
        }
        if let Some(first) = diags.errors.first() {
            return Err(ServerConfigError::Provider {
                name: block.name.clone(),
                message: first.message(),
            });
        }

        provider
            .configure(Context::new(), &config)
            .await
            .map_err(|e| ServerConfigError::Provider {
                name: block.name.clone(),
                message: e.to_string(),
            })?;

        info!("Registered provider {} ({})", block.name, block.builtin);
        providers.insert(block.name.clone(), Arc::from(provider));
    }

    Ok(providers)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use tfengine::Dynamic;

    fn block(name: &str, config: &[(&str, Dynamic)]) -> ProviderBlock {
        let mut block = ProviderBlock::new(name, "null");
        block.config = config
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        block
    }

    #[tokio::test]
    async fn registers_configured_providers() {
        let providers = initialize_providers(&[
            block("a", &[]),
            block("b", &[("greeting", Dynamic::from("${upper(\"hi\")}"))]),
        ])
        .await
        .unwrap();

        let mut names: Vec<&String> = providers.keys().collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn unknown_builtin_is_rejected() {
        let mut block = block("x", &[]);
        block.builtin = "aws".to_string();

        let err = initialize_providers(&[block]).await.err().unwrap();
        assert!(matches!(err, ServerConfigError::UnknownBuiltin(kind) if kind == "aws"));
    }

    #[tokio::test]
    async fn first_validation_error_is_fatal() {
        let err = initialize_providers(&[block(
            "local",
            &[("greeting", Dynamic::List(vec![Dynamic::from("hi")]))],
        )])
        .await
        .err()
        .unwrap();

        match err {
            ServerConfigError::Provider { name, message } => {
                assert_eq!(name, "local");
                assert!(message.contains("Incorrect attribute value type"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_expression_is_a_config_error() {
        let err = initialize_providers(&[block("local", &[("greeting", Dynamic::from("${upper("))])])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ServerConfigError::Engine(_)));
    }
}
