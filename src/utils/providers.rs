//! `backend:provider` parsing and availability listing

use crate::{
    config::ExecutionProvider,
    error::{ColorizeError, Result},
    processor::BackendType,
};

/// Information about an execution provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub execution_provider: ExecutionProvider,
    pub available: bool,
    pub description: String,
}

/// Every combination the CLI and `COLORIT_BACKEND` accept
const COMBINATIONS: [(BackendType, ExecutionProvider, &str); 5] = [
    (
        BackendType::Onnx,
        ExecutionProvider::Auto,
        "ONNX Runtime with auto-selected provider",
    ),
    (
        BackendType::Onnx,
        ExecutionProvider::Cpu,
        "ONNX Runtime CPU execution",
    ),
    (
        BackendType::Onnx,
        ExecutionProvider::Cuda,
        "ONNX Runtime CUDA GPU acceleration",
    ),
    (
        BackendType::Onnx,
        ExecutionProvider::CoreMl,
        "ONNX Runtime CoreML (Apple Silicon) acceleration",
    ),
    (
        BackendType::Tract,
        ExecutionProvider::Cpu,
        "Pure Rust CPU inference via Tract",
    ),
];

/// Utility for parsing and managing execution providers
pub struct ExecutionProviderManager;

impl ExecutionProviderManager {
    /// Parse a `backend:provider` string (case-insensitive)
    ///
    /// A bare backend name selects that backend's default provider.
    ///
    /// # Examples
    /// ```rust
    /// use colorit::{utils::ExecutionProviderManager, BackendType, ExecutionProvider};
    ///
    /// let (backend, provider) = ExecutionProviderManager::parse_provider_string("tract:cpu").unwrap();
    /// assert_eq!(backend, BackendType::Tract);
    /// assert_eq!(provider, ExecutionProvider::Cpu);
    /// ```
    pub fn parse_provider_string(provider_str: &str) -> Result<(BackendType, ExecutionProvider)> {
        let normalized = provider_str.trim().to_ascii_lowercase();
        let (backend, provider) = match normalized.split_once(':') {
            Some((backend, provider)) => (backend, Some(provider)),
            None => (normalized.as_str(), None),
        };

        let backend_type = match backend {
            "onnx" => BackendType::Onnx,
            "tract" => BackendType::Tract,
            _ => {
                return Err(ColorizeError::invalid_config(format!(
                    "Unknown backend: '{}'. Use backend:provider (e.g., onnx:auto, tract:cpu)",
                    provider_str
                )));
            },
        };

        let Some(provider) = provider else {
            return Ok((backend_type, Self::default_provider_for_backend(backend_type)));
        };

        COMBINATIONS
            .iter()
            .find(|(b, p, _)| *b == backend_type && p.to_string() == provider)
            .map(|(b, p, _)| (*b, *p))
            .ok_or_else(|| {
                let supported: Vec<String> = COMBINATIONS
                    .iter()
                    .filter(|(b, _, _)| *b == backend_type)
                    .map(|(_, p, _)| p.to_string())
                    .collect();
                ColorizeError::invalid_config(format!(
                    "Unknown {} provider: '{}'. Supported: {}",
                    backend_type,
                    provider,
                    supported.join(", ")
                ))
            })
    }

    /// All combinations with their availability in this build and on this machine
    #[must_use]
    pub fn list_all_providers() -> Vec<ProviderInfo> {
        #[cfg(feature = "onnx")]
        let onnx_available: Vec<(String, bool)> = crate::backends::OnnxBackend::list_providers()
            .into_iter()
            .map(|(name, available, _)| (name.to_lowercase(), available))
            .collect();
        #[cfg(not(feature = "onnx"))]
        let onnx_available: Vec<(String, bool)> = Vec::new();

        COMBINATIONS
            .iter()
            .map(|(backend_type, provider, description)| {
                let available = match (backend_type, provider) {
                    (BackendType::Tract, _) => cfg!(feature = "tract"),
                    // Auto always has at least the CPU fallback
                    (BackendType::Onnx, ExecutionProvider::Auto) => !onnx_available.is_empty(),
                    (BackendType::Onnx, p) => onnx_available
                        .iter()
                        .any(|(name, ok)| *ok && *name == p.to_string()),
                };
                let enabled = match backend_type {
                    BackendType::Onnx => cfg!(feature = "onnx"),
                    BackendType::Tract => cfg!(feature = "tract"),
                };

                ProviderInfo {
                    name: Self::provider_to_string(*backend_type, *provider),
                    backend_type: *backend_type,
                    execution_provider: *provider,
                    available,
                    description: if enabled {
                        (*description).to_string()
                    } else {
                        format!("{description} (feature disabled)")
                    },
                }
            })
            .collect()
    }

    #[must_use]
    pub fn is_valid_provider_string(provider_str: &str) -> bool {
        Self::parse_provider_string(provider_str).is_ok()
    }

    /// Get the default provider for a given backend type
    #[must_use]
    pub fn default_provider_for_backend(backend_type: BackendType) -> ExecutionProvider {
        match backend_type {
            BackendType::Onnx => ExecutionProvider::Auto,
            BackendType::Tract => ExecutionProvider::Cpu,
        }
    }

    /// Convert backend type and execution provider back to string
    #[must_use]
    pub fn provider_to_string(backend_type: BackendType, provider: ExecutionProvider) -> String {
        format!("{backend_type}:{provider}")
    }
}
