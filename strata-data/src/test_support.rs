//! In-memory layer source for tests.
//!
//! Enabled by the `test-support` feature so that integration tests and the
//! CLI crate can drive the pipeline without building archives.

use std::collections::BTreeMap;

use camino::Utf8Path;
use strata_core::Layer;

use crate::{CancellationToken, LayerSource, LoadError};

/// Serves prepared layers by name and reports `NoShapefile` for the rest.
#[derive(Debug, Clone, Default)]
pub struct StubSource {
    layers: BTreeMap<String, Layer>,
    cancel_on_load: Option<CancellationToken>,
}

impl StubSource {
    /// Source with no layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `layer` under its own name.
    #[must_use]
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.insert(layer.name().to_owned(), layer);
        self
    }

    /// Cancel `token` whenever a layer is loaded.
    #[must_use]
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_load = Some(token);
        self
    }
}

impl LayerSource for StubSource {
    fn load(&self, name: &str, archive: &Utf8Path) -> Result<Layer, LoadError> {
        if let Some(token) = &self.cancel_on_load {
            token.cancel();
        }
        self.layers
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NoShapefile {
                path: archive.to_path_buf(),
            })
    }
}
