use std::sync::Arc;

/// Decorator wrapping a service behind the same contract.
pub trait Layer<S: ?Sized>: Send + Sync {
    /// Returns a service that handles calls and delegates to `inner`.
    fn wrap(&self, inner: Arc<S>) -> Arc<S>;
}

/// Ordered stack of layers composed around a service at construction time.
///
/// The first layer added is the outermost one and sees every call first.
pub struct Pipeline<S: ?Sized> {
    layers: Vec<Arc<dyn Layer<S>>>,
}

impl<S: ?Sized> Pipeline<S> {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Appends a layer inside the ones already added.
    #[must_use]
    pub fn layer(mut self, layer: Arc<dyn Layer<S>>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns whether the pipeline has no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wraps `service` with every layer, innermost last.
    #[must_use]
    pub fn build(&self, service: Arc<S>) -> Arc<S> {
        self.layers
            .iter()
            .rev()
            .fold(service, |inner, layer| layer.wrap(inner))
    }
}

impl<S: ?Sized> Default for Pipeline<S> {
    fn default() -> Self {
        Self::new()
    }
}
