//! Route providers.
//!
//! A provider bundles the routes of one module so the application can
//! register them without knowing the individual routes.

use crate::error::RouterError;
use crate::router::Router;

/// Registers a group of routes on a router.
pub trait RoutingProvider {
    /// Adds this provider's routes to `router`.
    fn register_routes(&self, router: &mut Router) -> Result<(), RouterError>;
}

impl<F> RoutingProvider for F
where
    F: Fn(&mut Router) -> Result<(), RouterError>,
{
    fn register_routes(&self, router: &mut Router) -> Result<(), RouterError> {
        self(router)
    }
}

/// Several providers acting as one, invoked in insertion order.
///
/// # Example
///
/// ```
/// use middle_router::{Router, RouterError, RoutingProviderCollection};
///
/// let providers = RoutingProviderCollection::new()
///     .with(|_router: &mut Router| -> Result<(), RouterError> { Ok(()) })
///     .with(|_router: &mut Router| -> Result<(), RouterError> { Ok(()) });
///
/// let mut router = Router::new("http://localhost").unwrap();
/// router.register_routes(&providers).unwrap();
/// assert_eq!(providers.len(), 2);
/// ```
#[derive(Default)]
pub struct RoutingProviderCollection {
    providers: Vec<Box<dyn RoutingProvider>>,
}

impl RoutingProviderCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider.
    pub fn with(mut self, provider: impl RoutingProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Returns the number of providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns true if the collection holds no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl FromIterator<Box<dyn RoutingProvider>> for RoutingProviderCollection {
    fn from_iter<I: IntoIterator<Item = Box<dyn RoutingProvider>>>(iter: I) -> Self {
        Self {
            providers: iter.into_iter().collect(),
        }
    }
}

impl RoutingProvider for RoutingProviderCollection {
    fn register_routes(&self, router: &mut Router) -> Result<(), RouterError> {
        self.providers
            .iter()
            .try_for_each(|provider| provider.register_routes(router))
    }
}

impl std::fmt::Debug for RoutingProviderCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingProviderCollection")
            .field("providers", &self.providers.len())
            .finish()
    }
}
