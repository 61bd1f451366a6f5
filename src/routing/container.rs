//! Constructors keyed by identifier, used to build controllers and
//! middleware named in route definitions.

use super::controller::Controller;
use crate::{errors::Error, middleware::Middleware};
use std::{any::Any, collections::HashMap, fmt, sync::Arc};

/// A freshly constructed binding.
pub enum Instance {
    Controller(Box<dyn Controller>),
    Middleware(Arc<dyn Middleware>),
    Service(Box<dyn Any + Send>),
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Controller(_) => f.write_str("Controller"),
            Self::Middleware(middleware) => f.debug_tuple("Middleware").field(&middleware.name()).finish(),
            Self::Service(_) => f.write_str("Service"),
        }
    }
}

type Factory = Box<dyn Fn() -> Instance + Send + Sync>;

/// Registry of constructors.
///
/// Every [`resolve`](Self::resolve) builds a new instance; a binding that
/// must be shared captures an `Arc` in its constructor.
///
/// # Examples
/// ```
/// use kiln::routing::{Container, Instance};
///
/// let mut container = Container::new();
/// container.bind("greeting", || String::from("hello"));
///
/// let Ok(Instance::Service(service)) = container.resolve("greeting") else {
///     unreachable!();
/// };
/// assert_eq!(service.downcast_ref::<String>().map(String::as_str), Some("hello"));
/// ```
#[derive(Default)]
pub struct Container {
    factories: HashMap<String, Factory>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_controller<C, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.insert(id, move || Instance::Controller(Box::new(factory())))
    }

    pub fn bind_middleware<M, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.insert(id, move || Instance::Middleware(Arc::new(factory())))
    }

    /// Binds anything that is neither a controller nor a middleware.
    pub fn bind<T, F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(id, move || Instance::Service(Box::new(factory())))
    }

    fn insert<F>(&mut self, id: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Instance + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
        self
    }

    pub fn has(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Constructs whatever is bound to `id`.
    pub fn resolve(&self, id: &str) -> Result<Instance, Error> {
        self.factories
            .get(id)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnresolvedBinding(id.to_string()))
    }

    /// Constructs the service bound to `id` as a `T`.
    ///
    /// `None` when nothing is bound or the binding is not a `T` service.
    pub fn make<T: Any>(&self, id: &str) -> Option<Box<T>> {
        match self.resolve(id).ok()? {
            Instance::Service(service) => service.downcast().ok(),
            _ => None,
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        f.debug_struct("Container").field("bindings", &ids).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::builtin::AddFrameGuard;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn resolves_each_kind() {
        let mut container = Container::new();
        container
            .bind_middleware("frame", || AddFrameGuard)
            .bind("limit", || 10_usize);

        assert!(matches!(container.resolve("frame"), Ok(Instance::Middleware(_))));
        assert!(matches!(container.resolve("limit"), Ok(Instance::Service(_))));
        assert!(matches!(
            container.resolve("missing"),
            Err(Error::UnresolvedBinding(id)) if id == "missing"
        ));
    }

    #[test]
    fn typed_services() {
        let mut container = Container::new();
        container.bind("limit", || 10_usize);

        #[rustfmt::skip]
        let cases = [
            ("limit",   Some(10)),
            ("missing", None),
        ];

        for (id, expected) in cases {
            assert_eq!(container.make::<usize>(id).map(|boxed| *boxed), expected, "{id}");
        }
        assert!(container.make::<String>("limit").is_none());
    }

    #[test]
    fn constructs_on_every_resolve() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);

        let mut container = Container::new();
        container.bind("counter", move || counter.fetch_add(1, Ordering::SeqCst));

        for _ in 0..3 {
            container.resolve("counter").unwrap();
        }
        assert_eq!(built.load(Ordering::SeqCst), 3);
        assert!(container.has("counter"));
        assert!(!container.has("other"));
    }
}
