//! Controller binding.
//!
//! A controller exposes its invocable actions through an explicit
//! [`ActionTable`] built once at bind time, and describes its routes as
//! `{ METHOD: { path: action | [actions] } }` ([`RouteDescription`]).
//! Binding resolves every action name against the table; names the table
//! does not contain are dropped with a warning, or rejected when strict
//! binding is configured.
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use relayroute::controller::{ActionTable, Controller, RouteDescription};
//! use relayroute::{HandlerError, Pipeline, RequestContext};
//!
//! struct Users {
//!     greeting: String,
//! }
//!
//! impl Controller for Users {
//!     fn routes(&self) -> RouteDescription {
//!         RouteDescription::new().route(Method::GET, "/users/:id", &["show"])
//!     }
//!
//!     fn actions() -> ActionTable<Self> {
//!         ActionTable::new().action("show", |users: &Users, ctx: &RequestContext| {
//!             Ok::<_, HandlerError>(format!("{} {}", users.greeting, ctx.param("id").unwrap_or("?")))
//!         })
//!     }
//! }
//!
//! let mut pipeline = Pipeline::new();
//! let bound = pipeline
//!     .bind_controller(Arc::new(Users { greeting: "hi".into() }))
//!     .unwrap();
//! assert_eq!(bound, 1);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, FutureExt};
use http::Method;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{HandlerError, PipelineError};
use crate::handler::{Handler, HandlerChain, HandlerFuture};
use crate::outcome::Reply;
use crate::request::RequestContext;

type ActionFn<C> = Arc<dyn Fn(Arc<C>, Arc<RequestContext>) -> HandlerFuture + Send + Sync>;

/// Named actions a controller exposes for binding.
pub struct ActionTable<C> {
    actions: Vec<(Cow<'static, str>, ActionFn<C>)>,
}

impl<C> Default for ActionTable<C> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
        }
    }
}

impl<C: Send + Sync + 'static> ActionTable<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous action. A later action with the same name
    /// replaces the earlier one.
    #[must_use]
    pub fn action<F, R>(self, name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&C, &RequestContext) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        let action: ActionFn<C> = Arc::new(move |controller: Arc<C>, ctx: Arc<RequestContext>| {
            future::ready(f(&controller, &ctx).map(Into::into)).boxed()
        });
        self.insert(name.into(), action)
    }

    /// Register an asynchronous action.
    #[must_use]
    pub fn async_action<F, Fut, R>(self, name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Arc<C>, Arc<RequestContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
        R: Into<Reply>,
    {
        let action: ActionFn<C> = Arc::new(move |controller: Arc<C>, ctx: Arc<RequestContext>| {
            f(controller, ctx)
                .map(|result| result.map(Into::into))
                .boxed()
        });
        self.insert(name.into(), action)
    }

    fn insert(mut self, name: Cow<'static, str>, action: ActionFn<C>) -> Self {
        match self.actions.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = action,
            None => self.actions.push((name, action)),
        }
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|(n, _)| n.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    fn get(&self, name: &str) -> Option<&ActionFn<C>> {
        self.actions
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, a)| a)
    }

    /// Bind `name` to `controller`, or `None` if no such action exists.
    pub(crate) fn bind(
        &self,
        name: &str,
        controller: &Arc<C>,
        controller_name: &str,
    ) -> Option<Arc<dyn Handler>> {
        let action = self.get(name)?;
        Some(Arc::new(BoundAction {
            name: format!("{controller_name}.{name}"),
            controller: Arc::clone(controller),
            action: Arc::clone(action),
        }))
    }
}

/// An action bound to its controller instance.
struct BoundAction<C> {
    name: String,
    controller: Arc<C>,
    action: ActionFn<C>,
}

impl<C: Send + Sync + 'static> Handler for BoundAction<C> {
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        (self.action)(Arc::clone(&self.controller), ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A group of related route handlers sharing one receiver.
pub trait Controller: Send + Sync + Sized + 'static {
    /// Name used in logs and bound handler names.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Routes this controller serves.
    fn routes(&self) -> RouteDescription;

    /// Actions this controller exposes.
    fn actions() -> ActionTable<Self>;
}

/// One `(method, path)` entry of a route description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribedRoute {
    pub method: Method,
    pub path: String,
    /// Action names, in chain order
    pub actions: Vec<String>,
}

/// Declarative `{ METHOD: { path: action | [actions] } }` route mapping.
///
/// Entry order is preserved, both when built in code and when read from a
/// JSON or YAML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteDescription {
    routes: Vec<DescribedRoute>,
}

impl RouteDescription {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn route(mut self, method: Method, path: impl Into<String>, actions: &[&str]) -> Self {
        self.routes.push(DescribedRoute {
            method,
            path: path.into(),
            actions: actions.iter().map(|a| (*a).to_string()).collect(),
        });
        self
    }

    pub fn from_json(document: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(document).map_err(|e| PipelineError::Description(e.to_string()))
    }

    pub fn from_yaml(document: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(document).map_err(|e| PipelineError::Description(e.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DescribedRoute> {
        self.routes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Parse a description method name (case-insensitive).
pub fn parse_method(name: &str) -> Result<Method, PipelineError> {
    match name.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        _ => Err(PipelineError::UnsupportedMethod(name.to_string())),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionNames {
    One(String),
    Many(Vec<String>),
}

impl ActionNames {
    fn into_vec(self) -> Vec<String> {
        match self {
            ActionNames::One(name) => vec![name],
            ActionNames::Many(names) => names,
        }
    }
}

/// `{ path: action | [actions] }`, in document order.
struct PathActions(Vec<(String, ActionNames)>);

impl<'de> Deserialize<'de> for PathActions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PathActionsVisitor;

        impl<'de> Visitor<'de> for PathActionsVisitor {
            type Value = PathActions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of path to action name or list of action names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PathActions, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((path, actions)) = map.next_entry::<String, ActionNames>()? {
                    entries.push((path, actions));
                }
                Ok(PathActions(entries))
            }
        }

        deserializer.deserialize_map(PathActionsVisitor)
    }
}

impl<'de> Deserialize<'de> for RouteDescription {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DescriptionVisitor;

        impl<'de> Visitor<'de> for DescriptionVisitor {
            type Value = RouteDescription;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of HTTP method to route map")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> Result<RouteDescription, A::Error> {
                let mut routes = Vec::new();
                while let Some(name) = map.next_key::<String>()? {
                    let method = parse_method(&name).map_err(de::Error::custom)?;
                    let PathActions(paths) = map.next_value()?;
                    routes.extend(paths.into_iter().map(|(path, actions)| DescribedRoute {
                        method: method.clone(),
                        path,
                        actions: actions.into_vec(),
                    }));
                }
                Ok(RouteDescription { routes })
            }
        }

        deserializer.deserialize_map(DescriptionVisitor)
    }
}

/// A route ready for registration.
pub(crate) struct BoundRoute {
    pub method: Method,
    pub path: String,
    pub chain: HandlerChain,
}

/// Resolve every described route against `table`.
///
/// In strict mode the whole description is checked before anything is
/// returned, so a failed bind registers nothing.
pub(crate) fn bind<C: Controller>(
    description: &RouteDescription,
    table: &ActionTable<C>,
    controller: &Arc<C>,
    strict: bool,
) -> Result<Vec<BoundRoute>, PipelineError> {
    let controller_name = controller.name();

    if strict {
        if let Some(missing) = description
            .iter()
            .flat_map(|r| r.actions.iter())
            .find(|a| !table.contains(a))
        {
            return Err(PipelineError::UnknownAction {
                controller: controller_name.to_string(),
                action: missing.clone(),
            });
        }
    }

    let mut bound = Vec::with_capacity(description.len());
    for route in description.iter() {
        let mut chain = HandlerChain::new();
        for action in &route.actions {
            match table.bind(action, controller, controller_name) {
                Some(handler) => chain.push(handler),
                None => warn!(
                    controller = controller_name,
                    action = %action,
                    method = %route.method,
                    path = %route.path,
                    "Dropping unknown controller action"
                ),
            }
        }

        if chain.is_empty() {
            warn!(
                controller = controller_name,
                method = %route.method,
                path = %route.path,
                "No resolvable actions; route skipped"
            );
            continue;
        }

        debug!(
            controller = controller_name,
            method = %route.method,
            path = %route.path,
            chain = ?chain,
            "Controller route resolved"
        );
        bound.push(BoundRoute {
            method: route.method.clone(),
            path: route.path.clone(),
            chain,
        });
    }
    Ok(bound)
}
