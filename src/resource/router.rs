use std::sync::Arc;

use http::Method;
use tracing::{info, warn};

use super::kind::Kind;
use super::object::{Object, ObjectIdentifier, ObjectList};
use super::store::Store;
use crate::call::{CallResourceHandler, CallResourceRequest, ResponseSender};
use crate::context::RequestContext;
use crate::json::{json_handler, to_json, HttpError, JsonRequest, JsonRouter};
use crate::router::RouterError;

/// Generic CRUD surface for registered kinds, backed by a [`Store`].
///
/// Each kind gets:
///
/// | Route | Store call | Success |
/// |---|---|---|
/// | `GET /{group}/{version}/{plural}` | `list` | 200 |
/// | `POST /{group}/{version}/{plural}` | `add` | 202 |
/// | `GET /{group}/{version}/{plural}/{name}` | `get` | 200 |
/// | `PUT /{group}/{version}/{plural}/{name}` | `update` | 202 |
/// | `DELETE /{group}/{version}/{plural}/{name}` | `delete` | 204 |
///
/// Store failures surface as 500; writes get the kind's identity and the
/// router's namespace stamped onto the object before they reach the store.
pub struct ResourceGroupRouter {
    router: JsonRouter,
    namespace: String,
    store: Arc<dyn Store>,
}

impl ResourceGroupRouter {
    pub fn new(store: Arc<dyn Store>, namespace: impl Into<String>) -> Self {
        Self {
            router: JsonRouter::new(),
            namespace: namespace.into(),
            store,
        }
    }

    /// Build a router serving every kind in `kinds`.
    pub fn with_kinds(
        store: Arc<dyn Store>,
        namespace: impl Into<String>,
        kinds: impl IntoIterator<Item = Kind>,
    ) -> Result<Self, RouterError> {
        let mut router = Self::new(store, namespace);
        for kind in kinds {
            router.add_kind(kind)?;
        }
        Ok(router)
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn json_router(&self) -> &JsonRouter {
        &self.router
    }

    /// Access to the underlying router, for middleware and extra routes.
    pub fn json_router_mut(&mut self) -> &mut JsonRouter {
        &mut self.router
    }

    /// Register the five CRUD routes for `kind`.
    pub fn add_kind(&mut self, kind: Kind) -> Result<(), RouterError> {
        let collection = format!("/{}/{}/{}", kind.group(), kind.version(), kind.plural());
        let item = format!("{collection}/{{name}}");
        let kind = Arc::new(kind);
        info!(
            group = kind.group(),
            version = kind.version(),
            kind = kind.kind(),
            path = %collection,
            "Registering resource routes"
        );

        let ops = self.ops(&kind);
        self.router.handle_with_code(
            &collection,
            200,
            json_handler(move |_ctx, _req| to_json(&ops.list()?)),
            &[Method::GET],
        )?;

        let ops = self.ops(&kind);
        self.router.handle_with_code(
            &collection,
            202,
            json_handler(move |_ctx, req| to_json(&ops.create(req)?)),
            &[Method::POST],
        )?;

        let ops = self.ops(&kind);
        self.router.handle_with_code(
            &item,
            200,
            json_handler(move |_ctx, req| to_json(&ops.get(req)?)),
            &[Method::GET],
        )?;

        let ops = self.ops(&kind);
        self.router.handle_with_code(
            &item,
            202,
            json_handler(move |_ctx, req| to_json(&ops.update(req)?)),
            &[Method::PUT],
        )?;

        let ops = self.ops(&kind);
        self.router.handle_with_code(
            &item,
            204,
            json_handler(move |_ctx, req| {
                ops.delete(req)?;
                Ok(None)
            }),
            &[Method::DELETE],
        )?;

        Ok(())
    }

    fn ops(&self, kind: &Arc<Kind>) -> KindOps {
        KindOps {
            kind: Arc::clone(kind),
            namespace: self.namespace.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl CallResourceHandler for ResourceGroupRouter {
    fn call_resource(
        &self,
        ctx: RequestContext,
        req: CallResourceRequest,
        sender: &dyn ResponseSender,
    ) -> anyhow::Result<()> {
        self.router.call_resource(ctx, req, sender)
    }
}

/// Store operations for one kind, captured by that kind's route handlers.
struct KindOps {
    kind: Arc<Kind>,
    namespace: String,
    store: Arc<dyn Store>,
}

impl KindOps {
    fn list(&self) -> Result<ObjectList, HttpError> {
        let items = self
            .store
            .list(&self.kind, &self.namespace)
            .map_err(|e| self.store_error("list", e))?;
        Ok(ObjectList {
            api_version: self.kind.api_version(),
            kind: format!("{}List", self.kind.kind()),
            items,
        })
    }

    fn create(&self, req: &JsonRequest) -> Result<Object, HttpError> {
        let mut object = self.decode(req)?;
        self.stamp(&mut object);
        self.store
            .add(&self.kind, object)
            .map_err(|e| self.store_error("add", e))
    }

    fn get(&self, req: &JsonRequest) -> Result<Object, HttpError> {
        let id = self.identifier(req)?;
        self.store
            .get(&self.kind, &id)
            .map_err(|e| self.store_error("get", e))
    }

    fn update(&self, req: &JsonRequest) -> Result<Object, HttpError> {
        let id = self.identifier(req)?;
        let mut object = self.decode(req)?;
        self.stamp(&mut object);
        object.metadata_mut().name = Some(id.name);
        self.store
            .update(&self.kind, object)
            .map_err(|e| self.store_error("update", e))
    }

    fn delete(&self, req: &JsonRequest) -> Result<(), HttpError> {
        let id = self.identifier(req)?;
        self.store
            .delete(&self.kind, &id)
            .map_err(|e| self.store_error("delete", e))
    }

    fn identifier(&self, req: &JsonRequest) -> Result<ObjectIdentifier, HttpError> {
        let name = req
            .var("name")
            .filter(|name| !name.is_empty())
            .ok_or_else(|| HttpError::bad_request("missing resource name"))?;
        Ok(ObjectIdentifier {
            namespace: self.namespace.clone(),
            name: name.to_string(),
        })
    }

    fn decode(&self, req: &JsonRequest) -> Result<Object, HttpError> {
        self.kind
            .decode(&req.body)
            .map_err(|e| HttpError::bad_request(e.to_string()))
    }

    fn stamp(&self, object: &mut Object) {
        object.api_version = Some(self.kind.api_version());
        object.kind = Some(self.kind.kind().to_string());
        object.metadata_mut().namespace = Some(self.namespace.clone());
    }

    fn store_error(&self, op: &'static str, err: anyhow::Error) -> HttpError {
        warn!(
            op,
            group = self.kind.group(),
            kind = self.kind.kind(),
            error = %err,
            "Store call failed"
        );
        HttpError::internal(err.to_string())
    }
}
