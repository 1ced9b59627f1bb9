mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use common::{get, send_json};
use kindrouter::call::{CallResourceHandler, CallResourceRequest, ResponseCapture};
use kindrouter::context::RequestContext;
use kindrouter::resource::{Kind, Object, ObjectIdentifier, ResourceGroupRouter, Store};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// In-memory store keyed by namespace/name, with a switch to fail every call.
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Object>>,
    broken: Mutex<bool>,
}

impl MemoryStore {
    fn check(&self) -> anyhow::Result<()> {
        if *self.broken.lock() {
            bail!("connection refused by 10.0.0.7");
        }
        Ok(())
    }

    fn key(id: &ObjectIdentifier) -> (String, String) {
        (id.namespace.clone(), id.name.clone())
    }
}

impl Store for MemoryStore {
    fn get(&self, _kind: &Kind, id: &ObjectIdentifier) -> anyhow::Result<Object> {
        self.check()?;
        self.objects
            .lock()
            .get(&Self::key(id))
            .cloned()
            .ok_or_else(|| anyhow!("{} not found", id.name))
    }

    fn list(&self, _kind: &Kind, namespace: &str) -> anyhow::Result<Vec<Object>> {
        self.check()?;
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, obj)| obj.clone())
            .collect())
    }

    fn add(&self, _kind: &Kind, object: Object) -> anyhow::Result<Object> {
        self.check()?;
        self.objects
            .lock()
            .insert(Self::key(&object.identifier()), object.clone());
        Ok(object)
    }

    fn update(&self, kind: &Kind, object: Object) -> anyhow::Result<Object> {
        self.get(kind, &object.identifier())?;
        self.add(kind, object)
    }

    fn delete(&self, _kind: &Kind, id: &ObjectIdentifier) -> anyhow::Result<()> {
        self.check()?;
        self.objects
            .lock()
            .remove(&Self::key(id))
            .map(|_| ())
            .ok_or_else(|| anyhow!("{} not found", id.name))
    }
}

fn animals() -> Kind {
    Kind::new("zoo.example.com", "v1", "Animal", "animals")
}

fn setup() -> (Arc<MemoryStore>, ResourceGroupRouter) {
    let store = Arc::new(MemoryStore::default());
    let router = ResourceGroupRouter::with_kinds(
        Arc::clone(&store) as Arc<dyn Store>,
        "zoo",
        [animals()],
    )
    .unwrap();
    (store, router)
}

const COLLECTION: &str = "/zoo.example.com/v1/animals";

fn internal_error() -> Value {
    json!({ "code": 500, "error": "internal server error" })
}

#[test]
fn test_crud_round_trip() {
    let (_store, router) = setup();

    let resp = send_json(
        &router,
        "POST",
        COLLECTION,
        &json!({ "metadata": { "name": "rex" }, "spec": { "legs": 4 } }),
    );
    assert_eq!(resp.status, 202);
    assert_eq!(
        resp.body_json().unwrap(),
        json!({
            "apiVersion": "zoo.example.com/v1",
            "kind": "Animal",
            "metadata": { "name": "rex", "namespace": "zoo" },
            "spec": { "legs": 4 }
        })
    );

    let resp = get(&router, &format!("{COLLECTION}/rex"));
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body_json().unwrap()["spec"]["legs"], 4);

    let resp = send_json(
        &router,
        "PUT",
        &format!("{COLLECTION}/rex"),
        &json!({ "spec": { "legs": 3 } }),
    );
    assert_eq!(resp.status, 202);
    let body = resp.body_json().unwrap();
    assert_eq!(body["metadata"]["name"], "rex");
    assert_eq!(body["spec"]["legs"], 3);

    let resp = get(&router, COLLECTION);
    assert_eq!(resp.status, 200);
    let list = resp.body_json().unwrap();
    assert_eq!(list["apiVersion"], "zoo.example.com/v1");
    assert_eq!(list["kind"], "AnimalList");
    assert_eq!(list["items"].as_array().map(Vec::len), Some(1));

    let resp = send_json(&router, "DELETE", &format!("{COLLECTION}/rex"), &Value::Null);
    assert_eq!(resp.status, 204);
    assert!(resp.body.is_none());

    let resp = get(&router, COLLECTION);
    assert_eq!(resp.body_json().unwrap()["items"], json!([]));
}

#[test]
fn test_store_failures_are_masked_500s() {
    let (store, router) = setup();
    *store.broken.lock() = true;
    let item = format!("{COLLECTION}/rex");

    let cases = [
        send_json(&router, "POST", COLLECTION, &json!({ "metadata": { "name": "rex" } })),
        get(&router, &item),
        get(&router, COLLECTION),
        send_json(&router, "PUT", &item, &json!({})),
        send_json(&router, "DELETE", &item, &Value::Null),
    ];
    for resp in cases {
        assert_eq!(resp.status, 500);
        assert_eq!(resp.body_json().unwrap(), internal_error());
    }
}

#[test]
fn test_missing_object_is_500() {
    let (_store, router) = setup();
    assert_eq!(get(&router, &format!("{COLLECTION}/ghost")).status, 500);
    let resp = send_json(
        &router,
        "DELETE",
        &format!("{COLLECTION}/ghost"),
        &Value::Null,
    );
    assert_eq!(resp.status, 500);
}

#[test]
fn test_malformed_body_is_400() {
    let (_store, router) = setup();
    let resp = common::call(
        &router,
        CallResourceRequest::new("POST", COLLECTION).with_body("{oops"),
    );
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body_json().unwrap()["code"], 400);
}

#[test]
fn test_unregistered_kind_is_not_routed() {
    let (_store, router) = setup();
    let capture = ResponseCapture::new();
    let req = CallResourceRequest::new("GET", "/zoo.example.com/v1/keepers");
    let ctx = RequestContext::for_call(&req);
    assert!(router.call_resource(ctx, req, &capture).is_err());
    assert!(capture.take().is_none());
}
