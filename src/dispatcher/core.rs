//! Dispatcher core: the per-request pipeline.

use super::error::{DispatchError, ValidationTarget};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::multipart::{self, FileEntry};
use crate::route::{HandlerError, RouteDefinition, Schema};
use crate::router::{RouteMatch, Router};
use crate::runtime_config::{RuntimeConfig, DEFAULT_MAX_BODY_BYTES};
use crate::security::{
    is_granted, AuthorizationRequest, Authorizer, AuthorizerError, Principal,
};
use crate::server::RawRequest;
use crate::validator::{JsonSchemaValidator, Validator};
use http::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};
use smallvec::SmallVec;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage: `(lowercase name, value)` pairs.
///
/// Header names are `Arc<str>` because the same few names repeat on every request.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Everything a handler receives.
///
/// Each optional field is `None` when the request had nothing to put there.
#[derive(Debug, Clone, Default)]
pub struct RequestData {
    /// Correlation id, also echoed in the `x-request-id` response header
    pub request_id: RequestId,
    /// Parsed (and, when the route declares a schema, validated) JSON body or multipart
    /// fields
    pub input: Option<Value>,
    /// Uploaded files by field name
    pub files: Option<BTreeMap<String, FileEntry>>,
    /// Query-string pairs merged with path parameters (path parameters win), as a JSON
    /// object of strings unless a query-parameter schema coerced them
    pub query_params: Option<Value>,
    /// Principal returned by the authorizer
    pub auth_data: Option<Principal>,
}

impl RequestData {
    /// String value of a query or path parameter.
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.as_ref()?.get(name)?.as_str()
    }

    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FileEntry> {
        self.files.as_ref()?.get(name)
    }
}

/// Status, headers and JSON body of a dispatched request.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header (case-insensitive).
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

/// Methods whose body is read and decoded.
fn carries_body(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Owns the route table, the optional authorizer and the validator, and turns raw
/// requests into responses.
///
/// Built once through [`Dispatcher::builder`] and shared read-only (usually behind an
/// `Arc`) by every connection coroutine.
pub struct Dispatcher {
    router: Router,
    authorizer: Option<Arc<dyn Authorizer>>,
    validator: Arc<dyn Validator>,
    max_body_bytes: Option<usize>,
    docs_path: Option<String>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.router.len())
            .field("authorizer", &self.authorizer.is_some())
            .field("max_body_bytes", &self.max_body_bytes)
            .field("docs_path", &self.docs_path)
            .finish()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    #[must_use]
    pub fn has_authorizer(&self) -> bool {
        self.authorizer.is_some()
    }

    #[must_use]
    pub fn max_body_bytes(&self) -> Option<usize> {
        self.max_body_bytes
    }

    #[must_use]
    pub fn docs_path(&self) -> Option<&str> {
        self.docs_path.as_deref()
    }

    /// Run one request through the pipeline.
    ///
    /// Never fails: every error is converted into a JSON error response here. The
    /// response always carries `x-request-id`.
    pub fn dispatch(&self, req: &RawRequest) -> HandlerResponse {
        let request_id = RequestId::from_header_or_new(req.get_header(REQUEST_ID_HEADER));
        let start = Instant::now();
        let path = req.path();

        let mut response = if self.is_docs_request(req) {
            debug!(request_id = %request_id, path = %path, "Serving route catalog");
            HandlerResponse::json(200, self.route_catalog())
        } else {
            match self.run(req, request_id) {
                Ok(body) => HandlerResponse::json(200, body),
                Err(err) => {
                    let status = err.status();
                    if status >= 500 {
                        error!(
                            request_id = %request_id,
                            method = %req.method,
                            path = %path,
                            status = status,
                            error = %err,
                            "Request failed"
                        );
                    } else {
                        warn!(
                            request_id = %request_id,
                            method = %req.method,
                            path = %path,
                            status = status,
                            error = %err,
                            "Request rejected"
                        );
                    }
                    err.into_response()
                }
            }
        };

        response.set_header(REQUEST_ID_HEADER, request_id.to_string());
        info!(
            request_id = %request_id,
            method = %req.method,
            path = %path,
            status = response.status,
            latency_us = start.elapsed().as_micros() as u64,
            "Request dispatched"
        );
        response
    }

    fn is_docs_request(&self, req: &RawRequest) -> bool {
        self.docs_path
            .as_deref()
            .is_some_and(|docs| req.method == Method::GET && req.path() == docs)
    }

    fn run(&self, req: &RawRequest, request_id: RequestId) -> Result<Value, DispatchError> {
        // 1. Resolve
        let matched = self
            .router
            .route(&req.method, req.path())
            .ok_or(DispatchError::RouteNotFound)?;
        let route = Arc::clone(&matched.route);

        // 2. Authorize
        let auth_data = self.authorize(req, &route, request_id)?;

        // 3 + 4. Acquire the body and validate the input
        let (input, files) = if carries_body(&req.method) {
            self.acquire_body(req, &route, request_id)?
        } else {
            (None, None)
        };

        // 5. Merge context
        let query_params = self.query_params(req, &matched, request_id)?;
        let data = RequestData {
            request_id,
            input,
            files,
            query_params,
            auth_data,
        };

        // 6. Invoke the handler
        let result = self.invoke(&route, data)?;

        // 7. Validate the output
        if let Some(schema) = route.response_schema() {
            self.validate(result.clone(), schema, ValidationTarget::Response, request_id)?;
        }

        Ok(result)
    }

    fn authorize(
        &self,
        req: &RawRequest,
        route: &RouteDefinition,
        request_id: RequestId,
    ) -> Result<Option<Principal>, DispatchError> {
        let roles = route.required_roles();
        if roles.is_empty() {
            return Ok(None);
        }
        let Some(authorizer) = &self.authorizer else {
            debug!(
                request_id = %request_id,
                roles = ?roles,
                "Route declares roles but no authorizer is configured"
            );
            return Ok(None);
        };

        let auth_req = AuthorizationRequest::new(req, roles);
        let outcome = catch_unwind(AssertUnwindSafe(|| authorizer.authorize(&auth_req)))
            .unwrap_or_else(|panic| {
                Err(AuthorizerError::new(format!(
                    "authorizer panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });

        match outcome {
            Ok(Some(principal)) if is_granted(&principal) => {
                debug!(request_id = %request_id, roles = ?roles, "Authorization granted");
                Ok(Some(principal))
            }
            Ok(_) => Err(DispatchError::Forbidden),
            Err(e) => {
                error!(request_id = %request_id, error = %e, "Authorizer failed");
                Err(DispatchError::AuthorizationFailed(e))
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn acquire_body(
        &self,
        req: &RawRequest,
        route: &RouteDefinition,
        request_id: RequestId,
    ) -> Result<(Option<Value>, Option<BTreeMap<String, FileEntry>>), DispatchError> {
        if let Some(limit) = self.max_body_bytes {
            if req.body.len() > limit {
                return Err(DispatchError::PayloadTooLarge { limit });
            }
        }

        let content_type = req.content_type().unwrap_or_default();
        if multipart::is_multipart(content_type) {
            let boundary = multipart::boundary_from_content_type(content_type)?;
            let form = multipart::decode(&req.body, boundary)?;
            debug!(
                request_id = %request_id,
                fields = form.fields.len(),
                files = form.files.len(),
                body_bytes = req.body.len(),
                "Multipart body decoded"
            );

            let input = if form.fields.is_empty() {
                None
            } else {
                Some(self.validate_input(Value::Object(form.fields), route, request_id)?)
            };
            let files = (!form.files.is_empty()).then_some(form.files);
            Ok((input, files))
        } else {
            let value: Value = serde_json::from_slice(&req.body)
                .map_err(|e| DispatchError::InvalidJson(e.to_string()))?;
            debug!(request_id = %request_id, body_bytes = req.body.len(), "JSON body decoded");
            Ok((Some(self.validate_input(value, route, request_id)?), None))
        }
    }

    fn validate_input(
        &self,
        value: Value,
        route: &RouteDefinition,
        request_id: RequestId,
    ) -> Result<Value, DispatchError> {
        match route.input_schema() {
            Some(schema) => self.validate(value, schema, ValidationTarget::Input, request_id),
            None => Ok(value),
        }
    }

    fn query_params(
        &self,
        req: &RawRequest,
        matched: &RouteMatch,
        request_id: RequestId,
    ) -> Result<Option<Value>, DispatchError> {
        let mut params = Map::new();
        for (name, value) in req.query_pairs() {
            params.insert(name, Value::String(value));
        }
        for (name, value) in &matched.path_params {
            params.insert(name.to_string(), Value::String(value.clone()));
        }

        let merged = match matched.route.query_params_schema() {
            Some(schema) => self.validate(
                Value::Object(params),
                schema,
                ValidationTarget::QueryParams,
                request_id,
            )?,
            None => Value::Object(params),
        };

        let empty = merged.as_object().is_some_and(Map::is_empty);
        Ok((!empty).then_some(merged))
    }

    fn validate(
        &self,
        value: Value,
        schema: &Schema,
        target: ValidationTarget,
        request_id: RequestId,
    ) -> Result<Value, DispatchError> {
        self.validator.validate(value, schema).map_err(|source| {
            warn!(
                request_id = %request_id,
                validation = %target,
                details = ?source.details(),
                "Schema validation failed"
            );
            DispatchError::Validation { target, source }
        })
    }

    fn invoke(&self, route: &RouteDefinition, data: RequestData) -> Result<Value, DispatchError> {
        let request_id = data.request_id;
        let start = Instant::now();
        let handler = route.handler();

        let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(data)));
        let elapsed_us = start.elapsed().as_micros() as u64;

        match outcome {
            Ok(Ok(value)) => {
                debug!(
                    request_id = %request_id,
                    route = %route.path_pattern(),
                    execution_time_us = elapsed_us,
                    "Handler execution complete"
                );
                Ok(value)
            }
            Ok(Err(e)) => {
                debug!(
                    request_id = %request_id,
                    route = %route.path_pattern(),
                    execution_time_us = elapsed_us,
                    error = %e,
                    "Handler returned an error"
                );
                Err(DispatchError::Handler(e))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    request_id = %request_id,
                    route = %route.path_pattern(),
                    panic_message = %message,
                    "Handler panicked"
                );
                Err(DispatchError::Handler(HandlerError::new(format!(
                    "Handler panicked: {message}"
                ))))
            }
        }
    }

    /// JSON description of every registered route, static routes first.
    ///
    /// Each entry is `{method, path, roles, input, response, queryParams}`; schema
    /// entries hold the validator's structural description, or `null`.
    #[must_use]
    pub fn route_catalog(&self) -> Value {
        let describe = |schema: Option<&Schema>| {
            schema.map_or(Value::Null, |s| self.validator.describe(s))
        };
        Value::Array(
            self.router
                .routes()
                .map(|route| {
                    json!({
                        "method": route.method().as_str(),
                        "path": route.path_pattern(),
                        "roles": route.required_roles(),
                        "input": describe(route.input_schema()),
                        "response": describe(route.response_schema()),
                        "queryParams": describe(route.query_params_schema()),
                    })
                })
                .collect(),
        )
    }
}

/// Builder for [`Dispatcher`].
///
/// ```rust
/// use bendf::dispatcher::Dispatcher;
/// use bendf::route::RouteDefinition;
/// use bendf::server::RawRequest;
/// use http::Method;
/// use serde_json::json;
///
/// let dispatcher = Dispatcher::builder()
///     .route(
///         RouteDefinition::builder()
///             .method("GET")
///             .path("/hello")
///             .handler(|_| Ok(json!({"message": "hi"})))
///             .build()
///             .unwrap(),
///     )
///     .build();
///
/// let resp = dispatcher.dispatch(&RawRequest::new(Method::GET, "/hello"));
/// assert_eq!(resp.status, 200);
/// assert_eq!(resp.body, json!({"message": "hi"}));
/// ```
pub struct DispatcherBuilder {
    router: Router,
    authorizer: Option<Arc<dyn Authorizer>>,
    validator: Option<Arc<dyn Validator>>,
    max_body_bytes: Option<usize>,
    docs_path: Option<String>,
    schema_cache: bool,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            authorizer: None,
            validator: None,
            max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
            docs_path: None,
            schema_cache: true,
        }
    }

    #[must_use]
    pub fn route(mut self, route: RouteDefinition) -> Self {
        self.router.register(route);
        self
    }

    #[must_use]
    pub fn routes<I>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        for route in routes {
            self.router.register(route);
        }
        self
    }

    #[must_use]
    pub fn authorizer<A>(mut self, authorizer: A) -> Self
    where
        A: Authorizer + 'static,
    {
        self.authorizer = Some(Arc::new(authorizer));
        self
    }

    /// Closure authorizer; the argument types are inferred.
    #[must_use]
    pub fn authorizer_fn<F>(self, f: F) -> Self
    where
        F: Fn(&AuthorizationRequest<'_>) -> Result<Option<Principal>, AuthorizerError>
            + Send
            + Sync
            + 'static,
    {
        self.authorizer(f)
    }

    /// Replace the bundled [`JsonSchemaValidator`].
    #[must_use]
    pub fn validator<V>(mut self, validator: V) -> Self
    where
        V: Validator + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// `None` removes the body cap.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_body_bytes = limit;
        self
    }

    #[must_use]
    pub fn docs_path(mut self, path: impl Into<String>) -> Self {
        self.docs_path = Some(path.into());
        self
    }

    /// Take body cap, docs path and schema caching from a [`RuntimeConfig`].
    #[must_use]
    pub fn config(mut self, config: &RuntimeConfig) -> Self {
        self.max_body_bytes = config.max_body_bytes;
        self.docs_path = config.docs_path.clone();
        self.schema_cache = config.schema_cache;
        self
    }

    #[must_use]
    pub fn build(self) -> Dispatcher {
        let validator = match self.validator {
            Some(v) => v,
            None => {
                let validator = JsonSchemaValidator::new(self.schema_cache);
                let schemas = self.router.routes().flat_map(|r| {
                    [r.input_schema(), r.query_params_schema(), r.response_schema()]
                        .into_iter()
                        .flatten()
                });
                validator.cache().precompile(schemas);
                Arc::new(validator) as Arc<dyn Validator>
            }
        };

        info!(
            routes = self.router.len(),
            authorizer = self.authorizer.is_some(),
            max_body_bytes = ?self.max_body_bytes,
            docs_path = ?self.docs_path,
            "Dispatcher ready"
        );

        Dispatcher {
            router: self.router,
            authorizer: self.authorizer,
            validator,
            max_body_bytes: self.max_body_bytes,
            docs_path: self.docs_path,
        }
    }
}
