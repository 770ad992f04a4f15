//! Dispatcher and typed-layer behaviour against in-process transport doubles.
//!
//! # Design
//! `StubTransport` answers synchronously, `DeferredTransport` parks the
//! callback until the test completes it, and `ThreadedTransport` answers from
//! a fresh thread. Operations count their cancels through a shared counter so
//! the test never holds a strong reference to the operation itself.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use netpipe_core::{
    BoxError, BuildError, Cancellable, Dispatcher, Executor, Headers, HttpMethod, HttpRequest, Job,
    NetworkingError, NetworkingService, Outcome, Parameters, RawResponse, RequestAdapter,
    RequestBuilder, RequestDescriptor, RequestDispatching, RequestError, Service, SimpleRequest,
    Transport, TransportCallback, TransportError, TypedRequesting,
};
use serde::Deserialize;
use url::Url;

// ---------------------------------------------------------------------------
// Doubles
// ---------------------------------------------------------------------------

struct OperationSpy {
    cancels: Arc<AtomicUsize>,
}

impl Cancellable for OperationSpy {
    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers every request immediately with a canned response.
struct StubTransport {
    response: RawResponse,
    sent: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    fn new(response: RawResponse) -> Self {
        Self {
            response,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    fn send(&self, request: HttpRequest, callback: TransportCallback) -> Arc<dyn Cancellable> {
        self.sent.lock().unwrap().push(request);
        callback(self.response.clone());
        Arc::new(OperationSpy {
            cancels: Arc::new(AtomicUsize::new(0)),
        })
    }
}

/// Holds callbacks (and the operation) until `complete` is called.
#[derive(Default)]
struct DeferredTransport {
    cancels: Arc<AtomicUsize>,
    pending: Mutex<Vec<(TransportCallback, Arc<dyn Cancellable>)>>,
}

impl DeferredTransport {
    fn complete(&self, response: RawResponse) {
        let (callback, operation) = self.pending.lock().unwrap().remove(0);
        callback(response);
        drop(operation);
    }
}

impl Transport for DeferredTransport {
    fn send(&self, _request: HttpRequest, callback: TransportCallback) -> Arc<dyn Cancellable> {
        let operation: Arc<dyn Cancellable> = Arc::new(OperationSpy {
            cancels: Arc::clone(&self.cancels),
        });
        self.pending
            .lock()
            .unwrap()
            .push((callback, Arc::clone(&operation)));
        operation
    }
}

/// Answers from a new thread after a short pause.
struct ThreadedTransport;

impl Transport for ThreadedTransport {
    fn send(&self, request: HttpRequest, callback: TransportCallback) -> Arc<dyn Cancellable> {
        let operation: Arc<dyn Cancellable> = Arc::new(OperationSpy {
            cancels: Arc::new(AtomicUsize::new(0)),
        });
        let in_flight = Arc::clone(&operation);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            let body = request.url.path().as_bytes().to_vec();
            callback(RawResponse::new(200, Some(body)));
            drop(in_flight);
        });
        operation
    }
}

/// A builder whose terminal step always fails.
struct FailingBuilder;

impl RequestBuilder for FailingBuilder {
    fn from_descriptor(_descriptor: &dyn RequestDescriptor) -> Self {
        FailingBuilder
    }

    fn with_base_url(_base_url: Url, _path: Option<String>) -> Self {
        FailingBuilder
    }

    fn method(&mut self, _method: HttpMethod) -> &mut Self {
        self
    }

    fn path(&mut self, _path: impl Into<String>) -> &mut Self {
        self
    }

    fn headers(&mut self, _headers: Option<Headers>) -> &mut Self {
        self
    }

    fn parameters(&mut self, _parameters: Option<Parameters>) -> &mut Self {
        self
    }

    fn adapter(&mut self, _adapter: Arc<dyn RequestAdapter>) -> &mut Self {
        self
    }

    fn build(&self) -> Result<HttpRequest, BuildError> {
        Err(BuildError::CannotBeABase("data:".to_string()))
    }
}

#[derive(Default)]
struct AdapterSpy {
    calls: AtomicUsize,
}

impl RequestAdapter for AdapterSpy {
    fn adapt(&self, mut request: HttpRequest) -> Result<HttpRequest, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        request.set_header("x-adapted", "true");
        Ok(request)
    }
}

struct RejectingAdapter;

impl RequestAdapter for RejectingAdapter {
    fn adapt(&self, _request: HttpRequest) -> Result<HttpRequest, BoxError> {
        Err("no credentials".into())
    }
}

/// Counts jobs before running them inline.
#[derive(Default)]
struct CountingExecutor {
    jobs: AtomicUsize,
}

impl Executor for CountingExecutor {
    fn execute(&self, job: Job) {
        self.jobs.fetch_add(1, Ordering::SeqCst);
        job();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn request() -> SimpleRequest {
    SimpleRequest::new(Url::parse("http://www.someurl.com/").unwrap())
}

/// Execute and collect every outcome delivered inline.
fn run<D: RequestDispatching>(dispatcher: &D, descriptor: &dyn RequestDescriptor) -> Vec<Outcome> {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    dispatcher.execute(
        descriptor,
        Box::new(move |outcome| sink.lock().unwrap().push(outcome)),
    );
    let delivered = std::mem::take(&mut *outcomes.lock().unwrap());
    delivered
}

fn single(outcomes: Vec<Outcome>) -> Outcome {
    assert_eq!(outcomes.len(), 1, "expected exactly one completion");
    outcomes.into_iter().next().unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Dummy {
    id: u32,
    name: String,
}

// ---------------------------------------------------------------------------
// Build failures
// ---------------------------------------------------------------------------

#[test]
fn builder_failure_reports_request_builder_failed_without_sending() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)))
        .with_builder::<FailingBuilder>();

    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let token = dispatcher.execute(
        &request(),
        Box::new(move |outcome| sink.lock().unwrap().push(outcome)),
    );

    assert!(token.is_none());
    let outcomes = std::mem::take(&mut *outcomes.lock().unwrap());
    assert!(matches!(
        single(outcomes),
        Err(RequestError::RequestBuilderFailed(BuildError::CannotBeABase(_)))
    ));
    assert!(dispatcher.transport().sent().is_empty());
}

#[test]
fn adapter_failure_reports_request_builder_failed() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)))
        .with_adapter(Arc::new(RejectingAdapter));

    let outcome = single(run(&dispatcher, &request()));
    assert!(matches!(
        outcome,
        Err(RequestError::RequestBuilderFailed(BuildError::Adapter(_)))
    ));
    assert!(dispatcher.transport().sent().is_empty());
}

// ---------------------------------------------------------------------------
// Classification through the dispatcher
// ---------------------------------------------------------------------------

#[test]
fn missing_metadata_is_invalid_response() {
    let raw = RawResponse {
        body: Some(b"{}".to_vec()),
        error: None,
        metadata: None,
    };
    let dispatcher = Dispatcher::new(StubTransport::new(raw));
    assert!(matches!(
        single(run(&dispatcher, &request())),
        Err(RequestError::InvalidResponse)
    ));
}

#[test]
fn transport_failure_without_response_is_invalid_response() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::failed(
        TransportError::Connection("refused".into()),
    )));
    assert!(matches!(
        single(run(&dispatcher, &request())),
        Err(RequestError::InvalidResponse)
    ));
}

#[test]
fn ok_without_data_is_success_none() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)));
    assert!(matches!(single(run(&dispatcher, &request())), Ok(None)));
}

#[test]
fn ok_with_data_returns_same_bytes() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, Some(b"{}".to_vec()))));
    let body = single(run(&dispatcher, &request())).unwrap();
    assert_eq!(body, Some(b"{}".to_vec()));
}

#[test]
fn redirect_with_transport_error_is_unknown() {
    let raw = RawResponse {
        body: Some(br#"{"someValue":"value"}"#.to_vec()),
        error: Some(TransportError::Connection("reset".into())),
        metadata: Some(netpipe_core::ResponseMetadata::new(300)),
    };
    let dispatcher = Dispatcher::new(StubTransport::new(raw));
    assert!(matches!(
        single(run(&dispatcher, &request())),
        Err(RequestError::Unknown)
    ));
}

#[test]
fn client_error_with_payload_is_surfaced() {
    let body = br#"{"someValue":"value"}"#.to_vec();
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(400, Some(body.clone()))));
    match single(run(&dispatcher, &request())) {
        Err(err @ RequestError::WithPayload { .. }) => {
            assert_eq!(err.error_json().unwrap()["someValue"], "value");
            let RequestError::WithPayload { body: got, cause } = err else {
                unreachable!()
            };
            assert_eq!(got, body);
            assert!(cause.is_none());
        }
        other => panic!("expected WithPayload, got {other:?}"),
    }
}

#[test]
fn client_error_without_payload_is_unknown() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(400, None)));
    assert!(matches!(
        single(run(&dispatcher, &request())),
        Err(RequestError::Unknown)
    ));
}

// ---------------------------------------------------------------------------
// Built request
// ---------------------------------------------------------------------------

#[test]
fn transport_receives_built_request() {
    let mut body = serde_json::Map::new();
    body.insert("name".into(), serde_json::Value::from("value"));
    let descriptor = request()
        .with_method(HttpMethod::Post)
        .with_path("users")
        .with_body(body)
        .with_header("accept", "application/json");

    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(201, None)));
    single(run(&dispatcher, &descriptor)).unwrap();

    let sent = dispatcher.transport().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, HttpMethod::Post);
    assert_eq!(sent[0].url.as_str(), "http://www.someurl.com/users");
    assert_eq!(sent[0].header("accept"), Some("application/json"));
    assert_eq!(sent[0].body.as_deref(), Some(&br#"{"name":"value"}"#[..]));
}

#[test]
fn dispatcher_adapter_replaces_request_adapter() {
    let own = Arc::new(AdapterSpy::default());
    let configured = Arc::new(AdapterSpy::default());
    let descriptor = request().with_adapter(own.clone());

    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)))
        .with_adapter(configured.clone());
    single(run(&dispatcher, &descriptor)).unwrap();

    assert_eq!(own.calls.load(Ordering::SeqCst), 0);
    assert_eq!(configured.calls.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.transport().sent()[0].header("x-adapted"), Some("true"));
}

#[test]
fn request_adapter_runs_without_dispatcher_adapter() {
    let own = Arc::new(AdapterSpy::default());
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)));
    single(run(&dispatcher, &request().with_adapter(own.clone()))).unwrap();
    assert_eq!(own.calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Tokens and delivery
// ---------------------------------------------------------------------------

#[test]
fn token_is_returned_before_completion() {
    let dispatcher = Dispatcher::new(DeferredTransport::default());
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);

    let token = dispatcher
        .execute(
            &request(),
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .expect("token");

    assert!(token.is_alive());
    assert_eq!(delivered.load(Ordering::SeqCst), 0);

    dispatcher.transport().complete(RawResponse::new(204, None));
    assert_eq!(delivered.load(Ordering::SeqCst), 1);
    assert!(!token.is_alive());
}

#[test]
fn cancel_forwards_once_per_call_while_in_flight() {
    let dispatcher = Dispatcher::new(DeferredTransport::default());
    let token = dispatcher.execute(&request(), Box::new(|_| {})).unwrap();

    token.cancel();
    assert_eq!(dispatcher.transport().cancels.load(Ordering::SeqCst), 1);
    token.cancel();
    assert_eq!(dispatcher.transport().cancels.load(Ordering::SeqCst), 2);
}

#[test]
fn cancel_after_completion_is_noop_and_result_still_delivered() {
    let dispatcher = Dispatcher::new(DeferredTransport::default());
    let (tx, rx) = mpsc::channel();
    let token = dispatcher
        .execute(&request(), Box::new(move |outcome| tx.send(outcome).unwrap()))
        .unwrap();

    dispatcher
        .transport()
        .complete(RawResponse::new(200, Some(b"done".to_vec())));
    token.cancel();
    token.cancel();

    assert_eq!(dispatcher.transport().cancels.load(Ordering::SeqCst), 0);
    assert_eq!(rx.recv().unwrap().unwrap(), Some(b"done".to_vec()));
    assert!(rx.try_recv().is_err());
}

#[test]
fn execute_on_delivers_through_given_executor() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)));
    let executor = Arc::new(CountingExecutor::default());
    let (tx, rx) = mpsc::channel();

    dispatcher.execute_on(
        executor.clone(),
        &request(),
        Box::new(move |outcome| tx.send(outcome.is_ok()).unwrap()),
    );

    assert!(rx.recv().unwrap());
    assert_eq!(executor.jobs.load(Ordering::SeqCst), 1);
}

#[test]
fn builder_failure_is_delivered_through_given_executor() {
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)))
        .with_adapter(Arc::new(RejectingAdapter));
    let executor = Arc::new(CountingExecutor::default());

    let token = dispatcher.execute_on(executor.clone(), &request(), Box::new(|_| {}));

    assert!(token.is_none());
    assert_eq!(executor.jobs.load(Ordering::SeqCst), 1);
}

#[test]
fn default_executor_is_configurable() {
    let executor = Arc::new(CountingExecutor::default());
    let dispatcher = Dispatcher::new(StubTransport::new(RawResponse::new(200, None)))
        .with_executor(executor.clone());

    single(run(&dispatcher, &request())).unwrap();
    assert_eq!(executor.jobs.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_callers_each_get_one_completion() {
    let dispatcher = Arc::new(Dispatcher::new(ThreadedTransport));
    let (tx, rx) = mpsc::channel();

    let callers: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            let tx = tx.clone();
            thread::spawn(move || {
                let descriptor = request().with_path(format!("item/{i}"));
                dispatcher.execute(&descriptor, Box::new(move |outcome| tx.send((i, outcome)).unwrap()));
            })
        })
        .collect();
    drop(tx);
    for caller in callers {
        caller.join().unwrap();
    }

    let mut seen: Vec<_> = rx
        .iter()
        .map(|(i, outcome)| {
            let body = outcome.unwrap().unwrap();
            assert_eq!(String::from_utf8(body).unwrap(), format!("/item/{i}"));
            i
        })
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<_>>());
}

// ---------------------------------------------------------------------------
// Typed layer
// ---------------------------------------------------------------------------

fn typed<T>(raw: RawResponse) -> Result<T, NetworkingError>
where
    T: serde::de::DeserializeOwned + Send + 'static,
{
    let service = Service::new(Dispatcher::new(StubTransport::new(raw)));
    let (tx, rx) = mpsc::channel();
    service.request_typed::<T, _>(&request(), move |result| tx.send(result).unwrap());
    rx.recv().unwrap()
}

#[test]
fn typed_request_decodes_valid_json() {
    let raw = RawResponse::new(200, Some(br#"{"id":1,"name":"dummy"}"#.to_vec()));
    let value: Dummy = typed(raw).unwrap();
    assert_eq!(
        value,
        Dummy {
            id: 1,
            name: "dummy".to_string()
        }
    );
}

#[test]
fn typed_request_with_malformed_json_is_serialization_error() {
    let raw = RawResponse::new(200, Some(br#"{"id":1,"name":"#.to_vec()));
    assert!(matches!(
        typed::<Dummy>(raw),
        Err(NetworkingError::Serialization(_))
    ));
}

#[test]
fn typed_request_without_data_is_no_data() {
    assert!(matches!(
        typed::<Dummy>(RawResponse::new(200, None)),
        Err(NetworkingError::NoData)
    ));
}

#[test]
fn typed_request_wraps_dispatcher_failure() {
    let err = typed::<Dummy>(RawResponse::new(500, Some(b"boom".to_vec()))).unwrap_err();
    assert!(matches!(err, NetworkingError::UrlRequest(RequestError::Unknown)));
    assert_eq!(err.code(), -1);
}

#[test]
fn typed_request_on_executor() {
    let service = Service::new(Dispatcher::new(StubTransport::new(RawResponse::new(
        200,
        Some(b"[1,2,3]".to_vec()),
    ))));
    let executor = Arc::new(CountingExecutor::default());
    let (tx, rx) = mpsc::channel();

    let token = service.request_typed_on::<Vec<u8>, _>(executor.clone(), &request(), move |result| {
        tx.send(result).unwrap()
    });

    assert!(token.is_some());
    assert_eq!(rx.recv().unwrap().unwrap(), vec![1, 2, 3]);
    assert_eq!(executor.jobs.load(Ordering::SeqCst), 1);
}

#[test]
fn service_exposes_its_dispatcher() {
    let service = Service::new(Dispatcher::new(StubTransport::new(RawResponse::new(200, None))));
    let (tx, rx) = mpsc::channel();
    service
        .dispatcher()
        .execute(&request(), Box::new(move |outcome| tx.send(outcome.is_ok()).unwrap()));
    assert!(rx.recv().unwrap());
}
