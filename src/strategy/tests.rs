use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::{Value, json};

use super::{BroadcastIntent, ConnectedEvent, LocalEmitter, RequestContext, Route, SocketIo, Target};
use super::{ConnectionHandle, connected_event};
use crate::engine::{
    ConnectionCallback, Emitter, Engine, EventHandler, HostServer, Middleware, Namespace, Socket,
};
use crate::utils::{Error, Result};

// Recording doubles for the engine seam

#[derive(Debug, Clone, PartialEq)]
enum Call {
    To(String),
    ToEmit(String, String, Vec<Value>),
    Emit(String, Vec<Value>),
}

#[derive(Default)]
struct MockSocket {
    id: String,
    calls: Mutex<Vec<String>>,
    handlers: Mutex<HashMap<String, Vec<EventHandler>>>,
}

impl MockSocket {
    fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            ..Default::default()
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn receive(&self, event: &str, args: &[Value]) {
        let handlers = self.handlers.lock().unwrap().get(event).cloned();
        for handler in handlers.into_iter().flatten() {
            handler(args);
        }
    }
}

impl Socket for MockSocket {
    fn id(&self) -> &str {
        &self.id
    }

    fn join(&self, channel: &str) {
        self.calls.lock().unwrap().push(format!("join:{channel}"));
    }

    fn leave(&self, channel: &str) {
        self.calls.lock().unwrap().push(format!("leave:{channel}"));
    }

    fn on(&self, event: &str, handler: EventHandler) {
        self.calls.lock().unwrap().push(format!("on:{event}"));
        self.handlers
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn disconnect(&self) {
        self.calls.lock().unwrap().push("disconnect".to_string());
    }
}

struct MockNamespace {
    name: String,
    calls: Mutex<Vec<Call>>,
    middleware: Mutex<Vec<Middleware<MockSocket>>>,
    callbacks: Mutex<Vec<ConnectionCallback<MockSocket>>>,
}

impl MockNamespace {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            middleware: Mutex::new(Vec::new()),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn simulate_connection(&self, socket: Arc<MockSocket>) {
        let callbacks = self.callbacks.lock().unwrap().clone();
        for callback in callbacks {
            callback(socket.clone());
        }
    }
}

impl Emitter for MockNamespace {
    fn emit(&self, event: &str, args: &[Value]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Emit(event.to_string(), args.to_vec()));
        Ok(())
    }
}

struct MockTarget<'a> {
    nsp: &'a MockNamespace,
    target: String,
}

impl Emitter for MockTarget<'_> {
    fn emit(&self, event: &str, args: &[Value]) -> Result<()> {
        self.nsp.calls.lock().unwrap().push(Call::ToEmit(
            self.target.clone(),
            event.to_string(),
            args.to_vec(),
        ));
        Ok(())
    }
}

impl Namespace for MockNamespace {
    type Socket = MockSocket;

    fn name(&self) -> &str {
        &self.name
    }

    fn use_middleware(&self, middleware: Middleware<MockSocket>) {
        self.middleware.lock().unwrap().push(middleware);
    }

    fn on_connection(&self, callback: ConnectionCallback<MockSocket>) {
        self.callbacks.lock().unwrap().push(callback);
    }

    fn to(&self, target: &str) -> Box<dyn Emitter + '_> {
        self.calls.lock().unwrap().push(Call::To(target.to_string()));
        Box::new(MockTarget {
            nsp: self,
            target: target.to_string(),
        })
    }
}

struct MockEngine {
    listener: String,
    namespaces: Mutex<HashMap<String, Arc<MockNamespace>>>,
}

impl Engine for MockEngine {
    type Listener = String;
    type Namespace = MockNamespace;

    fn attach(listener: String) -> Result<Self> {
        Ok(Self {
            listener,
            namespaces: Mutex::new(HashMap::new()),
        })
    }

    fn of(&self, name: &str) -> Arc<MockNamespace> {
        self.namespaces
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MockNamespace::new(name)))
            .clone()
    }
}

struct MockHost;

impl HostServer for MockHost {
    type Listener = String;

    fn raw_server(&self) -> Result<String> {
        Ok("raw-listener".to_string())
    }
}

struct BrokenHost;

impl HostServer for BrokenHost {
    type Listener = String;

    fn raw_server(&self) -> Result<String> {
        Err(std::io::Error::other("no listener").into())
    }
}

fn bound_strategy() -> SocketIo<MockEngine> {
    let strategy = SocketIo::<MockEngine>::new();
    strategy.create_socket(&MockHost).unwrap();
    strategy
}

fn request(id: &str) -> (RequestContext<MockNamespace>, Arc<MockNamespace>) {
    let nsp = Arc::new(MockNamespace::new("/chat"));
    (RequestContext::new(MockSocket::new(id), nsp.clone()), nsp)
}

// broadcast

#[test]
fn test_broadcast_without_target_goes_to_sender() {
    let strategy = bound_strategy();
    let (request, nsp) = request("abc");

    let intent = BroadcastIntent::new("chat", vec![json!(1), json!(2), json!(3)]);
    strategy.broadcast(&request, intent).unwrap();

    assert_eq!(
        nsp.calls(),
        vec![
            Call::To("abc".to_string()),
            Call::ToEmit(
                "abc".to_string(),
                "chat".to_string(),
                vec![json!(1), json!(2), json!(3)]
            ),
        ]
    );
}

#[test]
fn test_broadcast_to_explicit_target() {
    let strategy = bound_strategy();
    let (request, nsp) = request("abc");

    let intent = BroadcastIntent::new("chat", vec![json!("hi")]).to("room1");
    strategy.broadcast(&request, intent).unwrap();

    assert_eq!(
        nsp.calls(),
        vec![
            Call::To("room1".to_string()),
            Call::ToEmit("room1".to_string(), "chat".to_string(), vec![json!("hi")]),
        ]
    );
}

#[test]
fn test_broadcast_with_null_target_reaches_namespace() {
    let strategy = bound_strategy();
    let (request, nsp) = request("abc");

    let intent = BroadcastIntent::new("chat", vec![json!("hi")]).to_everyone();
    strategy.broadcast(&request, intent).unwrap();

    assert_eq!(
        nsp.calls(),
        vec![Call::Emit("chat".to_string(), vec![json!("hi")])]
    );
}

#[test]
fn test_broadcast_with_empty_target_reaches_namespace() {
    let strategy = bound_strategy();
    let (request, nsp) = request("abc");

    let intent = BroadcastIntent::new("chat", vec![json!(1), json!(3), json!(5)]).to("");
    strategy.broadcast(&request, intent).unwrap();

    assert_eq!(
        nsp.calls(),
        vec![Call::Emit(
            "chat".to_string(),
            vec![json!(1), json!(3), json!(5)]
        )]
    );
}

#[test]
fn test_broadcast_with_empty_data_emits_no_arguments() {
    let strategy = bound_strategy();
    let (request, nsp) = request("abc");

    strategy
        .broadcast(&request, BroadcastIntent::new("ping", Vec::new()))
        .unwrap();

    assert_eq!(
        nsp.calls().last(),
        Some(&Call::ToEmit("abc".to_string(), "ping".to_string(), Vec::new()))
    );
}

#[test]
fn test_route_resolution() {
    let unset = BroadcastIntent::new("e", Vec::new());
    assert_eq!(unset.route("abc"), Route::Targeted("abc".to_string()));
    assert_eq!(unset.route(""), Route::Namespace);

    assert_eq!(
        unset.clone().to("room").route("abc"),
        Route::Targeted("room".to_string())
    );
    assert_eq!(unset.clone().to("").route("abc"), Route::Namespace);
    assert_eq!(unset.to_everyone().route("abc"), Route::Namespace);
}

#[test]
fn test_intent_target_from_json() {
    let unset: BroadcastIntent = serde_json::from_value(json!({"event": "chat", "data": [1]})).unwrap();
    assert_eq!(unset.target, Target::Unset);

    let null: BroadcastIntent =
        serde_json::from_value(json!({"event": "chat", "data": [1], "target": null})).unwrap();
    assert_eq!(null.target, Target::Null);

    let room: BroadcastIntent =
        serde_json::from_value(json!({"event": "chat", "target": "room1"})).unwrap();
    assert_eq!(room.target, Target::Explicit("room1".to_string()));
    assert!(room.data.is_empty());

    assert_eq!(
        serde_json::to_value(&null).unwrap(),
        json!({"event": "chat", "data": [1], "target": null})
    );
    assert_eq!(
        serde_json::to_value(&unset).unwrap(),
        json!({"event": "chat", "data": [1]})
    );
}

proptest! {
    #[test]
    fn explicit_target_never_routes_to_sender(target in "[a-z0-9]{1,12}", sender in "[A-Z]{1,12}") {
        let intent = BroadcastIntent::new("e", Vec::new()).to(target.as_str());
        prop_assert_eq!(intent.route(&sender), Route::Targeted(target));
    }

    #[test]
    fn unset_target_routes_to_sender(sender in "[a-zA-Z0-9-]{1,36}") {
        let intent = BroadcastIntent::new("e", Vec::new());
        prop_assert_eq!(intent.route(&sender), Route::Targeted(sender.clone()));
    }

    #[test]
    fn null_target_always_routes_to_namespace(sender in ".*") {
        let intent = BroadcastIntent::new("e", Vec::new()).to_everyone();
        prop_assert_eq!(intent.route(&sender), Route::Namespace);
    }

    #[test]
    fn broadcast_preserves_argument_order(data in proptest::collection::vec(any::<i64>(), 0..16)) {
        let strategy = bound_strategy();
        let (request, nsp) = request("sender");
        let args: Vec<Value> = data.iter().map(|n| json!(n)).collect();

        strategy.broadcast(&request, BroadcastIntent::new("e", args.clone()).to_everyone()).unwrap();

        prop_assert_eq!(nsp.calls(), vec![Call::Emit("e".to_string(), args)]);
    }
}

// binding lifecycle

#[test]
fn test_connect_before_create_socket_is_unbound() {
    let strategy = SocketIo::<MockEngine>::new();
    assert!(!strategy.is_bound());
    assert!(matches!(strategy.connect("/chat", Vec::new()), Err(Error::Unbound)));
    assert!(matches!(strategy.engine(), Err(Error::Unbound)));
}

#[test]
fn test_create_socket_attaches_raw_listener() {
    let strategy = bound_strategy();
    assert!(strategy.is_bound());
    assert_eq!(strategy.engine().unwrap().listener, "raw-listener");
}

#[test]
fn test_create_socket_propagates_host_errors() {
    let strategy = SocketIo::<MockEngine>::new();
    assert!(matches!(strategy.create_socket(&BrokenHost), Err(Error::Io(_))));
    assert!(!strategy.is_bound());
}

#[test]
fn test_connect_returns_self_for_chaining() {
    let strategy = bound_strategy();

    let chained = strategy
        .connect("/chat", Vec::new())
        .unwrap()
        .connect("/news", Vec::new())
        .unwrap();

    assert!(std::ptr::eq(chained, &strategy));
}

#[test]
fn test_connect_attaches_middleware_in_order() {
    let strategy = bound_strategy();
    let order = Arc::new(Mutex::new(Vec::new()));

    let middleware: Vec<Middleware<MockSocket>> = (0..3)
        .map(|i| {
            let order = order.clone();
            Arc::new(move |_: &MockSocket| -> Result<()> {
                order.lock().unwrap().push(i);
                Ok(())
            }) as Middleware<MockSocket>
        })
        .collect();

    strategy.connect("/chat", middleware).unwrap();

    let nsp = strategy.engine().unwrap().of("/chat");
    let socket = MockSocket::new("abc");
    for mw in nsp.middleware.lock().unwrap().iter() {
        mw(socket.as_ref()).unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_each_connection_fires_one_connected_event() {
    let strategy = bound_strategy();
    let fired = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));

    {
        let fired = fired.clone();
        let seen = seen.clone();
        strategy.on(connected_event("/chat"), move |event: &ConnectedEvent<MockNamespace>| {
            fired.fetch_add(1, Ordering::SeqCst);
            seen.lock()
                .unwrap()
                .push((event.socket.id().to_string(), event.nsp.name().to_string()));
        });
    }

    strategy.connect("/chat", Vec::new()).unwrap();
    let nsp = strategy.engine().unwrap().of("/chat");

    nsp.simulate_connection(MockSocket::new("one"));
    nsp.simulate_connection(MockSocket::new("two"));

    assert_eq!(fired.load(Ordering::SeqCst), 2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            ("one".to_string(), "/chat".to_string()),
            ("two".to_string(), "/chat".to_string()),
        ]
    );
}

#[test]
fn test_connected_event_carries_namespace_instance() {
    let strategy = bound_strategy();
    let captured: Arc<Mutex<Option<ConnectedEvent<MockNamespace>>>> = Arc::new(Mutex::new(None));

    {
        let captured = captured.clone();
        strategy.on("/chat_connected", move |event: &ConnectedEvent<MockNamespace>| {
            *captured.lock().unwrap() = Some(event.clone());
        });
    }
    strategy.connect("/chat", Vec::new()).unwrap();

    let nsp = strategy.engine().unwrap().of("/chat");
    let socket = MockSocket::new("abc");
    nsp.simulate_connection(socket.clone());

    let event = captured.lock().unwrap().take().unwrap();
    assert!(Arc::ptr_eq(&event.nsp, &nsp));
    assert!(Arc::ptr_eq(&event.socket, &socket));
}

#[test]
fn test_connections_on_other_namespaces_are_not_announced() {
    let strategy = bound_strategy();
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = fired.clone();
        strategy.on(connected_event("/chat"), move |_: &ConnectedEvent<MockNamespace>| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    strategy.connect("/chat", Vec::new()).unwrap();
    strategy.connect("/news", Vec::new()).unwrap();
    strategy
        .engine()
        .unwrap()
        .of("/news")
        .simulate_connection(MockSocket::new("abc"));

    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_connected_event_feeds_broadcast() {
    let strategy = Arc::new(bound_strategy());
    {
        let inner = strategy.clone();
        strategy.on(connected_event("/chat"), move |event: &ConnectedEvent<MockNamespace>| {
            inner
                .broadcast(&event.request(), BroadcastIntent::new("welcome", vec![json!("hello")]))
                .unwrap();
        });
    }
    strategy.connect("/chat", Vec::new()).unwrap();

    let nsp = strategy.engine().unwrap().of("/chat");
    nsp.simulate_connection(MockSocket::new("abc"));

    assert_eq!(
        nsp.calls().last(),
        Some(&Call::ToEmit(
            "abc".to_string(),
            "welcome".to_string(),
            vec![json!("hello")]
        ))
    );
}

// per-connection forwarding

#[test]
fn test_connection_operations_forward_to_socket() {
    let strategy = bound_strategy();
    let socket = MockSocket::new("socketId");
    let obj = ConnectionHandle::from(socket.clone());

    assert_eq!(strategy.get_socket_id(&obj), "socketId");
    strategy.join_channel(&obj, "room1");
    strategy.leave_channel(&obj, "room1");
    strategy.disconnect(&obj);

    assert_eq!(
        socket.calls(),
        vec!["join:room1", "leave:room1", "disconnect"]
    );
}

#[test]
fn test_listen_registers_handler_on_socket() {
    let strategy = bound_strategy();
    let socket = MockSocket::new("socketId");
    let obj = ConnectionHandle::from(socket.clone());
    let received = Arc::new(Mutex::new(Vec::new()));

    {
        let received = received.clone();
        strategy.listen(&obj, "message", move |args| {
            received.lock().unwrap().extend_from_slice(args);
        });
    }

    assert_eq!(socket.calls(), vec!["on:message"]);
    socket.receive("message", &[json!("a"), json!(2)]);
    socket.receive("other", &[json!("ignored")]);
    assert_eq!(*received.lock().unwrap(), vec![json!("a"), json!(2)]);
}

// local emitter

#[test]
fn test_local_emitter_reports_listeners() {
    let emitter: LocalEmitter<u32> = LocalEmitter::new();
    assert!(!emitter.emit("tick", &1));

    let total = Arc::new(AtomicUsize::new(0));
    {
        let total = total.clone();
        emitter.on("tick", move |n: &u32| {
            total.fetch_add(*n as usize, Ordering::SeqCst);
        });
    }

    let shared = emitter.clone();
    assert!(shared.emit("tick", &5));
    assert_eq!(total.load(Ordering::SeqCst), 5);
    assert_eq!(emitter.listener_count("tick"), 1);

    emitter.remove_all_listeners("tick");
    assert_eq!(shared.listener_count("tick"), 0);
}

#[test]
fn test_local_emitter_runs_listeners_in_order() {
    let emitter: LocalEmitter<()> = LocalEmitter::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for name in ["first", "second"] {
        let order = order.clone();
        emitter.on("go", move |_: &()| order.lock().unwrap().push(name));
    }

    emitter.emit("go", &());
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}
