//! The tag-routed dispatcher.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::task::{Context, Poll, ready};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::{Tag, handler_tag};
use futures_util::FutureExt;
use tokio::sync::{Notify, oneshot};
use tracing::Instrument;

use crate::action::Action;
use crate::error::{DispatchError, RegistrationError};
use crate::handler::Handler;
use crate::message::{Commands, Events, Message, MessageKind};

/// Dispatcher for commands.
pub type CommandDispatcher = Dispatcher<Commands>;

/// Dispatcher for events.
pub type EventDispatcher = Dispatcher<Events>;

/// Reporting thresholds for a dispatcher.
///
/// Neither threshold changes behavior: a slow handler is never cancelled and
/// a deep queue never rejects messages. They only trigger warnings.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Handlers running at least this long are logged as slow.
    pub slow_handler_threshold: Duration,

    /// Queue length at which a warning is logged (once per drain).
    pub queue_warn_depth: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            slow_handler_threshold: Duration::from_millis(250),
            queue_warn_depth: 1024,
        }
    }
}

/// Routes messages of one kind to the single handler registered for their tag.
///
/// Messages are processed strictly in the order they were dispatched, one at
/// a time: a handler may await, but the next message is not taken off the
/// queue until it finishes. Failures (no handler, handler error, handler
/// panic) are reported and the queue keeps draining.
///
/// The dispatcher is a cheap handle; clones share the registry and queue.
pub struct Dispatcher<K: MessageKind> {
    inner: Arc<Inner<K>>,
}

impl<K: MessageKind> Clone for Dispatcher<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: MessageKind> Default for Dispatcher<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MessageKind> std::fmt::Debug for Dispatcher<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kind", &K::KIND)
            .field("handlers", &self.handler_count())
            .field("queued", &self.queue_len())
            .finish()
    }
}

impl<K: MessageKind> Dispatcher<K> {
    /// Creates a dispatcher with default thresholds.
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Creates a dispatcher with the given thresholds.
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                handlers: RwLock::new(HashMap::new()),
                queue: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                _kind: PhantomData,
            }),
        }
    }

    /// Registers a handler under the tag derived from its name.
    ///
    /// A handler already registered for the same tag is replaced.
    pub fn register_handler<H>(&self, handler: H) -> Result<(), RegistrationError>
    where
        H: Handler,
        H::Message: Message<Kind = K>,
    {
        let tag = handler_tag(H::TYPE_NAME)?;

        if tag.kind() != Some(K::KIND) {
            return Err(RegistrationError::WrongKind {
                handler: H::TYPE_NAME,
                tag,
                expected: K::KIND,
            });
        }

        let message_tag = <H::Message as Message>::tag();
        if tag != message_tag {
            return Err(RegistrationError::TagMismatch {
                handler: H::TYPE_NAME,
                handler_tag: tag,
                message_tag,
            });
        }

        let previous = self
            .inner
            .write_handlers()
            .insert(tag.clone(), Arc::new(Registered(handler)));

        match previous {
            Some(old) => tracing::debug!(
                kind = %K::KIND,
                %tag,
                handler = H::TYPE_NAME,
                replaced = old.type_name(),
                "handler replaced"
            ),
            None => tracing::debug!(
                kind = %K::KIND,
                %tag,
                handler = H::TYPE_NAME,
                "handler registered"
            ),
        }

        Ok(())
    }

    /// Queues a typed message.
    ///
    /// Starts a drain if none is running. The returned [`Completion`]
    /// resolves once the message has been processed; it can be dropped.
    ///
    /// Called outside a Tokio runtime while no drain is running, the message
    /// is not queued and the completion resolves to
    /// [`DispatchError::NoRuntime`].
    pub fn dispatch<M>(&self, message: M) -> Completion
    where
        M: Message<Kind = K>,
    {
        self.enqueue(M::tag(), Body::Typed(Box::new(message)))
    }

    /// Queues a wire action. It is decoded by the registered handler's entry
    /// when it reaches the head of the queue.
    pub fn dispatch_action(&self, action: Action) -> Completion {
        self.enqueue(action.tag.clone(), Body::Action(action))
    }

    /// The kind of messages this dispatcher routes.
    pub fn kind(&self) -> common::TagKind {
        K::KIND
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.inner.read_handlers().len()
    }

    /// Returns true if a handler is registered for `tag`.
    pub fn has_handler(&self, tag: &Tag) -> bool {
        self.inner.read_handlers().contains_key(tag)
    }

    /// Number of messages waiting to be processed.
    pub fn queue_len(&self) -> usize {
        self.inner.lock_queue().pending.len()
    }

    /// Returns true while a drain is active.
    pub fn is_draining(&self) -> bool {
        self.inner.lock_queue().draining
    }

    /// Waits until the queue is empty and no drain is running.
    pub async fn idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if !self.is_draining() {
                return;
            }
            notified.await;
        }
    }

    fn enqueue(&self, tag: Tag, body: Body) -> Completion {
        let (done, rx) = oneshot::channel();
        let runtime = tokio::runtime::Handle::try_current();

        let (start_drain, depth) = {
            let mut queue = self.inner.lock_queue();
            let start = !queue.draining;

            // Nothing would ever take the message off the queue.
            if start && runtime.is_err() {
                drop(queue);
                tracing::error!(kind = %K::KIND, %tag, "dispatch outside a Tokio runtime");
                let _ = done.send(Err(DispatchError::NoRuntime { tag: tag.clone() }));
                return Completion { tag, rx };
            }

            queue.pending.push_back(Pending {
                tag: tag.clone(),
                body,
                done,
            });
            let depth = queue.pending.len();

            if depth >= self.inner.config.queue_warn_depth && !queue.depth_warned {
                queue.depth_warned = true;
                tracing::warn!(kind = %K::KIND, depth, "dispatch queue is deep");
            }

            queue.draining = true;
            (start, depth)
        };

        metrics::counter!("cqrs_messages_dispatched_total", "kind" => K::KIND.as_str())
            .increment(1);
        tracing::debug!(kind = %K::KIND, %tag, depth, "message queued");

        if start_drain && let Ok(runtime) = runtime {
            let inner = Arc::clone(&self.inner);
            let span = tracing::debug_span!("drain", kind = %K::KIND);
            runtime.spawn(inner.drain().instrument(span));
        }

        Completion { tag, rx }
    }
}

/// Resolves once a dispatched message has been processed.
///
/// Because messages are processed in order, everything queued before it has
/// been processed too.
///
/// A handler must not await a completion from the dispatcher it is running
/// on: the drain waits for the handler, so that completion never resolves.
/// Awaiting completions from the other dispatcher is fine, which is how a
/// command handler waits for the events it emits.
#[must_use = "dropping a Completion is fine, but its outcome is then ignored"]
pub struct Completion {
    tag: Tag,
    rx: oneshot::Receiver<Result<(), DispatchError>>,
}

impl Completion {
    /// Tag of the dispatched message.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion").field("tag", &self.tag).finish()
    }
}

impl Future for Completion {
    type Output = Result<(), DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let received = ready!(Pin::new(&mut self.rx).poll(cx));
        Poll::Ready(received.unwrap_or_else(|_| {
            Err(DispatchError::Abandoned {
                tag: self.tag.clone(),
            })
        }))
    }
}

struct Inner<K> {
    config: DispatcherConfig,
    handlers: RwLock<HashMap<Tag, Arc<dyn ErasedHandler>>>,
    queue: Mutex<QueueState>,
    idle: Notify,
    _kind: PhantomData<fn() -> K>,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Pending>,
    draining: bool,
    depth_warned: bool,
}

struct Pending {
    tag: Tag,
    body: Body,
    done: oneshot::Sender<Result<(), DispatchError>>,
}

enum Body {
    Typed(Box<dyn Any + Send>),
    Action(Action),
}

impl<K: MessageKind> Inner<K> {
    // The registry and queue are only mutated in short non-panicking
    // sections, so a poisoned lock still holds consistent data.
    fn lock_queue(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_handlers(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Tag, Arc<dyn ErasedHandler>>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_handlers(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<Tag, Arc<dyn ErasedHandler>>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drain(self: Arc<Self>) {
        let mut processed: u64 = 0;

        loop {
            let next = {
                let mut queue = self.lock_queue();
                match queue.pending.pop_front() {
                    Some(pending) => pending,
                    None => {
                        queue.draining = false;
                        queue.depth_warned = false;
                        break;
                    }
                }
            };

            let Pending { tag, body, done } = next;
            let outcome = self.process(tag, body).await;
            processed += 1;

            // The caller may have dropped its Completion.
            let _ = done.send(outcome);
        }

        tracing::info!(processed, "drain finished");
        self.idle.notify_waiters();
    }

    async fn process(&self, tag: Tag, body: Body) -> Result<(), DispatchError> {
        let handler = self.read_handlers().get(&tag).cloned();
        let Some(handler) = handler else {
            metrics::counter!("cqrs_messages_unhandled_total", "kind" => K::KIND.as_str())
                .increment(1);
            tracing::warn!(kind = %K::KIND, %tag, "no handler registered, message dropped");
            return Err(DispatchError::Unhandled { tag });
        };

        let started = Instant::now();
        let result = AssertUnwindSafe(handler.invoke(tag.clone(), body))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed();

        metrics::histogram!("cqrs_handler_duration_seconds", "kind" => K::KIND.as_str())
            .record(elapsed.as_secs_f64());

        if elapsed >= self.config.slow_handler_threshold {
            tracing::warn!(
                kind = %K::KIND,
                %tag,
                handler = handler.type_name(),
                elapsed_ms = elapsed.as_millis() as u64,
                "slow handler"
            );
        }

        let outcome = result.unwrap_or_else(|panic| {
            Err(DispatchError::HandlerPanicked {
                tag: tag.clone(),
                message: panic_message(panic.as_ref()),
            })
        });

        match &outcome {
            Ok(()) => {
                metrics::counter!("cqrs_messages_handled_total", "kind" => K::KIND.as_str())
                    .increment(1);
                tracing::debug!(kind = %K::KIND, %tag, "message handled");
            }
            Err(error) => {
                metrics::counter!("cqrs_handler_failures_total", "kind" => K::KIND.as_str())
                    .increment(1);
                tracing::error!(
                    kind = %K::KIND,
                    %tag,
                    handler = handler.type_name(),
                    %error,
                    "message handling failed"
                );
            }
        }

        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Object-safe view of a registered handler.
#[async_trait]
trait ErasedHandler: Send + Sync {
    fn type_name(&self) -> &'static str;

    async fn invoke(&self, tag: Tag, body: Body) -> Result<(), DispatchError>;
}

struct Registered<H>(H);

#[async_trait]
impl<H: Handler> ErasedHandler for Registered<H> {
    fn type_name(&self) -> &'static str {
        H::TYPE_NAME
    }

    async fn invoke(&self, tag: Tag, body: Body) -> Result<(), DispatchError> {
        let message = match body {
            Body::Typed(any) => match any.downcast::<H::Message>() {
                Ok(message) => *message,
                Err(_) => {
                    return Err(DispatchError::TypeMismatch {
                        tag,
                        expected: <H::Message as Message>::TYPE_NAME,
                    });
                }
            },
            Body::Action(action) => match action.into_message::<H::Message>() {
                Ok(message) => message,
                Err(source) => return Err(DispatchError::Decode { tag, source }),
            },
        };

        self.0
            .handle(message)
            .await
            .map_err(|source| DispatchError::HandlerFailed { tag, source })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use common::{MessageId, TagKind};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::handler::HandlerResult;

    #[derive(Debug, Serialize, Deserialize)]
    struct PingCommand {
        id: MessageId,
        n: u32,
    }

    crate::command!(PingCommand);

    #[derive(Debug, Serialize, Deserialize)]
    struct PongEvent {
        id: MessageId,
    }

    crate::event!(PongEvent);

    fn ping(n: u32) -> PingCommand {
        PingCommand {
            id: MessageId::new(),
            n,
        }
    }

    #[derive(Default)]
    struct PingCommandHandler {
        seen: Arc<Mutex<Vec<u32>>>,
    }

    #[async_trait]
    impl Handler for PingCommandHandler {
        type Message = PingCommand;
        const TYPE_NAME: &'static str = "PingCommandHandler";

        async fn handle(&self, message: PingCommand) -> HandlerResult {
            self.seen.lock().unwrap().push(message.n);
            Ok(())
        }
    }

    struct PingHandler;

    #[async_trait]
    impl Handler for PingHandler {
        type Message = PingCommand;
        const TYPE_NAME: &'static str = "PingHandler";

        async fn handle(&self, _message: PingCommand) -> HandlerResult {
            Ok(())
        }
    }

    struct PongCommandHandler;

    #[async_trait]
    impl Handler for PongCommandHandler {
        type Message = PingCommand;
        const TYPE_NAME: &'static str = "PongCommandHandler";

        async fn handle(&self, _message: PingCommand) -> HandlerResult {
            Ok(())
        }
    }

    struct PingEventHandler;

    #[async_trait]
    impl Handler for PingEventHandler {
        type Message = PingCommand;
        const TYPE_NAME: &'static str = "PingEventHandler";

        async fn handle(&self, _message: PingCommand) -> HandlerResult {
            Ok(())
        }
    }

    struct CountingPingCommandHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Handler for CountingPingCommandHandler {
        type Message = PingCommand;
        // Same tag as PingCommandHandler.
        const TYPE_NAME: &'static str = "PingCommandHandlerV2";

        async fn handle(&self, _message: PingCommand) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn registered_handler_receives_message() {
        let dispatcher = CommandDispatcher::new();
        let handler = PingCommandHandler::default();
        let seen = Arc::clone(&handler.seen);
        dispatcher.register_handler(handler).unwrap();

        dispatcher.dispatch(ping(7)).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn unhandled_tag_is_reported_not_fatal() {
        let dispatcher = CommandDispatcher::new();

        let err = dispatcher.dispatch(ping(1)).await.unwrap_err();

        assert!(err.is_unhandled());
        assert_eq!(err.tag(), &PingCommand::tag());
    }

    #[test]
    fn handler_without_kind_segment_is_rejected() {
        let dispatcher = CommandDispatcher::new();
        let err = dispatcher.register_handler(PingHandler).unwrap_err();
        assert!(matches!(err, RegistrationError::Tag(_)));
        assert_eq!(dispatcher.handler_count(), 0);
    }

    #[test]
    fn handler_for_a_different_tag_is_rejected() {
        let dispatcher = CommandDispatcher::new();
        let err = dispatcher.register_handler(PongCommandHandler).unwrap_err();
        assert!(matches!(err, RegistrationError::TagMismatch { .. }));
    }

    #[test]
    fn event_handler_name_is_rejected_by_command_dispatcher() {
        let dispatcher = CommandDispatcher::new();

        let err = dispatcher.register_handler(PingEventHandler).unwrap_err();

        assert!(matches!(
            err,
            RegistrationError::WrongKind {
                expected: TagKind::Command,
                ..
            }
        ));
        assert_eq!(dispatcher.kind(), TagKind::Command);
        assert_eq!(dispatcher.handler_count(), 0);
    }

    #[tokio::test]
    async fn later_registration_replaces_earlier_one() {
        let dispatcher = CommandDispatcher::new();
        let first = PingCommandHandler::default();
        let first_seen = Arc::clone(&first.seen);
        dispatcher.register_handler(first).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        dispatcher
            .register_handler(CountingPingCommandHandler {
                calls: Arc::clone(&calls),
            })
            .unwrap();

        dispatcher.dispatch(ping(1)).await.unwrap();

        assert_eq!(dispatcher.handler_count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(first_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn action_is_decoded_before_handling() {
        let dispatcher = CommandDispatcher::new();
        let handler = PingCommandHandler::default();
        let seen = Arc::clone(&handler.seen);
        dispatcher.register_handler(handler).unwrap();

        let action = Action::from_message(&ping(42)).unwrap();
        dispatcher.dispatch_action(action).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![42]);
    }

    #[tokio::test]
    async fn undecodable_action_is_reported() {
        let dispatcher = CommandDispatcher::new();
        dispatcher
            .register_handler(PingCommandHandler::default())
            .unwrap();

        let err = dispatcher
            .dispatch_action(Action::new(PingCommand::tag()))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Decode { .. }));
    }

    #[tokio::test]
    async fn idle_returns_once_queue_is_drained() {
        let dispatcher = EventDispatcher::new();
        for _ in 0..3 {
            let _ = dispatcher.dispatch(PongEvent {
                id: MessageId::new(),
            });
        }

        dispatcher.idle().await;

        assert_eq!(dispatcher.queue_len(), 0);
        assert!(!dispatcher.is_draining());
    }

    #[test]
    fn dispatch_outside_runtime_leaves_dispatcher_usable() {
        let dispatcher = CommandDispatcher::new();
        let handler = PingCommandHandler::default();
        let seen = Arc::clone(&handler.seen);
        dispatcher.register_handler(handler).unwrap();

        let outcome = dispatcher.dispatch(ping(1)).now_or_never();

        assert!(matches!(outcome, Some(Err(DispatchError::NoRuntime { .. }))));
        assert!(!dispatcher.is_draining());
        assert_eq!(dispatcher.queue_len(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            tokio::time::timeout(Duration::from_secs(1), dispatcher.dispatch(ping(2)))
                .await
                .expect("dispatcher stalled")
                .unwrap();
        });
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    /// Log output written by a test-local subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn count(&self, needle: &str) -> usize {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .matches(needle)
                .count()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture_warnings() -> (Captured, tracing::subscriber::DefaultGuard) {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (captured, tracing::subscriber::set_default(subscriber))
    }

    #[tokio::test]
    async fn slow_handler_is_logged() {
        let (captured, _guard) = capture_warnings();
        let dispatcher = CommandDispatcher::with_config(DispatcherConfig {
            slow_handler_threshold: Duration::ZERO,
            ..DispatcherConfig::default()
        });
        dispatcher
            .register_handler(PingCommandHandler::default())
            .unwrap();

        dispatcher.dispatch(ping(1)).await.unwrap();

        assert_eq!(captured.count("slow handler"), 1);
    }

    #[tokio::test]
    async fn deep_queue_warns_once_per_drain() {
        let (captured, _guard) = capture_warnings();
        let dispatcher = EventDispatcher::with_config(DispatcherConfig {
            queue_warn_depth: 2,
            ..DispatcherConfig::default()
        });
        let pong = || PongEvent {
            id: MessageId::new(),
        };

        // The drain cannot start until the test yields.
        for _ in 0..3 {
            let _ = dispatcher.dispatch(pong());
        }
        assert!(dispatcher.inner.lock_queue().depth_warned);

        dispatcher.idle().await;
        assert!(!dispatcher.inner.lock_queue().depth_warned);

        for _ in 0..3 {
            let _ = dispatcher.dispatch(pong());
        }
        dispatcher.idle().await;

        assert_eq!(captured.count("dispatch queue is deep"), 2);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(s.as_ref()), "bang");
    }
}
