//! Routing of decoded envelopes to their single registered handler.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use crate::envelope::Envelope;
use crate::error::{DispatchError, RegistrationError};
use crate::kind::MessageKind;
use crate::payload::Payload;

/// Type-erased handler stored by the dispatcher.
type Handler<R> = Box<dyn Fn(&Envelope) -> Result<R, DispatchError> + Send + Sync>;

/// Maps each [`MessageKind`] to at most one handler producing `R`.
///
/// Registration is the only mutation; once built, a dispatcher can be shared
/// (e.g. behind an `Arc`) and [`Dispatcher::dispatch`] called concurrently.
///
/// ```
/// use mmbridge_proto::{Command, Dispatcher, Payload};
///
/// let mut dispatcher = Dispatcher::new();
/// dispatcher.on(|cmd: Command| cmd.command.len())?;
///
/// let env = Command::new("snap").into_envelope();
/// assert_eq!(dispatcher.dispatch(&env)?, 4);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Dispatcher<R> {
    /// Bound handlers.
    handlers: BTreeMap<MessageKind, Handler<R>>,
}

impl<R> Dispatcher<R> {
    /// Creates a dispatcher with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Binds `handler` to `kind`; it receives the raw validated envelope.
    pub fn register<F>(&mut self, kind: MessageKind, handler: F) -> Result<(), RegistrationError>
    where
        F: Fn(&Envelope) -> R + Send + Sync + 'static,
    {
        self.insert(
            kind,
            Box::new(move |env: &Envelope| -> Result<R, DispatchError> { Ok(handler(env)) }),
        )
    }

    /// Binds `handler` to `P::KIND`; it receives the typed payload.
    pub fn on<P, F>(&mut self, handler: F) -> Result<(), RegistrationError>
    where
        P: Payload,
        F: Fn(P) -> R + Send + Sync + 'static,
    {
        self.insert(
            P::KIND,
            Box::new(move |env: &Envelope| -> Result<R, DispatchError> {
                Ok(handler(P::from_envelope(env)?))
            }),
        )
    }

    /// Stores a handler, refusing a second one for the same kind.
    fn insert(&mut self, kind: MessageKind, handler: Handler<R>) -> Result<(), RegistrationError> {
        match self.handlers.entry(kind) {
            Entry::Occupied(_) => Err(RegistrationError::DuplicateHandler(kind)),
            Entry::Vacant(slot) => {
                slot.insert(handler);
                Ok(())
            }
        }
    }

    /// Invokes the handler bound to the envelope's kind exactly once.
    pub fn dispatch(&self, env: &Envelope) -> Result<R, DispatchError> {
        let handler = self
            .handlers
            .get(&env.kind())
            .ok_or(DispatchError::NoHandler(env.kind()))?;
        handler(env)
    }

    /// Whether a handler is bound to `kind`.
    pub fn handles(&self, kind: MessageKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Kinds with a bound handler, in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = MessageKind> + '_ {
        self.handlers.keys().copied()
    }
}

impl<R> Default for Dispatcher<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::payload::{ClassDef, Command, NewConnection};

    #[test]
    fn second_handler_for_a_kind_is_rejected() {
        let mut d = Dispatcher::new();
        d.on(|_: Command| 1).unwrap();
        assert_eq!(
            d.on(|_: Command| 2),
            Err(RegistrationError::DuplicateHandler(MessageKind::Command))
        );
        assert_eq!(
            d.register(MessageKind::Command, |_| 3),
            Err(RegistrationError::DuplicateHandler(MessageKind::Command))
        );
        // The first binding survives.
        assert_eq!(d.dispatch(&Command::new("x").into_envelope()), Ok(1));
    }

    #[test]
    fn invokes_exactly_the_bound_handler_once() {
        let calls: Arc<[AtomicUsize; 2]> = Arc::new([AtomicUsize::new(0), AtomicUsize::new(0)]);
        let mut d = Dispatcher::new();

        let c = Arc::clone(&calls);
        d.on(move |cmd: Command| {
            c[0].fetch_add(1, Ordering::SeqCst);
            cmd.command
        })
        .unwrap();
        let c = Arc::clone(&calls);
        d.on(move |def: ClassDef| {
            c[1].fetch_add(1, Ordering::SeqCst);
            def.api
        })
        .unwrap();

        let out = d.dispatch(&Command::new("snap").into_envelope()).unwrap();
        assert_eq!(out, "snap");
        assert_eq!(calls[0].load(Ordering::SeqCst), 1);
        assert_eq!(calls[1].load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unroutable_kind_is_reported() {
        let mut d = Dispatcher::new();
        d.on(|_: Command| ()).unwrap();
        let err = d.dispatch(&NewConnection.into_envelope()).unwrap_err();
        assert_eq!(err, DispatchError::NoHandler(MessageKind::NewConnection));
        assert_eq!(err.to_string(), "no handler registered for NEWCONNECTION");
    }

    #[test]
    fn raw_registration_sees_the_envelope() {
        let mut d = Dispatcher::new();
        d.register(MessageKind::ClassDef, |env| env.get_str("api").map(str::len))
            .unwrap();
        let out = d.dispatch(&ClassDef::new("abc").into_envelope()).unwrap();
        assert_eq!(out, Ok(3));
    }

    #[test]
    fn introspection() {
        let mut d: Dispatcher<()> = Dispatcher::default();
        d.on(|_: ClassDef| ()).unwrap();
        d.on(|_: Command| ()).unwrap();
        assert!(d.handles(MessageKind::Command));
        assert!(!d.handles(MessageKind::Exception));
        assert_eq!(
            d.kinds().collect::<Vec<_>>(),
            [MessageKind::Command, MessageKind::ClassDef]
        );
    }

    #[test]
    fn dispatch_from_many_threads() {
        let mut d = Dispatcher::new();
        d.on(|cmd: Command| cmd.command.len()).unwrap();
        let d = Arc::new(d);

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let d = Arc::clone(&d);
                std::thread::spawn(move || {
                    let env = Command::new("x".repeat(i)).into_envelope();
                    d.dispatch(&env).unwrap()
                })
            })
            .collect();
        let lens: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        assert_eq!(lens, [0, 1, 2, 3]);
    }
}
