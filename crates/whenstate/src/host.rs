//! [`ReactiveHost`] backed by the `whenstate-reactive` signal runtime.

use tracing::trace;
use whenstate_core::{EffectGuard, ReactiveHost, ReactiveRef, ReactiveSource, Value};
use whenstate_reactive::{EffectHandle, Observable};

/// Signal runtime host: effects are [`whenstate_reactive::effect`]s and
/// batches are [`whenstate_reactive::batch`]es on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalHost;

struct SignalEffect(EffectHandle);

impl EffectGuard for SignalEffect {
    fn dispose(&self) {
        trace!(runs = self.0.run_count(), "disposing binding effect");
        self.0.dispose();
    }
}

impl ReactiveHost for SignalHost {
    fn effect(&self, body: Box<dyn FnMut()>) -> Box<dyn EffectGuard> {
        Box::new(SignalEffect(whenstate_reactive::effect(body)))
    }

    fn batch(&self, f: &mut dyn FnMut()) {
        whenstate_reactive::batch(f);
    }
}

struct ObservableSource<T: Clone + PartialEq + 'static>(Observable<T>);

impl<T> ReactiveSource for ObservableSource<T>
where
    T: Into<Value> + Clone + PartialEq + 'static,
{
    fn snapshot(&self) -> Value {
        self.0.get().into()
    }
}

/// Wrap an observable as a reactive [`Value`]. Reading it inside a binding
/// cycle subscribes the binding to the observable.
pub fn tracked<T>(observable: &Observable<T>) -> Value
where
    T: Into<Value> + Clone + PartialEq + 'static,
{
    Value::Reactive(ReactiveRef::new(ObservableSource(observable.clone())))
}
