//! Reactive property primitive used to expose daemon-internal state.
//!
//! A [`Property<T>`] is a watch-channel backed cell: readers take a snapshot
//! with [`Property::get`] or subscribe to a stream of changes with
//! [`Property::watch`]. This is how [`upowerd-device`](../upowerd_device)
//! exposes per-attribute state to the aggregator and bus surface without any
//! locking on the read path.

use std::fmt::Debug;

use futures::stream::Stream;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Stream of property value changes.
pub type PropertyStream<T> = Box<dyn Stream<Item = T> + Send + Unpin>;

/// Reactive property exposing service state.
///
/// # Reading State
///
/// - `.get()` - Returns the current value (snapshot)
/// - `.watch()` - Returns a stream that yields on every change
///
/// ```ignore
/// // Snapshot
/// let percentage = device.percentage.get();
///
/// // React to changes
/// let mut stream = device.percentage.watch();
/// while let Some(pct) = stream.next().await {
///     println!("Percentage: {pct:?}");
/// }
/// ```
#[derive(Clone)]
pub struct Property<T: Clone + Send + Sync + 'static> {
    tx: watch::Sender<T>,
    rx: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Property<T> {
    /// Creates a property with an initial value.
    pub fn new(initial: T) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, rx }
    }

    /// Sets the property value, notifying watchers if changed.
    pub fn set(&self, new_value: T)
    where
        T: PartialEq,
    {
        self.tx.send_if_modified(|current| {
            if *current != new_value {
                *current = new_value;
                return true;
            }

            false
        });
    }

    /// Returns the current value.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Watches for value changes.
    ///
    /// Yields the current value immediately, then on every change.
    pub fn watch(&self) -> impl Stream<Item = T> + Send + 'static {
        WatchStream::new(self.rx.clone())
    }
}

impl<T: Clone + Send + Sync + Debug + 'static> Debug for Property<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

impl<T: Clone + Send + Sync + Serialize + 'static> Serialize for Property<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.get().serialize(serializer)
    }
}

impl<'de, T: Clone + Send + Sync + Deserialize<'de> + 'static> Deserialize<'de> for Property<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = T::deserialize(deserializer)?;
        Ok(Property::new(value))
    }
}

/// Create a property that derives its value from other properties.
///
/// The computed property automatically updates when any dependency changes.
/// Used by the aggregator to recompute the display device whenever any
/// tracked battery's properties change.
pub struct ComputedProperty<T: Clone + Send + Sync + 'static> {
    property: Property<T>,
    _task: tokio::task::JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> ComputedProperty<T> {
    /// Create a new computed property.
    ///
    /// The computation function is called whenever any input stream yields a value.
    pub fn new<S, F>(initial: T, mut inputs: S, mut compute: F) -> Self
    where
        S: Stream + Send + Unpin + 'static,
        F: FnMut() -> T + Send + 'static,
        T: PartialEq + Sync,
    {
        use futures::StreamExt;

        let property = Property::new(initial);
        let prop_clone = property.clone();

        let task = tokio::spawn(async move {
            while inputs.next().await.is_some() {
                let new_value = compute();
                prop_clone.set(new_value);
            }
        });

        Self {
            property,
            _task: task,
        }
    }

    /// Get the current computed value.
    pub fn get(&self) -> T {
        self.property.get()
    }

    /// Watch for changes to the computed value.
    pub fn watch(&self) -> impl Stream<Item = T> + Send + 'static {
        self.property.watch()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for ComputedProperty<T> {
    fn drop(&mut self) {
        self._task.abort();
    }
}

#[cfg(test)]
mod tests {
    use futures::{StreamExt, stream};
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn set_updates_value_when_different() {
        let property = Property::new(42);

        property.set(100);

        assert_eq!(property.get(), 100);
    }

    #[tokio::test]
    async fn set_does_not_notify_when_value_unchanged() {
        let property = Property::new(42);
        let mut watch_stream = property.watch();

        let initial = watch_stream.next().await;
        assert_eq!(initial, Some(42));

        property.set(42);

        let next_value =
            tokio::time::timeout(std::time::Duration::from_millis(10), watch_stream.next()).await;

        assert!(next_value.is_err());
    }

    #[tokio::test]
    async fn set_notifies_watchers_when_value_changes() {
        let property = Property::new(1);
        let mut watch_stream = property.watch();

        let initial = watch_stream.next().await;
        assert_eq!(initial, Some(1));

        property.set(2);

        let updated = watch_stream.next().await;
        assert_eq!(updated, Some(2));
    }

    #[tokio::test]
    async fn computed_property_recomputes_when_input_stream_emits() {
        let (tx, mut rx) = mpsc::channel(10);
        let input_stream = stream::poll_fn(move |cx| rx.poll_recv(cx));

        let counter = std::sync::Arc::new(std::sync::atomic::AtomicI32::new(0));
        let counter_clone = counter.clone();

        let computed = ComputedProperty::new(0, input_stream, move || {
            counter_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst)
        });

        assert_eq!(computed.get(), 0);

        tx.send(()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(computed.get(), 0);

        tx.send(()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(computed.get(), 1);

        drop(tx);
    }

    #[test]
    fn serializes_to_inner_value() {
        let property = Property::new(42);

        let json = serde_json::to_string(&property).unwrap();

        assert_eq!(json, "42");
    }

    #[test]
    fn deserializes_from_inner_value() {
        let json = "\"hello\"";

        let property: Property<String> = serde_json::from_str(json).unwrap();

        assert_eq!(property.get(), "hello");
    }
}
