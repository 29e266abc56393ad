use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

/// Keys for the persisted per-user state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Accumulated accept/reject weight map
    FeedbackWeights(String),
    /// Recently rejected combinations (bounded)
    RerollHistory(String),
    /// Restaurants the user explicitly kept
    SavedRestaurants(String),
    /// Like/dislike terms
    Preferences(String),
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::FeedbackWeights(user) => write!(f, "dd:weights:{}", user),
            StoreKey::RerollHistory(user) => write!(f, "dd:rerolls:{}", user),
            StoreKey::SavedRestaurants(user) => write!(f, "dd:saved:{}", user),
            StoreKey::Preferences(user) => write!(f, "dd:prefs:{}", user),
        }
    }
}

/// Message for asynchronous store writes
struct StoreWriteMessage {
    key: String,
    value: String,
}

/// Best-effort key-value persistence on top of Redis.
///
/// Reads are parse-or-default: a missing key, an unreachable server, or a
/// malformed payload all degrade to the type's `Default` rather than
/// surfacing an error. Writes are queued to a background task so the
/// request path never blocks on Redis.
#[derive(Clone)]
pub struct KvStore {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<StoreWriteMessage>,
}

/// Handle for gracefully shutting down the store writer
pub struct StoreWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl StoreWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Store writer shutdown signal sent");
    }
}

impl KvStore {
    /// Opens the store and spawns its background write task
    pub fn open(redis_url: &str) -> anyhow::Result<(Self, StoreWriterHandle)> {
        let client = Client::open(redis_url)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(redis_client: Client) -> (Self, StoreWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::store_writer_task(client, write_rx, shutdown_rx).await;
        });

        let store = Self {
            redis_client,
            write_tx,
        };

        (store, StoreWriterHandle { shutdown_tx })
    }

    /// Background task draining queued writes into Redis
    async fn store_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<StoreWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Store writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::warn!(error = %e, "Store write failed");
                    }
                }
                _ = shutdown_rx.recv() => {
                    // Flush whatever is still queued before exiting
                    while let Ok(msg) = write_rx.try_recv() {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::warn!(error = %e, "Store flush write failed");
                        }
                    }
                    tracing::debug!("Store writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(
        client: &Client,
        msg: StoreWriteMessage,
    ) -> Result<(), redis::RedisError> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(msg.key, msg.value).await?;
        Ok(())
    }

    /// Reads a value, falling back to `T::default()` on any failure.
    ///
    /// Failures are logged at warn level and never propagated; the store
    /// is an optimization layer, not a source of truth the caller can
    /// insist on.
    pub async fn get_or_default<T>(&self, key: &StoreKey) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let mut conn = match self.redis_client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Store unreachable, using default");
                return T::default();
            }
        };

        let raw: Option<String> = match conn.get(format!("{}", key)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Store read failed, using default");
                return T::default();
            }
        };

        match raw {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "Malformed stored payload, using default");
                T::default()
            }),
            None => T::default(),
        }
    }

    /// Queues a write without blocking the caller
    pub fn set_in_background<T: serde::Serialize>(&self, key: &StoreKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Store serialization error");
                return;
            }
        };

        let msg = StoreWriteMessage {
            key: format!("{}", key),
            value: json,
        };

        if self.write_tx.send(msg).is_err() {
            tracing::error!(key = %key, "Store writer channel closed");
        }
    }
}
