pub mod kv;

pub use kv::{KvStore, StoreKey, StoreWriterHandle};
