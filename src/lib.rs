//! redis-basic - 带调用计数与调用历史的 Redis 缓存
//!
//! # 示例
//! ```rust
//! use std::sync::Arc;
//! use redis_basic::{Cache, MemoryStore};
//!
//! let cache = Cache::new(Arc::new(MemoryStore::new())).unwrap();
//! let key = cache.store("hello").unwrap();
//! assert_eq!(cache.get_str(&key).unwrap(), Some("hello".to_string()));
//! assert_eq!(cache.call_count(Cache::STORE_QUALNAME).unwrap(), 1);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod instrument;
pub mod replay;
pub mod resp;
pub mod server;
pub mod store;
pub mod value;

pub use cache::Cache;
pub use config::ConnectionOptions;
pub use error::{CacheError, CacheResult, DecodeError};
pub use instrument::{count_calls, instrument, record_history, CallArgs};
pub use replay::{replay, CallHistory};
pub use store::{MemoryStore, RedisStore, RemoteStore, StoreError, StoreResult};
pub use value::Value;
