//! Relational store access.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ExecutionGate                 │  StoreMetadataProvider         │
//! │  - re-checks SELECT-only rule  │  - pragma_table_list           │
//! │  - runs one statement          │  - pragma_table_info           │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │ PoolManager::run()
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      PoolManager                                │
//! │  - creates the single shared pool on first use (once only)      │
//! │  - drops it after a fatal error so the next caller rebuilds     │
//! └─────────────────────────────────────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │            ConnectionPool (rusqlite, semaphore-bounded)         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod error;
mod gate;
mod manager;
mod pool;

pub use error::{StoreError, StoreResult};
pub use gate::{ExecutionGate, QueryResult, Row};
pub use manager::PoolManager;
pub use pool::{ConnectionPool, PooledConnection};
