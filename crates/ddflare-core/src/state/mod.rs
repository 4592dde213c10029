// # Reconciliation State
//
// Process-local state kept by the reconciler between cycles.

pub mod cache;

pub use cache::{CacheEntry, LastSetCache};
