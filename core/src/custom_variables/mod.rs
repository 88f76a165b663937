//! Custom variables
//!
//! Named JSON values set by effects, `$setCustomVariable` or the API.
//! Values may carry a TTL; expired entries are invisible to readers and are
//! removed lazily on read or by the periodic sweeper.

mod store;


pub use store::{CustomVariable, CustomVariableStore};
