pub mod snapshot;

pub use snapshot::{ResolveError, ResourceSnapshot};
