use std::{io, path::Path};

use crate::{query::Query, types::Compression, types::ProbeResult};

/// A tablebase probing library.
///
/// Lifecycle: paths are registered with [`Backend::add_path()`], then the
/// library is initialized with [`Backend::init()`] and
/// [`Backend::init_cache()`]. Teardown runs [`Backend::release_cache()`],
/// [`Backend::release()`] and [`Backend::clear_paths()`] in that order.
/// Release methods may be called after a partially failed initialization
/// and must do nothing for steps that never ran.
///
/// Probes take `&self` and may be issued concurrently from multiple search
/// threads while the library is initialized. Implementations provide their
/// own synchronization for internal caches.
pub trait Backend: Sync {
    /// Registers a directory containing table files.
    ///
    /// # Errors
    ///
    /// Errors if the library refuses the path.
    fn add_path(&mut self, path: &Path) -> io::Result<()>;

    /// Initializes the library with all registered paths.
    ///
    /// # Errors
    ///
    /// Errors if index structures can not be loaded.
    fn init(&mut self, compression: Compression) -> io::Result<()>;

    /// Allocates the cache. `wdl_fraction` is the share of the cache, in
    /// units of 1/128, reserved for WDL information.
    ///
    /// # Errors
    ///
    /// Errors if the cache can not be allocated.
    fn init_cache(&mut self, bytes: usize, wdl_fraction: u32) -> io::Result<()>;

    fn release_cache(&mut self);

    fn release(&mut self);

    fn clear_paths(&mut self);

    /// Resets cumulative probe statistics.
    fn reset_stats(&mut self);

    /// Probes distance to mate, loading from disk as required.
    fn probe_hard(&self, query: &Query) -> ProbeResult;

    /// Probes the outcome only, loading from disk as required.
    fn probe_wdl_hard(&self, query: &Query) -> ProbeResult;

    /// Probes distance to mate using only cached data.
    fn probe_soft(&self, query: &Query) -> ProbeResult;

    /// Probes the outcome only, using only cached data.
    fn probe_wdl_soft(&self, query: &Query) -> ProbeResult;
}
