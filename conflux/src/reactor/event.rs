/// A readiness report produced by the poller.
///
/// The reactor consumes events to resolve pending native-handle waits.
pub(crate) struct Event {
    /// Token the handle was registered with (a slab index in the driver).
    pub(crate) token: usize,

    /// The OS reported an error condition instead of plain readiness.
    pub(crate) failed: bool,
}
