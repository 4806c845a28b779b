/// A unit of work the pool can move onto a worker thread.
///
/// The job is moved into the worker and its output moved back, so neither
/// side ever holds a reference into the other's memory.
pub trait Job: Send + 'static {
    type Output: Send + 'static;

    /// Short operation name for logs.
    fn kind(&self) -> &'static str;

    /// Approximate number of bytes handed to the worker.
    fn payload_size(&self) -> usize {
        0
    }

    /// Run to completion. An `Err` fails this task only; a panic is treated
    /// as a fault of the worker running it.
    fn run(self) -> Result<Self::Output, String>;
}
