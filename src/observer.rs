//! The consumer side of a reliable request.

use bytes::Bytes;

/// Error an observer may return when it cannot accept a body.
pub type ObserveError = Box<dyn std::error::Error + Send + Sync>;

/// Receives the body of a successful response.
///
/// A request calls `observe` at most once, and only after a 2xx response was
/// read in full. An `Err` does not trigger another network attempt; it ends
/// the request as [`FatalError::Observer`](crate::FatalError::Observer).
///
/// Any `Fn(Bytes) -> Result<(), ObserveError>` closure is an observer.
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use steadyget::{ObserveError, ResultObserver};
///
/// struct Printer;
///
/// impl ResultObserver for Printer {
///     fn observe(&self, data: Bytes) -> Result<(), ObserveError> {
///         println!("{} bytes", data.len());
///         Ok(())
///     }
/// }
///
/// let closure = |data: Bytes| -> Result<(), ObserveError> {
///     assert_eq!(&data[..], b"ok");
///     Ok(())
/// };
/// closure.observe(Bytes::from_static(b"ok")).unwrap();
/// Printer.observe(Bytes::new()).unwrap();
/// ```
pub trait ResultObserver {
    /// Consume the full response body.
    fn observe(&self, data: Bytes) -> Result<(), ObserveError>;
}

impl<F> ResultObserver for F
where
    F: Fn(Bytes) -> Result<(), ObserveError>,
{
    fn observe(&self, data: Bytes) -> Result<(), ObserveError> {
        self(data)
    }
}
