/// Decides whether a failure is transient, i.e. worth retrying.
///
/// Classifiers are stateless and side-effect free; a single instance is shared by
/// every execution of a [`RetryPolicy`](crate::RetryPolicy). Any `Fn(&E) -> bool`
/// closure is a classifier.
///
/// # Example
/// ```
/// use transient_retry::TransientClassifier;
///
/// let classifier = |e: &String| e.contains("transient");
/// assert!(classifier.is_transient(&"transient error".to_string()));
/// assert!(!classifier.is_transient(&"403".to_string()));
/// ```
pub trait TransientClassifier<E>: Send + Sync {
    fn is_transient(&self, failure: &E) -> bool;
}

/// Treats every failure as transient.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchAll;

impl<E> TransientClassifier<E> for CatchAll {
    fn is_transient(&self, _failure: &E) -> bool {
        true
    }
}

/// Treats every failure as permanent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ignore;

impl<E> TransientClassifier<E> for Ignore {
    fn is_transient(&self, _failure: &E) -> bool {
        false
    }
}

impl<E, F> TransientClassifier<E> for F
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn is_transient(&self, failure: &E) -> bool {
        self(failure)
    }
}
