//! Retry across a rotating set of endpoints

use crate::retry::Retryable;
use log::{debug, warn};
use std::fmt::Display;
use std::future::Future;

/// Attempts an operation against each endpoint in turn.
///
/// Attempt `n` goes to endpoint `(base + n) mod len`. A retryable failure
/// moves on to the next endpoint, and once every endpoint has been tried the
/// last error is returned. Without endpoints the operation runs once with
/// `None`; a single endpoint gets a single attempt.
#[derive(Debug, Clone)]
pub struct EndpointRotation<T> {
    endpoints: Vec<T>,
}

impl<T> EndpointRotation<T> {
    pub fn new(endpoints: Vec<T>) -> Self {
        Self { endpoints }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Run `operation`, starting at endpoint `base`
    pub async fn execute<F, Fut, R, E>(&self, base: usize, mut operation: F) -> Result<R, E>
    where
        T: Display,
        F: FnMut(Option<&T>) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Retryable + Display,
    {
        let count = self.endpoints.len();
        if count == 0 {
            return operation(None).await;
        }

        let first = base % count;
        let mut attempt = 0;
        loop {
            let endpoint = &self.endpoints[(first + attempt) % count];
            debug!("Attempt {} of {} via {}", attempt + 1, count, endpoint);

            match operation(Some(endpoint)).await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    attempt += 1;
                    if !error.is_retryable() {
                        warn!("Operation failed with non-retryable error via {}: {}", endpoint, error);
                        return Err(error);
                    }
                    if attempt >= count {
                        warn!("Operation failed on all {} endpoints: {}", count, error);
                        return Err(error);
                    }
                    warn!("Attempt via {} failed: {}. Trying next endpoint", endpoint, error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
        message: String,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn failing(endpoint: Option<&u16>, retryable: bool) -> Result<u16, TestError> {
        Err(TestError {
            retryable,
            message: format!("failed on {:?}", endpoint),
        })
    }

    #[tokio::test]
    async fn test_rotates_from_base_and_returns_last_error() {
        let rotation = EndpointRotation::new(vec![8301u16, 8302, 8303]);
        let seen = Mutex::new(Vec::new());

        let result = rotation
            .execute(4, |endpoint| {
                seen.lock().unwrap().push(endpoint.copied());
                let outcome = failing(endpoint, true);
                async move { outcome }
            })
            .await;

        assert_eq!(result.unwrap_err().message, "failed on Some(8301)");
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(8302), Some(8303), Some(8301)]
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let rotation = EndpointRotation::new(vec![1u16, 2, 3]);
        let mut calls = 0;

        let result = rotation
            .execute(0, |endpoint| {
                calls += 1;
                let outcome = match endpoint {
                    Some(&2) => Ok(2),
                    other => failing(other, true),
                };
                async move { outcome }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_rotated() {
        let rotation = EndpointRotation::new(vec![1u16, 2, 3]);
        let mut calls = 0;

        let result = rotation
            .execute(0, |endpoint| {
                calls += 1;
                let outcome = failing(endpoint, false);
                async move { outcome }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_without_endpoints_runs_once() {
        let rotation: EndpointRotation<u16> = EndpointRotation::new(vec![]);
        let mut calls = 0;

        let result = rotation
            .execute(7, |endpoint| {
                calls += 1;
                let outcome = failing(endpoint, true);
                async move { outcome }
            })
            .await;

        assert_eq!(result.unwrap_err().message, "failed on None");
        assert_eq!(calls, 1);
    }
}
