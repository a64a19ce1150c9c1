//! Test assertions for responses.

use std::fmt::Debug;

use crate::core::{Response, ResponseStatus};

/// Asserts that the responses carry exactly the expected statuses, in order.
pub fn assert_status_sequence<T>(responses: &[Response<T>], expected: &[ResponseStatus]) {
    let actual: Vec<ResponseStatus> = responses.iter().map(Response::status).collect();
    assert_eq!(
        actual, expected,
        "Expected status sequence {:?}, got {:?}",
        expected, actual
    );
}

/// Asserts that the response is a success carrying `expected`.
pub fn assert_success_eq<T>(response: &Response<T>, expected: &T)
where
    T: PartialEq + Debug,
{
    assert_eq!(
        response.data(),
        Some(expected),
        "Expected success with {:?}, got status {}",
        expected,
        response.status()
    );
}

/// Asserts that the response is an error whose message contains `fragment`.
pub fn assert_error_response<T>(response: &Response<T>, fragment: &str) {
    let Some(error) = response.failure() else {
        panic!("Expected an error response, got status {}", response.status());
    };
    assert!(
        error.to_string().contains(fragment),
        "Expected error containing '{}', got '{}'",
        fragment,
        error
    );
}

/// Asserts that the response is an error raised by the deadline.
pub fn assert_deadline_exceeded<T>(response: &Response<T>) {
    assert!(
        response.failure().is_some_and(|error| error.is_deadline_exceeded()),
        "Expected a deadline error, got status {}",
        response.status()
    );
}
