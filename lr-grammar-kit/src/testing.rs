use lr_grammar_model::{Error, Result};
use std::fmt::Debug;

/// A wrapper around [`Result`] for writing fluent assertions in tests.
pub struct TestResult<T> {
    inner: Result<T>,
}

impl<T: Debug> TestResult<T> {
    pub fn new(result: Result<T>) -> Self {
        Self { inner: result }
    }

    /// Asserts success and returns the value.
    pub fn assert_success(self) -> T {
        match self.inner {
            Ok(val) => val,
            Err(e) => {
                panic!(
                    "\n🔴 TEST FAILED (Expected Success, but got Error):\nMessage:  {}\nLocation: {:?}\n",
                    e,
                    e.location()
                );
            }
        }
    }

    /// Asserts success and compares the value.
    pub fn assert_success_is<E>(self, expected: E) -> T
    where
        T: PartialEq<E>,
        E: Debug,
    {
        let val = self.assert_success();
        if val != expected {
            panic!(
                "\n🔴 TEST FAILED (Value Mismatch):\nExpected: {:?}\nGot:      {:?}\n",
                expected, val
            );
        }
        val
    }

    /// Asserts failure and returns the error.
    pub fn assert_failure(self) -> Error {
        match self.inner {
            Ok(val) => {
                panic!(
                    "\n🔴 TEST FAILED (Expected Failure, but got Success):\nValue: {:?}\n",
                    val
                );
            }
            Err(e) => e,
        }
    }

    /// Asserts failure with a message containing `expected_msg_part`.
    pub fn assert_failure_contains(self, expected_msg_part: &str) -> Error {
        let err = self.assert_failure();
        let actual_msg = err.to_string();
        if !actual_msg.contains(expected_msg_part) {
            panic!(
                "\n🔴 TEST FAILED (Error Message Mismatch):\nExpected part: {:?}\nActual msg:    {:?}\nLocation:      {:?}\n",
                expected_msg_part,
                actual_msg,
                err.location()
            );
        }
        err
    }
}

pub trait Testable<T> {
    fn test(self) -> TestResult<T>;
}

impl<T: Debug> Testable<T> for Result<T> {
    fn test(self) -> TestResult<T> {
        TestResult::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let r: Result<u32> = Ok(3);
        assert_eq!(r.test().assert_success_is(3), 3);
    }

    #[test]
    fn test_failure_contains() {
        let r: Result<u32> = Err(Error::grammar(4, "empty rule body for 'a'"));
        let err = r.test().assert_failure_contains("empty rule body");
        assert_eq!(err, Error::grammar(4, "empty rule body for 'a'"));
    }

    #[test]
    #[should_panic(expected = "Expected Failure")]
    fn test_unexpected_success() {
        let r: Result<u32> = Ok(1);
        r.test().assert_failure();
    }
}
