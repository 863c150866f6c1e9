//! First-success selection over an ordered list of candidates.
//!
//! Used for the model chain: each model id is tried in priority order and
//! the first one that answers wins. Failures are collected so the caller can
//! log them once the whole chain is exhausted.

use std::future::Future;

/// Outcome of [`first_success`].
#[derive(Debug)]
pub enum Fallback<C, T, E> {
    /// `candidate` produced `value`; `failures` holds the ones tried before it.
    Success {
        candidate: C,
        value: T,
        failures: Vec<(C, E)>,
    },
    /// Every candidate failed, in order.
    Exhausted { failures: Vec<(C, E)> },
}

impl<C, T, E> Fallback<C, T, E> {
    pub fn into_value(self) -> Option<T> {
        match self {
            Fallback::Success { value, .. } => Some(value),
            Fallback::Exhausted { .. } => None,
        }
    }

    pub fn failures(&self) -> &[(C, E)] {
        match self {
            Fallback::Success { failures, .. } | Fallback::Exhausted { failures } => failures,
        }
    }
}

/// Try `attempt` on each candidate in order, stopping at the first `Ok`.
///
/// Candidates are tried strictly one after another.
pub async fn first_success<C, T, E, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
) -> Fallback<C, T, E>
where
    C: Clone,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(candidate.clone()).await {
            Ok(value) => {
                return Fallback::Success {
                    candidate,
                    value,
                    failures,
                }
            }
            Err(e) => failures.push((candidate, e)),
        }
    }
    Fallback::Exhausted { failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[tokio::test]
    async fn stops_at_first_success() {
        let tried = RefCell::new(Vec::new());
        let out = first_success(["a", "b", "c"], |m| {
            tried.borrow_mut().push(m);
            async move {
                if m == "b" {
                    Ok(42)
                } else {
                    Err(format!("{m} rejected"))
                }
            }
        })
        .await;

        assert_eq!(*tried.borrow(), vec!["a", "b"]);
        match out {
            Fallback::Success {
                candidate,
                value,
                failures,
            } => {
                assert_eq!(candidate, "b");
                assert_eq!(value, 42);
                assert_eq!(failures, vec![("a", "a rejected".to_string())]);
            }
            Fallback::Exhausted { .. } => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn exhausts_in_order() {
        let out: Fallback<&str, (), &str> =
            first_success(["x", "y"], |m| async move { Err(m) }).await;
        assert_eq!(out.failures(), &[("x", "x"), ("y", "y")]);
        assert!(out.into_value().is_none());
    }

    #[tokio::test]
    async fn empty_chain_is_exhausted() {
        let out: Fallback<&str, u8, ()> =
            first_success(Vec::<&str>::new(), |_| async { Ok(1) }).await;
        assert!(matches!(out, Fallback::Exhausted { ref failures } if failures.is_empty()));
    }
}
