// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::domain::constants::BATCH_BASE_DELAY_MS;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry an async operation with exponential backoff.
pub async fn retry_async<F, Fut, T, E>(
    mut op: F,
    attempts: usize,
    initial_delay: Duration,
) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(_) if attempt < attempts => {
                sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Linear backoff with a random jitter factor in `[1, 2)`.
/// Used when a provider signals rate limiting: `base * attempt * (1 + rand)`.
pub fn jittered_delay(attempt: u32) -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    let ms = (BATCH_BASE_DELAY_MS as f64) * (attempt.max(1) as f64) * (1.0 + jitter);
    Duration::from_millis(ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicUsize::new(0);
        let res: Result<u32, ()> = retry_async(
            |_| {
                let current = counter.fetch_add(1, Ordering::Relaxed);
                async move {
                    if current < 2 {
                        Err(())
                    } else {
                        Ok(7)
                    }
                }
            },
            4,
            Duration::from_millis(1),
        )
        .await;

        assert_eq!(res.unwrap(), 7);
        assert!(counter.load(Ordering::Relaxed) >= 3);
    }

    #[tokio::test]
    async fn gives_up_after_last_attempt() {
        let counter = AtomicUsize::new(0);
        let res: Result<u32, &str> = retry_async(
            |_| {
                counter.fetch_add(1, Ordering::Relaxed);
                async move { Err("nope") }
            },
            3,
            Duration::from_millis(1),
        )
        .await;

        assert!(res.is_err());
        assert_eq!(counter.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn jittered_delay_scales_with_attempt() {
        for attempt in 1..=5u32 {
            let d = jittered_delay(attempt).as_millis() as u64;
            let base = 150 * attempt as u64;
            assert!(d >= base, "attempt {attempt}: {d} < {base}");
            assert!(d < base * 2, "attempt {attempt}: {d} >= {}", base * 2);
        }
    }
}
