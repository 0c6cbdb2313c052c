use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tracing::warn;

static POISON_RECOVERIES: AtomicU64 = AtomicU64::new(0);

/// Locks `lock`, taking the inner value back out of a poisoned mutex.
///
/// The terminal parser is only ever mutated by whole `process` calls, so a
/// panic on another thread cannot leave it half-written.
pub fn mutex_lock_or_recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        POISON_RECOVERIES.fetch_add(1, Ordering::Relaxed);
        warn!("recovering from poisoned mutex");
        poisoned.into_inner()
    })
}

/// Number of poisoned locks recovered since process start.
pub fn poison_recovery_count() -> u64 {
    POISON_RECOVERIES.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_healthy_mutex() {
        let lock = Mutex::new(5);
        *mutex_lock_or_recover(&lock) += 1;
        assert_eq!(*mutex_lock_or_recover(&lock), 6);
    }

    #[test]
    fn test_recovers_poisoned_mutex() {
        let lock = Arc::new(Mutex::new(String::from("screen")));
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        let before = poison_recovery_count();
        assert_eq!(mutex_lock_or_recover(&lock).as_str(), "screen");
        assert!(poison_recovery_count() > before);
    }
}
