//! Driver lock and operation state
//!
//! A single atomic-exchange lock serializes every flash operation,
//! including the control-plane commands that touch hardware registers.
//! Acquisition never blocks: contention is reported as [`Error::Busy`] and
//! callers retry. The interrupt completion path releases the lock on
//! behalf of the foreground call that started a background operation.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::{Error, Result};

/// Driver operation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpState {
    /// Driver closed (never opened, or closed again)
    Uninitialized = 0,
    /// `open()` in progress
    Initializing = 1,
    /// Idle and ready to accept an operation
    Ready = 2,
    /// Write in progress
    Writing = 3,
    /// Erase in progress
    Erasing = 4,
    /// Blank check in progress
    BlankChecking = 5,
    /// Status poll in progress
    GettingStatus = 6,
    /// Lock-bit read or write in progress
    LockBit = 7,
}

impl OpState {
    fn from_u8(v: u8) -> OpState {
        match v {
            1 => OpState::Initializing,
            2 => OpState::Ready,
            3 => OpState::Writing,
            4 => OpState::Erasing,
            5 => OpState::BlankChecking,
            6 => OpState::GettingStatus,
            7 => OpState::LockBit,
            _ => OpState::Uninitialized,
        }
    }
}

/// Exclusive-ownership flag plus the current operation state
///
/// The flag is claimed with a single atomic exchange, so acquisition is
/// safe against both other tasks and the flash-ready interrupt. The state
/// is only ever written while the flag is held.
pub struct DriverLock {
    locked: AtomicBool,
    state: AtomicU8,
}

impl DriverLock {
    /// Creates a released lock in the `Uninitialized` state.
    pub const fn new() -> Self {
        DriverLock {
            locked: AtomicBool::new(false),
            state: AtomicU8::new(OpState::Uninitialized as u8),
        }
    }

    /// Attempts to claim the lock and set the operation state.
    ///
    /// On contention the state is left untouched and `Busy` is returned;
    /// callers are expected to retry.
    pub fn acquire(&self, new_state: OpState) -> Result<()> {
        if self.locked.swap(true, Ordering::AcqRel) {
            return Err(Error::Busy);
        }
        self.state.store(new_state as u8, Ordering::Release);
        Ok(())
    }

    /// Returns the state to `Ready` and releases the lock.
    pub fn release(&self) {
        self.state.store(OpState::Ready as u8, Ordering::Release);
        self.locked.store(false, Ordering::Release);
    }

    /// Returns the state to `Uninitialized` and releases the lock.
    ///
    /// Used by `close()`, which must not leave the driver looking ready.
    pub fn release_closed(&self) {
        self.state.store(OpState::Uninitialized as u8, Ordering::Release);
        self.locked.store(false, Ordering::Release);
    }

    /// Current operation state.
    pub fn state(&self) -> OpState {
        OpState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True while some operation holds the lock.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_sets_state_and_blocks_second_acquire() {
        let lock = DriverLock::new();
        assert_eq!(lock.state(), OpState::Uninitialized);

        lock.acquire(OpState::Erasing).unwrap();
        assert_eq!(lock.state(), OpState::Erasing);

        // contention does not disturb the state
        assert_eq!(lock.acquire(OpState::Writing), Err(Error::Busy));
        assert_eq!(lock.state(), OpState::Erasing);

        lock.release();
        assert_eq!(lock.state(), OpState::Ready);
        lock.acquire(OpState::Writing).unwrap();
    }

    #[test]
    fn release_closed_marks_driver_uninitialized() {
        let lock = DriverLock::new();
        lock.acquire(OpState::Uninitialized).unwrap();
        lock.release_closed();
        assert_eq!(lock.state(), OpState::Uninitialized);
        lock.acquire(OpState::Initializing).unwrap();
    }

    #[test]
    fn only_one_thread_wins_the_exchange() {
        let lock = Arc::new(DriverLock::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let lock = lock.clone();
            handles.push(thread::spawn(move || {
                lock.acquire(OpState::Erasing).is_ok()
            }));
        }

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(wins, 1);
        assert_eq!(lock.state(), OpState::Erasing);
    }
}
