//! In-flight request flag shared by the screens.

use crate::error::ViewError;

/// Holds a screen's busy flag set for as long as it lives.
///
/// The flag is cleared on drop, so a request future dropped before it
/// completes still leaves the screen usable.
pub(crate) struct BusyFlag<'a>(&'a mut bool);

impl<'a> BusyFlag<'a> {
    /// # Errors
    ///
    /// Returns [`ViewError::Busy`] when the flag is already set.
    pub(crate) fn acquire(flag: &'a mut bool) -> Result<Self, ViewError> {
        if *flag {
            return Err(ViewError::Busy);
        }
        *flag = true;
        Ok(Self(flag))
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_cleared_when_the_guard_drops() {
        let mut busy = false;
        {
            let _guard = BusyFlag::acquire(&mut busy).unwrap();
        }
        assert!(!busy);
    }

    #[test]
    fn second_acquire_is_rejected() {
        let mut busy = true;
        assert!(matches!(BusyFlag::acquire(&mut busy), Err(ViewError::Busy)));
        assert!(busy, "a rejected acquire must not clear the flag");
    }

    #[tokio::test]
    async fn cancelled_future_clears_the_flag() {
        let mut busy = false;
        let pending = async {
            let _guard = BusyFlag::acquire(&mut busy)?;
            std::future::pending::<()>().await;
            Ok::<_, ViewError>(())
        };
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert!(!busy);
    }
}
