//! Minimal readiness check: does the MCC have any reports at all?

use awrc_client::Session;
use awrc_core::Ccid;

use crate::error::ViewError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Ready,
    NoData,
}

/// Unlike the account screen, pending job counters are ignored: any
/// downloaded report counts. A ready MCC is marked verified, and the
/// session remembers it so repeat checks skip the availability request.
///
/// # Errors
///
/// Returns [`ViewError::Client`] when the MCC is unknown or the
/// availability request fails.
pub async fn health_check(session: &Session, mcc: Ccid) -> Result<HealthStatus, ViewError> {
    session.mcc_by_id(mcc).await?;
    if session.reports_downloaded(mcc).await? {
        session.mark_verified(mcc);
        Ok(HealthStatus::Ready)
    } else {
        Ok(HealthStatus::NoData)
    }
}
