//! Fire-and-forget audit trail of authentication events.
//!
//! Handlers record an event after each login attempt, logout and rotation.
//! A sink must never fail the request that produced the event.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    MerchantRegistered,
    MerchantLogin,
    UserLogin,
    TokenRefresh,
    Logout,
    LogoutAllDevices,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::MerchantRegistered => "merchant_registered",
            AuditAction::MerchantLogin => "merchant_login",
            AuditAction::UserLogin => "user_login",
            AuditAction::TokenRefresh => "token_refresh",
            AuditAction::Logout => "logout",
            AuditAction::LogoutAllDevices => "logout_all_devices",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub success: bool,
    pub merchant_id: Option<String>,
    pub principal_id: Option<String>,
    /// Failure category, never a secret or token
    pub reason: Option<String>,
}

impl AuditEvent {
    pub fn success(action: AuditAction) -> Self {
        Self {
            action,
            success: true,
            merchant_id: None,
            principal_id: None,
            reason: None,
        }
    }

    pub fn failure(action: AuditAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            success: false,
            merchant_id: None,
            principal_id: None,
            reason: Some(reason.into()),
        }
    }

    pub fn merchant(mut self, merchant_id: impl Into<String>) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    pub fn principal(mut self, principal_id: impl Into<String>) -> Self {
        self.principal_id = Some(principal_id.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Emits each event as a structured `tracing` record under the `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "audit",
            action = %event.action,
            success = event.success,
            merchant_id = event.merchant_id.as_deref().unwrap_or("-"),
            principal_id = event.principal_id.as_deref().unwrap_or("-"),
            reason = event.reason.as_deref().unwrap_or("-"),
            "auth event"
        );
    }
}

/// Keeps events in memory so tests can assert on them.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    events: std::sync::Mutex<Vec<AuditEvent>>,
}

#[cfg(test)]
impl RecordingAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
impl AuditSink for RecordingAuditSink {
    fn record(&self, event: AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fills_identity() {
        let event = AuditEvent::failure(AuditAction::UserLogin, "invalid_credentials")
            .merchant("m-1")
            .principal("u-1");

        assert!(!event.success);
        assert_eq!(event.merchant_id.as_deref(), Some("m-1"));
        assert_eq!(event.principal_id.as_deref(), Some("u-1"));
        assert_eq!(event.reason.as_deref(), Some("invalid_credentials"));
        assert_eq!(event.action.to_string(), "user_login");
    }

    #[test]
    fn test_recording_sink_keeps_order() {
        let sink = RecordingAuditSink::default();
        sink.record(AuditEvent::success(AuditAction::MerchantLogin));
        sink.record(AuditEvent::success(AuditAction::Logout));
        TracingAuditSink.record(AuditEvent::success(AuditAction::Logout));

        let actions: Vec<_> = sink.events().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![AuditAction::MerchantLogin, AuditAction::Logout]);
    }
}
