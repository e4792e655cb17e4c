//! Tests for the protocol module
//!
//! These tests verify request construction, ID generation, the failure
//! taxonomy's fail-over rules and the diagnostics report helpers.

#[cfg(test)]
mod tests {
    use super::super::*;
    use relay_descriptor::Target;
    use serde_json::json;
    use std::collections::HashSet;
    use std::error::Error;
    use std::sync::Arc;
    use std::time::Duration;

    fn target() -> Target {
        Target::new("10.0.0.1:9001").unwrap()
    }

    fn request(idempotent: bool) -> Arc<Request> {
        Arc::new(Request::new("test", json!({})).idempotent(idempotent))
    }

    const ALL_KINDS: [CallErrorKind; 12] = [
        CallErrorKind::UnknownHost,
        CallErrorKind::NoRouteToHost,
        CallErrorKind::ConnectionRefused,
        CallErrorKind::ConnectTimeout,
        CallErrorKind::ConnectFailed,
        CallErrorKind::SocketTimeout,
        CallErrorKind::ConnectionDropped,
        CallErrorKind::InvalidResponse,
        CallErrorKind::Unclassified,
        CallErrorKind::Application,
        CallErrorKind::NoMoreTargets,
        CallErrorKind::TotalTimeoutExceeded,
    ];

    #[test]
    fn test_request_creation() {
        let req = Request::new("test_method", json!({"arg": 42}));
        assert_eq!(req.method, "test_method");
        assert_eq!(req.args, json!({"arg": 42}));
        assert!(req.timeout_ms.is_none());
        assert!(!req.idempotent);
    }

    #[test]
    fn test_request_builders() {
        let req = Request::new("test", json!({})).with_timeout(5000).idempotent(true);
        assert_eq!(req.timeout(), Some(Duration::from_millis(5000)));
        assert!(req.idempotent);
    }

    #[test]
    fn test_request_id_uniqueness() {
        let ids: HashSet<_> = (0..1000)
            .map(|_| Request::new("test", json!({})).id)
            .collect();
        assert_eq!(ids.len(), 1000, "All request IDs should be unique");
    }

    #[test]
    fn test_request_deserializes_without_optional_fields() {
        let req: Request =
            serde_json::from_value(json!({"id": 7, "method": "m", "args": null})).unwrap();
        assert_eq!(req.id, 7);
        assert!(!req.idempotent);
        assert!(req.timeout_ms.is_none());
    }

    #[test]
    fn test_connection_kinds_always_fail_over() {
        for kind in [
            CallErrorKind::UnknownHost,
            CallErrorKind::NoRouteToHost,
            CallErrorKind::ConnectionRefused,
            CallErrorKind::ConnectTimeout,
            CallErrorKind::ConnectFailed,
        ] {
            assert_eq!(kind.fail_over_policy(), FailOverPolicy::Always);
            let err = CallError::new(kind, request(false), target(), Duration::ZERO);
            assert!(err.is_fail_over_allowed(), "{:?} should fail over", kind);
        }
    }

    #[test]
    fn test_mid_call_kinds_depend_on_idempotence() {
        for kind in [
            CallErrorKind::SocketTimeout,
            CallErrorKind::ConnectionDropped,
            CallErrorKind::InvalidResponse,
            CallErrorKind::Unclassified,
        ] {
            assert_eq!(kind.category(), FailureCategory::MidCallIo);
            let plain = CallError::new(kind, request(false), target(), Duration::ZERO);
            let idempotent = CallError::new(kind, request(true), target(), Duration::ZERO);
            assert!(!plain.is_fail_over_allowed());
            assert!(idempotent.is_fail_over_allowed());
        }
    }

    #[test]
    fn test_application_and_terminal_kinds_never_fail_over() {
        for kind in [
            CallErrorKind::Application,
            CallErrorKind::NoMoreTargets,
            CallErrorKind::TotalTimeoutExceeded,
        ] {
            let err = CallError::new(kind, request(true), target(), Duration::ZERO);
            assert!(!err.is_fail_over_allowed(), "{:?} must not fail over", kind);
        }
        assert!(CallErrorKind::NoMoreTargets.is_terminal());
        assert!(CallErrorKind::TotalTimeoutExceeded.is_terminal());
        assert!(!CallErrorKind::Application.is_terminal());
    }

    #[test]
    fn test_every_kind_has_one_category_and_reason() {
        let reasons: HashSet<_> = ALL_KINDS.iter().map(|k| k.short_reason()).collect();
        assert_eq!(reasons.len(), ALL_KINDS.len(), "short reasons must be distinct");
        assert_eq!(CallErrorKind::UnknownHost.category(), FailureCategory::Resolution);
        assert_eq!(CallErrorKind::NoRouteToHost.category(), FailureCategory::Connection);
        assert_eq!(CallErrorKind::Application.category(), FailureCategory::Application);
        assert_eq!(CallErrorKind::NoMoreTargets.category(), FailureCategory::Exhaustion);
        assert_eq!(
            CallErrorKind::TotalTimeoutExceeded.category(),
            FailureCategory::BudgetExceeded
        );
    }

    #[test]
    fn test_negative_duration_rejected() {
        let result = CallError::from_millis(CallErrorKind::UnknownHost, request(false), target(), -1);
        assert_eq!(result.unwrap_err(), InvalidCallError::NegativeDuration(-1));

        let ok = CallError::from_millis(CallErrorKind::UnknownHost, request(false), target(), 0)
            .unwrap();
        assert_eq!(ok.duration(), Duration::ZERO);
    }

    #[test]
    fn test_call_error_accessors_and_display() {
        let err = CallError::new(
            CallErrorKind::NoRouteToHost,
            request(false),
            target(),
            Duration::from_millis(42),
        )
        .with_detail("network unreachable");

        assert_eq!(err.short_reason(), "No route to host");
        assert_eq!(err.request().method, "test");
        assert_eq!(err.target().address(), "10.0.0.1:9001");
        assert_eq!(err.detail(), Some("network unreachable"));

        let shown = err.to_string();
        assert!(shown.starts_with("No route to host calling 'test' on 10.0.0.1:9001"));
        assert!(shown.contains("after 42ms"));
        assert!(shown.ends_with(": network unreachable"));
    }

    #[test]
    fn test_terminal_error_chains_last_attempt() {
        let last = CallError::new(
            CallErrorKind::ConnectionRefused,
            request(false),
            target(),
            Duration::from_millis(5),
        );
        let terminal = CallError::new(
            CallErrorKind::NoMoreTargets,
            request(false),
            target(),
            Duration::from_millis(15),
        )
        .with_last_attempt(last);

        let cause = terminal.last_attempt().unwrap();
        assert_eq!(cause.kind(), CallErrorKind::ConnectionRefused);

        let source = terminal.source().unwrap();
        assert!(source.to_string().starts_with("Connection refused"));
    }

    #[test]
    fn test_transport_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = TransportError::from(io);
        assert_eq!(err.kind(), CallErrorKind::ConnectionDropped);
        assert!(err.source().is_some());

        let call = err.into_call_error(request(true), target(), Duration::from_millis(3));
        assert_eq!(call.kind(), CallErrorKind::ConnectionDropped);
        assert_eq!(call.detail(), Some("reset by peer"));
        assert!(call.source().is_some());
        assert!(call.is_fail_over_allowed());
    }

    #[test]
    fn test_transport_error_unclassified_wraps_source() {
        let err = TransportError::unclassified("bad state");
        assert_eq!(err.kind(), CallErrorKind::Unclassified);
        assert_eq!(err.to_string(), "Unexpected failure: bad state");
    }

    #[test]
    fn test_report_helpers() {
        let t = target();
        let failed = CallError::new(
            CallErrorKind::ConnectTimeout,
            request(false),
            t.clone(),
            Duration::from_millis(10),
        );
        let report = CallReport {
            request_id: 1,
            method: "test".to_string(),
            attempts: vec![
                AttemptRecord::failed(&failed),
                AttemptRecord::succeeded(&t, Duration::from_millis(4)),
            ],
            total_duration: Duration::from_millis(14),
            outcome: CallOutcome::Succeeded,
        };
        assert_eq!(report.attempt_count(), 2);
        assert_eq!(report.failovers(), 1);
        assert_eq!(report.last_target_checksum(), Some(t.checksum()));
        assert!(report.is_success());
        assert_eq!(
            report.attempts[0].outcome,
            AttemptOutcome::Failed {
                kind: CallErrorKind::ConnectTimeout,
                fail_over_allowed: true
            }
        );
    }

    #[test]
    fn test_report_serializes_kinds_snake_case() {
        let value = serde_json::to_value(CallOutcome::Failed(CallErrorKind::NoMoreTargets)).unwrap();
        assert_eq!(value, json!({"status": "failed", "kind": "no_more_targets"}));
    }
}
