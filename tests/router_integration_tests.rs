use audio_session_router::audio::{OverrideType, PortOverride};
use audio_session_router::catalog::{InterruptionType, Port, RouteChangeReason};
use audio_session_router::events::{EventKind, SessionEvent};
use audio_session_router::priority::{ConfigureOptions, EvaluationOutcome};
use audio_session_router::system::{
    MockAudioSession, NotificationValue, ROUTE_CHANGE_REASON_KEY, SessionCall,
};
use audio_session_router::{AudioSessionRouter, Config, SessionError};
use std::time::Duration;

mod test_utils;
use test_utils::{ConfigBuilder, NotificationBuilder, failing_observer, recording_observer};

/// Test fixture wiring a router to a mock audio session
struct RouterFixture {
    session: MockAudioSession,
    router: AudioSessionRouter<MockAudioSession>,
}

impl RouterFixture {
    fn new(config: &Config) -> Self {
        let session = MockAudioSession::new();
        let router = AudioSessionRouter::new(session.clone(), config).unwrap();
        Self { session, router }
    }

    fn with_outputs(config: &Config, ports: &[Port]) -> Self {
        let fixture = Self::new(config);
        fixture.session.set_outputs(ports);
        fixture
    }

    /// Load, wait for the startup pass if any, and forget its calls
    async fn loaded(self) -> Self {
        if let Some(handle) = self.router.load().unwrap() {
            handle.wait().await;
        }
        self.router.settle().await;
        self.session.clear_calls();
        self
    }
}

#[cfg(test)]
mod override_requests {
    use super::*;

    #[tokio::test]
    async fn test_repeated_speaker_override_issues_one_command() {
        let fixture = RouterFixture::new(&Config::default());

        let first = fixture.router.override_output("speaker").await;
        let second = fixture.router.request_override("speaker");
        assert!(!second.is_pending());
        let second = second.outcome().await;

        assert!(first.success);
        assert!(second.success);
        assert_eq!(fixture.session.get_override_calls(), vec![PortOverride::Speaker]);
        assert_eq!(fixture.router.current_override(), Some(OverrideType::Speaker));
    }

    #[tokio::test]
    async fn test_invalid_type_completes_synchronously() {
        let fixture = RouterFixture::new(&Config::default());

        let request = fixture.router.request_override("bogus");
        assert!(!request.is_pending());

        let outcome = request.outcome().await;
        assert!(!outcome.success);
        assert!(!outcome.is_fatal);
        assert_eq!(outcome.message.as_deref(), Some("No valid output provided..."));
        assert!(fixture.session.get_calls().is_empty());
        assert_eq!(fixture.router.current_override(), None);
    }

    #[tokio::test]
    async fn test_setup_failure_is_fatal_and_keeps_state() {
        let fixture = RouterFixture::new(&Config::default());
        fixture.session.set_activation_failure(true);

        let outcome = fixture.router.override_output("speaker").await;

        assert!(!outcome.success);
        assert!(outcome.is_fatal);
        assert!(
            outcome
                .message
                .unwrap()
                .starts_with("Error setting session settings")
        );
        assert!(fixture.session.get_override_calls().is_empty());
        assert_eq!(fixture.router.current_override(), None);
    }

    #[tokio::test]
    async fn test_rejected_override_is_distinguished_from_setup() {
        let fixture = RouterFixture::new(&Config::default());
        fixture.session.set_override_failure(true);

        let outcome = fixture.router.override_output("default").await;

        assert!(!outcome.success);
        assert!(outcome.is_fatal);
        assert!(
            outcome
                .message
                .unwrap()
                .starts_with("Could not override output port")
        );
        assert_eq!(fixture.router.current_override(), None);

        // The failed attempt must not short-circuit a retry.
        fixture.session.set_override_failure(false);
        assert!(fixture.router.override_output("default").await.success);
        assert_eq!(fixture.session.get_override_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_switching_back_and_forth() {
        let fixture = RouterFixture::new(&Config::default());

        for requested in ["speaker", "default", "speaker"] {
            assert!(fixture.router.override_output(requested).await.success);
        }

        assert_eq!(
            fixture.session.get_override_calls(),
            vec![PortOverride::Speaker, PortOverride::None, PortOverride::Speaker]
        );
    }

    #[tokio::test]
    async fn test_slow_hardware_times_out() {
        let config = ConfigBuilder::new().command_timeout_ms(50).build();
        let fixture = RouterFixture::new(&config);
        fixture
            .session
            .set_override_delay(Some(Duration::from_millis(300)));

        let outcome = fixture.router.override_output("speaker").await;

        assert!(!outcome.success);
        assert!(outcome.is_fatal);
        assert!(outcome.message.unwrap().contains("timed out"));
    }
}

#[cfg(test)]
mod evaluation {
    use super::*;

    async fn evaluate(order: &[Port], connected: &[Port]) -> (EvaluationOutcome, MockAudioSession) {
        let config = ConfigBuilder::new().order(order).build();
        let fixture = RouterFixture::with_outputs(&config, connected);
        let outcome = fixture.router.evaluate().wait().await;
        (outcome, fixture.session)
    }

    #[tokio::test]
    async fn test_first_matching_port_is_applied() {
        let (outcome, session) = evaluate(
            &[Port::Headphones, Port::BluetoothA2dp, Port::BuiltinSpeaker],
            &[Port::BuiltinSpeaker, Port::BluetoothA2dp],
        )
        .await;

        assert_eq!(
            outcome,
            EvaluationOutcome::Applied {
                port: Port::BluetoothA2dp
            }
        );
        assert_eq!(session.get_override_calls(), vec![PortOverride::None]);
    }

    #[tokio::test]
    async fn test_speaker_alone_is_applied_with_override() {
        let (outcome, session) =
            evaluate(&[Port::Headphones, Port::BuiltinSpeaker], &[Port::BuiltinSpeaker]).await;

        assert_eq!(
            outcome,
            EvaluationOutcome::Applied {
                port: Port::BuiltinSpeaker
            }
        );
        assert_eq!(session.get_override_calls(), vec![PortOverride::Speaker]);
        assert_eq!(session.get_calls().last(), Some(&SessionCall::SetActive(true)));
    }

    #[tokio::test]
    async fn test_speaker_never_targeted_next_to_headphones() {
        let (outcome, session) = evaluate(
            &[Port::Headphones, Port::BuiltinSpeaker],
            &[Port::Headphones, Port::BuiltinSpeaker],
        )
        .await;

        assert_eq!(
            outcome,
            EvaluationOutcome::Applied {
                port: Port::Headphones
            }
        );
        assert!(!session.get_override_calls().contains(&PortOverride::Speaker));
    }

    #[tokio::test]
    async fn test_rejected_override_does_not_fall_back_to_speaker() {
        let config = ConfigBuilder::new()
            .order(&[Port::Headphones, Port::BuiltinSpeaker])
            .build();
        let fixture =
            RouterFixture::with_outputs(&config, &[Port::Headphones, Port::BuiltinSpeaker]);
        fixture.session.set_override_failure(true);

        let outcome = fixture.router.evaluate().wait().await;

        assert!(matches!(
            outcome,
            EvaluationOutcome::Failed {
                error: SessionError::OverrideRejected(_)
            }
        ));
        assert_eq!(fixture.session.get_override_calls(), vec![PortOverride::None]);
    }

    #[tokio::test]
    async fn test_category_failure_does_not_fall_back_to_speaker() {
        let config = ConfigBuilder::new()
            .order(&[Port::Headphones, Port::BuiltinSpeaker])
            .build();
        let fixture =
            RouterFixture::with_outputs(&config, &[Port::Headphones, Port::BuiltinSpeaker]);
        fixture.session.set_category_failure(true);

        let outcome = fixture.router.evaluate().wait().await;

        assert!(matches!(
            outcome,
            EvaluationOutcome::Failed {
                error: SessionError::SessionSetup(_)
            }
        ));
        let categories = fixture
            .session
            .get_calls()
            .into_iter()
            .filter(|call| matches!(call, SessionCall::SetCategory(..)))
            .count();
        assert_eq!(categories, 1);
        assert!(fixture.session.get_override_calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_match_issues_no_commands() {
        let (outcome, session) = evaluate(&[Port::Headphones], &[Port::AirPlay]).await;

        assert_eq!(outcome, EvaluationOutcome::NoMatch);
        assert!(session.get_hardware_calls().is_empty());
    }

    #[tokio::test]
    async fn test_passes_complete_in_submission_order() {
        let config = ConfigBuilder::new().order(&[Port::Headphones, Port::BuiltinSpeaker]).build();
        let fixture = RouterFixture::with_outputs(&config, &[Port::BuiltinSpeaker]);
        let (observer, events) = recording_observer();
        fixture.router.add_listener(EventKind::Routing, observer);

        let first = fixture.router.evaluate();
        fixture.session.set_outputs(&[Port::Headphones]);
        let second = fixture.router.evaluate();

        let second = second.wait().await;
        let first = first.wait().await;
        assert_eq!(second, EvaluationOutcome::Applied { port: Port::Headphones });
        assert!(matches!(first, EvaluationOutcome::Applied { .. }));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].label(), "applied headphones");
    }

    #[tokio::test]
    async fn test_configure_filters_unknown_tokens() {
        let fixture = RouterFixture::new(&Config::default());

        let handle = fixture.router.configure(ConfigureOptions {
            auto_switch_bluetooth: None,
            priority_order: Some(vec![
                "unknown-token".to_string(),
                "headphones".to_string(),
            ]),
        });

        assert!(handle.is_none());
        assert_eq!(fixture.router.policy().priority_order.ports(), &[Port::Headphones]);
        assert!(fixture.session.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_enabling_auto_switch_runs_one_pass() {
        let fixture = RouterFixture::with_outputs(&Config::default(), &[Port::Headphones]);

        let outcome = fixture
            .router
            .configure(ConfigureOptions {
                auto_switch_bluetooth: Some(true),
                priority_order: Some(vec!["headphones".to_string()]),
            })
            .unwrap()
            .wait()
            .await;

        assert_eq!(outcome, EvaluationOutcome::Applied { port: Port::Headphones });
        let queries = fixture
            .session
            .get_calls()
            .into_iter()
            .filter(|call| *call == SessionCall::CurrentOutputs)
            .count();
        assert_eq!(queries, 1);
    }
}

#[cfg(test)]
mod notifications {
    use super::*;

    #[tokio::test]
    async fn test_malformed_notifications_are_dropped() {
        let config = ConfigBuilder::new().auto_switch().build();
        let fixture = RouterFixture::with_outputs(&config, &[Port::Headphones])
            .loaded()
            .await;
        let (observer, events) = recording_observer();
        fixture.router.add_listener(EventKind::RouteChange, observer.clone());
        fixture.router.add_listener(EventKind::Interruption, observer);

        fixture.session.emit(NotificationBuilder::route_change().build());
        fixture.session.emit(
            NotificationBuilder::route_change()
                .value(ROUTE_CHANGE_REASON_KEY, NotificationValue::Text("1".to_string()))
                .build(),
        );
        fixture.session.emit(NotificationBuilder::interruption().build());
        fixture.router.settle().await;

        assert!(events.lock().unwrap().is_empty());
        assert!(fixture.session.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_route_change_triggers_evaluation_with_auto_switch() {
        let config = ConfigBuilder::new()
            .auto_switch()
            .order(&[Port::Headphones, Port::BuiltinSpeaker])
            .build();
        let fixture = RouterFixture::with_outputs(&config, &[Port::BuiltinSpeaker])
            .loaded()
            .await;
        let (observer, events) = recording_observer();
        fixture.router.add_listener(EventKind::RouteChange, observer.clone());
        fixture.router.add_listener(EventKind::Routing, observer);

        fixture.session.set_outputs(&[Port::Headphones, Port::BuiltinSpeaker]);
        fixture
            .session
            .emit(NotificationBuilder::route_change().reason(1).build());
        fixture.router.settle().await;

        let events = events.lock().unwrap().clone();
        assert_eq!(events.len(), 2);
        match &events[0] {
            SessionEvent::RouteChanged(event) => {
                assert_eq!(event.reason, RouteChangeReason::NewDeviceAvailable)
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(events[1].label(), "applied headphones");
        assert_eq!(fixture.session.get_override_calls(), vec![PortOverride::None]);
    }

    #[tokio::test]
    async fn test_route_change_without_auto_switch_only_notifies() {
        let fixture = RouterFixture::with_outputs(&Config::default(), &[Port::Headphones])
            .loaded()
            .await;
        let (observer, events) = recording_observer();
        fixture.router.add_listener(EventKind::RouteChange, observer);

        fixture
            .session
            .emit(NotificationBuilder::route_change().reason(2).build());
        fixture.router.settle().await;

        assert_eq!(events.lock().unwrap().len(), 1);
        assert_eq!(events.lock().unwrap()[0].label(), "old-device-unavailable");
        assert!(fixture.session.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unmapped_reason_is_reported_as_unknown() {
        let fixture = RouterFixture::new(&Config::default()).loaded().await;
        let (observer, events) = recording_observer();
        fixture.router.add_listener(EventKind::RouteChange, observer);

        fixture
            .session
            .emit(NotificationBuilder::route_change().reason(5).build());

        assert_eq!(events.lock().unwrap()[0].label(), "unknown");
    }

    #[tokio::test]
    async fn test_interruptions_never_evaluate() {
        let config = ConfigBuilder::new().auto_switch().build();
        let fixture = RouterFixture::with_outputs(&config, &[Port::Headphones])
            .loaded()
            .await;
        let (observer, events) = recording_observer();
        fixture.router.add_listener(EventKind::Interruption, observer);

        fixture
            .session
            .emit(NotificationBuilder::interruption().interruption_type(1).build());
        fixture
            .session
            .emit(NotificationBuilder::interruption().interruption_type(0).build());
        fixture.router.settle().await;

        let types: Vec<InterruptionType> = events
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                SessionEvent::Interruption(event) => event.interruption_type,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(types, vec![InterruptionType::Began, InterruptionType::Ended]);
        assert!(fixture.session.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_router_stops_delivery() {
        let session = MockAudioSession::new();
        let router = AudioSessionRouter::new(session.clone(), &Config::default()).unwrap();
        router.load().unwrap();
        drop(router);

        // Handlers are still registered with the session but hold no router.
        assert_eq!(session.handler_count(), 2);
        session.emit(NotificationBuilder::route_change().reason(1).build());
        assert!(session.get_calls().is_empty());
    }
}

#[cfg(test)]
mod listeners {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_fan_out_survives_failing_listener() {
        let fixture = RouterFixture::new(&Config::default()).loaded().await;
        let (first, first_events) = recording_observer();
        let (second, second_events) = recording_observer();

        fixture.router.add_listener(EventKind::RouteChange, first);
        fixture
            .router
            .add_listener(EventKind::RouteChange, failing_observer());
        fixture.router.add_listener(EventKind::RouteChange, second);

        fixture
            .session
            .emit(NotificationBuilder::route_change().reason(3).build());

        assert_eq!(first_events.lock().unwrap().len(), 1);
        assert_eq!(second_events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_removed_listener_stops_receiving() {
        let fixture = RouterFixture::new(&Config::default()).loaded().await;
        let (observer, events) = recording_observer();
        let id = fixture.router.add_listener(EventKind::RouteChange, observer);

        fixture
            .session
            .emit(NotificationBuilder::route_change().reason(1).build());
        assert!(fixture.router.remove_listener(id));
        assert!(!fixture.router.remove_listener(id));
        fixture
            .session
            .emit(NotificationBuilder::route_change().reason(2).build());

        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_listener_keeps_single_slot() {
        let fixture = RouterFixture::new(&Config::default()).loaded().await;
        let (old, old_events) = recording_observer();
        let (new, new_events) = recording_observer();

        fixture.router.set_listener(EventKind::Interruption, old);
        fixture.router.set_listener(EventKind::Interruption, new);
        fixture
            .session
            .emit(NotificationBuilder::interruption().interruption_type(1).build());

        assert!(old_events.lock().unwrap().is_empty());
        assert_eq!(new_events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listener_by_bridge_name() {
        let fixture = RouterFixture::new(&Config::default()).loaded().await;
        let (observer, events) = recording_observer();

        fixture
            .router
            .add_listener_by_name("interruption", observer)
            .unwrap();
        fixture
            .session
            .emit(NotificationBuilder::interruption().interruption_type(0).build());

        assert_eq!(events.lock().unwrap()[0].label(), "ended");
    }

    #[tokio::test]
    async fn test_event_stream() {
        let config = ConfigBuilder::new().order(&[Port::Headphones]).build();
        let fixture = RouterFixture::with_outputs(&config, &[Port::Headphones]);
        let mut routing = fixture.router.events(EventKind::Routing);

        fixture.router.evaluate().wait().await;

        let event = tokio::time::timeout(Duration::from_secs(1), routing.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.label(), "applied headphones");
    }
}
