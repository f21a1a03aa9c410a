mod common;

use activity_worker::error::ActivityError;
use activity_worker::state_machine::{TaskEvent, TaskStateMachine};
use activity_worker::validation::validate_input;
use activity_worker::worker::shutdown_channel;
use common::*;
use futures::FutureExt;
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
enum Scenario {
    Empty,
    PollError,
    Task { valid_input: bool, succeeds: bool },
}

fn scenario_strategy() -> impl Strategy<Value = Scenario> {
    prop_oneof![
        Just(Scenario::Empty),
        Just(Scenario::PollError),
        (any::<bool>(), any::<bool>())
            .prop_map(|(valid_input, succeeds)| Scenario::Task { valid_input, succeeds }),
    ]
}

fn event_strategy() -> impl Strategy<Value = TaskEvent> {
    prop_oneof![
        Just(TaskEvent::Validate),
        Just(TaskEvent::Dispatch),
        Just(TaskEvent::Succeed),
        "[A-Z_]{1,16}".prop_map(TaskEvent::fail),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: the input gate accepts exactly the non-null JSON documents
    #[test]
    fn input_gate_accepts_only_non_null_json(raw in ".{0,64}") {
        let expected = serde_json::from_str::<serde_json::Value>(&raw)
            .ok()
            .filter(|value| !value.is_null());

        match validate_input(&raw) {
            Ok(value) => prop_assert_eq!(Some(value), expected),
            Err(e) => {
                prop_assert!(expected.is_none());
                prop_assert_eq!(e.code(), "INPUT_INVALID");
            }
        }
    }

    /// Property: once terminal, the state machine rejects every further event
    #[test]
    fn terminal_states_are_final(events in prop::collection::vec(event_strategy(), 0..12)) {
        let mut machine = TaskStateMachine::new();
        let mut terminal_reached = false;

        for event in events {
            let was_terminal = machine.current_state().is_terminal();
            let result = machine.transition(event);
            if was_terminal {
                prop_assert!(result.is_err());
            }
            terminal_reached |= machine.current_state().is_terminal();
            if terminal_reached {
                prop_assert!(machine.current_state().is_terminal());
            }
        }
    }

    /// Property: every polled task gets exactly one terminal report, whatever
    /// the input, the handler outcome, or the health of the report calls
    #[test]
    fn every_task_is_reported_exactly_once(
        scenarios in prop::collection::vec(scenario_strategy(), 1..8),
        reports_fail in any::<bool>(),
        notifications_fail in any::<bool>(),
    ) {
        let log = CallLog::default();
        let (shutdown, signal) = shutdown_channel();
        let valid = input_with_queue(json!({"x": 1}));

        let mut polls = Vec::new();
        let mut tokens = Vec::new();
        for (index, scenario) in scenarios.iter().enumerate() {
            polls.push(match scenario {
                Scenario::Empty => PollScript::Empty,
                Scenario::PollError => PollScript::Error("unavailable".to_string()),
                Scenario::Task { valid_input, succeeds } => {
                    let token = format!("{}-token-{index}", if *succeeds { "ok" } else { "fail" });
                    tokens.push(token.clone());
                    let input = if *valid_input { valid.as_str() } else { "{" };
                    PollScript::Task(polled_task(&token, Some(input)))
                }
            });
        }

        let mut client =
            MockTaskClient::new(log.clone(), polls).with_shutdown_when_exhausted(shutdown);
        if reports_fail {
            client = client.with_failing_reports();
        }
        let transport = if notifications_fail {
            RecordingTransport::failing(log.clone())
        } else {
            RecordingTransport::new(log.clone())
        };
        let handler = FnHandler::new(log.clone(), |context| {
            let succeeds = context.handle().token().starts_with("ok");
            async move {
                if succeeds {
                    Ok(json!({"done": true}))
                } else {
                    Err(ActivityError::processing("scripted failure"))
                }
            }
            .boxed()
        });
        let observer = RecordingObserver::new(log.clone());
        let worker = build_worker_with(client, transport, observer, handler);

        let stats = tokio_test::block_on(worker.run("worker-p", signal));

        prop_assert_eq!(stats.polls as usize, scenarios.len());
        prop_assert_eq!(stats.tasks_processed() as usize, tokens.len());
        for token in &tokens {
            let reports = log.count(|c| match c {
                Call::ReportSuccess { token: t, .. } | Call::ReportFailure { token: t, .. } => {
                    t == token
                }
                _ => false,
            });
            prop_assert_eq!(reports, 1);
        }
    }
}
