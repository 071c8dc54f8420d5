use std::{path::PathBuf, sync::Arc, time::Duration};

use a4c_interface::{
    ContentIssue, CsarReport, Event, InterfaceError, IssueLevel, LogEntry, LogLevel,
    MockApplicationService, MockCatalogService, MockDeploymentService, MockEventService,
    MockLogService, MockWorkflowService, ServiceBundle,
};
use a4c_monitor::{MonitorConfig, MonitorError, OperationMonitor, ProgressSink};
use chrono::{TimeZone, Utc};
use clap::Parser;

use super::{
    commands::{Command, execute},
    console::{ConsoleSink, format_event, format_log},
};

#[derive(Default)]
struct Fixture {
    deployments: Arc<MockDeploymentService>,
    workflows: Arc<MockWorkflowService>,
    logs: Arc<MockLogService>,
    events: Arc<MockEventService>,
    applications: Arc<MockApplicationService>,
    catalog: Arc<MockCatalogService>,
}

impl Fixture {
    fn monitor(&self) -> OperationMonitor {
        let services = ServiceBundle {
            deployments: self.deployments.clone(),
            workflows: self.workflows.clone(),
            logs: self.logs.clone(),
            events: self.events.clone(),
            applications: self.applications.clone(),
            catalog: self.catalog.clone(),
        };
        OperationMonitor::new(
            services,
            MonitorConfig::default().with_poll_interval(Duration::ZERO),
        )
    }

    /// Run `args` and return the result with everything printed.
    fn run(&self, args: &[&str], json: bool) -> (anyhow::Result<()>, String) {
        let command = parse(args);
        let mut console = ConsoleSink::new(Vec::new(), json);
        let result = execute(&command, &self.monitor(), &mut console);
        let printed = String::from_utf8(console.into_inner()).unwrap();
        (result, printed)
    }
}

#[derive(Parser)]
struct TestCli {
    #[command(subcommand)]
    command: Command,
}

fn parse(args: &[&str]) -> Command {
    let argv = std::iter::once("a4c").chain(args.iter().copied());
    TestCli::try_parse_from(argv).unwrap().command
}

mod parsing_tests {
    use super::*;

    #[test]
    fn run_workflow_accepts_human_durations() {
        match parse(&[
            "run-workflow",
            "--app",
            "shop",
            "--workflow",
            "install",
            "--timeout",
            "2m 30s",
        ]) {
            Command::RunWorkflow {
                target,
                workflow,
                timeout,
                callback,
            } => {
                assert_eq!(target.app, "shop");
                assert_eq!(target.env, None);
                assert_eq!(workflow, "install");
                assert_eq!(timeout, Some(Duration::from_secs(150)));
                assert!(!callback);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn events_limit_defaults_to_fifty() {
        match parse(&["events", "--app", "shop", "--env", "prod"]) {
            Command::Events { target, limit } => {
                assert_eq!(target.env.as_deref(), Some("prod"));
                assert_eq!(limit, 50);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn deploy_requires_a_location() {
        let argv = ["a4c", "deploy", "--app", "shop"];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn upload_takes_a_path() {
        match parse(&["upload", "archives/demo.zip"]) {
            Command::Upload { csar } => assert_eq!(csar, PathBuf::from("archives/demo.zip")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

mod console_tests {
    use super::*;

    fn entry() -> LogEntry {
        let mut entry = LogEntry::new(LogLevel::Info, "starting apache");
        entry.timestamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        entry
    }

    #[test]
    fn log_lines_carry_node_instance_and_operation() {
        let mut entry = entry();
        entry.node_id = Some("Apache".into());
        entry.instance_id = Some("0".into());
        entry.interface_name = Some("standard".into());
        entry.operation_name = Some("start".into());

        assert_eq!(
            format_log(&entry),
            "[2024-03-01 12:30:05.000][INFO][Apache/0/standard.start] starting apache"
        );
    }

    #[test]
    fn log_lines_without_context_skip_the_bracket() {
        assert_eq!(
            format_log(&entry()),
            "[2024-03-01 12:30:05.000][INFO] starting apache"
        );
    }

    #[test]
    fn only_state_changes_are_printed_as_text() {
        let change = Event::instance_state("Compute", "1", "started");
        assert_eq!(format_event(&change).as_deref(), Some("Compute/1 -> started"));

        let mut other = change.clone();
        other.instance_state = None;
        assert_eq!(format_event(&other), None);

        let mut console = ConsoleSink::new(Vec::new(), false);
        console.on_event(&other);
        assert!(console.into_inner().is_empty());
    }

    #[test]
    fn json_mode_prints_one_object_per_line() {
        let mut console = ConsoleSink::new(Vec::new(), true);
        console.on_log(&entry());
        console.on_event(&Event::instance_state("Compute", "1", "started"));
        let printed = String::from_utf8(console.into_inner()).unwrap();

        let lines: Vec<serde_json::Value> = printed
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "log");
        assert_eq!(lines[0]["level"], "INFO");
        assert_eq!(lines[0]["content"], "starting apache");
        assert_eq!(lines[1]["kind"], "event");
        assert_eq!(lines[1]["state"], "started");
    }
}

mod command_tests {
    use super::*;

    #[test]
    fn deploy_resolves_the_default_environment() {
        let fixture = Fixture::default();
        fixture.deployments.push_status("DEPLOYED");

        let (result, printed) = fixture.run(&["deploy", "--app", "shop", "--location", "os"], false);

        result.unwrap();
        assert_eq!(
            fixture.deployments.start_calls(),
            vec![("shop".to_string(), "shop-env".to_string(), "os".to_string())]
        );
        assert_eq!(
            printed,
            "status: deployed\ndeployment of shop/shop-env succeeded (status: deployed)\n"
        );
    }

    #[test]
    fn failed_deployment_is_reported_then_returned() {
        let fixture = Fixture::default();
        fixture.deployments.push_status("ERROR");

        let (result, printed) = fixture.run(
            &["deploy", "--app", "shop", "--env", "prod", "--location", "os"],
            false,
        );

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MonitorError>(),
            Some(MonitorError::OperationFailed { .. })
        ));
        assert!(printed.ends_with("deployment of shop/prod FAILED (status: error)\n"));
    }

    #[test]
    fn run_workflow_in_callback_mode_prints_the_outcome() {
        let fixture = Fixture::default();
        fixture.workflows.push_status("SUCCEEDED");

        let (result, printed) = fixture.run(
            &[
                "run-workflow",
                "--app",
                "shop",
                "--env",
                "prod",
                "--workflow",
                "install",
                "--callback",
            ],
            true,
        );

        result.unwrap();
        assert_eq!(fixture.workflows.start_calls(), vec!["install".to_string()]);
        let last: serde_json::Value =
            serde_json::from_str(printed.lines().last().unwrap()).unwrap();
        assert_eq!(last["kind"], "outcome");
        assert_eq!(last["outcome"]["succeeded"], true);
        assert_eq!(last["outcome"]["status"], "succeeded");
    }

    #[test]
    fn logs_page_until_nothing_is_left() {
        let fixture = Fixture::default();
        fixture.logs.push_page(vec![
            LogEntry::new(LogLevel::Info, "one"),
            LogEntry::new(LogLevel::Info, "two"),
        ]);
        fixture.logs.push_page(vec![LogEntry::new(LogLevel::Warn, "three")]);

        let (result, printed) = fixture.run(
            &["logs", "--app", "shop", "--env", "prod", "--execution", "exec-4"],
            false,
        );

        result.unwrap();
        let offsets: Vec<usize> = fixture.logs.requests().iter().map(|(_, from)| *from).collect();
        assert_eq!(offsets, vec![0, 2, 3]);
        assert!(
            fixture
                .logs
                .requests()
                .iter()
                .all(|(filter, _)| filter.execution_id.as_deref() == Some("exec-4"))
        );
        let contents: Vec<&str> = printed
            .lines()
            .map(|line| line.rsplit("] ").next().unwrap())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn events_print_oldest_first() {
        let fixture = Fixture::default();
        fixture.events.preload(vec![
            Event::instance_state("Compute", "0", "creating"),
            Event::instance_state("Compute", "0", "started"),
            Event::instance_state("Apache", "0", "started"),
        ]);

        let (result, printed) = fixture.run(
            &["events", "--app", "shop", "--env", "prod", "--limit", "2"],
            false,
        );

        result.unwrap();
        assert_eq!(fixture.events.requests(), vec![(0, 2)]);
        assert_eq!(printed, "Compute/0 -> started\nApache/0 -> started\n");
    }

    #[test]
    fn upload_prints_warnings_and_the_stored_archive() {
        let fixture = Fixture::default();
        fixture.catalog.set_upload_result(Ok(CsarReport {
            archive_id: "demo:1.0.0".into(),
            name: "demo".into(),
            version: "1.0.0".into(),
            warnings: vec![ContentIssue {
                file: "types.yml".into(),
                level: IssueLevel::Warning,
                code: "UNKNOWN_IMPLEMENTATION_ARTIFACT".into(),
                message: None,
            }],
        }));

        let (result, printed) = fixture.run(&["upload", "demo.zip"], false);

        result.unwrap();
        assert_eq!(fixture.catalog.uploads(), vec![PathBuf::from("demo.zip")]);
        assert_eq!(
            printed,
            "warning: types.yml: Warning UNKNOWN_IMPLEMENTATION_ARTIFACT\nuploaded demo 1.0.0 (demo:1.0.0)\n"
        );
    }

    #[test]
    fn rejected_upload_surfaces_the_content_error() {
        let fixture = Fixture::default();
        let issue = ContentIssue {
            file: "topology.yml".into(),
            level: IssueLevel::Error,
            code: "SYNTAX_ERROR".into(),
            message: Some("mapping values are not allowed here".into()),
        };
        fixture
            .catalog
            .set_upload_result(Err(InterfaceError::Content(vec![issue.clone()])));

        let (result, printed) = fixture.run(&["upload", "broken.zip"], false);

        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<InterfaceError>(),
            Some(&InterfaceError::Content(vec![issue]))
        );
        assert!(printed.is_empty());
    }

    #[test]
    fn delete_app_removes_the_application() {
        let fixture = Fixture::default();

        let (result, printed) = fixture.run(&["delete-app", "--app", "shop"], false);

        result.unwrap();
        assert_eq!(fixture.applications.deleted(), vec!["shop".to_string()]);
        assert_eq!(printed, "deleted application shop\n");
    }
}

mod options_tests {
    use super::*;
    use crate::{RunOptions, cli::ConnectionOverrides};

    fn options(deadline: Option<Duration>) -> RunOptions {
        RunOptions {
            connection: ConnectionOverrides::default(),
            poll_interval: Duration::from_secs(2),
            deadline,
            json: false,
        }
    }

    #[test]
    fn deadline_flows_into_the_monitor_config() {
        let config = options(Some(Duration::from_secs(600))).monitor_config();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.deadline, Some(Duration::from_secs(600)));
    }

    #[test]
    fn no_deadline_waits_without_limit() {
        assert_eq!(options(None).monitor_config().deadline, None);
    }
}
