// ABOUTME: Integration tests specifically for the workflow parser module
// ABOUTME: Tests loading YAML and JSON documents, structural errors, and validation warnings

use serde_json::json;
use std::sync::Arc;
use tokio::fs;

use toolflow::engine::{ConditionMode, Priority};
use toolflow::parser::{
    ParserError, ValidationError, ValidationWarning, WorkflowDocument, WorkflowParser,
    WorkflowValidator,
};
use toolflow::tools::{ToolRegistry, ToolSettings};

mod common;
use common::{TestEnvironment, TestStep, TestTask, TestWorkflowBuilder};

#[tokio::test]
async fn test_parse_generated_yaml_document() {
    let env = TestEnvironment::new();
    let builder = TestWorkflowBuilder::new("report")
        .with_variable("count", json!(3))
        .workflow_task(
            TestTask::new("compute").step(
                TestStep::new("calculate")
                    .param("expression", json!("{{count}} + 1"))
                    .result_name("total"),
            ),
        )
        .queued_task(
            TestTask::new("announce")
                .priority("high")
                .continue_on_error()
                .step(TestStep::new("echo").param("message", json!("total {{total}}"))),
        );
    let path = env.create_workflow_file("report", &builder).await;

    let document = WorkflowParser::new().parse_file(&path).await.unwrap();

    assert_eq!(document.name, "report");
    assert_eq!(document.variables.get("count"), Some(&json!(3)));
    let workflow = document.workflow.as_ref().unwrap();
    assert_eq!(workflow.tasks.len(), 1);
    assert_eq!(workflow.tasks[0].steps[0].result_name.as_deref(), Some("total"));

    assert_eq!(document.tasks.len(), 1);
    assert_eq!(document.tasks[0].priority, Priority::High);
    assert!(document.tasks[0].task.continue_on_error);
}

#[tokio::test]
async fn test_parse_json_by_extension() {
    let env = TestEnvironment::new();
    let path = env.path().join("flow.json");
    let content = json!({
        "name": "json-flow",
        "parallel": true,
        "workflow": [
            { "id": "a", "steps": [{ "tool": "echo", "params": { "message": "a" } }] },
            { "id": "b", "steps": [{ "tool": "echo", "params": { "message": "b" } }] }
        ]
    });
    fs::write(&path, content.to_string()).await.unwrap();

    let document = WorkflowDocument::from_file(&path).unwrap();

    let workflow = document.workflow.unwrap();
    assert!(workflow.parallel);
    assert_eq!(workflow.tasks.len(), 2);
}

#[test]
fn test_tasks_without_ids_get_positional_ids() {
    let yaml = r#"
name: anonymous
tasks:
  - steps:
      - tool: echo
  - name: named
    steps:
      - tool: echo
"#;

    let document = WorkflowDocument::from_yaml(yaml).unwrap();
    let ids: Vec<&str> = document.tasks.iter().map(|queued| queued.task.id.as_str()).collect();
    assert_eq!(ids, vec!["task-1", "named"]);
    assert!(document.tasks.iter().all(|queued| queued.priority == Priority::Normal));
}

#[test]
fn test_structural_errors() {
    let missing_tool = r#"
name: broken
workflow:
  - id: t
    steps:
      - params:
          message: hi
"#;
    assert!(matches!(
        WorkflowDocument::from_yaml(missing_tool),
        Err(ParserError::ValidationError(ValidationError::MissingTool { step: 1, .. }))
    ));

    let empty_task = "name: broken\nworkflow:\n  - id: t\n    steps: []\n";
    assert!(matches!(
        WorkflowDocument::from_yaml(empty_task),
        Err(ParserError::ValidationError(ValidationError::EmptyTask { .. }))
    ));

    assert!(matches!(
        WorkflowDocument::from_yaml("name: [unclosed"),
        Err(ParserError::YamlError(_))
    ));
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let env = TestEnvironment::new();
    let result = WorkflowParser::new()
        .parse_file(env.path().join("absent.yaml"))
        .await;

    assert!(matches!(result, Err(ParserError::IoError(_))));
}

#[test]
fn test_validator_reports_all_warning_kinds() {
    let yaml = r#"
name: noisy
variables:
  count: 1
workflow:
  - id: first
    steps:
      - tool: calculate
        params:
          expression: "{{count}} + {{missing}}"
        condition: "count >"
      - tool: teleport
"#;
    let document = WorkflowDocument::from_yaml(yaml).unwrap();
    let tools = Arc::new(ToolRegistry::with_builtins(ToolSettings::default()));

    let report = WorkflowValidator::new()
        .with_condition_mode(ConditionMode::Strict)
        .with_tools(tools)
        .validate(&document);

    assert_eq!(report.task_count, 1);
    assert_eq!(report.step_count, 2);
    assert_eq!(report.warnings.len(), 3);
    assert!(report.warnings.iter().any(|warning| matches!(
        warning,
        ValidationWarning::MalformedCondition { mode: ConditionMode::Strict, step: 1, .. }
    )));
    assert!(report.warnings.contains(&ValidationWarning::UnresolvedReference {
        task: "first".to_string(),
        step: 1,
        name: "missing".to_string(),
    }));
    assert!(report.warnings.contains(&ValidationWarning::UnknownTool {
        task: "first".to_string(),
        step: 2,
        tool: "teleport".to_string(),
    }));
}

#[test]
fn test_parallel_tasks_cannot_see_sibling_results() {
    let builder = TestWorkflowBuilder::new("fanout")
        .parallel()
        .workflow_task(
            TestTask::new("producer").step(
                TestStep::new("echo")
                    .param("message", json!("hi"))
                    .result_name("greeting"),
            ),
        )
        .workflow_task(
            TestTask::new("consumer")
                .step(TestStep::new("echo").param("message", json!("{{greeting}}"))),
        );
    let document = WorkflowDocument::from_yaml(&builder.generate_yaml()).unwrap();

    let report = WorkflowValidator::new().validate(&document);

    assert_eq!(
        report.warnings,
        vec![ValidationWarning::UnresolvedReference {
            task: "consumer".to_string(),
            step: 1,
            name: "greeting".to_string(),
        }]
    );
}
