mod common;

use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Arc;

use common::{output_for, spec, ScriptedEngine};
use watermarker_core::{CoreError, TaskId, TaskKind, TaskStatus};
use watermarker_tasks::{HookDispatcher, SchedulerConfig, TaskScheduler, WatermarkJob};

fn scheduler() -> TaskScheduler {
    TaskScheduler::new(
        SchedulerConfig::default(),
        Arc::new(ScriptedEngine::succeeding()),
        HookDispatcher::disabled(),
    )
}

#[tokio::test]
async fn empty_inputs_are_rejected_and_no_task_is_created() {
    let sched = scheduler();
    let err = sched
        .submit(WatermarkJob {
            kind: TaskKind::Batch,
            inputs: vec![],
            spec: spec("SAMPLE"),
        })
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation(_)));
    assert!(sched.store().is_empty());
}

#[tokio::test]
async fn blank_text_is_rejected() {
    let sched = scheduler();
    let err = sched
        .submit(WatermarkJob {
            kind: TaskKind::Single,
            inputs: vec![PathBuf::from("a.jpg")],
            spec: spec("   "),
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn single_task_requires_exactly_one_input() {
    let sched = scheduler();
    let err = sched
        .submit(WatermarkJob {
            kind: TaskKind::Single,
            inputs: vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")],
            spec: spec("SAMPLE"),
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn unknown_task_id_is_a_not_found_error() {
    let sched = scheduler();
    assert!(matches!(
        sched.status(TaskId::new()),
        Err(CoreError::NotFound(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_complete_without_cross_task_corruption() {
    let sched = Arc::new(scheduler());

    let inputs: Vec<PathBuf> = (0..24).map(|i| PathBuf::from(format!("file-{i}.jpg"))).collect();
    let ids: Vec<(TaskId, PathBuf)> = inputs
        .iter()
        .map(|input| {
            let id = sched
                .submit(WatermarkJob {
                    kind: TaskKind::Single,
                    inputs: vec![input.clone()],
                    spec: spec("SAMPLE"),
                })
                .unwrap();
            (id, input.clone())
        })
        .collect();

    sched.shutdown().await;

    for (id, input) in ids {
        let task = sched.status(id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.files[0].input, input);
        assert_eq!(task.result.unwrap().outputs, vec![output_for(&input)]);
    }
}

#[tokio::test]
async fn shutdown_drains_in_flight_tasks() {
    let sched = scheduler();
    let id = sched
        .submit(WatermarkJob {
            kind: TaskKind::Batch,
            inputs: vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg")],
            spec: spec("SAMPLE"),
        })
        .unwrap();

    sched.shutdown().await;
    assert!(sched.status(id).unwrap().status.is_terminal());
}
