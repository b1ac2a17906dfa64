use std::sync::Arc;

use call_analytics::{
    charts::{
        ChartDataset, DurationEdit, DurationField, SadPathCategory, SadPathEdit, Subcategory,
    },
    notify::Notification,
    workflow::{ValidationError, SAVE_SUCCESS_MESSAGE},
    ChartData, ChartType, DurationDataset, EditWorkflow, EmailAddress, MemoryStore,
    NotificationLevel, RecordingNotifier, SadPathDataset, StoredRecord, WorkflowError,
    WorkflowState,
};

struct Harness<D: ChartDataset> {
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    workflow: EditWorkflow<D>,
}

fn harness<D: ChartDataset + Default>() -> Harness<D> {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let workflow = EditWorkflow::new(D::default(), store.clone(), notifier.clone());
    Harness {
        store,
        notifier,
        workflow,
    }
}

fn email(raw: &str) -> EmailAddress {
    EmailAddress::parse(raw).unwrap()
}

fn saved_sad_path() -> SadPathDataset {
    SadPathDataset::new(vec![
        SadPathCategory {
            category: "Customer Hostility".into(),
            value: 10.0,
            subcategories: vec![Subcategory {
                name: "Verbal Agression".into(),
                value: 10.0,
            }],
        },
        SadPathCategory {
            category: "Unsupported Language".into(),
            value: 50.0,
            subcategories: vec![
                Subcategory {
                    name: "Assistant did not speak French".into(),
                    value: 40.0,
                },
                Subcategory {
                    name: "Assistant did not speak Spanish".into(),
                    value: 10.0,
                },
            ],
        },
        SadPathCategory {
            category: "Caller Identification Issues".into(),
            value: 40.0,
            subcategories: vec![Subcategory {
                name: "Caller Identification".into(),
                value: 40.0,
            }],
        },
    ])
}

#[tokio::test]
async fn malformed_emails_never_leave_email_capture() {
    let h = harness::<DurationDataset>();
    h.workflow.begin_edit().await.unwrap();

    for input in ["", "  ", "a", "a@b", "a@b.", "a @b.com", "@b.com", "a@b@c.com"] {
        let err = h.workflow.submit_email(input).await.unwrap_err();
        assert!(
            matches!(err, WorkflowError::Validation(_)),
            "{input:?} gave {err:?}"
        );
        assert_eq!(h.workflow.state().await, WorkflowState::EmailCapture);
    }

    let err = h.workflow.submit_email("").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ValidationError::Empty)));
    assert_eq!(h.store.lookup_count(), 0);
}

#[tokio::test]
async fn first_time_duration_edit_starts_from_the_bell_curve() {
    let h = harness::<DurationDataset>();
    h.workflow.begin_edit().await.unwrap();

    let state = h.workflow.submit_email("a@b.com").await.unwrap();

    assert_eq!(state, WorkflowState::Editing);
    let working = h.workflow.working_copy().await.unwrap();
    assert_eq!(working.len(), 61);
    assert_eq!(working, DurationDataset::bell_curve());
    assert!(h.workflow.overwrite_preview().await.is_none());
}

#[tokio::test]
async fn declining_overwrite_restores_the_saved_record() {
    let h = harness::<SadPathDataset>();
    let saved = saved_sad_path();
    h.store.seed(StoredRecord::new(
        email("a@b.com"),
        ChartData::SadPath(saved.clone()),
    ));

    h.workflow.begin_edit().await.unwrap();
    let state = h.workflow.submit_email("a@b.com").await.unwrap();
    assert_eq!(state, WorkflowState::OverwriteConfirm);

    let preview = h.workflow.overwrite_preview().await.unwrap();
    assert_eq!(preview.lines[0], "Customer Hostility: 10%");
    assert_eq!(preview.lines.len(), 7);

    assert_eq!(h.workflow.decline_overwrite().await.unwrap(), WorkflowState::Idle);
    assert_eq!(h.workflow.displayed().await, saved);
    assert!(h.workflow.working_copy().await.is_none());

    let on_wire = serde_json::to_string(&h.workflow.displayed().await).unwrap();
    assert_eq!(on_wire, serde_json::to_string(&saved).unwrap());
    assert_eq!(h.store.upsert_count(), 0);
}

#[tokio::test]
async fn confirming_overwrite_edits_what_is_on_screen() {
    let h = harness::<SadPathDataset>();
    h.store.seed(StoredRecord::new(
        email("a@b.com"),
        ChartData::SadPath(saved_sad_path()),
    ));

    h.workflow.begin_edit().await.unwrap();
    h.workflow.submit_email("a@b.com").await.unwrap();
    assert_eq!(h.workflow.confirm_overwrite().await.unwrap(), WorkflowState::Editing);

    assert_eq!(
        h.workflow.working_copy().await.unwrap(),
        SadPathDataset::default()
    );
}

#[tokio::test]
async fn subcategory_edit_updates_the_category_total() {
    let h = harness::<SadPathDataset>();
    h.workflow.begin_edit().await.unwrap();
    h.workflow.submit_email("a@b.com").await.unwrap();

    h.workflow
        .edit(SadPathEdit::from_input(1, Some(0), "20"))
        .await
        .unwrap();

    let working = h.workflow.working_copy().await.unwrap();
    let language = &working.categories()[1];
    assert_eq!(language.category, "Unsupported Language");
    assert_eq!(language.subcategories[0].name, "Assistant did not speak French");
    assert_eq!(language.subcategories[0].value, 20.0);
    assert_eq!(language.subcategories[1].value, 15.0);
    assert_eq!(language.value, 35.0);

    // the chart keeps showing the old total until the save lands
    assert_eq!(h.workflow.displayed().await.categories()[1].value, 30.0);
}

#[tokio::test]
async fn successful_save_commits_the_working_copy() {
    let h = harness::<DurationDataset>();
    h.workflow.begin_edit().await.unwrap();
    h.workflow.submit_email("a@b.com").await.unwrap();
    h.workflow
        .edit(DurationEdit::from_input(4, DurationField::Frequency, "12.75"))
        .await
        .unwrap();
    let at_save = h.workflow.working_copy().await.unwrap();

    assert_eq!(h.workflow.save().await.unwrap(), WorkflowState::Idle);

    assert_eq!(h.workflow.displayed().await, at_save);
    let stored = h.store.get(&email("a@b.com"), ChartType::Duration).unwrap();
    assert_eq!(stored.chart_data, ChartData::Duration(at_save));
    assert_eq!(
        h.notifier.last(),
        Some(Notification {
            message: SAVE_SUCCESS_MESSAGE.into(),
            level: NotificationLevel::Success,
        })
    );
}

#[tokio::test]
async fn failed_save_reports_and_keeps_editing() {
    let h = harness::<SadPathDataset>();
    h.workflow.begin_edit().await.unwrap();
    h.workflow.submit_email("a@b.com").await.unwrap();
    h.workflow
        .edit(SadPathEdit::CategoryTotal {
            category: 0,
            value: 55.0,
        })
        .await
        .unwrap();
    let working_before = h.workflow.working_copy().await;
    let displayed_before = h.workflow.displayed().await;
    h.store.fail_next_upsert("network error");

    let err = h.workflow.save().await.unwrap_err();

    assert!(matches!(err, WorkflowError::Save(_)));
    assert_eq!(
        h.notifier.last(),
        Some(Notification {
            message: "Error saving custom values: network error".into(),
            level: NotificationLevel::Error,
        })
    );
    assert_eq!(h.workflow.state().await, WorkflowState::Editing);
    assert_eq!(h.workflow.working_copy().await, working_before);
    assert_eq!(h.workflow.displayed().await, displayed_before);
    assert!(h.store.is_empty());

    // retry goes through with the same copy
    assert_eq!(h.workflow.save().await.unwrap(), WorkflowState::Idle);
    assert_eq!(Some(h.workflow.displayed().await), working_before);
}

#[tokio::test]
async fn cancel_leaves_the_chart_untouched() {
    let h = harness::<DurationDataset>();
    h.workflow.begin_edit().await.unwrap();
    h.workflow.submit_email("a@b.com").await.unwrap();
    h.workflow
        .edit(DurationEdit::from_input(0, DurationField::Duration, "999"))
        .await
        .unwrap();

    assert_eq!(h.workflow.cancel_edit().await.unwrap(), WorkflowState::Idle);
    assert_eq!(h.workflow.displayed().await, DurationDataset::bell_curve());
    assert!(h.workflow.working_copy().await.is_none());
    assert_eq!(h.store.upsert_count(), 0);
    assert!(h.notifier.entries().is_empty());
}

#[tokio::test]
async fn second_save_overwrites_the_first() {
    let h = harness::<DurationDataset>();
    for value in ["10", "20"] {
        h.workflow.begin_edit().await.unwrap();
        h.workflow.submit_email("a@b.com").await.unwrap();
        if h.workflow.state().await == WorkflowState::OverwriteConfirm {
            h.workflow.confirm_overwrite().await.unwrap();
        }
        h.workflow
            .edit(DurationEdit::from_input(0, DurationField::Frequency, value))
            .await
            .unwrap();
        h.workflow.save().await.unwrap();
    }

    assert_eq!(h.store.len(), 1);
    let stored = h.store.get(&email("a@b.com"), ChartType::Duration).unwrap();
    match stored.chart_data {
        ChartData::Duration(points) => assert_eq!(points.points()[0].frequency, 20.0),
        other => panic!("unexpected shape {other:?}"),
    }
}
