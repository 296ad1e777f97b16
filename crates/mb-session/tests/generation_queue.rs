//! Integration tests: submitting prompts through a live `Session`.
//!
//! All tests run on a paused clock, so generator latency and the progress
//! ticker advance deterministically.

use mb_core::{CanvasElement, ElementId, ElementKind, Project, Rect};
use mb_editor::EditorConfig;
use mb_session::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(3600);

fn reference() -> CanvasElement {
    let mut el = CanvasElement::image(Rect::new(100.0, 100.0, 300.0, 200.0), "https://example/ref.png");
    el.id = ElementId::intern("queue_ref");
    el
}

fn config() -> SessionConfig {
    SessionConfig {
        editor: EditorConfig {
            screen_width: 1000.0,
            screen_height: 600.0,
            ..EditorConfig::default()
        },
        ..SessionConfig::default()
    }
}

async fn open_with(
    generator: Arc<MockImageGenerator>,
    elements: Vec<CanvasElement>,
    config: SessionConfig,
) -> Session {
    let mut project = Project::new("p1", "Board");
    project.elements = elements;
    let backends = Backends {
        store: Arc::new(MemoryProjectStore::with_projects([project])),
        generator,
        files: Arc::new(MemoryFileStorage::new(&config)),
    };
    Session::open("p1", AuthState::Authorized, backends, config)
        .await
        .unwrap()
}

/// Let spawned tasks run without moving the clock.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn status(session: &Session, id: mb_core::TaskId) -> TaskStatus {
    session.task(id).unwrap().status
}

#[tokio::test(start_paused = true)]
async fn sunset_beach_end_to_end() {
    let generator = Arc::new(MockImageGenerator::returning("https://example/img.png"));
    let session = open_with(generator, vec![], config()).await;

    let id = session.submit_prompt("sunset beach").unwrap();
    assert_eq!(session.tasks().len(), 1);
    assert_eq!(status(&session, id), TaskStatus::Pending);

    settle().await;
    let task = session.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Running);
    assert_eq!(task.progress, 10);
    assert!(session.editor_snapshot().elements.is_empty());

    session.wait_idle().await;
    let task = session.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.progress, 100);
    assert_eq!(task.result_image_url.as_deref(), Some("https://example/img.png"));
    assert_eq!(task.error, None);

    let elements = session.editor_snapshot().elements;
    assert_eq!(elements.len(), 1);
    let image = &elements[0];
    assert_eq!(image.kind, ElementKind::Image);
    assert_eq!(image.content, "https://example/img.png");
    assert_eq!((image.x, image.y), (500.0, 300.0), "viewport centre");
    assert_eq!((image.width, image.height), (400.0, 400.0));
}

#[tokio::test(start_paused = true)]
async fn tasks_run_one_at_a_time_in_submit_order() {
    let generator = Arc::new(MockImageGenerator::new());
    let session = open_with(generator.clone(), vec![], config()).await;

    let ids: Vec<_> = ["one", "two", "three"]
        .into_iter()
        .map(|p| session.submit_prompt(p).unwrap())
        .collect();

    let mut completion_order = Vec::new();
    while completion_order.len() < ids.len() {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let tasks = session.tasks();
        let running = tasks.iter().filter(|t| t.status == TaskStatus::Running).count();
        assert!(running <= 1, "two tasks running at once");
        for task in &tasks {
            if task.status.is_finished() && !completion_order.contains(&task.id) {
                completion_order.push(task.id);
            }
        }
    }

    assert_eq!(completion_order, ids);
    let prompts: Vec<_> = generator.requests().into_iter().map(|r| r.prompt).collect();
    assert_eq!(prompts, vec!["one", "two", "three"]);
    assert_eq!(session.editor_snapshot().elements.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failure_does_not_block_the_queue() {
    let generator = Arc::new(MockImageGenerator::returning("https://example/ok.png").failing_on("bad"));
    let session = open_with(generator, vec![], config()).await;

    let bad = session.submit_prompt("bad idea").unwrap();
    let good = session.submit_prompt("good idea").unwrap();
    session.wait_idle().await;

    let failed = session.task(bad).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.progress, 0);
    assert!(failed.error.unwrap().contains("refused"));
    assert_eq!(failed.result_image_url, None);

    assert_eq!(status(&session, good), TaskStatus::Completed);
    assert_eq!(session.editor_snapshot().elements.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn references_are_read_when_the_task_starts() {
    let generator = Arc::new(MockImageGenerator::returning("https://example/out.png"));
    let session = open_with(generator.clone(), vec![reference()], config()).await;
    let reference_id = ElementId::intern("queue_ref");

    session.submit_prompt("first").unwrap();
    session.submit_prompt("second").unwrap();
    settle().await;
    // Selected after submit, while "first" is already running.
    session.with_editor(|editor| editor.select_only(reference_id));
    session.wait_idle().await;

    let requests = generator.requests();
    assert!(requests[0].references.is_empty());
    assert_eq!(requests[1].references, vec![reference_id]);

    let snapshot = session.editor_snapshot();
    let second = snapshot.elements.last().unwrap();
    assert_eq!((second.x, second.y), (100.0 + 300.0 + 20.0, 100.0));
    assert_eq!(snapshot.selection, vec![reference_id], "selection untouched");
}

#[tokio::test(start_paused = true)]
async fn progress_climbs_but_stays_below_cap() {
    let generator = Arc::new(MockImageGenerator::new().with_latency(Duration::from_secs(60)));
    let session = open_with(generator, vec![], config()).await;
    let id = session.submit_prompt("slow").unwrap();
    settle().await;

    let mut last = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let task = session.task(id).unwrap();
        if task.status != TaskStatus::Running {
            break;
        }
        assert!(task.progress >= last, "progress went backwards");
        assert!(task.progress <= 90);
        last = task.progress;
    }
    assert_eq!(last, 90, "a minute of ticks reaches the cap");
    assert_eq!(session.task(id).unwrap().progress, 100);
}

#[tokio::test(start_paused = true)]
async fn close_cancels_running_and_keeps_pending() {
    let generator = Arc::new(MockImageGenerator::new().with_latency(HOUR));
    let mut session = open_with(generator, vec![], config()).await;

    let running = session.submit_prompt("running").unwrap();
    let waiting = session.submit_prompt("waiting").unwrap();
    settle().await;
    assert_eq!(status(&session, running), TaskStatus::Running);

    session.close().await;
    let cancelled = session.task(running).unwrap();
    assert_eq!(cancelled.status, TaskStatus::Failed);
    assert_eq!(cancelled.error.as_deref(), Some("cancelled"));
    assert_eq!(status(&session, waiting), TaskStatus::Pending);

    assert!(matches!(session.submit_prompt("late"), Err(SessionError::Closed)));
    session.wait_idle().await;
}

#[tokio::test(start_paused = true)]
async fn hung_backend_times_out() {
    let generator = Arc::new(MockImageGenerator::new().with_latency(HOUR));
    let config = SessionConfig {
        generation_timeout_ms: Some(1000),
        ..config()
    };
    let session = open_with(generator, vec![], config).await;

    let id = session.submit_prompt("never").unwrap();
    let next = session.submit_prompt("next").unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let task = session.task(id).unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("generation timed out after 1000 ms"));
    assert_eq!(status(&session, next), TaskStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn clear_finished_leaves_running_task() {
    let generator = Arc::new(MockImageGenerator::new());
    let session = open_with(generator, vec![], config()).await;
    session.submit_prompt("a").unwrap();
    session.wait_idle().await;
    let b = session.submit_prompt("b").unwrap();
    settle().await;

    assert_eq!(session.clear_finished_tasks(), 1);
    let remaining: Vec<_> = session.tasks().into_iter().map(|t| t.id).collect();
    assert_eq!(remaining, vec![b]);
}

#[tokio::test]
async fn blank_prompt_is_rejected() {
    let session = open_with(Arc::new(MockImageGenerator::new()), vec![], config()).await;
    assert!(matches!(session.submit_prompt("  \n"), Err(SessionError::EmptyPrompt)));
    assert!(session.tasks().is_empty());
}

#[tokio::test]
async fn open_requires_authorization_and_an_existing_project() {
    let config = config();
    let backends = Backends {
        store: Arc::new(MemoryProjectStore::with_projects([Project::new("p1", "Board")])),
        generator: Arc::new(MockImageGenerator::new()),
        files: Arc::new(MemoryFileStorage::new(&config)),
    };

    let denied = Session::open("p1", AuthState::Anonymous, backends.clone(), config.clone()).await;
    assert!(matches!(denied, Err(SessionError::Unauthorized(_))));

    let missing = Session::open("nope", AuthState::Authorized, backends, config).await;
    assert!(matches!(
        missing,
        Err(SessionError::Store(StoreError::NotFound(_)))
    ));
}

#[tokio::test]
async fn upload_places_image_at_screen_centre() {
    let session = open_with(Arc::new(MockImageGenerator::new()), vec![], config()).await;
    let id = session.upload_image(vec![0xFF, 0xD8], "photo.jpg").await.unwrap();

    let snapshot = session.editor_snapshot();
    let image = snapshot.elements.iter().find(|el| el.id == id).unwrap();
    assert!(image.content.starts_with("memory://uploads/"));
    assert_eq!(image.bounds(), Rect::new(350.0, 150.0, 300.0, 300.0));
    assert_eq!(snapshot.selection, vec![id]);

    let rejected = session.upload_image(vec![1], "notes.txt").await;
    assert!(matches!(
        rejected,
        Err(SessionError::Storage(StorageError::DisallowedExtension(_)))
    ));
}

#[tokio::test]
async fn pasted_image_and_library_card_are_placed() {
    let session = open_with(Arc::new(MockImageGenerator::new()), vec![], config()).await;
    let image = session
        .upload_data_uri("data:image/png;base64,iVBORw0KGgo=")
        .await
        .unwrap();

    let library = MemoryCardLibrary::new();
    let card = library
        .create(NewCard::new("inspiration", "https://example/trend.png").with_text("Trend"))
        .await
        .unwrap();
    let placed = session.add_custom_card(&card);

    let snapshot = session.editor_snapshot();
    assert_eq!(snapshot.elements.len(), 2);
    assert!(snapshot.elements[0].content.ends_with(".png"));
    assert_eq!(snapshot.elements[0].id, image);
    assert_eq!(snapshot.elements[1].id, placed);
    assert_eq!(snapshot.elements[1].card_type, Some(mb_core::CardType::Inspiration));
    assert_eq!(snapshot.selection, vec![placed]);
    assert_eq!(session.save_status(), SaveStatus::Unsaved);
}
