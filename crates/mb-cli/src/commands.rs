//! Subcommand implementations. Output goes to the given writer so tests
//! can capture it.

use anyhow::{Context, Result, anyhow, bail};
use mb_core::cards::card_type_info;
use mb_core::{CanvasElement, CardType, ElementId, ElementKind, ElementPatch, templates_for};
use mb_editor::Editor;
use mb_session::{
    AuthState, Backends, JsonFileProjectStore, MemoryFileStorage, MockImageGenerator,
    ProjectStore, Session, SessionConfig, TaskStatus,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub struct GenerateOptions {
    pub prompts: Vec<String>,
    pub select: Vec<String>,
    pub fail: bool,
    pub latency: Duration,
}

fn store_for(path: &Path) -> Result<(JsonFileProjectStore, String)> {
    JsonFileProjectStore::for_file(path)
        .ok_or_else(|| anyhow!("Not a project file path: {}", path.display()))
}

async fn open_session(
    path: &Path,
    config: SessionConfig,
    generator: MockImageGenerator,
) -> Result<Session> {
    let (store, id) = store_for(path)?;
    let backends = Backends {
        store: Arc::new(store),
        generator: Arc::new(generator),
        files: Arc::new(MemoryFileStorage::new(&config)),
    };
    Session::open(&id, AuthState::Authorized, backends, config)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))
}

/// Save and stop background work; a failed save is an error here.
async fn finish(mut session: Session) -> Result<()> {
    let saved = session.flush().await;
    session.close().await;
    if !saved {
        bail!("Failed to save project {}", session.project_id());
    }
    Ok(())
}

fn kind_label(kind: ElementKind) -> &'static str {
    match kind {
        ElementKind::Image => "image",
        ElementKind::Text => "text",
        ElementKind::Card => "card",
    }
}

fn describe(el: &CanvasElement) -> String {
    let detail = match el.kind {
        ElementKind::Card => {
            let label = el.card_type.map_or("?", |t| card_type_info(t).label);
            match &el.text_content {
                Some(text) => format!("{label}: {text}"),
                None => label.to_string(),
            }
        }
        _ => el.content.clone(),
    };
    format!(
        "{:<28} {:<5} ({:.0}, {:.0}) {:.0}x{:.0}  {detail}",
        el.id.as_str(),
        kind_label(el.kind),
        el.x,
        el.y,
        el.width,
        el.height,
    )
}

pub async fn show(path: &Path, config: &SessionConfig, out: &mut impl Write) -> Result<()> {
    let (store, id) = store_for(path)?;
    let project = store
        .get(&id)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut editor = Editor::new(config.editor.clone());
    editor.load(project.elements);

    writeln!(out, "{} (project {})", project.title, project.id)?;
    writeln!(
        out,
        "{} element(s), zoom {}%",
        editor.elements().len(),
        editor.viewport().zoom_percent()
    )?;
    for el in editor.elements() {
        writeln!(out, "  {}", describe(el))?;
    }
    Ok(())
}

pub async fn generate(
    path: &Path,
    config: SessionConfig,
    options: GenerateOptions,
    out: &mut impl Write,
) -> Result<()> {
    let generator = if options.fail {
        MockImageGenerator::failing("generation disabled by --fail")
    } else {
        MockImageGenerator::new()
    }
    .with_latency(options.latency);
    let session = open_session(path, config, generator).await?;

    session.with_editor(|editor| {
        for raw in &options.select {
            let id = ElementId::intern(raw);
            if editor.element(id).is_some() {
                editor.toggle_selection(id);
            } else {
                log::warn!("--select {raw}: no such element");
            }
        }
    });

    let mut submitted = Vec::new();
    for prompt in &options.prompts {
        match session.submit_prompt(prompt) {
            Ok(id) => submitted.push(id),
            Err(e) => log::warn!("skipping prompt {prompt:?}: {e}"),
        }
    }
    session.wait_idle().await;

    let mut failed = 0;
    for id in submitted {
        let Some(task) = session.task(id) else {
            continue;
        };
        match task.status {
            TaskStatus::Completed => writeln!(
                out,
                "completed  {:<24} {}",
                task.display_prompt(),
                task.result_image_url.unwrap_or_default()
            )?,
            status => {
                failed += 1;
                writeln!(
                    out,
                    "{:<10} {:<24} {}",
                    format!("{status:?}").to_lowercase(),
                    task.display_prompt(),
                    task.error.unwrap_or_default()
                )?
            }
        }
    }
    finish(session).await?;

    if failed > 0 {
        bail!("{failed} generation task(s) failed");
    }
    Ok(())
}

pub async fn add_text(
    path: &Path,
    config: SessionConfig,
    text: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let session = open_session(path, config, MockImageGenerator::new()).await?;
    let id = session.with_editor(|editor| {
        let id = editor.add_text();
        if let Some(text) = text {
            editor.update_element(id, &ElementPatch::content(text));
        }
        id
    });
    finish(session).await?;
    writeln!(out, "added text {id}")?;
    Ok(())
}

pub async fn add_card(
    path: &Path,
    config: SessionConfig,
    card_type: &str,
    template: usize,
    out: &mut impl Write,
) -> Result<()> {
    let card_type = CardType::parse(card_type).ok_or_else(|| {
        let known: Vec<_> = CardType::ALL.iter().map(|t| t.as_str()).collect();
        anyhow!("Unknown card type {card_type:?}; expected one of {}", known.join(", "))
    })?;
    let templates = templates_for(card_type);
    let chosen = templates.get(template).with_context(|| {
        format!(
            "{} has {} template(s), index {template} is out of range",
            card_type.as_str(),
            templates.len()
        )
    })?;

    let session = open_session(path, config, MockImageGenerator::new()).await?;
    let id = session.with_editor(|editor| editor.add_card(chosen));
    finish(session).await?;
    writeln!(out, "added {} card {id}", card_type.as_str())?;
    Ok(())
}

pub async fn new_project(dir: &Path, title: &str, out: &mut impl Write) -> Result<()> {
    let store = JsonFileProjectStore::new(dir);
    let project = store
        .create(title)
        .await
        .with_context(|| format!("Failed to create project in {}", dir.display()))?;
    writeln!(out, "{}", store.path_for(&project.id).display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_core::Project;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn read_project(path: &Path) -> Project {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    async fn new_file(dir: &Path) -> PathBuf {
        let mut out = Vec::new();
        new_project(dir, "Test Board", &mut out).await.unwrap();
        PathBuf::from(String::from_utf8(out).unwrap().trim())
    }

    #[tokio::test]
    async fn new_then_show() {
        let dir = TempDir::new().unwrap();
        let path = new_file(dir.path()).await;
        assert!(path.exists());

        let mut out = Vec::new();
        show(&path, &SessionConfig::default(), &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Test Board (project "));
        assert!(text.contains("0 element(s), zoom 100%"));
    }

    #[tokio::test]
    async fn add_text_and_card_are_saved() {
        let dir = TempDir::new().unwrap();
        let path = new_file(dir.path()).await;

        let mut out = Vec::new();
        add_text(&path, SessionConfig::default(), Some("Hello"), &mut out)
            .await
            .unwrap();
        add_card(&path, SessionConfig::default(), "product", 0, &mut out)
            .await
            .unwrap();

        let project = read_project(&path);
        assert_eq!(project.elements.len(), 2);
        assert_eq!(project.elements[0].content, "Hello");
        assert_eq!(project.elements[1].card_type, Some(CardType::Product));

        let err = add_card(&path, SessionConfig::default(), "poster", 0, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown card type"));
    }

    #[tokio::test]
    async fn generate_places_images_and_reports() {
        let dir = TempDir::new().unwrap();
        let path = new_file(dir.path()).await;
        let mut out = Vec::new();
        add_text(&path, SessionConfig::default(), None, &mut out)
            .await
            .unwrap();
        let reference = read_project(&path).elements[0].id;

        let mut out = Vec::new();
        let options = GenerateOptions {
            prompts: vec!["misty forest".into(), "city at night".into()],
            select: vec![reference.as_str().to_string()],
            fail: false,
            latency: Duration::from_millis(1),
        };
        generate(&path, SessionConfig::default(), options, &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|l| l.starts_with("completed")));
        assert_eq!(read_project(&path).elements.len(), 3);
    }

    #[tokio::test]
    async fn generate_with_fail_reports_error() {
        let dir = TempDir::new().unwrap();
        let path = new_file(dir.path()).await;
        let mut out = Vec::new();
        let options = GenerateOptions {
            prompts: vec!["anything".into()],
            select: vec![],
            fail: true,
            latency: Duration::from_millis(1),
        };
        let err = generate(&path, SessionConfig::default(), options, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("1 generation task(s) failed"));
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("failed"));
        assert!(text.contains("generation disabled by --fail"));
        assert!(read_project(&path).elements.is_empty());
    }
}
