// SPDX-License-Identifier: MIT

//! Web UI for the Skyorg dashboard

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::history::{History, HistoryEntry};
use crate::merger::Merger;
use crate::organizer::Organizer;
use crate::progress::{JobKind, JobSnapshot, JobState};

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    pub jobs: Arc<JobState>,
    pub history_path: PathBuf,
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(index_page))
        .route("/history", get(history_page))
        // API endpoints
        .route("/api/organize", post(api_organize))
        .route("/api/merge", post(api_merge))
        .route("/api/status", get(api_status))
        .route("/api/history", get(api_history))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === API Handlers ===

#[derive(Deserialize)]
struct OrganizeRequest {
    source: String,
    destination: String,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Serialize)]
struct JobAccepted {
    started: bool,
    message: String,
}

async fn api_organize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OrganizeRequest>,
) -> impl IntoResponse {
    if !state.jobs.try_start(JobKind::Organize) {
        return (
            StatusCode::CONFLICT,
            Json(JobAccepted {
                started: false,
                message: "A job is already running".to_string(),
            }),
        );
    }

    let jobs = state.jobs.clone();
    let organizer = Organizer::new(
        state.config.clone(),
        state.history_path.clone(),
        request.dry_run,
    );
    let source = PathBuf::from(request.source);
    let destination = PathBuf::from(request.destination);

    tokio::spawn(async move {
        let reporter: Arc<dyn crate::progress::Reporter> = jobs.clone();
        let result = organizer
            .run(&source, &destination, reporter)
            .await
            .map(|outcome| {
                info!(
                    "Organize finished: {}/{} archives placed",
                    outcome.organized, outcome.total
                );
            });
        if let Err(e) = &result {
            error!("Organize job failed: {}", e);
        }
        jobs.complete(&result);
    });

    (
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            started: true,
            message: "Organize started".to_string(),
        }),
    )
}

#[derive(Deserialize)]
struct MergeRequest {
    sources: Vec<String>,
    target: String,
    #[serde(default)]
    dry_run: bool,
}

async fn api_merge(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MergeRequest>,
) -> impl IntoResponse {
    if !state.jobs.try_start(JobKind::Merge) {
        return (
            StatusCode::CONFLICT,
            Json(JobAccepted {
                started: false,
                message: "A job is already running".to_string(),
            }),
        );
    }

    let jobs = state.jobs.clone();
    let sources: Vec<PathBuf> = request.sources.iter().map(PathBuf::from).collect();
    let target = PathBuf::from(request.target);
    let merger = Merger::new(request.dry_run);

    tokio::spawn(async move {
        let reporter: Arc<dyn crate::progress::Reporter> = jobs.clone();
        // Merging is pure filesystem work; keep it off the async workers.
        let result = tokio::task::spawn_blocking(move || {
            merger.merge(&sources, &target, reporter).map(|outcome| {
                info!(
                    "Merge finished: {} moved, {} duplicates, {} renamed",
                    outcome.moved, outcome.duplicates, outcome.renamed
                );
            })
        })
        .await
        .unwrap_or_else(|e| Err(crate::SkyorgError::Merge(format!("Merge task panicked: {}", e))));

        if let Err(e) = &result {
            error!("Merge job failed: {}", e);
        }
        jobs.complete(&result);
    });

    (
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            started: true,
            message: "Merge started".to_string(),
        }),
    )
}

async fn api_status(State(state): State<Arc<AppState>>) -> Json<JobSnapshot> {
    Json(state.jobs.snapshot())
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn api_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<HistoryEntry>> {
    let history = History::new(state.history_path.clone());
    let entries = history
        .get_recent(query.limit.unwrap_or(50))
        .unwrap_or_default();
    Json(entries)
}

// === Page Handlers ===

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(&state.config))
}

async fn history_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let history = History::new(state.history_path.clone());
    let entries = history.get_recent(100).unwrap_or_default();
    Html(render_history_page(&entries))
}

// === Template Rendering ===

fn base_template(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Skyorg</title>
    <style>
        :root {{
            --bg-primary: #1a1a2e;
            --bg-secondary: #16213e;
            --bg-card: #0f3460;
            --text-primary: #e8e8e8;
            --text-secondary: #a0a0a0;
            --accent: #e94560;
            --success: #00d9a5;
            --border: #2a2a4a;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }}
        .container {{ max-width: 1100px; margin: 0 auto; padding: 20px; }}
        nav {{
            background: var(--bg-secondary);
            padding: 15px 20px;
            display: flex;
            align-items: center;
            gap: 30px;
            border-bottom: 1px solid var(--border);
        }}
        nav .logo {{
            font-size: 1.5em;
            font-weight: bold;
            color: var(--accent);
            text-decoration: none;
        }}
        nav a {{
            color: var(--text-secondary);
            text-decoration: none;
        }}
        nav a:hover {{ color: var(--text-primary); }}
        .card {{
            background: var(--bg-card);
            border-radius: 12px;
            padding: 20px;
            margin-bottom: 20px;
        }}
        .card h2 {{ margin-bottom: 15px; color: var(--accent); }}
        label {{ display: block; margin: 10px 0 4px; color: var(--text-secondary); }}
        input[type=text] {{
            width: 100%;
            padding: 8px 10px;
            border-radius: 6px;
            border: 1px solid var(--border);
            background: var(--bg-secondary);
            color: var(--text-primary);
        }}
        button {{
            margin-top: 14px;
            padding: 8px 18px;
            border: none;
            border-radius: 6px;
            background: var(--accent);
            color: white;
            cursor: pointer;
        }}
        button:disabled {{ opacity: 0.5; cursor: default; }}
        table {{ width: 100%; border-collapse: collapse; }}
        th, td {{
            padding: 10px 12px;
            text-align: left;
            border-bottom: 1px solid var(--border);
        }}
        th {{ color: var(--text-secondary); font-weight: 500; }}
        #job-log {{
            background: var(--bg-secondary);
            border-radius: 6px;
            padding: 10px;
            margin-top: 10px;
            max-height: 240px;
            overflow-y: auto;
            font-family: monospace;
            font-size: 0.85em;
            white-space: pre-wrap;
        }}
        .phase-done {{ color: var(--success); }}
        .phase-failed {{ color: var(--accent); }}
    </style>
</head>
<body>
    <nav>
        <a href="/" class="logo">Skyorg</a>
        <a href="/">Dashboard</a>
        <a href="/history">History</a>
    </nav>
    <main class="container">
        {}
    </main>
</body>
</html>"#,
        title, content
    )
}

fn render_index(config: &AppConfig) -> String {
    let content = format!(
        r#"
        <h1>3DSky File Organizer</h1>
        <div class="card">
            <h2>Organize</h2>
            <p>Sort downloaded archives into <code>{models_dir}/</code> by catalog category.</p>
            <label for="org-source">Source directory</label>
            <input type="text" id="org-source" placeholder="/home/user/Downloads">
            <label for="org-dest">Destination directory</label>
            <input type="text" id="org-dest" placeholder="/home/user/Models">
            <button id="org-start" onclick="startOrganize()">Start Organizing</button>
        </div>
        <div class="card">
            <h2>Merge</h2>
            <p>Combine organized trees into one and refresh their summaries.</p>
            <label for="merge-sources">Source folders (one per line)</label>
            <input type="text" id="merge-sources" placeholder="/mnt/disk1/3ds_models, /mnt/disk2/3ds_models">
            <label for="merge-target">Target folder</label>
            <input type="text" id="merge-target" placeholder="/home/user/Models/3ds_models">
            <button id="merge-start" onclick="startMerge()">Start Merge</button>
        </div>
        <div class="card">
            <h2>Job Status</h2>
            <div id="job-phase">idle</div>
            <div id="job-progress"></div>
            <div id="job-log"></div>
        </div>
        <script>
            async function startOrganize() {{
                const body = {{
                    source: document.getElementById('org-source').value,
                    destination: document.getElementById('org-dest').value
                }};
                await postJob('/api/organize', body);
            }}
            async function startMerge() {{
                const body = {{
                    sources: document.getElementById('merge-sources').value
                        .split(',').map(s => s.trim()).filter(s => s),
                    target: document.getElementById('merge-target').value
                }};
                await postJob('/api/merge', body);
            }}
            async function postJob(url, body) {{
                const res = await fetch(url, {{
                    method: 'POST',
                    headers: {{'Content-Type': 'application/json'}},
                    body: JSON.stringify(body)
                }});
                const data = await res.json();
                if (!data.started) alert(data.message);
            }}
            async function poll() {{
                try {{
                    const res = await fetch('/api/status');
                    const s = await res.json();
                    const phase = document.getElementById('job-phase');
                    phase.textContent = s.kind ? s.kind + ': ' + s.phase : s.phase;
                    phase.className = 'phase-' + s.phase;
                    let progress = '';
                    if (s.total > 0) progress = s.processed + ' / ' + s.total +
                        (s.failed ? ' (' + s.failed + ' failed)' : '');
                    if (s.current) progress += '  —  ' + s.current;
                    if (s.error) progress = s.error;
                    document.getElementById('job-progress').textContent = progress;
                    document.getElementById('job-log').textContent = s.log.join('\n');
                    const running = s.phase === 'running';
                    document.getElementById('org-start').disabled = running;
                    document.getElementById('merge-start').disabled = running;
                }} catch (e) {{ /* server restarting */ }}
            }}
            setInterval(poll, 1000);
            poll();
        </script>
    "#,
        models_dir = config.organizer.models_dirname,
    );

    base_template("Dashboard", &content)
}

fn render_history_page(entries: &[HistoryEntry]) -> String {
    let rows: String = entries
        .iter()
        .map(|e| {
            let status = if e.undone { "undone" } else { "" };
            format!(
                r#"<tr>
                    <td>{}</td>
                    <td>{}</td>
                    <td>{}</td>
                    <td>{}</td>
                    <td>{}</td>
                </tr>"#,
                e.timestamp.format("%Y-%m-%d %H:%M"),
                e.model_id,
                e.title.as_deref().unwrap_or("-"),
                e.categories.join(" / "),
                status,
            )
        })
        .collect();

    let content = format!(
        r#"
        <h1>History</h1>
        <div class="card">
            <table>
                <tr>
                    <th>Date</th>
                    <th>Model</th>
                    <th>Title</th>
                    <th>Category</th>
                    <th></th>
                </tr>
                {}
            </table>
        </div>
    "#,
        if rows.is_empty() {
            "<tr><td colspan=5>No moves recorded yet</td></tr>".to_string()
        } else {
            rows
        }
    );

    base_template("History", &content)
}

/// Start the web server
pub async fn start_server(config: AppConfig, history_path: PathBuf) -> crate::Result<()> {
    let state = Arc::new(AppState {
        jobs: Arc::new(JobState::new()),
        config: config.clone(),
        history_path,
    });

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web UI available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| crate::SkyorgError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_page_mentions_both_modes() {
        let html = render_index(&AppConfig::default());
        assert!(html.contains("Organize"));
        assert!(html.contains("Merge"));
        assert!(html.contains("3ds_models"));
    }

    #[test]
    fn history_page_renders_entries() {
        let entry = crate::history::create_entry(
            PathBuf::from("/src/1.abc.zip"),
            PathBuf::from("/dest/Furniture/1.abc.zip"),
            "1.abc".to_string(),
            Some("Dining table".to_string()),
            vec!["Furniture".to_string(), "Table".to_string()],
        );

        let html = render_history_page(&[entry]);
        assert!(html.contains("Dining table"));
        assert!(html.contains("Furniture / Table"));
    }

    #[test]
    fn empty_history_page_has_placeholder() {
        let html = render_history_page(&[]);
        assert!(html.contains("No moves recorded yet"));
    }
}
