//! The encyclopedia: Markdown entries kept as files, with search and an
//! editor.

use axum::{
    Extension, Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tracing::info;

use agora_types::forms::{EditPageForm, NewPageForm, SearchForm};
use agora_types::models::Viewer;
use agora_wiki::{SearchOutcome, markdown, search};

use crate::error::PageError;
use crate::templates::{
    Nav, NavLink, WikiEditTemplate, WikiEntryTemplate, WikiIndexTemplate, WikiNewTemplate,
    WikiSearchTemplate, render,
};
use crate::{AppState, ENCYCLOPEDIA, path_segment};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/wiki/{title}", get(entry).post(edit_form))
        .route("/search", post(search_entries))
        .route("/new", get(new_form).post(create))
        .route("/edit", post(save_edit))
        .route("/random", get(random))
}

fn nav(viewer: &Viewer) -> Nav {
    let mut nav = Nav::for_viewer("Wiki", ENCYCLOPEDIA, viewer);
    nav.links = vec![
        NavLink::new(ENCYCLOPEDIA, "Home"),
        NavLink::new(format!("{}/new", ENCYCLOPEDIA), "Create New Page"),
        NavLink::new(format!("{}/random", ENCYCLOPEDIA), "Random Page"),
    ];
    nav.search_action = "/encyclopedia/search";
    nav
}

fn entry_href(title: &str) -> String {
    format!("{}/wiki/{}", ENCYCLOPEDIA, path_segment(title))
}

fn page_not_found() -> PageError {
    PageError::NotFound("Page Not Found".into())
}

async fn index(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Response, PageError> {
    let entries = state
        .entries
        .list_entries()
        .await?
        .into_iter()
        .map(|title| NavLink::new(entry_href(&title), title))
        .collect();

    Ok(render(&WikiIndexTemplate { nav: nav(&viewer), entries })?.into_response())
}

async fn entry(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(title): Path<String>,
) -> Result<Response, PageError> {
    let content = state.entries.get_entry(&title).await?.ok_or_else(page_not_found)?;

    Ok(render(&WikiEntryTemplate {
        nav: nav(&viewer),
        content_html: markdown::render(&content),
        title,
    })?
    .into_response())
}

/// Posting to an entry opens it in the editor.
async fn edit_form(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(title): Path<String>,
) -> Result<Response, PageError> {
    let content = state.entries.get_entry(&title).await?.ok_or_else(page_not_found)?;

    Ok(render(&WikiEditTemplate {
        nav: nav(&viewer),
        title,
        content,
        message: String::new(),
    })?
    .into_response())
}

async fn save_edit(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<EditPageForm>,
) -> Result<Response, PageError> {
    let title = form.title.trim().to_string();

    if let Err(e) = form.validate() {
        let page = render(&WikiEditTemplate {
            nav: nav(&viewer),
            title,
            content: form.content,
            message: e.to_string(),
        })?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    state.entries.save_entry(&title, &form.content).await?;
    state.entries.remove_newline(&title).await?;
    info!("Entry '{}' edited", title);

    Ok(Redirect::to(&entry_href(&title)).into_response())
}

async fn search_entries(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<SearchForm>,
) -> Result<Response, PageError> {
    let titles = state.entries.list_entries().await?;

    match search(&titles, &form.q) {
        SearchOutcome::Exact(title) => Ok(Redirect::to(&entry_href(&title)).into_response()),
        SearchOutcome::Candidates(found) => {
            let candidates = found
                .into_iter()
                .map(|c| NavLink::new(entry_href(&c.title), c.display))
                .collect();
            Ok(render(&WikiSearchTemplate {
                nav: nav(&viewer),
                query: form.q.trim().to_string(),
                candidates,
            })?
            .into_response())
        }
    }
}

async fn new_form(Extension(viewer): Extension<Viewer>) -> Result<Response, PageError> {
    Ok(render(&WikiNewTemplate {
        nav: nav(&viewer),
        title: String::new(),
        content: String::new(),
        message: String::new(),
    })?
    .into_response())
}

async fn create(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Form(form): Form<NewPageForm>,
) -> Result<Response, PageError> {
    let title = form.title.trim().to_string();

    if let Err(e) = form.validate() {
        let page = render(&WikiNewTemplate {
            nav: nav(&viewer),
            title,
            content: form.content,
            message: e.to_string(),
        })?;
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    if state.entries.list_entries().await?.contains(&title) {
        return Err(PageError::Conflict(
            "Page Exist: there is already a wiki page with this title.".into(),
        ));
    }

    state.entries.save_entry(&title, &form.content).await?;
    state.entries.remove_newline(&title).await?;
    info!("Entry '{}' created", title);

    Ok(Redirect::to(&entry_href(&title)).into_response())
}

async fn random(State(state): State<AppState>) -> Result<Response, PageError> {
    let target = match state.entries.random_entry().await? {
        Some(title) => entry_href(&title),
        None => ENCYCLOPEDIA.to_string(),
    };
    Ok(Redirect::to(&target).into_response())
}
