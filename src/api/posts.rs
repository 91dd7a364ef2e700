use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::types::{PostDetailContext, PostFormContext, PostListContext, View, found};
use super::validation::parse_post_id;
use super::{ApiError, AppState};
use crate::domain::{Actor, PostId};
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::services::BlogError;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

fn list_view(
    template: &'static str,
    actor: &Actor,
    posts: Vec<crate::models::Post>,
    tag: Option<String>,
    query: Option<String>,
) -> View<PostListContext> {
    View::new(
        template,
        PostListContext {
            user: actor.user().cloned(),
            posts,
            tag,
            query,
        },
    )
}

/// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.blog().list_posts().await?;
    Ok(list_view("blog/index.html", &actor, posts, None, None))
}

/// GET /tag/{name}/
pub async fn by_tag(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(tag): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.blog().list_by_tag(&tag).await?;
    Ok(list_view("blog/tag.html", &actor, posts, Some(tag), None))
}

/// GET /search/?q=
pub async fn search(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let posts = state.blog().search(&query.q).await?;
    Ok(list_view("blog/search.html", &actor, posts, None, Some(query.q)))
}

async fn detail_view(
    state: &AppState,
    actor: &Actor,
    id: PostId,
    form: CommentForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    let detail = state.blog().get_post(actor, id).await?;
    Ok(View::new(
        "blog/post.html",
        PostDetailContext {
            user: actor.user().cloned(),
            post: detail.post,
            comments: detail.comments,
            can_edit: detail.can_edit,
            form,
            errors,
        },
    )
    .into_response())
}

/// GET /post/{id}/
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&id)?;
    detail_view(&state, &actor, id, CommentForm::default(), FormErrors::new()).await
}

/// POST /post/{id}/
pub async fn comment(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&raw_id)?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return detail_view(&state, &actor, id, form, errors).await,
    };

    state.blog().add_comment(&actor, id, input).await?;
    Ok(found(&format!("/post/{id}/")))
}

async fn post_form_view(
    state: &AppState,
    actor: &Actor,
    post_id: Option<PostId>,
    form: PostForm,
    errors: FormErrors,
) -> Result<Response, ApiError> {
    let tags = state.blog().list_tags().await?;
    let template = if post_id.is_some() {
        "blog/editpost.html"
    } else {
        "blog/addpost.html"
    };

    Ok(View::new(
        template,
        PostFormContext {
            user: actor.user().cloned(),
            post_id: post_id.map(|id| id.value()),
            form,
            errors,
            tags,
        },
    )
    .into_response())
}

/// GET /addpost/
pub async fn add_page(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Response, ApiError> {
    post_form_view(&state, &actor, None, PostForm::initial(), FormErrors::new()).await
}

/// POST /addpost/
///
/// The author is always the logged-in user; an `author` field in the body is
/// ignored.
pub async fn add(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let form = PostForm::from_pairs(&pairs);

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return post_form_view(&state, &actor, None, form, errors).await,
    };

    match state.blog().create_post(&actor, input).await {
        Ok(_) => Ok(found("/")),
        Err(BlogError::Validation(errors)) => {
            post_form_view(&state, &actor, None, form, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /editpost/{id}/
pub async fn edit_page(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&raw_id)?;
    let post = state.blog().post_for_edit(&actor, id).await?;
    post_form_view(
        &state,
        &actor,
        Some(id),
        PostForm::from_post(&post),
        FormErrors::new(),
    )
    .await
}

/// POST /editpost/{id}/
pub async fn edit(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(raw_id): Path<String>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&raw_id)?;

    // Refused edits redirect before the form is even looked at.
    state.blog().post_for_edit(&actor, id).await?;

    let form = PostForm::from_pairs(&pairs);
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return post_form_view(&state, &actor, Some(id), form, errors).await,
    };

    match state.blog().edit_post(&actor, id, input).await {
        Ok(_) => Ok(found("/")),
        Err(BlogError::Validation(errors)) => {
            post_form_view(&state, &actor, Some(id), form, errors).await
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /deletepost/{id}/
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_post_id(&raw_id)?;
    state.blog().delete_post(&actor, id).await?;
    Ok(found("/"))
}
