//! `GET /v2/<name>/referrers/<digest>`
//!
//! Answers with an OCI image index listing every manifest that declares
//! `<digest>` as its subject. The whole enumeration completes before any
//! byte of the response is written; a failure part-way through yields an
//! error response, never a truncated index.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use oreg_storage::{resolve_referrers, RepositoryName, StorageError};
use oreg_types::{media_types, Digest, ImageIndex};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

const REFERRERS_SEGMENT: &str = "/referrers/";

/// Split `<name>/referrers/<digest>` at the last `/referrers/`, since
/// repository names may themselves contain a `referrers` component.
pub fn split_referrers_path(rest: &str) -> Option<(&str, &str)> {
    let rest = rest.trim_start_matches('/');
    let (name, reference) = rest.rsplit_once(REFERRERS_SEGMENT)?;
    if name.is_empty() || reference.is_empty() {
        return None;
    }
    Some((name, reference))
}

pub async fn get_referrers(
    State(state): State<AppState>,
    Path(rest): Path<String>,
) -> ServerResult<Response> {
    let (name, reference) =
        split_referrers_path(&rest).ok_or_else(|| ServerError::RouteNotFound(rest.clone()))?;

    // These checks are syntactic; nothing touches storage until they pass.
    let subject = Digest::parse(reference)?;
    subject.check_length()?;
    let name = RepositoryName::parse(name).map_err(|e| match e {
        StorageError::InvalidName { name, .. } => ServerError::NameInvalid(name),
        other => other.into(),
    })?;

    let ctx = state.request_context();
    let repository = state
        .namespace()
        .repository(&name)
        .map_err(|e| match e {
            StorageError::NotFound(_) => ServerError::RepoNotFound(name.to_string()),
            other => other.into(),
        })?;

    // Referrers whose content is not stored are left out of the index, so
    // the listing can be shorter than the set of links for this subject.
    let descriptors = resolve_referrers(&ctx, repository.as_ref(), &subject, "").await?;
    tracing::debug!(
        repository = %name,
        subject = %subject,
        count = descriptors.len(),
        "served referrers"
    );

    let index = ImageIndex::new(descriptors);
    let body = serde_json::to_vec(&index).map_err(|e| ServerError::Encoding(e.to_string()))?;
    Ok(([(CONTENT_TYPE, media_types::IMAGE_INDEX)], body).into_response())
}
