//! The token-gated object access pipeline.
//!
//! One strictly sequential resolution per request: authenticate the token,
//! extract claims, parse the range/conditional modifiers, fetch from the
//! store, and build the response.  The only designed branch-back is the
//! bounded re-fetch when a range request meets a content-encoded object —
//! byte offsets are meaningless against the encoded representation, so the
//! range is discarded and the object fetched once more in full.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

use crate::conditional::{self, Conditional, ShortCircuit};
use crate::errors::GatewayError;
use crate::range::{self, RangeSpec};
use crate::storage::store::{ObjectResult, StoredObject};
use crate::AppState;

/// Download disposition requested via the `download` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadMode {
    /// Serve inline (no parameter present).
    Inline,
    /// Serve as an attachment; a non-empty value overrides the token's
    /// display name.
    Attachment(Option<String>),
}

/// Parse the `download` query parameter out of a raw query string.
pub fn parse_download(query: Option<&str>) -> DownloadMode {
    let query = match query {
        Some(q) => q,
        None => return DownloadMode::Inline,
    };
    for pair in query.split('&') {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (pair, None),
        };
        if percent_decode_str(key).decode_utf8_lossy() == "download" {
            let name = value
                .map(|v| percent_decode_str(v).decode_utf8_lossy().into_owned())
                .filter(|v| !v.is_empty());
            return DownloadMode::Attachment(name);
        }
    }
    DownloadMode::Inline
}

/// Resolve one access request to its final response.
///
/// `head` only affects the 404 body; HEAD body suppression on success
/// paths is the transport's job.
pub async fn access_object(
    state: Arc<AppState>,
    token: &str,
    headers: &HeaderMap,
    query: Option<&str>,
    head: bool,
) -> Result<Response, GatewayError> {
    // Authenticate.  Failures never say why.
    let claims = state
        .verifier
        .verify(token)
        .ok_or(GatewayError::Unauthorized)?;

    // A verified token without an object key is an issuer bug, not a
    // client error.
    let key = claims.file.ok_or(GatewayError::MalformedClaims)?;

    let mut range = range::try_parse(headers);
    let mut conditional = conditional::try_parse(headers);
    let download = parse_download(query);

    let mut result = state
        .store
        .get(&key, conditional.as_ref(), range.as_ref())
        .await?;
    let mut retried = false;

    if range.is_some() && has_encoding_conflict(&result, conditional.as_ref()) {
        // Discard the range and re-fetch the whole object.  Bounded to
        // exactly one extra fetch; the conditional already passed.
        range = None;
        conditional = None;
        retried = true;
        result = state.store.get(&key, None, None).await?;
    }

    match result {
        ObjectResult::Missing if retried => Err(GatewayError::StoreInconsistency),
        ObjectResult::Missing => Err(GatewayError::NotFound { head }),
        ObjectResult::Metadata(meta) => {
            match conditional
                .as_ref()
                .and_then(|c| c.short_circuit(&meta.etag, meta.uploaded_at))
            {
                Some(ShortCircuit::NotModified) => Err(GatewayError::NotModified),
                Some(ShortCircuit::PreconditionFailed) => Err(GatewayError::PreconditionFailed),
                None => Err(anyhow::anyhow!(
                    "object store returned metadata for {} without a matching predicate",
                    meta.key
                )
                .into()),
            }
        }
        ObjectResult::Body(obj) => Ok(build_response(
            obj,
            range.as_ref(),
            claims.name.as_deref(),
            &download,
        )),
    }
}

/// Whether the fetched result's metadata makes the requested range invalid
/// (content encoding present and no conditional short-circuit pending).
fn has_encoding_conflict(result: &ObjectResult, conditional: Option<&Conditional>) -> bool {
    match result {
        ObjectResult::Body(obj) => obj.meta.content_encoding.is_some(),
        ObjectResult::Metadata(meta) => {
            meta.content_encoding.is_some()
                && conditional
                    .map_or(true, |c| c.short_circuit(&meta.etag, meta.uploaded_at).is_none())
        }
        ObjectResult::Missing => false,
    }
}

/// Assemble the success response: 206 when a range was ultimately honored,
/// else 200.
fn build_response(
    obj: StoredObject,
    range: Option<&RangeSpec>,
    display_name: Option<&str>,
    download: &DownloadMode,
) -> Response {
    let StoredObject { meta, body } = obj;

    // The store slices with the same resolution used here, so the span and
    // the returned body always agree.
    let resolved = range.and_then(|spec| range::resolve(spec, meta.size));
    let status = if resolved.is_some() {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let content_length = body.len();
    let mut response = (status, Body::from(body)).into_response();
    let hdrs = response.headers_mut();

    hdrs.insert(
        "content-type",
        meta.content_type
            .as_deref()
            .and_then(|ct| HeaderValue::from_str(ct).ok())
            .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream")),
    );
    hdrs.insert(
        "content-length",
        HeaderValue::from_str(&content_length.to_string()).unwrap(),
    );
    if let Ok(val) = HeaderValue::from_str(&meta.http_etag()) {
        hdrs.insert("etag", val);
    }
    if let Ok(val) = HeaderValue::from_str(&httpdate::fmt_http_date(meta.uploaded_at)) {
        hdrs.insert("last-modified", val);
    }
    hdrs.insert("accept-ranges", HeaderValue::from_static("bytes"));

    if let Some((start, end)) = resolved {
        if let Ok(val) = HeaderValue::from_str(&range::content_range(start, end, meta.size)) {
            hdrs.insert("content-range", val);
        }
    }

    // Optional store-provided headers.  An encoded body is passed through
    // verbatim; no transcoding happens here or downstream.
    if let Some(ref enc) = meta.content_encoding {
        if let Ok(val) = HeaderValue::from_str(enc) {
            hdrs.insert("content-encoding", val);
        }
    }
    if let Some(ref lang) = meta.content_language {
        if let Ok(val) = HeaderValue::from_str(lang) {
            hdrs.insert("content-language", val);
        }
    }
    if let Some(ref cc) = meta.cache_control {
        if let Ok(val) = HeaderValue::from_str(cc) {
            hdrs.insert("cache-control", val);
        }
    }

    if let DownloadMode::Attachment(override_name) = download {
        let filename = override_name
            .as_deref()
            .or(display_name)
            .unwrap_or_else(|| meta.key.rsplit('/').next().unwrap_or(meta.key.as_str()));
        let disposition = format!("attachment; filename=\"{}\"", filename);
        if let Ok(val) = HeaderValue::from_str(&disposition) {
            hdrs.insert("content-disposition", val);
        }
    }

    response
}

// -- Tests -------------------------------------------------------------------
