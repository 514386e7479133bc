//! Two-phase page responses: an eagerly rendered shell plus deferred sections.
//!
//! A handler awaits its critical data, renders the page shell with a
//! placeholder for every deferred section, and returns a [`TwoPhaseResponse`].
//! The shell is flushed immediately. Each section is then streamed in the
//! order its data resolves, wrapped in a `<template>` and followed by a
//! nonce'd script that swaps it into the placeholder.
//!
//! ```text
//! chunk 1   <!DOCTYPE html> ... <div id="placeholder-recommended-products">Loading...</div> ...
//! chunk 2   <template id="deferred-recommended-products">...</template><script nonce=..>...</script>
//! chunk 3   </body></html>
//! ```
//!
//! Deferred data never fails the page: errors are logged and resolve to
//! `None` (see [`Deferred::spawn`]).

use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;

use axum::{
    body::Body,
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;

use crate::middleware::CspNonce;

/// Closing markup appended after the last deferred section.
pub const DOCUMENT_TAIL: &str = "</body>\n</html>\n";

/// Inline helper that moves a streamed `<template>` into its placeholder.
///
/// Page shells must emit this (with the request's CSP nonce) before the
/// first placeholder.
pub const SWAP_SCRIPT: &str = "window.__swapDeferred=function(id){\
var t=document.getElementById('deferred-'+id),p=document.getElementById('placeholder-'+id);\
if(t&&p){p.replaceWith(t.content.cloneNode(true));}if(t){t.remove();}};";

// =============================================================================
// Deferred values
// =============================================================================

/// Renderer-facing state of a deferred value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredView<T> {
    /// Not resolved yet; the placeholder is showing.
    Loading,
    /// Resolved successfully.
    Resolved(T),
    /// The query failed (already logged); render the empty state.
    Errored,
}

impl<T> DeferredView<T> {
    /// Returns `true` while the placeholder should be shown.
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// A value fetched in parallel with the critical path that resolves exactly once.
pub struct Deferred<T> {
    label: &'static str,
    handle: JoinHandle<Option<T>>,
}

impl<T: Send + 'static> Deferred<T> {
    /// Start `future` on the runtime without waiting for it.
    ///
    /// Must be called from within a Tokio runtime. An `Err` is logged with
    /// `label` and becomes `None`, so awaiting a `Deferred` never fails.
    pub fn spawn<F, E>(label: &'static str, future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            match future.await {
                Ok(value) => Some(value),
                Err(e) => {
                    // Log but don't propagate so the page still renders
                    tracing::error!(deferred = label, error = %e, "Deferred query failed");
                    None
                }
            }
        });

        Self { label, handle }
    }

    /// Wait for the value. Failures and panics resolve to `None`.
    pub async fn resolve(self) -> Option<T> {
        match self.handle.await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(deferred = self.label, error = %e, "Deferred task did not complete");
                None
            }
        }
    }

    /// Wait for the value and map it onto the renderer tri-state.
    pub async fn resolve_view(self) -> DeferredView<T> {
        self.resolve()
            .await
            .map_or(DeferredView::Errored, DeferredView::Resolved)
    }
}

// =============================================================================
// Streaming response
// =============================================================================

/// A page section rendered once its deferred data resolves.
pub struct DeferredSection {
    id: &'static str,
    render: BoxFuture<'static, String>,
}

impl DeferredSection {
    /// `id` must match the shell's `placeholder-{id}` element.
    pub fn new<F>(id: &'static str, render: F) -> Self
    where
        F: Future<Output = String> + Send + 'static,
    {
        Self {
            id,
            render: Box::pin(render),
        }
    }
}

/// Markup streamed for one resolved section.
#[must_use]
pub fn section_chunk(id: &str, html: &str, nonce: &CspNonce) -> String {
    format!(
        "<template id=\"deferred-{id}\">{html}</template>\
         <script nonce=\"{nonce}\">window.__swapDeferred('{id}');</script>\n",
        nonce = nonce.value()
    )
}

/// Streaming HTML response: shell first, then each section as it resolves.
pub struct TwoPhaseResponse {
    shell: String,
    nonce: CspNonce,
    sections: Vec<DeferredSection>,
}

impl TwoPhaseResponse {
    /// `shell` is the rendered page without its closing `</body></html>`.
    #[must_use]
    pub const fn new(shell: String, nonce: CspNonce) -> Self {
        Self {
            shell,
            nonce,
            sections: Vec::new(),
        }
    }

    /// Add a section to stream after the shell.
    #[must_use]
    pub fn with_section(mut self, section: DeferredSection) -> Self {
        self.sections.push(section);
        self
    }
}

impl IntoResponse for TwoPhaseResponse {
    fn into_response(self) -> Response {
        let Self {
            shell,
            nonce,
            sections,
        } = self;

        let body = async_stream::stream! {
            yield Ok::<_, Infallible>(shell);

            let mut pending: FuturesUnordered<_> = sections
                .into_iter()
                .map(|section| async move { (section.id, section.render.await) })
                .collect();

            while let Some((id, html)) = pending.next().await {
                tracing::debug!(section = id, "Streaming deferred section");
                yield Ok(section_chunk(id, &html, &nonce));
            }

            yield Ok(DOCUMENT_TAIL.to_string());
        };

        (
            [
                (CONTENT_TYPE, "text/html; charset=utf-8"),
                (CACHE_CONTROL, "no-store"),
            ],
            Body::from_stream(body),
        )
            .into_response()
    }
}
