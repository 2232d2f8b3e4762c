//! Long-lived translation streams.

use std::fmt;
use std::pin::Pin;
use std::task::{
    Context,
    Poll,
};

use futures::future::BoxFuture;
use futures::stream::{
    self,
    BoxStream,
};
use futures::{
    Stream,
    StreamExt,
};

use crate::error::TranslateError;
use crate::store::Subscription;
use crate::types::Resolution;

/// Emits the current resolution of some keys, then a new one after every
/// relevant store event. Never ends on its own; dropping it unsubscribes.
#[must_use = "streams do nothing unless polled"]
pub struct TranslationStream {
    /// Initial value followed by updates
    inner: BoxStream<'static, Result<Resolution, TranslateError>>,
    /// Keeps the event listener registered
    subscription: Subscription,
}

impl TranslationStream {
    pub(crate) fn new(
        first: BoxFuture<'static, Result<Resolution, TranslateError>>,
        updates: BoxStream<'static, Result<Resolution, TranslateError>>,
        subscription: Subscription,
    ) -> Self {
        Self { inner: stream::once(first).chain(updates).boxed(), subscription }
    }
}

impl Stream for TranslationStream {
    type Item = Result<Resolution, TranslateError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for TranslationStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationStream").field("subscription", &self.subscription).finish()
    }
}
