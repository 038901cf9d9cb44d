//! The response decision engine.
//!
//! A run walks its [`DecisionList`] front to back. Skipped decisions are gone
//! for the rest of the run; an applied decision either replaces the response
//! context and lets the walk continue, or ends the run with a restart, an
//! error, or a decoded value.

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::client::Client;
use crate::decision::{Action, Decision, DecisionKind, DecisionList, EMPTY_OBJECT, RestartReason};
use crate::error::Error;
use crate::response::ResponseContext;

/// Structured error body returned by the API on a non-2xx status.
#[derive(Clone, Debug, serde::Deserialize, PartialEq, Eq)]
pub struct ApiErrorBody {
    pub code: i64,
    pub reason: String,
}

pub(crate) enum RunOutcome<R> {
    Finished(crate::Result<R>),
    Restart(DecisionList, RestartReason),
}

/// Runs `run_list` against `context` until a decision ends the run.
///
/// # Panics
///
/// Panics if the list runs out before a terminal decision; a list without an
/// unconditional `ParseResult` at its end is a configuration bug.
pub(crate) async fn run_decisions<R>(
    client: &Client,
    run_list: &DecisionList,
    context: ResponseContext,
) -> RunOutcome<R>
where
    R: DeserializeOwned + Send,
{
    let mut remaining: VecDeque<(usize, Decision)> =
        run_list.iter().copied().enumerate().collect();
    let mut context = context;

    loop {
        let Some((index, decision)) = remaining.pop_front() else {
            panic!("decision chain exhausted without terminal action");
        };
        if !decision.should_apply(&context) {
            trace!(?decision, "decision skipped");
            continue;
        }

        debug!(?decision, status = context.status().as_u16(), "applying decision");
        match apply::<R>(client, index, decision, run_list, &context).await {
            Action::Continue(next) => context = next,
            Action::Restart(next, reason) => return RunOutcome::Restart(next, reason),
            Action::Errored(error) => return RunOutcome::Finished(Err(error)),
            Action::Done(value) => return RunOutcome::Finished(Ok(value)),
        }
    }
}

async fn apply<R>(
    client: &Client,
    index: usize,
    decision: Decision,
    run_list: &DecisionList,
    context: &ResponseContext,
) -> Action<R>
where
    R: DeserializeOwned,
{
    match decision {
        Decision::RefreshAuth => match client.refresh_credentials().await {
            Ok(()) => Action::Restart(
                run_list.without(DecisionKind::RefreshAuth),
                RestartReason::AuthRefreshed,
            ),
            Err(error) => {
                warn!(error = %error, "auth refresh failed");
                Action::Errored(error)
            }
        },
        Decision::Retry(remaining) => {
            let next = remaining.saturating_sub(1);
            let backoff = client.config().retry_backoff;
            warn!(
                status = context.status().as_u16(),
                remaining = next,
                delay_ms = backoff.as_millis() as u64,
                "retrying request after bad status"
            );
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
            Action::Restart(
                run_list.replacing_at(index, Decision::Retry(next)),
                RestartReason::Retry { remaining: next },
            )
        }
        Decision::ValidateStatus => match context.json::<ApiErrorBody>() {
            Ok(body) => Action::Errored(Error::Api {
                code: body.code,
                reason: body.reason,
                status: context.status().as_u16(),
            }),
            Err(error) => Action::Errored(error),
        },
        Decision::NormalizePayload => Action::Continue(context.with_body(EMPTY_OBJECT)),
        Decision::ParseResult => match context.json::<R>() {
            Ok(value) => Action::Done(value),
            Err(error) => Action::Errored(error),
        },
    }
}
