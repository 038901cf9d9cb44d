use crate::error::Error;
use crate::response::ResponseContext;

/// Body substituted for an empty response before the terminal decode.
pub const EMPTY_OBJECT: &[u8] = b"{}";

/// Variant tag of a [`Decision`], used to locate entries in a [`DecisionList`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    RefreshAuth,
    Retry,
    ValidateStatus,
    NormalizePayload,
    ParseResult,
}

/// A response policy step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// On `403`, refresh the access token once and restart without this step.
    RefreshAuth,
    /// On a non-2xx status, restart up to this many more times.
    Retry(usize),
    /// On a non-2xx status, fail with the structured API error in the body.
    ValidateStatus,
    /// Replace an empty body with `{}`.
    NormalizePayload,
    /// Decode the body into the descriptor's response type. Always terminal.
    ParseResult,
}

impl Decision {
    pub const fn kind(self) -> DecisionKind {
        match self {
            Self::RefreshAuth => DecisionKind::RefreshAuth,
            Self::Retry(_) => DecisionKind::Retry,
            Self::ValidateStatus => DecisionKind::ValidateStatus,
            Self::NormalizePayload => DecisionKind::NormalizePayload,
            Self::ParseResult => DecisionKind::ParseResult,
        }
    }

    pub fn should_apply(self, context: &ResponseContext) -> bool {
        match self {
            Self::RefreshAuth => context.status() == http::StatusCode::FORBIDDEN,
            Self::Retry(remaining) => !context.is_success() && remaining > 0,
            Self::ValidateStatus => !context.is_success(),
            Self::NormalizePayload => context.body().is_empty(),
            Self::ParseResult => true,
        }
    }
}

/// Ordered decisions for one pipeline run.
///
/// Lists are values: [`without`](Self::without) and
/// [`replacing`](Self::replacing) build new lists and leave `self` untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionList {
    decisions: Vec<Decision>,
}

impl DecisionList {
    pub const STANDARD_RETRIES: usize = 2;

    pub fn new(decisions: impl IntoIterator<Item = Decision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
        }
    }

    /// Refresh, retry, status validation, payload normalization, then parse.
    pub fn standard() -> Self {
        Self::with_retries(Self::STANDARD_RETRIES)
    }

    pub fn with_retries(retries: usize) -> Self {
        Self::new([
            Decision::RefreshAuth,
            Decision::Retry(retries),
            Decision::ValidateStatus,
            Decision::NormalizePayload,
            Decision::ParseResult,
        ])
    }

    /// A copy with every entry of `kind` removed.
    pub fn without(&self, kind: DecisionKind) -> Self {
        Self::new(
            self.decisions
                .iter()
                .copied()
                .filter(|decision| decision.kind() != kind),
        )
    }

    /// A copy with the first entry of `kind` swapped for `replacement`.
    pub fn replacing(&self, kind: DecisionKind, replacement: Decision) -> Self {
        let mut decisions = self.decisions.clone();
        if let Some(slot) = decisions.iter_mut().find(|decision| decision.kind() == kind) {
            *slot = replacement;
        }
        Self { decisions }
    }

    /// A copy with the entry at `index` swapped for `replacement`.
    ///
    /// Out-of-range indexes leave the copy unchanged.
    pub fn replacing_at(&self, index: usize, replacement: Decision) -> Self {
        let mut decisions = self.decisions.clone();
        if let Some(slot) = decisions.get_mut(index) {
            *slot = replacement;
        }
        Self { decisions }
    }

    pub fn find(&self, kind: DecisionKind) -> Option<Decision> {
        self.decisions
            .iter()
            .copied()
            .find(|decision| decision.kind() == kind)
    }

    pub fn contains(&self, kind: DecisionKind) -> bool {
        self.find(kind).is_some()
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Decision> {
        self.decisions.iter()
    }

    pub fn as_slice(&self) -> &[Decision] {
        &self.decisions
    }

    /// The list a transport-failure restart continues with, or `None` once retries are spent.
    ///
    /// Only the first `Retry` entry with budget left is decremented, the same
    /// entry a bad status would have fired.
    pub(crate) fn after_retry(&self) -> Option<(Self, usize)> {
        let (index, remaining) = self
            .decisions
            .iter()
            .enumerate()
            .find_map(|(index, decision)| match decision {
                Decision::Retry(remaining) if *remaining > 0 => Some((index, *remaining)),
                _ => None,
            })?;
        let next = remaining - 1;
        Some((self.replacing_at(index, Decision::Retry(next)), next))
    }
}

impl Default for DecisionList {
    fn default() -> Self {
        Self::standard()
    }
}

impl FromIterator<Decision> for DecisionList {
    fn from_iter<I: IntoIterator<Item = Decision>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a DecisionList {
    type Item = &'a Decision;
    type IntoIter = std::slice::Iter<'a, Decision>;

    fn into_iter(self) -> Self::IntoIter {
        self.decisions.iter()
    }
}

/// Why a run was abandoned for a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartReason {
    AuthRefreshed,
    Retry { remaining: usize },
    TransportRetry { remaining: usize },
}

/// Outcome of applying one decision.
#[derive(Debug)]
pub(crate) enum Action<R> {
    Continue(ResponseContext),
    Restart(DecisionList, RestartReason),
    Errored(Error),
    Done(R),
}
