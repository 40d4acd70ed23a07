// Domain rules - Candidate selection, retry adjustment and aggregation

use std::path::Path;

use tracing::debug;

use crate::domain::errors::DomainError;
use crate::domain::model::*;

/// Picks the ordered list of tools worth trying for one request
#[derive(Debug, Clone)]
pub struct CandidateSelector {
    registered: Vec<ToolCandidate>,
}

impl CandidateSelector {
    /// Build a selector; candidates are kept in rank order
    pub fn new(mut registered: Vec<ToolCandidate>) -> Self {
        registered.sort_by_key(|c| c.rank);
        Self { registered }
    }

    pub fn registered(&self) -> &[ToolCandidate] {
        &self.registered
    }

    /// Candidates whose extension set claims the file, in priority order
    ///
    /// May be empty; callers that need a failure use [`Self::select`].
    pub fn candidates(&self, path: &Path) -> Vec<ToolCandidate> {
        self.registered
            .iter()
            .filter(|c| c.matches(path))
            .cloned()
            .collect()
    }

    /// Whether any registered tool claims the file
    pub fn claims(&self, path: &Path) -> bool {
        self.registered.iter().any(|c| c.matches(path))
    }

    /// Ordered candidates able to satisfy the whole request
    ///
    /// An explicit order replaces extension matching. Requests with filters
    /// keep only filter-capable tools; frame cut-lists keep only frame-split
    /// tools unless a frame rate allows converting to seconds.
    pub fn select(
        &self,
        request: &ConvertRequest,
        explicit: Option<&[ConverterId]>,
    ) -> Result<Vec<ToolCandidate>, DomainError> {
        let mut selected = match explicit {
            Some(order) => order
                .iter()
                .filter_map(|id| self.registered.iter().find(|c| c.id == *id))
                .cloned()
                .collect::<Vec<_>>(),
            None => self.candidates(&request.input),
        };

        if selected.is_empty() {
            return Err(DomainError::UnsupportedFormat {
                path: request.input.clone(),
            });
        }

        if !request.options.filters.is_empty() {
            selected.retain(|c| {
                let keep = c.has(Capability::Filters);
                if !keep {
                    debug!("Dropping {}: cannot apply filters", c.id);
                }
                keep
            });
            if selected.is_empty() {
                return Err(DomainError::NoCapableConverter {
                    path: request.input.clone(),
                    requirement: "apply custom filters".to_string(),
                });
            }
        }

        if request.cuts.unit == CutUnit::Frames && request.options.frame_rate.is_none() {
            selected.retain(|c| {
                let keep = c.has(Capability::FrameSplit);
                if !keep {
                    debug!("Dropping {}: cannot split on frames", c.id);
                }
                keep
            });
            if selected.is_empty() {
                return Err(DomainError::NoCapableConverter {
                    path: request.input.clone(),
                    requirement: "split on frame numbers (pass --fps to convert to seconds)"
                        .to_string(),
                });
            }
        }

        Ok(selected)
    }
}

/// Adjusts a request before each attempt
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Force the most widely supported container once the first tool failed
    pub universal_container_on_retry: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            universal_container_on_retry: true,
        }
    }
}

impl RetryPolicy {
    pub const UNIVERSAL_CONTAINER: Container = Container::Mkv;

    /// Request as the given candidate should see it on attempt `attempt`
    ///
    /// Start/end pairs keep their order and meaning; only the unit may change
    /// for tools that cannot split on frames.
    pub fn adjust(
        &self,
        request: &ConvertRequest,
        candidate: &ToolCandidate,
        attempt: usize,
    ) -> Result<ConvertRequest, DomainError> {
        let mut adjusted = request.clone();

        if attempt > 0 && self.universal_container_on_retry && adjusted.options.container.is_none() {
            debug!(
                "Attempt {} with {}: forcing {:?} container",
                attempt + 1,
                candidate.id,
                Self::UNIVERSAL_CONTAINER
            );
            adjusted.options.container = Some(Self::UNIVERSAL_CONTAINER);
        }

        if adjusted.cuts.unit == CutUnit::Frames && !candidate.has(Capability::FrameSplit) {
            let fps = adjusted.options.frame_rate.ok_or_else(|| {
                DomainError::BadArgs(format!(
                    "{} needs a frame rate to convert frame cuts to seconds",
                    candidate.id
                ))
            })?;
            adjusted.cuts = adjusted.cuts.to_seconds(fps)?;
        }

        Ok(adjusted)
    }
}

/// Strict AND over every invocation of one attempt
pub fn aggregate(results: &[RunResult]) -> AggregateResult {
    AggregateResult {
        successes: results.iter().filter(|r| r.success).count(),
        total: results.len(),
    }
}

/// Segment counts for one attempt over a cut-list of `segments` points
///
/// A command bound to one segment counts once; a command without a segment
/// covers the whole cut-list and counts for every point in it.
pub fn aggregate_segments(results: &[RunResult], segments: usize) -> AggregateResult {
    let weight = |r: &RunResult| if r.segment.is_some() { 1 } else { segments.max(1) };
    AggregateResult {
        successes: results.iter().filter(|r| r.success).map(weight).sum(),
        total: results.iter().map(weight).sum(),
    }
}

/// First recorded failure reason, used when every segment failed
pub fn first_failure(results: &[RunResult]) -> Option<&str> {
    results
        .iter()
        .filter(|r| !r.success)
        .find_map(|r| r.failure.as_deref())
}

#[cfg(test)]
mod tests;
