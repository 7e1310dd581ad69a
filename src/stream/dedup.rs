// Copyright 2026 The Lumi Project
// SPDX-License-Identifier: Apache-2.0

// Citation deduplication.

use crate::frame::Source;

/// Whether `candidate` should be appended to `existing`.
///
/// Returns false iff some existing source carries the same
/// `(url, title)` pair. Both fields are optional and compared by value:
/// a candidate with both absent only collides with an existing source
/// that also has both absent. Linear scan — citation lists per answer
/// are tens of entries, not thousands.
pub fn should_append(existing: &[Source], candidate: &Source) -> bool {
    !existing.iter().any(|s| s.same_citation(candidate))
}
