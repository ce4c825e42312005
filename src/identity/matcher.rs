use tracing::debug;

use crate::dom::dom_model::{Dom, NodeId};
use crate::identity::fingerprint::{FingerprintVersion, fingerprint};
use crate::location::location_model::LocationMatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityVerdict {
    Exact,
    Stale,
}

impl From<IdentityVerdict> for LocationMatch {
    fn from(verdict: IdentityVerdict) -> Self {
        match verdict {
            IdentityVerdict::Exact => LocationMatch::Exact,
            IdentityVerdict::Stale => LocationMatch::Stale,
        }
    }
}

/// Decide whether `candidate` is the element the stored identifier was
/// captured from.
///
/// Returns `None` when nothing was stored; what an unverifiable match means
/// is up to the caller. The fingerprint is recomputed with the algorithm
/// version the identifier was captured with. Versions this build does not
/// know can never verify.
pub fn match_element_identity(
    dom: &dyn Dom,
    candidate: NodeId,
    stored_identifier: Option<&str>,
    stored_version: Option<u32>,
) -> Option<IdentityVerdict> {
    let (stored, version) = (stored_identifier?, stored_version?);

    let Some(version) = FingerprintVersion::from_number(version) else {
        debug!(version, "unknown element identifier version");
        return Some(IdentityVerdict::Stale);
    };

    match fingerprint(dom, candidate, version) {
        Some(current) if current == stored => Some(IdentityVerdict::Exact),
        _ => Some(IdentityVerdict::Stale),
    }
}
