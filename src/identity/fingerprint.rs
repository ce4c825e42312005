use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::dom::dom_model::{Dom, ElementInfo, NodeId};
use crate::location::location_model::ElementIdentifier;

/// How many ancestors contribute to a fingerprint.
const ANCESTOR_DEPTH: usize = 3;

/// Attributes that host apps set specifically to keep elements targetable.
const STABLE_ATTRIBUTES: &[&str] = &[
    "data-cord-annotation-target",
    "data-qa",
    "data-test-id",
    "data-cy",
    "data-testid",
    "role",
    "name",
    "type",
];

/// Class fragments that flip with interaction state.
const VOLATILE_CLASS_FRAGMENTS: &[&str] = &["select", "hover", "focus", "active", "--"];

/// Fingerprinting algorithms. Every version ever shipped stays selectable so
/// stored identifiers keep verifying after an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintVersion {
    /// Tag, id and classes of the element and its nearest ancestors.
    V1,
    /// Interaction-state classes dropped; stable attributes and
    /// same-tag sibling position added.
    V2,
}

impl FingerprintVersion {
    pub const CURRENT: FingerprintVersion = FingerprintVersion::V2;

    pub fn from_number(version: u32) -> Option<Self> {
        match version {
            1 => Some(FingerprintVersion::V1),
            2 => Some(FingerprintVersion::V2),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            FingerprintVersion::V1 => 1,
            FingerprintVersion::V2 => 2,
        }
    }
}

/// Structural fingerprint of `node`, or `None` if the node is gone.
pub fn fingerprint(dom: &dyn Dom, node: NodeId, version: FingerprintVersion) -> Option<String> {
    let info = dom.element(node)?;

    let mut segments = vec![match version {
        FingerprintVersion::V1 => describe_v1(&info),
        FingerprintVersion::V2 => describe_v2(dom, node, &info),
    }];

    let mut current = dom.parent(node);
    while let Some(parent) = current {
        if segments.len() > ANCESTOR_DEPTH {
            break;
        }
        let Some(parent_info) = dom.element(parent) else {
            break;
        };
        segments.push(match version {
            FingerprintVersion::V1 => describe_v1(&parent_info),
            FingerprintVersion::V2 => describe_ancestor_v2(&parent_info),
        });
        current = dom.parent(parent);
    }

    segments.reverse();
    Some(hash(&segments.join(" > ")))
}

/// Identifier for `node` at the current algorithm version.
pub fn compute_element_identifier(dom: &dyn Dom, node: NodeId) -> Option<ElementIdentifier> {
    let version = FingerprintVersion::CURRENT;
    fingerprint(dom, node, version).map(|identifier| ElementIdentifier {
        identifier,
        version: version.number(),
    })
}

fn describe_v1(info: &ElementInfo) -> String {
    let mut out = info.tag.clone();
    if let Some(id) = info.id() {
        out.push('#');
        out.push_str(id);
    }
    let mut classes: Vec<_> = info.classes().collect();
    classes.sort_unstable();
    for class in classes {
        out.push('.');
        out.push_str(class);
    }
    out
}

fn describe_v2(dom: &dyn Dom, node: NodeId, info: &ElementInfo) -> String {
    let mut out = describe_ancestor_v2(info);

    let mut classes: Vec<_> = info
        .classes()
        .filter(|class| {
            !VOLATILE_CLASS_FRAGMENTS
                .iter()
                .any(|fragment| class.contains(fragment))
        })
        .collect();
    classes.sort_unstable();
    for class in classes {
        out.push('.');
        out.push_str(class);
    }

    if let Some(index) = same_tag_index(dom, node, &info.tag) {
        out.push_str(&format!(":{}", index));
    }
    out
}

fn describe_ancestor_v2(info: &ElementInfo) -> String {
    let mut out = info.tag.clone();
    if let Some(id) = info.id() {
        out.push('#');
        out.push_str(id);
    }
    for name in STABLE_ATTRIBUTES {
        if let Some(value) = info.attribute(name) {
            out.push_str(&format!("[{}={}]", name, value));
        }
    }
    out
}

/// 1-based position among siblings sharing `tag`.
fn same_tag_index(dom: &dyn Dom, node: NodeId, tag: &str) -> Option<usize> {
    let parent = dom.parent(node)?;
    dom.children(parent)
        .into_iter()
        .filter(|sibling| dom.element(*sibling).is_some_and(|s| s.tag == tag))
        .position(|sibling| sibling == node)
        .map(|i| i + 1)
}

/// Salted digest stored in place of captured text: `sha256:<salt>:<hex>`,
/// where the hex digest covers `<salt>:<text>`.
pub fn text_digest(salt: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", salt, text).as_bytes());
    format!("sha256:{}:{:x}", salt, hasher.finalize())
}

/// Whether `stored` is a [`text_digest`] of `text`.
pub fn matches_text_digest(text: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("sha256"), Some(salt), Some(_)) => text_digest(salt, text) == stored,
        _ => false,
    }
}

fn hash(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
