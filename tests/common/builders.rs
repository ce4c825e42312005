use std::rc::Rc;
use std::time::Duration;

use annotation_locator::annotation::context::{AnnotationContext, TreeRegistry};
use annotation_locator::dom::dom_model::{ElementInfo, NodeId, Viewport};
use annotation_locator::dom::snapshot::SnapshotDom;
use annotation_locator::location::location_model::{
    AdditionalTargetData, LocationDescriptor, ReactTreeData, Rect,
};
use annotation_locator::virtualized::flattened_tree::FlattenedTree;
use annotation_locator::virtualized::tree::TreeEntity;

// =========================================================================
// Pages
// =========================================================================

/// A 1280x800 document with a full-size `<body>`.
pub struct Page {
    pub dom: Rc<SnapshotDom>,
    pub body: NodeId,
}

impl Page {
    pub fn new() -> Self {
        Self::with_viewport(Viewport::default())
    }

    pub fn with_viewport(viewport: Viewport) -> Self {
        let dom = Rc::new(SnapshotDom::new(viewport));
        let body = dom.append(
            None,
            ElementInfo::new("body"),
            Rect::new(0.0, 0.0, viewport.width, viewport.height),
        );
        Self { dom, body }
    }

    pub fn add(&self, parent: NodeId, tag: &str, attributes: &[(&str, &str)], rect: Rect) -> NodeId {
        let info = attributes
            .iter()
            .fold(ElementInfo::new(tag), |info, (name, value)| info.with_attribute(name, value));
        self.dom.append(Some(parent), info, rect)
    }

    pub fn context(&self) -> AnnotationContext {
        AnnotationContext::new(self.dom.clone())
    }
}

pub fn tree_location(selector: &str, key: &str, tree_id: Option<&str>) -> LocationDescriptor {
    LocationDescriptor::new(selector, 0.5, 0.5).with_target_data(AdditionalTargetData {
        react_tree: Some(ReactTreeData {
            key: Some(key.to_string()),
            tree_id: tree_id.map(str::to_string),
        }),
        ..AdditionalTargetData::default()
    })
}

// =========================================================================
// Virtualized tree
// =========================================================================

pub const TREE_ID: &str = "files";
pub const ROW_HEIGHT: f64 = 40.0;
pub const ROW_COUNT: usize = 5;

/// Outer container at (0, 100) sized 300x200 holding five recycled 40px
/// rows, and this logical tree (pre-order):
///
/// ```text
/// a
///   b
///     c
///       target
/// other
/// x
/// r3 .. r9
///   deep        (child of r9)
/// ```
pub struct TreeFixture {
    pub page: Page,
    pub outer: NodeId,
    pub rows: Vec<NodeId>,
    pub tree: Rc<FlattenedTree>,
    pub registry: Rc<TreeRegistry>,
}

impl TreeFixture {
    pub fn new(expanded: &[&str]) -> Self {
        let page = Page::new();
        let outer = page.add(page.body, "div", &[("class", "tree")], Rect::new(0.0, 100.0, 300.0, 200.0));
        let node_container = page.add(outer, "div", &[("class", "rows")], Rect::new(0.0, 100.0, 300.0, 200.0));
        let rows = (0..ROW_COUNT)
            .map(|i| {
                page.add(
                    node_container,
                    "div",
                    &[("class", "row")],
                    Rect::new(0.0, 100.0 + ROW_HEIGHT * i as f64, 300.0, ROW_HEIGHT),
                )
            })
            .collect();

        let tree = Rc::new(
            FlattenedTree::new(page.dom.clone(), outer, node_container, entities())
                .with_expanded(expanded.iter().copied())
                .with_expand_delay(Duration::from_millis(100)),
        );
        let registry = Rc::new(TreeRegistry::default());
        registry.add(TREE_ID, tree.clone());

        Self {
            page,
            outer,
            rows,
            tree,
            registry,
        }
    }

    pub fn context(&self) -> AnnotationContext {
        self.page.context().with_trees(self.registry.clone())
    }
}

fn entity(key: &str, level: u32, pos: &str) -> TreeEntity {
    TreeEntity {
        key: key.to_string(),
        level,
        pos: pos.to_string(),
    }
}

fn entities() -> Vec<TreeEntity> {
    let mut all = vec![
        entity("a", 0, "0"),
        entity("b", 1, "0-0"),
        entity("c", 2, "0-0-0"),
        entity("target", 3, "0-0-0-0"),
        entity("other", 0, "1"),
        entity("x", 0, "2"),
    ];
    for i in 3..=9 {
        all.push(entity(&format!("r{}", i), 0, &i.to_string()));
    }
    all.push(entity("deep", 1, "9-0"));
    all
}
