use std::rc::{Rc, Weak};

use tracing::debug;

use crate::annotation::context::AnnotationContext;
use crate::dom::dom_model::{Dom, NodeId};
use crate::error::LocationError;
use crate::identity::matcher::match_element_identity;
use crate::location::location_model::{
    ArrowPosition, LocationDescriptor, LocationMatch, Point, ResolvedPosition,
};
use crate::position::arrow::ArrowRouter;
use crate::position::resolver::{TargetGeometry, resolve_target_position};
use crate::virtualized::tree::{NodePositionVsScroll, VirtualizedTree};

/// Virtualization key plus a weak handle on the tree that renders it.
struct TreeHandle {
    key: String,
    container: Option<Weak<dyn VirtualizedTree>>,
}

impl TreeHandle {
    fn container(&self) -> Option<Rc<dyn VirtualizedTree>> {
        self.container.as_ref()?.upgrade()
    }
}

/// Outcome of looking the target up on the live page.
pub(crate) enum Located {
    /// Cannot be shown right now and there is nothing to anchor to.
    Unavailable,
    /// Logically present in a virtualized container but not rendered.
    NotRendered,
    Target(TargetGeometry),
}

/// Resolver for plain DOM targets and for rows of a virtualized tree.
pub struct DomAnnotation {
    location: LocationDescriptor,
    dom: Rc<dyn Dom>,
    tree: Option<TreeHandle>,
    router: ArrowRouter,
}

impl DomAnnotation {
    pub fn new(location: LocationDescriptor, ctx: &AnnotationContext) -> Result<Self, LocationError> {
        location.validate()?;

        let tree = match location.react_tree() {
            Some(data) => {
                let key = data
                    .key
                    .clone()
                    .filter(|k| !k.is_empty())
                    .ok_or(LocationError::MissingTreeKey)?;
                let container = data.tree_id.as_deref().and_then(|id| ctx.trees.get(id));
                Some(TreeHandle { key, container })
            }
            None if location.selector.trim().is_empty() => {
                return Err(LocationError::EmptySelector { kind: "dom" });
            }
            None => None,
        };

        Ok(Self {
            location,
            dom: ctx.dom.clone(),
            tree,
            router: ArrowRouter::new(ctx.arrow),
        })
    }

    pub fn location(&self) -> &LocationDescriptor {
        &self.location
    }

    pub(crate) fn locate(&self) -> Located {
        let Some(tree) = &self.tree else {
            return match self.dom.query_selector(&self.location.selector) {
                Some(target) => Located::Target(self.geometry(target)),
                None => Located::Unavailable,
            };
        };

        let container = tree.container();
        if let Some(container) = &container {
            if !container.is_visible() || !container.is_node_in_tree(&tree.key) {
                return Located::Unavailable;
            }
        }

        let target = container
            .as_ref()
            .and_then(|c| c.get_visible_tree_node(&tree.key))
            .or_else(|| self.selector_fallback(&tree.key));

        match (target, container) {
            (Some(target), _) => Located::Target(self.geometry(target)),
            (None, Some(_)) => Located::NotRendered,
            (None, None) => Located::Unavailable,
        }
    }

    /// Selectors are not unique, so inside a virtualized list one is only
    /// trusted when it names the row's key.
    fn selector_fallback(&self, key: &str) -> Option<NodeId> {
        let selector = &self.location.selector;
        if selector.is_empty() || !selector.contains(key) {
            return None;
        }
        self.dom.query_selector(selector)
    }

    fn geometry(&self, target: NodeId) -> TargetGeometry {
        resolve_target_position(
            self.dom.as_ref(),
            target,
            self.location.x,
            self.location.y,
            self.router.settings.right_boundary,
        )
    }

    pub async fn get_position(&self) -> Option<ResolvedPosition> {
        match self.locate() {
            Located::Unavailable => None,
            Located::NotRendered => Some(ResolvedPosition::not_rendered()),
            Located::Target(geometry) => Some(geometry.position),
        }
    }

    pub async fn get_match_type(&self) -> LocationMatch {
        if let Located::Target(geometry) = self.locate() {
            let Some(target) = geometry.position.target else {
                return LocationMatch::None;
            };
            let stored = self.location.element_identifier.as_ref();
            return match_element_identity(
                self.dom.as_ref(),
                target,
                stored.map(|id| id.identifier.as_str()),
                stored.map(|id| id.version),
            )
            .map(LocationMatch::from)
            .unwrap_or(LocationMatch::MaybeStale);
        }

        match &self.tree {
            None => LocationMatch::None,
            Some(tree) if tree.container().is_some() => {
                LocationMatch::OutsideAccessibleVirtualisedList
            }
            Some(_) => LocationMatch::OutsideInaccessibleVirtualisedList,
        }
    }

    pub async fn is_outside_scroll(&self) -> bool {
        self.get_match_type().await == LocationMatch::OutsideAccessibleVirtualisedList
    }

    pub async fn scroll_to(&self) {
        match &self.tree {
            Some(tree) => {
                if let Some(container) = tree.container() {
                    container.scroll_to_key(&tree.key).await;
                }
            }
            None => {
                if let Located::Target(geometry) = self.locate() {
                    if let Some(target) = geometry.position.target {
                        self.dom.scroll_into_view(target);
                    }
                }
            }
        }
    }

    pub async fn get_position_for_arrow(&self, from: Point) -> Option<ArrowPosition> {
        let geometry = match self.locate() {
            Located::Unavailable => return None,
            Located::NotRendered => None,
            Located::Target(geometry) => Some(geometry),
        };

        if let Some(geometry) = &geometry {
            if geometry.position.visible {
                let to = self
                    .router
                    .adjust_for_pointer_icon(from, geometry.position.point(), false);
                return Some(ArrowPosition::new(to, true));
            }
        }

        match (&self.tree, geometry) {
            (Some(tree), _) => self.arrow_via_collapsed_ancestor(tree),
            (None, Some(geometry)) => Some(self.router.clamp_out_of_view(
                geometry.position.point(),
                self.dom.viewport(),
                geometry.scroll_container,
            )),
            (None, None) => None,
        }
    }

    /// Anchor for a row hidden inside a collapsed branch: the outermost
    /// collapsed ancestor if it is on screen, otherwise the edge of the
    /// container it is scrolled past.
    fn arrow_via_collapsed_ancestor(&self, tree: &TreeHandle) -> Option<ArrowPosition> {
        let container = tree.container()?;
        let ancestors = container.get_ancestors(&tree.key)?;
        let Some(collapsed) = ancestors
            .iter()
            .find(|ancestor| !container.is_node_expanded(&ancestor.key))
        else {
            debug!(key = %tree.key, "all ancestors expanded; no arrow anchor");
            return None;
        };

        if let Some(node) = container.get_visible_tree_node(&collapsed.key) {
            let center = self.dom.bounding_client_rect(node).center();
            return Some(ArrowPosition::new(center, true));
        }

        let outer = self.dom.bounding_client_rect(container.outer_container());
        let x = outer.center().x;
        match container.get_node_position_vs_scroll(&collapsed.key) {
            NodePositionVsScroll::Above => Some(ArrowPosition::new(Point::new(x, outer.top()), false)),
            NodePositionVsScroll::Below => Some(ArrowPosition::new(Point::new(x, outer.bottom()), false)),
            NodePositionVsScroll::Within | NodePositionVsScroll::NotPresent => None,
        }
    }
}

/// Arrow for a single resolved element: straight at the pin when it is on
/// screen, else clamped to the nearest visible edge.
pub(crate) fn direct_arrow(
    router: &ArrowRouter,
    dom: &dyn Dom,
    from: Point,
    geometry: &TargetGeometry,
    highlighted_text: bool,
) -> ArrowPosition {
    let point = geometry.position.point();
    if geometry.position.visible {
        let to = router.adjust_for_pointer_icon(from, point, highlighted_text);
        return ArrowPosition::new(to, true);
    }
    router.clamp_out_of_view(point, dom.viewport(), geometry.scroll_container)
}
