use std::collections::HashSet;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::annotation::chart::{ChartPoint, StaticChart};
use crate::annotation::context::{AnnotationContext, ChartRegistry, TreeRegistry};
use crate::annotation::frame::FrameTable;
use crate::cli::config::AppConfig;
use crate::dom::dom_model::{Dom, NodeId};
use crate::dom::snapshot::{DocumentSnapshot, SnapshotDom};
use crate::error::SnapshotError;
use crate::location::location_model::{LocationDescriptor, Rect};
use crate::position::arrow::ArrowSettings;
use crate::relay::handlers::register_frame_handlers;
use crate::relay::protocol::FrameId;
use crate::relay::rpc::{FrameRelay, LocalBus};
use crate::scheduler::arrow_layer::ArrowLayer;
use crate::virtualized::flattened_tree::FlattenedTree;
use crate::virtualized::tree::TreeEntity;

/// A virtualized tree as captured in a page snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub id: String,
    pub outer_container: NodeId,
    pub node_container: NodeId,
    pub entities: Vec<TreeEntity>,
    #[serde(default)]
    pub expanded: Vec<String>,
    #[serde(default)]
    pub rendered_start: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSnapshot {
    pub id: String,
    pub container: NodeId,
    pub plot_area: Rect,
    /// Point positions in viewport coordinates.
    #[serde(default)]
    pub points: Vec<ChartPoint>,
}

/// An iframe and the document loaded into it. Cross-origin frames are only
/// reachable over the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub id: String,
    pub iframe: NodeId,
    #[serde(default)]
    pub cross_origin: bool,
    pub page: PageSnapshot,
}

/// Everything the CLI knows about a page: the document plus the
/// virtualized trees, charts and frames rendered in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(flatten)]
    pub document: DocumentSnapshot,
    #[serde(default)]
    pub trees: Vec<TreeSnapshot>,
    #[serde(default)]
    pub charts: Vec<ChartSnapshot>,
    #[serde(default)]
    pub frames: Vec<FrameSnapshot>,
}

/// Window id of the page the CLI resolves against.
pub const TOP_WINDOW: &str = "top";

/// A page snapshot brought to life.
pub struct LoadedPage {
    pub dom: Rc<SnapshotDom>,
    pub context: AnnotationContext,
    // The context only holds the relays weakly.
    _relays: Vec<Rc<FrameRelay>>,
    _frames: Vec<LoadedPage>,
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, SnapshotError> {
    let content = std::fs::read_to_string(path).map_err(|source| SnapshotError::Read {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
        context: path.to_string(),
        source,
    })
}

pub fn load_page(path: &str) -> Result<PageSnapshot, SnapshotError> {
    read_json(path)
}

pub fn load_location(path: &str) -> Result<LocationDescriptor, SnapshotError> {
    read_json(path)
}

impl PageSnapshot {
    /// Build the live page. Cross-origin frames get their own relay on an
    /// in-process bus, so this must run inside a `tokio::task::LocalSet`
    /// when the snapshot has any.
    pub fn into_page(self, arrow: ArrowSettings, config: &AppConfig) -> Result<LoadedPage, SnapshotError> {
        let bus = LocalBus::new(&config.relay);
        let mut seen = HashSet::new();
        self.load(&FrameId::new(TOP_WINDOW), arrow, config, &bus, &mut seen)
    }

    fn load(
        self,
        window: &FrameId,
        arrow: ArrowSettings,
        config: &AppConfig,
        bus: &Rc<LocalBus>,
        seen: &mut HashSet<String>,
    ) -> Result<LoadedPage, SnapshotError> {
        let dom = Rc::new(SnapshotDom::from_snapshot(self.document)?);
        let as_dom: Rc<dyn Dom> = dom.clone();

        let trees = Rc::new(TreeRegistry::default());
        for tree in self.trees {
            for node in [tree.outer_container, tree.node_container] {
                if dom.element(node).is_none() {
                    return Err(SnapshotError::UnknownElement {
                        owner: format!("tree {}", tree.id),
                        node: node.0,
                    });
                }
            }
            let flattened = FlattenedTree::new(
                as_dom.clone(),
                tree.outer_container,
                tree.node_container,
                tree.entities,
            )
            .with_expanded(tree.expanded)
            .with_expand_delay(config.tree.expand_delay());
            flattened.set_rendered_start(tree.rendered_start);
            trees.add(tree.id, Rc::new(flattened));
        }

        let charts = Rc::new(ChartRegistry::default());
        for chart in self.charts {
            if dom.element(chart.container).is_none() {
                return Err(SnapshotError::UnknownElement {
                    owner: format!("chart {}", chart.id),
                    node: chart.container.0,
                });
            }
            let host = chart
                .points
                .into_iter()
                .fold(StaticChart::new(chart.container, chart.plot_area), |host, p| {
                    host.with_point(&p.series_id, p.x, p.y, p.position)
                });
            charts.add(chart.id, Rc::new(host));
        }

        let mut context = AnnotationContext::new(as_dom)
            .with_trees(trees)
            .with_charts(charts)
            .with_arrow_settings(arrow);

        let mut relays = Vec::new();
        let mut frames = Vec::new();
        if !self.frames.is_empty() {
            let table = Rc::new(FrameTable::new());
            for frame in self.frames {
                if dom.element(frame.iframe).is_none() {
                    return Err(SnapshotError::UnknownElement {
                        owner: format!("frame {}", frame.id),
                        node: frame.iframe.0,
                    });
                }
                if frame.id == TOP_WINDOW || !seen.insert(frame.id.clone()) {
                    return Err(SnapshotError::DuplicateFrame(frame.id));
                }
                let id = FrameId::new(frame.id);
                let child_arrow = ArrowSettings {
                    right_boundary: None,
                    ..arrow
                };
                let child = frame.page.load(&id, child_arrow, config, bus, seen)?;
                if frame.cross_origin {
                    let child_relay = bus.join(&id);
                    register_frame_handlers(&child_relay, child.context.clone(), Rc::new(ArrowLayer::new()));
                    table.add_cross_origin(frame.iframe, id);
                    relays.push(child_relay);
                } else {
                    table.add_same_origin(frame.iframe, id, child.dom.clone());
                }
                frames.push(child);
            }
            context = context.with_frames(table);
            if !relays.is_empty() {
                let own = bus.join(window);
                context = context.with_relay(&own);
                relays.push(own);
            }
        }

        Ok(LoadedPage {
            dom,
            context,
            _relays: relays,
            _frames: frames,
        })
    }
}
