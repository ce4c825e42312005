use std::rc::Rc;

use annotation_locator::annotation::chart::{ChartHost, StaticChart};
use annotation_locator::annotation::context::ChartRegistry;
use annotation_locator::dom::dom_model::Dom;
use annotation_locator::identity::fingerprint::{compute_element_identifier, text_digest};
use annotation_locator::location::location_model::{
    AdditionalTargetData, ChartData, HighlightedTextConfig, MultimediaData, ReactTreeData,
};
use annotation_locator::{
    Annotation, AnnotationKind, LocationDescriptor, LocationError, LocationMatch, Point, Rect,
};

use crate::common::builders::{Page, tree_location};

mod common;

fn with_data(selector: &str, data: AdditionalTargetData) -> LocationDescriptor {
    LocationDescriptor::new(selector, 0.5, 0.5).with_target_data(data)
}

fn chart_location(chart_id: &str, series_id: &str, x: f64, y: f64) -> LocationDescriptor {
    with_data(
        "",
        AdditionalTargetData {
            chart: Some(ChartData {
                chart_id: chart_id.into(),
                series_id: series_id.into(),
                x,
                y,
            }),
            ..AdditionalTargetData::default()
        },
    )
}

fn media_location(selector: &str, time: f64) -> LocationDescriptor {
    with_data(
        selector,
        AdditionalTargetData {
            multimedia: Some(MultimediaData { current_time: time }),
            ..AdditionalTargetData::default()
        },
    )
}

/// Highlight from `start` to `end` (empty selectors fall back to
/// `.fallback` and to the start element respectively).
fn text_location(start: &str, end: &str, offsets: (usize, usize), text: &str) -> LocationDescriptor {
    with_data(
        ".fallback",
        AdditionalTargetData {
            highlighted_text_config: Some(HighlightedTextConfig {
                start_element_selector: start.into(),
                end_element_selector: end.into(),
                start_node_offset: offsets.0,
                end_node_offset: offsets.1,
                selected_text: text.into(),
                text_to_display: None,
            }),
            ..AdditionalTargetData::default()
        },
    )
}

// =========================================================================
// Variant selection
// =========================================================================

#[test]
fn kind_is_selected_from_target_data() {
    assert_eq!(AnnotationKind::of(&LocationDescriptor::new(".x", 0.0, 0.0)), AnnotationKind::PlainDom);
    assert_eq!(AnnotationKind::of(&tree_location(".x", "k", None)), AnnotationKind::VirtualizedTree);
    assert_eq!(AnnotationKind::of(&chart_location("c", "s", 0.0, 0.0)), AnnotationKind::Chart);
    assert_eq!(AnnotationKind::of(&media_location("video", 1.0)), AnnotationKind::Multimedia);
    assert_eq!(AnnotationKind::of(&text_location("", "", (0, 1), "t")), AnnotationKind::HighlightedText);

    let framed = media_location("video", 1.0).with_iframe_selectors(vec!["iframe".into()]);
    assert_eq!(AnnotationKind::of(&framed), AnnotationKind::Frame);
}

#[test]
fn descriptor_parses_camel_case_json() {
    let raw = r##"{
        "selector": "[data-key=\"n1\"]",
        "x": 0.25,
        "y": 1,
        "elementIdentifier": {"identifier": "abc", "version": 2},
        "additionalTargetData": {"reactTree": {"key": "n1", "treeId": "files"}},
        "iframeSelectors": ["#docs"]
    }"##;
    let location: LocationDescriptor = serde_json::from_str(raw).unwrap();
    assert_eq!(location.react_tree().and_then(|t| t.key.as_deref()), Some("n1"));
    assert_eq!(location.element_identifier.as_ref().map(|i| i.version), Some(2));
    assert_eq!(location.iframe_selectors, vec!["#docs".to_string()]);
    assert!(location.without_outer_frame().iframe_selectors.is_empty());
}

// =========================================================================
// Construction-time validation
// =========================================================================

#[test]
fn offsets_outside_unit_range_are_rejected() {
    let page = Page::new();
    let result = Annotation::new(LocationDescriptor::new(".x", 1.5, 0.5), &page.context());
    assert_eq!(
        result.err(),
        Some(LocationError::OffsetOutOfRange { axis: "x", value: 1.5 })
    );

    let result = Annotation::new(LocationDescriptor::new(".x", 0.5, f64::NAN), &page.context());
    assert!(matches!(result.err(), Some(LocationError::OffsetOutOfRange { axis: "y", .. })));
}

#[test]
fn tree_location_without_key_is_rejected() {
    let page = Page::new();
    let location = with_data(
        ".x",
        AdditionalTargetData {
            react_tree: Some(ReactTreeData {
                key: None,
                tree_id: Some("files".into()),
            }),
            ..AdditionalTargetData::default()
        },
    );
    assert_eq!(
        Annotation::new(location, &page.context()).err(),
        Some(LocationError::MissingTreeKey)
    );
}

#[test]
fn other_malformed_descriptors_are_rejected() {
    let page = Page::new();
    let ctx = page.context();

    let empty_selector = LocationDescriptor::new("  ", 0.5, 0.5);
    assert_eq!(
        Annotation::new(empty_selector, &ctx).err(),
        Some(LocationError::EmptySelector { kind: "dom" })
    );

    let empty_identifier = LocationDescriptor::new(".x", 0.5, 0.5).with_identifier("", 2);
    assert_eq!(
        Annotation::new(empty_identifier, &ctx).err(),
        Some(LocationError::EmptyIdentifier)
    );

    assert_eq!(
        Annotation::new(text_location("p", "", (0, 0), ""), &ctx).err(),
        Some(LocationError::EmptyHighlightedText)
    );

    assert_eq!(
        Annotation::new(chart_location("", "s", 1.0, 1.0), &ctx).err(),
        Some(LocationError::IncompleteChart { field: "chartId" })
    );
}

// =========================================================================
// Plain DOM classification
// =========================================================================

#[tokio::test]
async fn missing_target_without_tree_is_none() {
    let page = Page::new();
    let location = LocationDescriptor::new(".x", 0.5, 0.5).with_identifier("abc", 1);
    let annotation = Annotation::new(location, &page.context()).unwrap();

    assert_eq!(annotation.get_match_type().await, LocationMatch::None);
    assert_eq!(annotation.get_position().await, None);
    assert!(!annotation.is_outside_scroll().await);
}

#[tokio::test]
async fn unchanged_element_is_exact_and_changed_element_is_stale() {
    let page = Page::new();
    let card = page.add(page.body, "section", &[("id", "card")], Rect::default());
    let target = page.add(card, "button", &[("class", "save")], Rect::new(10.0, 10.0, 80.0, 30.0));
    let identifier = compute_element_identifier(&*page.dom, target).unwrap();

    let location = LocationDescriptor::new("#card .save", 0.5, 0.5)
        .with_identifier(identifier.identifier, identifier.version);
    let annotation = Annotation::new(location, &page.context()).unwrap();
    assert_eq!(annotation.get_match_type().await, LocationMatch::Exact);

    page.dom.set_attribute(target, "type", "submit");
    assert_eq!(annotation.get_match_type().await, LocationMatch::Stale);
    // Still found, so the pin keeps its position.
    assert!(annotation.get_position().await.is_some());
}

#[tokio::test]
async fn target_without_identifier_may_be_stale() {
    let page = Page::new();
    page.add(page.body, "div", &[("class", "x")], Rect::new(0.0, 0.0, 10.0, 10.0));
    let annotation = Annotation::new(LocationDescriptor::new(".x", 0.5, 0.5), &page.context()).unwrap();
    assert_eq!(annotation.get_match_type().await, LocationMatch::MaybeStale);
}

#[tokio::test]
async fn plain_scroll_to_brings_target_into_view() {
    let page = Page::new();
    let target = page.add(page.body, "div", &[("class", "x")], Rect::new(0.0, 2000.0, 10.0, 10.0));
    let annotation = Annotation::new(LocationDescriptor::new(".x", 0.5, 0.5), &page.context()).unwrap();

    annotation.scroll_to().await;
    assert_eq!(page.dom.scroll_requests(), vec![target]);

    let gone = Annotation::new(LocationDescriptor::new(".gone", 0.5, 0.5), &page.context()).unwrap();
    gone.scroll_to().await;
    assert_eq!(page.dom.scroll_requests().len(), 1);
}

// =========================================================================
// Chart
// =========================================================================

fn chart_page() -> (Page, Rc<StaticChart>, Rc<ChartRegistry>) {
    let page = Page::new();
    let container = page.add(page.body, "div", &[("class", "chart")], Rect::new(80.0, 80.0, 440.0, 340.0));
    let chart = Rc::new(
        StaticChart::new(container, Rect::new(100.0, 100.0, 400.0, 300.0))
            .with_point("revenue", 3.0, 7.0, Point::new(200.0, 150.0)),
    );
    let registry = Rc::new(ChartRegistry::default());
    registry.add("sales", chart.clone());
    (page, chart, registry)
}

#[tokio::test]
async fn chart_point_resolves_through_host() {
    let (page, _chart, registry) = chart_page();
    let ctx = page.context().with_charts(registry);
    let annotation = Annotation::new(chart_location("sales", "revenue", 3.0, 7.0), &ctx).unwrap();

    assert_eq!(annotation.kind(), AnnotationKind::Chart);
    assert_eq!(annotation.get_match_type().await, LocationMatch::Chart);
    let position = annotation.get_position().await.unwrap();
    assert_eq!(position.point(), Point::new(200.0, 150.0));
    assert!(position.visible);
    assert!(!annotation.is_outside_scroll().await);
}

#[tokio::test]
async fn chart_scrolled_away_is_outside_scroll() {
    let (page, chart, registry) = chart_page();
    let ctx = page.context().with_charts(registry);
    let annotation = Annotation::new(chart_location("sales", "revenue", 3.0, 7.0), &ctx).unwrap();

    chart.set_plot_area(Rect::new(100.0, -400.0, 400.0, 300.0));
    let position = annotation.get_position().await.unwrap();
    assert_eq!(position.point(), Point::new(200.0, -350.0));
    assert!(!position.visible);
    assert!(annotation.is_outside_scroll().await);

    let arrow = annotation.get_position_for_arrow(Point::new(640.0, 400.0)).await.unwrap();
    assert_eq!(arrow.point(), Point::new(200.0, 10.0));
    assert!(!arrow.within_scroll);

    annotation.scroll_to().await;
    assert_eq!(page.dom.scroll_requests(), vec![chart.container()]);
}

#[tokio::test]
async fn unknown_chart_point_is_none() {
    let (page, _chart, registry) = chart_page();
    let ctx = page.context().with_charts(registry);

    let wrong_series = Annotation::new(chart_location("sales", "costs", 3.0, 7.0), &ctx).unwrap();
    assert_eq!(wrong_series.get_match_type().await, LocationMatch::None);

    let wrong_chart = Annotation::new(chart_location("other", "revenue", 3.0, 7.0), &ctx).unwrap();
    assert_eq!(wrong_chart.get_match_type().await, LocationMatch::None);
    assert_eq!(wrong_chart.get_position().await, None);
}

// =========================================================================
// Multimedia
// =========================================================================

#[tokio::test]
async fn media_element_matches_and_seeks() {
    let page = Page::new();
    let video = page.add(page.body, "video", &[("id", "demo")], Rect::new(0.0, 0.0, 640.0, 360.0));
    page.dom.set_media_time(video, Some(0.0));
    let annotation = Annotation::new(media_location("#demo", 12.5), &page.context()).unwrap();

    assert_eq!(annotation.kind(), AnnotationKind::Multimedia);
    assert_eq!(annotation.get_match_type().await, LocationMatch::Multimedia);
    assert!(annotation.skip_media_to_annotated_time());
    assert_eq!(page.dom.media_current_time(video), Some(12.5));
}

#[tokio::test]
async fn non_media_target_is_stale_and_missing_is_none() {
    let page = Page::new();
    page.add(page.body, "div", &[("id", "demo")], Rect::new(0.0, 0.0, 640.0, 360.0));
    let annotation = Annotation::new(media_location("#demo", 3.0), &page.context()).unwrap();
    assert_eq!(annotation.get_match_type().await, LocationMatch::Stale);
    assert!(!annotation.skip_media_to_annotated_time());

    let missing = Annotation::new(media_location("#nope", 3.0), &page.context()).unwrap();
    assert_eq!(missing.get_match_type().await, LocationMatch::None);
    assert!(!missing.skip_media_to_annotated_time());
}

#[tokio::test]
async fn seeking_is_only_for_media_annotations() {
    let page = Page::new();
    let video = page.add(page.body, "video", &[("class", "x")], Rect::new(0.0, 0.0, 64.0, 36.0));
    page.dom.set_media_time(video, Some(4.0));
    let plain = Annotation::new(LocationDescriptor::new(".x", 0.5, 0.5), &page.context()).unwrap();
    assert!(!plain.skip_media_to_annotated_time());
    assert_eq!(page.dom.media_current_time(video), Some(4.0));
}

// =========================================================================
// Highlighted text
// =========================================================================

#[tokio::test]
async fn highlighted_text_matches_recorded_range() {
    let page = Page::new();
    let quote = page.add(page.body, "p", &[("class", "quote")], Rect::new(100.0, 200.0, 40.0, 20.0));
    page.dom.set_text(quote, "they said hello world twice");
    let annotation =
        Annotation::new(text_location("p.quote", "", (10, 21), "hello world"), &page.context()).unwrap();

    assert_eq!(annotation.kind(), AnnotationKind::HighlightedText);
    assert_eq!(annotation.get_match_type().await, LocationMatch::Exact);

    // No pointer-icon offset for text, even travelling down.
    let arrow = annotation.get_position_for_arrow(Point::new(0.0, 0.0)).await.unwrap();
    assert_eq!(arrow.point(), Point::new(120.0, 210.0));

    // Still present, but no longer where it was selected.
    page.dom.set_text(quote, "hello world, they said twice");
    assert_eq!(annotation.get_match_type().await, LocationMatch::None);

    // Shorter than the recorded end offset.
    page.dom.set_text(quote, "edited");
    assert_eq!(annotation.get_match_type().await, LocationMatch::None);
}

#[tokio::test]
async fn highlighted_range_spans_elements() {
    let page = Page::new();
    let block = page.add(page.body, "div", &[("class", "fallback")], Rect::new(0.0, 0.0, 10.0, 10.0));
    let inner = page.add(block, "span", &[], Rect::new(0.0, 0.0, 5.0, 5.0));
    page.dom.set_text(block, "the ");
    page.dom.set_text(inner, "needle");
    let annotation =
        Annotation::new(text_location("", "span", (0, 6), "the needle"), &page.context()).unwrap();
    assert_eq!(annotation.get_match_type().await, LocationMatch::Exact);

    page.dom.set_hidden(inner, true);
    assert_eq!(annotation.get_match_type().await, LocationMatch::None);

    page.dom.set_hidden(inner, false);
    page.dom.remove(inner);
    assert_eq!(annotation.get_match_type().await, LocationMatch::None);
}

#[tokio::test]
async fn highlighted_text_matches_salted_digest() {
    let page = Page::new();
    let quote = page.add(page.body, "p", &[("class", "quote")], Rect::new(0.0, 0.0, 40.0, 20.0));
    page.dom.set_text(quote, "a secret phrase");

    let stored = text_digest("k9", "secret");
    assert!(stored.starts_with("sha256:k9:"));
    let annotation = Annotation::new(text_location("p.quote", "", (2, 8), &stored), &page.context()).unwrap();
    assert_eq!(annotation.get_match_type().await, LocationMatch::Exact);

    let other = text_digest("k9", "public");
    let annotation = Annotation::new(text_location("p.quote", "", (2, 8), &other), &page.context()).unwrap();
    assert_eq!(annotation.get_match_type().await, LocationMatch::None);
}
