use std::fmt::Write as _;

use serde::Serialize;
use tokio::task::LocalSet;
use tracing::{debug, info};

use crate::annotation::annotation::{Annotation, AnnotationKind};
use crate::cli::config::{AppConfig, resolve_arrow_settings};
use crate::cli::page::{load_location, load_page};
use crate::dom::dom_model::Dom;
use crate::dom::snapshot::SnapshotDom;
use crate::identity::fingerprint::{FingerprintVersion, fingerprint};
use crate::location::location_model::{
    ArrowPosition, ElementIdentifier, LocationMatch, Point, ResolvedPosition,
};
use crate::position::arrow::{ArrowRoute, ArrowRouter};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::ResolutionEvent;

// ============================================================================
// resolve subcommand
// ============================================================================

/// Everything one resolution pass found out about a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveReport {
    pub kind: AnnotationKind,
    pub match_type: LocationMatch,
    pub position: Option<ResolvedPosition>,
    pub outside_scroll: bool,
    pub arrow_from: Point,
    pub arrow: Option<ArrowPosition>,
    pub route: Option<ArrowRoute>,
}

/// Resolve a location against a page snapshot and print the report.
pub async fn cmd_resolve(
    page_path: &str,
    location_path: &str,
    from: (Option<f64>, Option<f64>),
    format: &str,
    trace: Option<&str>,
    right_boundary: Option<f64>,
    config: &AppConfig,
) -> Result<ResolveReport, Box<dyn std::error::Error>> {
    // Frame relays pump their messages on local tasks.
    LocalSet::new()
        .run_until(resolve(
            page_path,
            location_path,
            from,
            format,
            trace,
            right_boundary,
            config,
        ))
        .await
}

async fn resolve(
    page_path: &str,
    location_path: &str,
    from: (Option<f64>, Option<f64>),
    format: &str,
    trace: Option<&str>,
    right_boundary: Option<f64>,
    config: &AppConfig,
) -> Result<ResolveReport, Box<dyn std::error::Error>> {
    let arrow_settings = resolve_arrow_settings(config, right_boundary);
    let page = load_page(page_path)?.into_page(arrow_settings, config)?;
    let location = load_location(location_path)?;

    let viewport = page.dom.viewport();
    let arrow_from = Point::new(
        from.0.unwrap_or(viewport.width / 2.0),
        from.1.unwrap_or(viewport.height / 2.0),
    );

    let annotation = Annotation::new(location, &page.context)?;
    info!(kind = %annotation.kind(), selector = %annotation.location().selector, "resolving");

    let match_type = annotation.get_match_type().await;
    let position = annotation.get_position().await;
    let outside_scroll = annotation.is_outside_scroll().await;
    let arrow = annotation.get_position_for_arrow(arrow_from).await;
    let route = arrow.map(|a| ArrowRouter::new(arrow_settings).route(arrow_from, a));
    debug!(?match_type, ?position, ?arrow, "resolution finished");

    let report = ResolveReport {
        kind: annotation.kind(),
        match_type,
        position,
        outside_scroll,
        arrow_from,
        arrow,
        route,
    };

    if let Some(path) = trace {
        let logger = TraceLogger::new(path);
        logger.log(
            &ResolutionEvent::now(report.kind, &annotation.location().selector)
                .with_match_type(report.match_type)
                .with_position(report.position)
                .with_outside_scroll(report.outside_scroll)
                .with_arrow(report.arrow, report.route)
                .with_note(format!("page={}", page_path)),
        );
    }

    let output = match format {
        "json" => serde_json::to_string_pretty(&report)?,
        _ => format_console_report(&report),
    };
    println!("{}", output);

    Ok(report)
}

pub fn format_console_report(report: &ResolveReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "kind:           {}", report.kind);
    let _ = writeln!(out, "match:          {:?}", report.match_type);
    match &report.position {
        Some(p) => {
            let _ = writeln!(
                out,
                "position:       ({:.1}, {:.1}) {}",
                p.x_vs_viewport,
                p.y_vs_viewport,
                if p.visible { "visible" } else { "not visible" }
            );
        }
        None => {
            let _ = writeln!(out, "position:       unavailable");
        }
    }
    let _ = writeln!(out, "outside scroll: {}", report.outside_scroll);
    match &report.route {
        Some(route) => {
            let _ = write!(
                out,
                "arrow:          ({:.1}, {:.1}) -> ({:.1}, {:.1}) {:?}{}",
                route.from.x,
                route.from.y,
                route.to.x,
                route.to.y,
                route.direction,
                if route.within_scroll { "" } else { " (edge)" }
            );
        }
        None => {
            let _ = write!(out, "arrow:          none");
        }
    }
    out
}

// ============================================================================
// fingerprint subcommand
// ============================================================================

/// Print the element identifier of the first element matching `selector`.
pub fn cmd_fingerprint(
    page_path: &str,
    selector: &str,
    version: Option<u32>,
) -> Result<ElementIdentifier, Box<dyn std::error::Error>> {
    let page = load_page(page_path)?;
    let dom = SnapshotDom::from_snapshot(page.document)?;

    let version = match version {
        Some(number) => FingerprintVersion::from_number(number)
            .ok_or_else(|| format!("unknown fingerprint version {}", number))?,
        None => FingerprintVersion::CURRENT,
    };
    let node = dom
        .query_selector(selector)
        .ok_or_else(|| format!("no element matches {:?}", selector))?;
    let identifier = fingerprint(&dom, node, version)
        .ok_or_else(|| format!("element {} has no fingerprint", node))?;

    let identifier = ElementIdentifier {
        identifier,
        version: version.number(),
    };
    println!("{}", serde_json::to_string(&identifier)?);
    Ok(identifier)
}
