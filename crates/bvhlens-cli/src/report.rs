//! Text and JSON output.

use std::fmt::Write as _;

use bvhlens::bvhlens_raycast::RaySegment;
use bvhlens::bvhlens_tree::visibility::CellVisibility;
use bvhlens::bvhlens_tree::Highlight;
use bvhlens::{
    BatchSummary, CastSettings, CostModel, IntersectionInfo, LoadedBvh, NodeReport, Octree,
    RaycastError, Scene,
};
use serde::Serialize;

/// Overview of a scene.
pub fn scene_info(scene: &Scene) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} BVH(s), {} triangle(s)", scene.bvhs().len(), scene.triangles().len());
    for (i, bvh) in scene.bvhs().iter().enumerate() {
        out.push_str(&bvh_info(i, bvh));
    }
    match scene.octree() {
        Some(octree) => {
            let _ = writeln!(
                out,
                "Octree: {} node(s), {} leaf/leaves",
                octree.len(),
                octree.leaves().count()
            );
        }
        None => out.push_str("Octree: none\n"),
    }
    out
}

fn bvh_info(index: usize, bvh: &LoadedBvh) -> String {
    let s = bvh.summary();
    let region = bvh.caster().map_or("none", |c| c.region().kind());
    let mut out = String::new();
    let _ = writeln!(out, "BVH {index}:");
    let _ = writeln!(out, "  nodes      = {}", s.number_of_nodes);
    let _ = writeln!(out, "  leaves     = {}", s.number_of_leaves);
    let _ = writeln!(out, "  max level  = {}", s.max_level);
    let _ = writeln!(out, "  SAH cost   = {:.2}", s.sah_cost);
    let _ = writeln!(out, "  PAH cost   = {:.2}", s.pah_cost);
    let _ = writeln!(out, "  region     = {region}");
    for mismatch in bvh.mismatches() {
        let _ = writeln!(out, "  mismatch: {mismatch}");
    }
    out
}

/// A node and its children, one report line each.
pub fn highlight(h: &Highlight<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", NodeReport::new("Node", h.node));
    let _ = writeln!(out, "  primitives: {:?}", h.node.primitives);
    if let Some((left, right)) = h.children {
        for (label, child) in [("Left child", left), ("Right child", right)] {
            let _ = writeln!(out, "{}", NodeReport::new(label, child));
            let _ = writeln!(out, "  primitives: {:?}", child.primitives);
        }
    }
    out
}

/// Batch statistics, or "no data" when no ray hit the tree.
pub fn batch(summary: &Result<BatchSummary, RaycastError>) -> String {
    match summary {
        Ok(s) => format!(
            "{} ray(s) cast, {} hit the tree\n  count      = {}\n  count/ray  = {:.3}\n  \
             cost       = {:.3}\n  cost/ray   = {:.3}\n",
            s.rays_cast,
            s.total.rays,
            s.total.count,
            s.count_per_ray,
            s.total.cost,
            s.cost_per_ray
        ),
        Err(RaycastError::UndefinedAggregate { rays_cast }) => {
            format!("{rays_cast} ray(s) cast, none hit the tree\n  no data\n")
        }
        Err(e) => format!("{e}\n"),
    }
}

/// One line per ray.
pub fn ray_rows(rows: &[RayRow]) -> String {
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        let [x, y, z] = row.segment.start;
        let [ex, ey, ez] = row.segment.end;
        let _ = writeln!(
            out,
            "  ray {i:3}: ({x:.3}, {y:.3}, {z:.3}) -> ({ex:.3}, {ey:.3}, {ez:.3})  \
             count {} cost {:.3}",
            row.info.count, row.info.cost
        );
    }
    out
}

/// Per-cell octree display state.
pub fn octree_cells(octree: &Octree, cells: &[CellVisibility]) -> String {
    let mut out = String::new();
    for cell in cells {
        let depth = octree
            .find_node(cell.id)
            .ok()
            .and_then(|n| n.depth)
            .unwrap_or(0) as usize;
        let fill = match cell.filled {
            Some([r, g, b]) => format!("fill ({r:.3}, {g:.3}, {b:.3})"),
            None => "no fill".to_string(),
        };
        let wire = if cell.wireframe { "wireframe" } else { "hidden" };
        let _ = writeln!(out, "{:indent$}cell {}: {wire}, {fill}", "", cell.id, indent = depth * 2);
    }
    out
}

/// A traced ray for display.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RayRow {
    /// Drawable segment.
    pub segment: RaySegment,
    /// The ray's statistics.
    pub info: IntersectionInfo,
}

/// Machine-readable result of the `rays` command.
#[derive(Debug, Clone, Serialize)]
pub struct RaysReport {
    pub bvh: usize,
    pub region: &'static str,
    pub settings: CastSettings,
    pub costs: CostModel,
    pub summary: Option<BatchSummary>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rays: Option<Vec<RayRow>>,
}
