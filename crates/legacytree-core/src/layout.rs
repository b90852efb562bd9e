//! Node-size tree layout over a pruned hierarchy.
//!
//! Every visible lineage node owns one horizontal slot. Children are packed
//! left to right by comparing subtree contours level by level, and each parent
//! is centered over its first and last visible child. An expanded node with an
//! attached spouse splits its slot between the two cards.
//!
//! The result is a pure function of the pruned tree and the config.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::collapse::PrunedTree;
use crate::error::TreeError;
use crate::hierarchy::NodeIdx;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Spacing constants. Separations are measured in slots (`node_width`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub level_height: f64,
    pub sibling_separation: f64,
    pub subtree_separation: f64,
    /// Distance from the slot center to each card of a couple.
    pub couple_offset: f64,
    pub card_width: f64,
    pub card_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 400.0,
            level_height: 220.0,
            sibling_separation: 1.0,
            subtree_separation: 2.0,
            couple_offset: 92.0,
            card_width: 160.0,
            card_height: 80.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), TreeError> {
        let positive = [
            ("nodeWidth", self.node_width),
            ("levelHeight", self.level_height),
            ("siblingSeparation", self.sibling_separation),
            ("cardWidth", self.card_width),
            ("cardHeight", self.card_height),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TreeError::Config(format!("{name} must be positive")));
            }
        }
        if !(self.subtree_separation >= self.sibling_separation) {
            return Err(TreeError::Config(
                "subtreeSeparation must be at least siblingSeparation".into(),
            ));
        }
        if self.couple_offset * 2.0 < self.card_width {
            return Err(TreeError::Config(
                "coupleOffset is too small: the two cards of a couple would overlap".into(),
            ));
        }
        if 2.0 * self.couple_offset + self.card_width > self.node_width * self.sibling_separation {
            return Err(TreeError::Config(
                "a couple is wider than one slot: raise nodeWidth or lower coupleOffset".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Lineage,
    Spouse,
}

/// One card to draw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedNode {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub kind: NodeKind,
    pub expanded: bool,
    /// Expanding or collapsing this node would change the picture.
    pub togglable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Lineage,
    Marriage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub points: [Position; 2],
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    pub nodes: Vec<PlacedNode>,
    pub edges: Vec<Edge>,
}

impl Layout {
    pub fn positions(&self) -> HashMap<&str, Position> {
        self.nodes
            .iter()
            .map(|n| (n.id.as_str(), Position::new(n.x, n.y)))
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<&PlacedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Extent of all cards, for fitting the view.
    pub fn bounds(&self, config: &LayoutConfig) -> Option<Bounds> {
        let first = self.nodes.first()?;
        let (hw, hh) = (config.card_width / 2.0, config.card_height / 2.0);
        let mut b = Bounds {
            min_x: first.x - hw,
            min_y: first.y - hh,
            max_x: first.x + hw,
            max_y: first.y + hh,
        };
        for n in &self.nodes[1..] {
            b.min_x = b.min_x.min(n.x - hw);
            b.min_y = b.min_y.min(n.y - hh);
            b.max_x = b.max_x.max(n.x + hw);
            b.max_y = b.max_y.max(n.y + hh);
        }
        Some(b)
    }
}

/// What the drawing side receives: nothing to draw, or a laid-out tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Scene {
    Empty,
    Drawn(Layout),
}

impl Scene {
    pub fn layout(&self) -> Option<&Layout> {
        match self {
            Scene::Empty => None,
            Scene::Drawn(l) => Some(l),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Scene::Empty)
    }
}

/// Left and right extents of a subtree per level, relative to its root.
struct Contour {
    left: Vec<f64>,
    right: Vec<f64>,
}

pub fn layout(pruned: &PrunedTree<'_, '_>, config: &LayoutConfig) -> Layout {
    let tree = pruned.hierarchy();
    let mut rel = vec![0.0; tree.len()];
    place(pruned, tree.root(), config, &mut rel);

    // Real roots sit on the top row; a virtual root is one level above it.
    let depth_shift = if tree.has_virtual_root() { 1.0 } else { 0.0 };
    let order = pruned.visible_nodes();
    let mut slot = vec![Position::default(); tree.len()];
    for &idx in &order {
        let node = tree.node(idx);
        let parent_x = node.parent.map(|p| slot[p].x).unwrap_or(0.0);
        slot[idx] = Position::new(
            parent_x + rel[idx] * config.node_width,
            (node.depth as f64 - depth_shift) * config.level_height,
        );
    }

    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for &idx in &order {
        let Some(person) = tree.node(idx).anchor.person() else {
            continue;
        };
        let at = slot[idx];
        let expanded = pruned.is_expanded(idx);
        let spouse = if expanded { tree.attached_spouse(idx) } else { None };

        match spouse {
            Some(spouse) => {
                let own_x = at.x + config.couple_offset;
                let spouse_x = at.x - config.couple_offset;
                nodes.push(PlacedNode {
                    id: person.id.clone(),
                    x: own_x,
                    y: at.y,
                    kind: NodeKind::Lineage,
                    expanded,
                    togglable: pruned.is_togglable(idx),
                    partner_id: Some(spouse.id.clone()),
                });
                nodes.push(PlacedNode {
                    id: spouse.id.clone(),
                    x: spouse_x,
                    y: at.y,
                    kind: NodeKind::Spouse,
                    expanded: false,
                    togglable: false,
                    partner_id: Some(person.id.clone()),
                });
                let half = config.card_width / 2.0;
                edges.push(Edge {
                    from: spouse.id.clone(),
                    to: person.id.clone(),
                    kind: EdgeKind::Marriage,
                    points: [
                        Position::new(spouse_x + half, at.y),
                        Position::new(own_x - half, at.y),
                    ],
                });
            }
            None => nodes.push(PlacedNode {
                id: person.id.clone(),
                x: at.x,
                y: at.y,
                kind: NodeKind::Lineage,
                expanded,
                togglable: pruned.is_togglable(idx),
                partner_id: None,
            }),
        }

        for &child in pruned.visible_children(idx) {
            if let Some(child_person) = tree.node(child).anchor.person() {
                edges.push(Edge {
                    from: person.id.clone(),
                    to: child_person.id.clone(),
                    kind: EdgeKind::Lineage,
                    points: [at, slot[child]],
                });
            }
        }
    }

    tracing::debug!(nodes = nodes.len(), edges = edges.len(), "laid out tree");
    Layout { nodes, edges }
}

/// Lay out the visible tree under `root`, writing each child's offset from
/// its parent (in slots) into `rel`. Children are packed before their parent
/// using an explicit stack, so depth is bounded only by memory.
fn place(pruned: &PrunedTree<'_, '_>, root: NodeIdx, config: &LayoutConfig, rel: &mut [f64]) {
    let mut contours: Vec<Option<Contour>> = (0..rel.len()).map(|_| None).collect();
    let mut stack = vec![(root, false)];
    while let Some((idx, packed)) = stack.pop() {
        let kids = pruned.visible_children(idx);
        if !packed {
            stack.push((idx, true));
            stack.extend(kids.iter().map(|&kid| (kid, false)));
            continue;
        }
        let subs = kids.iter().map(|&kid| contours[kid].take().unwrap_or_else(Contour::leaf));
        contours[idx] = Some(pack(kids, subs, config, rel));
    }
}

impl Contour {
    fn leaf() -> Self {
        Self {
            left: vec![0.0],
            right: vec![0.0],
        }
    }
}

/// Pack sibling subtrees left to right and center their parent over the
/// first and last of them.
fn pack(
    kids: &[NodeIdx],
    subs: impl Iterator<Item = Contour>,
    config: &LayoutConfig,
    rel: &mut [f64],
) -> Contour {
    if kids.is_empty() {
        return Contour::leaf();
    }

    let mut forest = Contour {
        left: Vec::new(),
        right: Vec::new(),
    };
    let mut offsets = Vec::with_capacity(kids.len());
    for (i, sub) in subs.enumerate() {
        let shift = if i == 0 {
            0.0
        } else {
            let levels = forest.right.len().min(sub.left.len());
            (0..levels)
                .map(|level| {
                    let gap = if level == 0 {
                        config.sibling_separation
                    } else {
                        config.subtree_separation
                    };
                    forest.right[level] + gap - sub.left[level]
                })
                .fold(f64::NEG_INFINITY, f64::max)
        };
        for level in 0..sub.left.len() {
            let (l, r) = (sub.left[level] + shift, sub.right[level] + shift);
            if level < forest.left.len() {
                forest.left[level] = forest.left[level].min(l);
                forest.right[level] = forest.right[level].max(r);
            } else {
                forest.left.push(l);
                forest.right.push(r);
            }
        }
        offsets.push(shift);
    }

    let mid = (offsets[0] + offsets[offsets.len() - 1]) / 2.0;
    for (&kid, off) in kids.iter().zip(&offsets) {
        rel[kid] = off - mid;
    }

    let mut contour = Contour::leaf();
    contour.left.extend(forest.left.iter().map(|x| x - mid));
    contour.right.extend(forest.right.iter().map(|x| x - mid));
    contour
}
