//! Data types shared by the `qgis-sync` crate.
//!
//! There are two independent layer trees in a QGIS backed map editor:
//!
//! * the [QGIS project tree](qgis) as published by QGIS Server. It is fetched once per project
//!   snapshot and never mutated on the client;
//! * the [application layer tree](layer_tree) that the user edits: toggles visibility, drags
//!   layers around, renames them.
//!
//! The two are joined either by the persisted QGIS id of a leaf or, for legacy nodes, by the
//! layer name.

pub mod color;
pub mod error;
pub mod geometry_type;
pub mod layer_tree;
pub mod qgis;

pub use color::Color;
pub use error::LayerTreeError;
pub use geometry_type::{GeometryType, PaintFamily};
pub use layer_tree::{LayerTree, LayerTreeNode, LeafKind, LeafView};
pub use qgis::{
    qgis_opacity_to_unit, LayerKind, ProjectTree, QgisGroup, QgisLayer, QgisLayerNode,
};
