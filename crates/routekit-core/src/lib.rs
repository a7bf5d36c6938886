//! # RouteKit Core
//!
//! Geometry primitives and shared plumbing for the RouteKit toolpath
//! pipeline: the 2D point and path model with depth profiles, the polygon
//! boolean/offset primitive wrapper, the offset containment tree, and the
//! application event bus used to drive reprocessing.

pub mod clip;
pub mod error;
pub mod event_bus;
pub mod geom;
pub mod path;
pub mod path_tree;

pub use clip::Loop;
pub use error::{GeometryError, GeometryResult};
pub use event_bus::{
    AppEvent, DocumentEvent, EventBus, EventCategory, EventFilter, MachineEvent, SubscriptionId,
};
pub use geom::Point;
pub use path::{Path, TAG_TABS};
pub use path_tree::PathTree;
