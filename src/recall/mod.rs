/*
Recall graph
============

A recall is a duplicable unit of processing behavior bound to a point in the
routing tree. Templates are inert prototypes owned by a container; starting a
run duplicates each template into an instance carrying a concrete run identity
(`RecallId`), and the engine then drives every instance through the staged
lifecycle once per tick.

Nodes live in an arena (`RecallGraph`) and reference each other by
generational handles, so the parent/child/container links carry no reference
counts and cannot form ownership cycles. Structural mutation (unlinking a
finished instance) is never performed mid-traversal; it goes through the task
queue.
*/

pub mod context;
pub mod copy_pattern;
pub mod dependency;
pub mod id;
pub mod node;
pub mod providers;
pub mod stage;
pub mod state;

pub use context::RecyclingContext;
pub use copy_pattern::CopyPattern;
pub use dependency::{Orientation, RecallDependency};
pub use id::{RecallId, ScopeFlags};
pub use node::{RecallBehavior, RecallGraph, RecallHandle, RecallNode};
pub use stage::Stage;
pub use state::{RecallFlags, RecallState};
