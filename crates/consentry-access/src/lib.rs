//! Consentry Access Control
//!
//! Who is calling, which surface they came in on, and what they may do
//! there. The pipeline is resolver, then authentication, then the
//! tenant guard: the resolver turns a Host header into a [`TenantScope`],
//! authentication produces a [`Caller`], and [`TenantGuard`] applies the
//! scope decision table plus the route's [`RoutePolicy`].

#![warn(missing_docs)]
#![allow(dead_code)]

pub mod caller;
pub mod guard;
pub mod permissions;
pub mod policy;
pub mod resolver;

pub use caller::Caller;
pub use guard::{AccessDecision, DenyReason, TenantGuard};
pub use permissions::{categories, Permission, PermissionSet, Role};
pub use policy::{PolicyTable, RoutePolicy};
pub use resolver::{ScopeResolver, TenantScope};
