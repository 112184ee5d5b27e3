//! Shared types for the hookbridge lifecycle-hook bridge.
//!
//! These types are shared between `hookbridge-hooks` (which loads, matches,
//! and executes hooks) and any host runtime that dispatches events through
//! the [`HookDispatch`] trait.

pub mod decision;
pub mod hooks;

pub use decision::{Decision, ExecutionFault, HookInvocationResult};
pub use hooks::{
    HookDefinition, HookDispatch, HookEvent, HookMatcherGroup, HookType, HooksConfig,
    SharedHookDispatcher, UnknownHookEvent,
};
