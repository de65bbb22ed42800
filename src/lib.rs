//! t1edge: operator tooling for NSX Tier-1 gateways.
//!
//! Lists Tier-1 gateways with their protection flags, locale-service edge
//! cluster bindings and NAT presence, lists edge clusters of an enforcement
//! point, and attaches or detaches the edge cluster bound to a gateway's
//! locale service.

pub mod cli;
pub mod client;
pub mod config;
pub mod policy;
