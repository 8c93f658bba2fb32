//! A local code-intelligence engine: parse, chunk, and hybrid-search a
//! codebase over a JSON-RPC tool protocol.
//!
//! [`domain`] defines the shared data model and error taxonomy; every other
//! module builds on it. [`chunking`] turns source files into [`domain::types::Chunk`]s,
//! [`store`] and [`index`] persist them alongside their vectors, [`search`]
//! ranks across both, [`embedding`] produces the vectors, [`tasks`] tracks
//! long-running work, [`rpc`] speaks the wire protocol, [`server`] wires it
//! all into a running process, and [`config`] loads the knobs that tune it.

pub mod chunking;
pub mod config;
pub mod domain;
pub mod embedding;
pub mod index;
pub mod rpc;
pub mod search;
pub mod server;
pub mod store;
pub mod tasks;
