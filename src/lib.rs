//! graphmap - schema-driven entity mapping over a property graph
//!
//! Entity types declare a static field table ([`schema`]); the converter
//! ([`convert`]) maps nodes to entities and back, the synthesizer ([`synth`])
//! emits parameterized Cypher, and [`repositories::GraphRepository`] runs it
//! through the driver boundary ([`graph`]).

pub mod cli;
pub mod config;
pub mod convert;
pub mod error;
pub mod graph;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod synth;
