//! Documentation decision engine for changedoc.
//!
//! Given one source-control change and the current knowledge base, this
//! crate decides whether documentation is warranted, how the knowledge base
//! should change, and applies that decision through a [`PageStore`].
//!
//! [`PageStore`]: changedoc_shared::PageStore

pub mod classifier;
pub mod executor;
pub mod extractor;
pub mod generator;
pub mod pipeline;
pub mod planner;
pub mod snapshot;

#[cfg(test)]
mod testing;
