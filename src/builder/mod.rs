//! Tree construction: turns the token stream the preprocessor already
//! stripped of hidden iXBRL into the semantic `Node` arena. Two entry
//! points share one engine (`engine::run_engine`) — `TreeBuilder` runs it
//! once over the whole token stream, `StreamingTreeBuilder` additionally
//! discards each top-level element's source tokens as soon as its subtree
//! is built, bounding peak memory on very large filings.

pub mod engine;
pub mod streaming;
pub mod tree;

pub use engine::EngineOutput;
pub use streaming::StreamingTreeBuilder;
pub use tree::TreeBuilder;
