//! Conversation core: reply parsing, bubble segmentation, timed delivery,
//! and the per-user session state machine that ties them together.

pub mod events;
pub mod parser;
pub mod scheduler;
pub mod segmenter;
pub mod session;
