// Asynchronous CSV import: streaming pipeline plus the pollable progress store.

pub mod pipeline;
pub mod progress;
