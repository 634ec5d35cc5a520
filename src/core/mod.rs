//! Core XML parsing primitives
//!
//! This module contains the collaborators the streaming bridges drive:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: incremental push tokenizer reporting to a `ScanHandler`
//! - Entities: XML entity decoding with Cow (zero-copy when possible)
//! - Attributes: raw attribute string parsing

pub mod attributes;
pub mod entities;
pub mod scanner;
pub mod tokenizer;
