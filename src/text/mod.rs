//! Text glue: tokenization, word windows and corpus / CSV loading.

pub mod corpus;
pub mod tokenize;
