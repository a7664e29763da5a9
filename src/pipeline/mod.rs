pub mod intake;
pub mod extraction;
pub mod product;
pub mod processor; // End-to-end document processing
pub mod resources; // Process-wide lexicons and sentence tokenizer
