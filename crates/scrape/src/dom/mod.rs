// ABOUTME: DOM traversal utilities on top of scraper's document tree.
// ABOUTME: Main-content detection by readability-style scoring and block-aware text extraction.

//! DOM utilities for main-content detection.
//!
//! The metadata extractor needs the article body as plain text; `scoring`
//! picks the element most likely to hold it and `text` renders that element
//! as newline-separated blocks.

pub mod scoring;
pub mod text;
