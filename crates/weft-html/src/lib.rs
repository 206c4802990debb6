//! Weft HTML Loader
//!
//! HTML5 parsing built on html5ever. Produces a [`weft_dom::Document`],
//! materialising declarative shadow roots (`<template shadowrootmode>`)
//! as real shadow trees.

mod parser;

pub use parser::HtmlParser;
pub use weft_dom::Document;

/// Parse an HTML string into a document
pub fn parse(html: &str) -> Result<Document, HtmlError> {
    HtmlParser::new().parse(html)
}

/// HTML loading error
#[derive(Debug, thiserror::Error)]
pub enum HtmlError {
    #[error("Failed to read HTML input: {0}")]
    Io(#[from] std::io::Error),

    #[error("DOM construction failed: {0}")]
    Dom(#[from] weft_dom::DomError),
}
