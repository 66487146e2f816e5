//! Template rendering.
//!
//! Strict `{placeholder}` substitution for resolved templates.

mod template_renderer;

pub use template_renderer::{check_variables, parse_variable_pairs, placeholders, render};
