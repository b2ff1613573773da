//! sitepipe - asset pipeline and dev server for static marketing sites
//!
//! This library provides functionality to:
//! - Build a site's fonts, stylesheets, scripts, images, pages and server
//!   files into a development or production output tree
//! - Watch sources and rebuild only the task a change belongs to
//! - Serve the output with live reload
//! - Relay contact-form posts to mail and a CRM

pub mod build;
pub mod cli;
pub mod config;
pub mod env;
pub mod reload;
pub mod server;
pub mod tasks;
pub mod tools;
pub mod transforms;
pub mod watch;
