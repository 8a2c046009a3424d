pub mod app;
pub mod catalog;
pub mod config;
pub mod counts;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod template;
