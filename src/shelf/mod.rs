pub mod audit;
pub mod builder;
pub mod config;
pub mod drive;
pub mod filename;
pub mod index;
pub mod links;
pub mod manifest;
pub mod mapping;
pub mod matcher;
pub mod migration;
pub mod paths;
pub mod releases;
pub mod serialize;
pub mod util;
pub mod warn;
