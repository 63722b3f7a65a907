pub mod assets;
pub mod config;
pub mod data;
pub mod filter;
pub mod http;
pub mod logging;
pub mod outcome;
pub mod overview;
pub mod quality;
pub mod relative_time;
pub mod series;
pub mod session;
pub mod stats;
pub mod view;
pub mod viewpoint;
