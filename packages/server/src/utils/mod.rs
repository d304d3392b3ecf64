pub mod cache;
pub mod follow;
pub mod hash;
pub mod jwt;
pub mod paginator;
pub mod posts;
pub mod redirect;
