//! Domain models shared by the retrieval pipeline

mod product;
mod request;

pub use product::{Category, Occasion, Product, ProductAttributes, Season};
pub use request::{StyleRequest, DEFAULT_MAX_RESULTS};
