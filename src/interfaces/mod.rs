pub mod fetcher;
pub mod policy;

pub use fetcher::{FetchRequest, FetchResponse, Fetcher, ResponseMode};
pub use policy::ResponsePolicy;
pub use crate::network::client::SiteClient;
