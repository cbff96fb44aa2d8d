/// Client-side consumption of the booking API: token storage for the
/// session and the resilient request sender built on top of it.

mod api_client;
mod token_provider;

pub use api_client::{ApiClient, ApiRequest, ClientError};
pub use token_provider::TokenProvider;
