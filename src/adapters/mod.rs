pub mod api_errors;
pub mod hosted_gateway;
pub mod http;
pub mod mock_gateway;
pub mod order_client;
