pub mod audit;
pub mod error;
pub mod gateway;
pub mod id;
pub mod money;
pub mod order;
pub mod store;
pub mod transaction;
pub mod webhook;
