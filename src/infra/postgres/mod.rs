pub mod audit_repo;
pub mod transaction_repo;

pub use transaction_repo::PgTransactionStore;
