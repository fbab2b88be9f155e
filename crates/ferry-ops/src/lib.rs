pub mod ops_drop;
pub mod ops_env;
pub mod ops_publish;
pub mod ops_pubkey;
pub mod ops_verify;
