pub mod db;
pub mod sql;

pub use db::DbAdapter;
