mod dsn;
mod pool;

pub use dsn::{Endpoint, MySqlDsn};
pub use pool::Database;
