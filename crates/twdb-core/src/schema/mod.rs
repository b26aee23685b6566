mod field;
mod model;
mod registry;
mod types;

pub use field::{quote_ident, FieldAttribute, FieldDef};
pub use model::{ForeignKeyDef, IndexDef, ModelMeta, TableDef};
pub use registry::EntityRegistry;
pub use types::{SqlType, TypeChange};
