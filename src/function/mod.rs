mod as_mssql;
mod geom_from_mssql;

pub use as_mssql::*;
pub use geom_from_mssql::*;
