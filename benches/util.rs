use arrow_array::RecordBatch;
use arrow_schema::{DataType, Field, Schema};
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use datafusion_expr::ScalarUDF;
use datafusion_mssql_geo::function::{AsMsSqlUdf, GeomFromMsSqlUdf};
use datafusion_mssql_geo::geometry::{Coord, Geometry, LineString};
use datafusion_mssql_geo::value::MsSqlGeometryArrayBuilder;
use std::sync::Arc;
use tokio::runtime::Runtime;

pub fn create_tokio_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(8)
        .enable_all()
        .build()
        .unwrap()
}

pub fn line(i: f64) -> Geometry {
    Geometry::new(
        LineString::new(vec![
            Coord::xy(i, i + 1.0),
            Coord::xy(i + 2.0, i + 3.0),
            Coord::xyz(i + 4.0, i + 5.0, i),
        ]),
        4326,
    )
}

pub fn create_session_with_data() -> SessionContext {
    let schema = Arc::new(Schema::new(vec![Field::new(
        "geom",
        DataType::Binary,
        true,
    )]));

    let mut batches = vec![];
    for batch in 0..100 {
        let geometries: Vec<Option<Geometry>> = (0..1000)
            .map(|i| Some(line((batch * 1000 + i) as f64)))
            .collect();
        let builder: MsSqlGeometryArrayBuilder<i32> = geometries.as_slice().try_into().unwrap();
        let record = RecordBatch::try_new(schema.clone(), vec![Arc::new(builder.build())]).unwrap();
        batches.push(record);
    }
    let mem_table = MemTable::try_new(schema.clone(), vec![batches]).unwrap();

    let ctx = SessionContext::new();
    ctx.register_udf(ScalarUDF::from(GeomFromMsSqlUdf::new()));
    ctx.register_udf(ScalarUDF::from(AsMsSqlUdf::new()));
    ctx.register_table("geom_table", Arc::new(mem_table))
        .unwrap();
    ctx
}
