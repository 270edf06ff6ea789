use crate::error::GeoResult;
use crate::geometry::{Geometry, Srid};
use crate::value::MsSqlGeometryArrayBuilder;
use crate::DFResult;
use arrow_array::cast::AsArray;
use arrow_array::{Array, GenericBinaryArray, OffsetSizeTrait};
use arrow_schema::DataType;
use datafusion_common::{internal_err, DataFusionError, ScalarValue};
use datafusion_expr::{ColumnarValue, ScalarUDFImpl, Signature, TypeSignature, Volatility};
use geozero::wkb::{FromWkb, WkbDialect};
use rayon::prelude::*;
use std::any::Any;
use std::sync::Arc;

/// Converts WKB to SQL Server native geometry bytes, with an optional SRID.
#[derive(Debug)]
pub struct AsMsSqlUdf {
    signature: Signature,
    aliases: Vec<String>,
}

impl AsMsSqlUdf {
    pub fn new() -> Self {
        Self {
            signature: Signature::one_of(
                vec![
                    TypeSignature::Exact(vec![DataType::Binary]),
                    TypeSignature::Exact(vec![DataType::Binary, DataType::Int64]),
                    TypeSignature::Exact(vec![DataType::LargeBinary]),
                    TypeSignature::Exact(vec![DataType::LargeBinary, DataType::Int64]),
                ],
                Volatility::Immutable,
            ),
            aliases: vec!["st_asmssql".to_string()],
        }
    }
}

impl ScalarUDFImpl for AsMsSqlUdf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "ST_AsMsSql"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _arg_types: &[DataType]) -> datafusion_common::Result<DataType> {
        Ok(DataType::Binary)
    }

    fn invoke(&self, args: &[ColumnarValue]) -> datafusion_common::Result<ColumnarValue> {
        let srid = if args.len() == 2 {
            let ColumnarValue::Scalar(ScalarValue::Int64(Some(srid))) = &args[1] else {
                return internal_err!("The second arg should be int64");
            };
            let Ok(srid) = Srid::try_from(*srid) else {
                return internal_err!("SRID {} is out of range", srid);
            };
            srid
        } else {
            0
        };
        let arr = args[0].clone().into_array(1)?;
        match arr.data_type() {
            DataType::Binary => to_native(arr.as_binary::<i32>(), srid),
            DataType::LargeBinary => to_native(arr.as_binary::<i64>(), srid),
            _ => internal_err!("The first arg should be binary"),
        }
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

impl Default for AsMsSqlUdf {
    fn default() -> Self {
        Self::new()
    }
}

fn to_native<O: OffsetSizeTrait>(arr: &GenericBinaryArray<O>, srid: Srid) -> DFResult<ColumnarValue> {
    let geom_vec = (0..arr.len())
        .into_par_iter()
        .map(|index| -> GeoResult<Option<Geometry>> {
            if arr.is_null(index) {
                return Ok(None);
            }
            let mut rdr = std::io::Cursor::new(arr.value(index));
            let geometry = Geometry::from_wkb(&mut rdr, WkbDialect::Wkb)?;
            Ok(Some(geometry.with_srid(srid)))
        })
        .collect::<GeoResult<Vec<_>>>()?;

    let mut builder = MsSqlGeometryArrayBuilder::<i32>::new(geom_vec.len());
    for geometry in geom_vec.iter() {
        builder.append_geometry(geometry.as_ref())?;
    }
    Ok(ColumnarValue::Array(Arc::new(builder.build())))
}
