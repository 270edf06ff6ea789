use crate::error::GeoResult;
use crate::value::MsSqlGeometryArray;
use crate::DFResult;
use arrow_array::cast::AsArray;
use arrow_array::{Array, BinaryArray, GenericBinaryArray, OffsetSizeTrait};
use arrow_schema::DataType;
use datafusion_common::{internal_err, DataFusionError};
use datafusion_expr::{ColumnarValue, ScalarUDFImpl, Signature, Volatility};
use geozero::{GeozeroGeometry, ToWkb};
use rayon::prelude::*;
use std::any::Any;
use std::sync::Arc;

/// Converts SQL Server native geometry bytes to WKB.
#[derive(Debug)]
pub struct GeomFromMsSqlUdf {
    signature: Signature,
    aliases: Vec<String>,
}

impl GeomFromMsSqlUdf {
    pub fn new() -> Self {
        Self {
            signature: Signature::uniform(
                1,
                vec![DataType::Binary, DataType::LargeBinary],
                Volatility::Immutable,
            ),
            aliases: vec!["st_geomfrommssql".to_string()],
        }
    }
}

impl ScalarUDFImpl for GeomFromMsSqlUdf {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn name(&self) -> &str {
        "ST_GeomFromMsSql"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn return_type(&self, _arg_types: &[DataType]) -> datafusion_common::Result<DataType> {
        Ok(DataType::Binary)
    }

    fn invoke(&self, args: &[ColumnarValue]) -> datafusion_common::Result<ColumnarValue> {
        let arr = args[0].clone().into_array(1)?;
        match arr.data_type() {
            DataType::Binary => to_wkb(arr.as_binary::<i32>()),
            DataType::LargeBinary => to_wkb(arr.as_binary::<i64>()),
            _ => internal_err!("The arg should be binary"),
        }
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }
}

impl Default for GeomFromMsSqlUdf {
    fn default() -> Self {
        Self::new()
    }
}

fn to_wkb<O: OffsetSizeTrait>(arr: &GenericBinaryArray<O>) -> DFResult<ColumnarValue> {
    let wkb_vec = (0..arr.len())
        .into_par_iter()
        .map(|index| -> GeoResult<Option<Vec<u8>>> {
            match arr.geometry_value(index)? {
                Some(geometry) => Ok(Some(geometry.to_wkb(geometry.dims())?)),
                None => Ok(None),
            }
        })
        .collect::<GeoResult<Vec<_>>>()?;
    let wkb_arr: BinaryArray = wkb_vec.iter().map(|wkb| wkb.as_deref()).collect();
    Ok(ColumnarValue::Array(Arc::new(wkb_arr)))
}
