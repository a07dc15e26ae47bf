//! Conversion between [`Table`] and Arrow `RecordBatch`.
//!
//! | Arrow                              | Vector       |
//! |------------------------------------|--------------|
//! | `Null`                             | `Null`       |
//! | `Boolean`                          | `Boolean`    |
//! | `Int8`..`Int64`, `UInt8`..`UInt32` | `Integer`    |
//! | `Float32`, `Float64`               | `Double`     |
//! | `Utf8`, `LargeUtf8`                | `Character`  |
//! | `Dictionary(Int32, Utf8)`          | `Factor`     |
//! | `List`                             | `List`       |
//! | `Struct`                           | `Record`     |
//!
//! Going back, integers become `Int64`, doubles `Float64` and strings
//! `Utf8`.

use std::sync::Arc;

use arrow::{
    array::{
        Array, ArrayRef, AsArray, BooleanArray, DictionaryArray, Float64Array, Int32Array,
        Int64Array, ListArray, NullArray, RecordBatch, RecordBatchOptions, StringArray,
        StructArray,
    },
    buffer::{NullBuffer, OffsetBuffer},
    compute::cast,
    datatypes::{DataType, Field, Fields, Float64Type, Int32Type, Int64Type, Schema},
};

use crate::{
    coerce::{self, common_type},
    error::{Error, Result},
    table::Table,
    vector::{Record, Vector},
};

fn array_to_vector(array: &dyn Array) -> Result<Vector> {
    Ok(match array.data_type() {
        DataType::Null => Vector::Null(array.len()),
        DataType::Boolean => Vector::Boolean(array.as_boolean().iter().collect()),
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => {
            let wide = cast(array, &DataType::Int64)?;
            Vector::Integer(wide.as_primitive::<Int64Type>().iter().collect())
        }
        DataType::Float32 | DataType::Float64 => {
            let wide = cast(array, &DataType::Float64)?;
            Vector::Double(wide.as_primitive::<Float64Type>().iter().collect())
        }
        DataType::Utf8 => Vector::Character(
            array
                .as_string::<i32>()
                .iter()
                .map(|s| s.map(str::to_string))
                .collect(),
        ),
        DataType::LargeUtf8 => Vector::Character(
            array
                .as_string::<i64>()
                .iter()
                .map(|s| s.map(str::to_string))
                .collect(),
        ),
        DataType::Dictionary(key, value)
            if **key == DataType::Int32 && **value == DataType::Utf8 =>
        {
            let dict = array.as_dictionary::<Int32Type>();
            let values = dict.values().as_string::<i32>();
            let levels = values
                .iter()
                .map(|l| {
                    l.map(str::to_string)
                        .ok_or_else(|| Error::invalid_input("dictionary values must not be null"))
                })
                .collect::<Result<Vec<_>>>()?;
            let codes = dict
                .keys()
                .iter()
                .map(|k| k.and_then(|k| u32::try_from(k).ok()))
                .collect();
            Vector::Factor { levels, codes }
        }
        DataType::List(_) => {
            let list = array.as_list::<i32>();
            let items = (0..list.len())
                .map(|i| {
                    if list.is_null(i) {
                        Ok(None)
                    } else {
                        array_to_vector(list.value(i).as_ref()).map(Some)
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Vector::List(items)
        }
        DataType::Struct(_) => {
            let strukt = array.as_struct();
            let names = strukt
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect::<Vec<_>>();
            let mut fields = strukt
                .columns()
                .iter()
                .map(|c| array_to_vector(c.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            if let Some(nulls) = strukt.nulls() {
                let mask: Vec<bool> = (0..strukt.len()).map(|i| nulls.is_null(i)).collect();
                fields = fields.iter().map(|f| f.mask_missing(&mask)).collect();
            }
            Vector::Record(Record::from_parts(names, fields, strukt.len())?)
        }
        other => {
            return Err(Error::invalid_input(format!(
                "unsupported Arrow type {other}"
            )))
        }
    })
}

fn vector_to_array(v: &Vector) -> Result<ArrayRef> {
    Ok(match v {
        Vector::Null(n) => Arc::new(NullArray::new(*n)),
        Vector::Boolean(x) => Arc::new(BooleanArray::from(x.clone())),
        Vector::Integer(x) => Arc::new(Int64Array::from(x.clone())),
        Vector::Double(x) => Arc::new(Float64Array::from(x.clone())),
        Vector::Character(x) => Arc::new(StringArray::from(x.clone())),
        Vector::Factor { levels, codes } => {
            let keys = codes
                .iter()
                .map(|c| c.map(i32::try_from).transpose())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| Error::invalid_input("factor has too many levels for Arrow"))?;
            let values = StringArray::from(levels.clone());
            Arc::new(DictionaryArray::<Int32Type>::try_new(
                Int32Array::from(keys),
                Arc::new(values),
            )?)
        }
        Vector::List(items) => {
            let present: Vec<&Vector> = items.iter().flatten().collect();
            let child = if present.is_empty() {
                Vector::Null(0)
            } else {
                let vtype = common_type(&present)?;
                let parts = present
                    .iter()
                    .map(|p| coerce::cast(p, &vtype))
                    .collect::<Result<Vec<_>>>()?;
                Vector::concat(&parts)?
            };
            let values = vector_to_array(&child)?;
            let lengths = items.iter().map(|i| i.as_ref().map_or(0, Vector::len));
            let offsets = OffsetBuffer::<i32>::from_lengths(lengths);
            let nulls = NullBuffer::from(items.iter().map(Option::is_some).collect::<Vec<_>>());
            let field = Arc::new(Field::new("item", values.data_type().clone(), true));
            Arc::new(ListArray::try_new(field, offsets, values, Some(nulls))?)
        }
        Vector::Record(r) => {
            if r.names().is_empty() {
                return Err(Error::invalid_input(
                    "a record with no fields has no Arrow representation",
                ));
            }
            let arrays = r
                .fields()
                .iter()
                .map(vector_to_array)
                .collect::<Result<Vec<_>>>()?;
            let fields: Fields = r
                .names()
                .iter()
                .zip(&arrays)
                .map(|(name, a)| Field::new(name, a.data_type().clone(), true))
                .collect();
            Arc::new(StructArray::try_new(fields, arrays, None)?)
        }
    })
}

impl Table {
    /// Converts an Arrow record batch into a table.
    ///
    /// # Errors
    ///
    /// Returns an error for column types with no vector counterpart.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        let names = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        let columns = batch
            .columns()
            .iter()
            .map(|c| array_to_vector(c.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Self::from_parts(names, columns, batch.num_rows())
    }

    /// Converts the table into an Arrow record batch.
    ///
    /// # Errors
    ///
    /// Returns an error if a column can't be represented in Arrow.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays = self
            .columns()
            .iter()
            .map(|c| vector_to_array(c))
            .collect::<Result<Vec<_>>>()?;
        let fields: Vec<Field> = self
            .names()
            .iter()
            .zip(&arrays)
            .map(|(name, a)| Field::new(name, a.data_type().clone(), true))
            .collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{BinaryArray, Float32Array, Int8Array};

    use super::*;

    fn create_test_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("score", DataType::Float32, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
                Arc::new(Float32Array::from(vec![Some(0.5), Some(1.5), None])),
            ],
        )
        .ok()
        .unwrap_or_else(|| panic!("Should create batch"))
    }

    #[test]
    fn test_from_record_batch_widens() {
        let t = Table::from_record_batch(&create_test_batch()).unwrap();
        assert_eq!(t.names(), &["id", "name", "score"]);
        assert_eq!(**t.column("id").unwrap(), Vector::from(vec![1_i64, 2, 3]));
        assert_eq!(
            **t.column("name").unwrap(),
            Vector::from(vec![Some("a"), None, Some("c")])
        );
        assert_eq!(
            **t.column("score").unwrap(),
            Vector::from(vec![Some(0.5), Some(1.5), None])
        );
    }

    #[test]
    fn test_round_trip_nested() {
        let record = Record::new(vec![
            ("p", Vector::from(vec![Some(1_i64), None])),
            ("q", Vector::from(vec![Some(true), None])),
        ])
        .unwrap();
        let t = Table::new(vec![
            ("f", Vector::factor(&[Some("lo"), None])),
            ("r", Vector::Record(record)),
        ])
        .unwrap();
        let back = Table::from_record_batch(&t.to_record_batch().unwrap()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_list_round_trip() {
        let t = Table::new(vec![(
            "l",
            Vector::List(vec![
                Some(Vector::from(vec![1_i64, 2])),
                None,
                Some(Vector::from(vec![3_i64])),
            ]),
        )])
        .unwrap();
        let batch = t.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 3);
        let back = Table::from_record_batch(&batch).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_struct_nulls_become_missing_rows() {
        let a: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let fields = Fields::from(vec![Field::new("a", DataType::Int64, true)]);
        let nulls = NullBuffer::from(vec![true, false]);
        let s = StructArray::try_new(fields, vec![a], Some(nulls)).unwrap();
        let v = array_to_vector(&s).unwrap();
        assert!(!v.is_missing(0));
        assert!(v.is_missing(1));
    }

    #[test]
    fn test_small_ints_and_unsupported() {
        let small = Int8Array::from(vec![Some(-3_i8), None]);
        assert_eq!(
            array_to_vector(&small).unwrap(),
            Vector::from(vec![Some(-3_i64), None])
        );
        let bin = BinaryArray::from(vec![b"x".as_ref()]);
        assert!(matches!(
            array_to_vector(&bin),
            Err(Error::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_columnless_table_keeps_row_count() {
        let batch = Table::empty(4).to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 4);
    }
}
