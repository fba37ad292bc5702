//! The `gopher` dataset fixtures.
//!
//! Every case defines one variable named `gopher` over one of three shapes
//! (2-D, 3-D and scalar), optionally carrying a set of attributes that
//! covers every attribute type, for each of the eleven element types.

use netcdf_access::{Attr, Dataset, NcType, NetCdfResult, Storage, Var};

/// Element types exercised by the fixtures, in the order cases are generated.
pub const DATA_TYPES: [NcType; 11] = [
    NcType::UInt64,
    NcType::Int64,
    NcType::Double,
    NcType::UInt,
    NcType::Int,
    NcType::Float,
    NcType::UShort,
    NcType::Short,
    NcType::UByte,
    NcType::Byte,
    NcType::Char,
];

/// Name of the variable every fixture defines.
pub const VAR_NAME: &str = "gopher";

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    UInt64(Vec<u64>),
    Int64(Vec<i64>),
    Double(Vec<f64>),
    UInt(Vec<u32>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    UShort(Vec<u16>),
    Short(Vec<i16>),
    UByte(Vec<u8>),
    Byte(Vec<i8>),
    Text(String),
}

impl AttrValue {
    /// The type the attribute is stored as.
    pub fn nc_type(&self) -> NcType {
        match self {
            AttrValue::UInt64(_) => NcType::UInt64,
            AttrValue::Int64(_) => NcType::Int64,
            AttrValue::Double(_) => NcType::Double,
            AttrValue::UInt(_) => NcType::UInt,
            AttrValue::Int(_) => NcType::Int,
            AttrValue::Float(_) => NcType::Float,
            AttrValue::UShort(_) => NcType::UShort,
            AttrValue::Short(_) => NcType::Short,
            AttrValue::UByte(_) => NcType::UByte,
            AttrValue::Byte(_) => NcType::Byte,
            AttrValue::Text(_) => NcType::Char,
        }
    }

    /// Write the value to `attr`, creating it.
    pub fn write<S: Storage + ?Sized>(&self, attr: &Attr<'_, S>) -> NetCdfResult<()> {
        match self {
            AttrValue::UInt64(v) => attr.write_values(v),
            AttrValue::Int64(v) => attr.write_values(v),
            AttrValue::Double(v) => attr.write_values(v),
            AttrValue::UInt(v) => attr.write_values(v),
            AttrValue::Int(v) => attr.write_values(v),
            AttrValue::Float(v) => attr.write_values(v),
            AttrValue::UShort(v) => attr.write_values(v),
            AttrValue::Short(v) => attr.write_values(v),
            AttrValue::UByte(v) => attr.write_values(v),
            AttrValue::Byte(v) => attr.write_values(v),
            AttrValue::Text(s) => attr.write_text(s.as_bytes()),
        }
    }

    /// Read `attr` back as whatever type it was stored with.
    pub fn read<S: Storage + ?Sized>(attr: &Attr<'_, S>) -> NetCdfResult<AttrValue> {
        Ok(match attr.nc_type()? {
            NcType::UInt64 => AttrValue::UInt64(attr.get_values()?),
            NcType::Int64 => AttrValue::Int64(attr.get_values()?),
            NcType::Double => AttrValue::Double(attr.get_values()?),
            NcType::UInt => AttrValue::UInt(attr.get_values()?),
            NcType::Int => AttrValue::Int(attr.get_values()?),
            NcType::Float => AttrValue::Float(attr.get_values()?),
            NcType::UShort => AttrValue::UShort(attr.get_values()?),
            NcType::Short => AttrValue::Short(attr.get_values()?),
            NcType::UByte => AttrValue::UByte(attr.get_values()?),
            NcType::Byte => AttrValue::Byte(attr.get_values()?),
            NcType::Char => AttrValue::Text(String::from_utf8_lossy(&attr.get_text()?).into_owned()),
            other => panic!("unexpected attribute type {}", other),
        })
    }
}

/// One attribute of each supported type.
#[allow(clippy::approx_constant)]
pub fn gopher_attributes() -> Vec<(&'static str, AttrValue)> {
    vec![
        (
            "uint64_test",
            AttrValue::UInt64(vec![0xFABC_FABC_FABC_FABC, 999, 0, 222]),
        ),
        (
            "int64_test",
            AttrValue::Int64(vec![0x7ABC_7ABC_7ABC_7ABC, -999, 0, 222]),
        ),
        ("double_test", AttrValue::Double(vec![3.14, 1.23, -5.7, 0.0, 7.0])),
        ("uint_test", AttrValue::UInt(vec![2, 1, 600, 7])),
        ("int_test", AttrValue::Int(vec![2, 1, -5, 7])),
        ("float_test", AttrValue::Float(vec![3.14, 1.23, -5.7, 0.0, 7.0])),
        ("ushort_test", AttrValue::UShort(vec![2, 1, 600, 7])),
        ("short_test", AttrValue::Short(vec![2, 1, -5, 7])),
        ("ubyte_test", AttrValue::UByte(vec![2, 1, 255, 0, 7])),
        ("byte_test", AttrValue::Byte(vec![2, 100, -128, 127, -17])),
        ("birthday", AttrValue::Text("2009-11-10".to_string())),
    ]
}

/// One dataset layout to write and read back.
#[derive(Debug, Clone)]
pub struct FileTest {
    pub dim_names: Vec<&'static str>,
    pub dim_lens: Vec<u64>,
    pub data_type: NcType,
    pub attrs: Vec<(&'static str, AttrValue)>,
}

impl FileTest {
    /// Define the dimensions and the `gopher` variable in `ds`.
    pub fn define<'a, S: Storage + ?Sized>(&self, ds: &'a Dataset<'a, S>) -> NetCdfResult<Var<'a, S>> {
        let dims = self
            .dim_names
            .iter()
            .zip(&self.dim_lens)
            .map(|(name, &len)| ds.add_dim(name, len))
            .collect::<NetCdfResult<Vec<_>>>()?;
        ds.add_var(VAR_NAME, self.data_type, &dims)
    }

    /// Write the attribute set to `var`.
    pub fn put_attrs<S: Storage + ?Sized>(&self, var: &Var<'_, S>) -> NetCdfResult<()> {
        for (name, value) in &self.attrs {
            let attr = var.attr(name)?;
            assert_eq!(attr.name(), *name);
            value.write(&attr)?;
        }
        Ok(())
    }

    /// Check that `var` carries exactly the attribute set.
    pub fn check_attrs<S: Storage + ?Sized>(&self, var: &Var<'_, S>) -> NetCdfResult<()> {
        assert_eq!(var.n_attrs()? as usize, self.attrs.len(), "attribute count");
        for (name, expected) in &self.attrs {
            let attr = var.attr(name)?;
            assert_eq!(attr.nc_type()?, expected.nc_type(), "type of attribute {}", name);
            assert_eq!(&AttrValue::read(&attr)?, expected, "attribute {}", name);
        }
        Ok(())
    }

    /// Check the dimensions defined by [`define`](Self::define).
    pub fn check_dims<S: Storage + ?Sized>(&self, ds: &Dataset<'_, S>) -> NetCdfResult<()> {
        for (name, &len) in self.dim_names.iter().zip(&self.dim_lens) {
            let dim = ds.dim(name)?;
            assert_eq!(dim.name()?, *name);
            assert_eq!(dim.len()?, len, "length of dimension {}", name);
        }
        Ok(())
    }
}

/// The three variable layouts: `[7, 3]`, `[12, 7, 3]` and scalar.
pub fn base_layouts() -> Vec<(Vec<&'static str>, Vec<u64>)> {
    vec![
        (vec!["height", "width"], vec![7, 3]),
        (vec!["time", "height", "width"], vec![12, 7, 3]),
        (vec![], vec![]),
    ]
}

/// Every layout, with and without attributes, for every element type.
pub fn file_tests() -> Vec<FileTest> {
    let mut tests = Vec::new();
    for (dim_names, dim_lens) in base_layouts() {
        for attrs in [Vec::new(), gopher_attributes()] {
            for data_type in DATA_TYPES {
                tests.push(FileTest {
                    dim_names: dim_names.clone(),
                    dim_lens: dim_lens.clone(),
                    data_type,
                    attrs: attrs.clone(),
                });
            }
        }
    }
    tests
}
