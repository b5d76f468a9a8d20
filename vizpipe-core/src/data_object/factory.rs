use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use super::{
    data_types, DataObject, DataObjectHandle, GenericDataObject, ImageData, MultiBlockDataSet,
    OverlappingAmr, PartitionedDataSet, PartitionedDataSetCollection, PolyData,
};
use crate::errors::DataObjectError;

type Constructor = Arc<dyn Fn() -> Box<dyn DataObject> + Send + Sync>;

#[derive(Clone, Default)]
/// Creates data objects from their type name. Used by the executive to instantiate outputs
/// from `DATA_TYPE_NAME`.
pub struct DataObjectFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl DataObjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that knows every concrete type shipped with this crate.
    pub fn with_standard_types() -> Self {
        let mut factory = Self::new();
        factory.register(data_types::DATA_OBJECT, || Box::new(GenericDataObject::new()));
        factory.register(data_types::POLY_DATA, || Box::new(PolyData::new()));
        factory.register(data_types::IMAGE_DATA, || Box::new(ImageData::new()));
        factory.register(data_types::MULTI_BLOCK_DATA_SET, || {
            Box::new(MultiBlockDataSet::new())
        });
        factory.register(data_types::PARTITIONED_DATA_SET, || {
            Box::new(PartitionedDataSet::new())
        });
        factory.register(data_types::PARTITIONED_DATA_SET_COLLECTION, || {
            Box::new(PartitionedDataSetCollection::new())
        });
        factory.register(data_types::OVERLAPPING_AMR, || Box::new(OverlappingAmr::new()));
        factory
    }

    /// Registers or replaces the constructor for `type_name`.
    pub fn register<F>(&mut self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn DataObject> + Send + Sync + 'static,
    {
        self.constructors
            .insert(type_name.into(), Arc::new(constructor));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn create(&self, type_name: &str) -> Result<Box<dyn DataObject>, DataObjectError> {
        self.constructors
            .get(type_name)
            .map(|constructor| constructor())
            .ok_or_else(|| DataObjectError::UnknownType(type_name.to_string()))
    }

    pub fn create_handle(&self, type_name: &str) -> Result<DataObjectHandle, DataObjectError> {
        self.create(type_name).map(DataObjectHandle::from_box)
    }
}

impl Debug for DataObjectFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}
