use super::{data_types, DataObject, DataObjectBase};

#[derive(Debug, Clone, Default)]
/// A data object with no payload beyond its information.
pub struct GenericDataObject {
    base: DataObjectBase,
}

impl GenericDataObject {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataObject for GenericDataObject {
    fn class_name(&self) -> &'static str {
        data_types::DATA_OBJECT
    }

    fn type_lineage(&self) -> &'static [&'static str] {
        &[data_types::DATA_OBJECT]
    }

    fn base(&self) -> &DataObjectBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DataObjectBase {
        &mut self.base
    }

    fn deep_copy(&self) -> Box<dyn DataObject> {
        Box::new(Self {
            base: self.base.deep_copied(),
        })
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(Self::new())
    }

    fn initialize(&mut self) {
        self.base.information.clear();
        self.modified();
    }
}
