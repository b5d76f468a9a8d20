//! Data objects flowing through the pipeline: a minimal set of concrete types, shared
//! handles to them and the composite containers.

use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Weak};

use dyn_clone::DynClone;
use vizpipe_types::parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use vizpipe_types::{Extent, MTime, TimeStamp};

use crate::as_any::AsAny;
use crate::collector::GarbageCollector;
use crate::information::Information;

mod cache;
pub mod composite;
mod factory;
mod generic;
mod image_data;
mod poly_data;

pub use cache::DataObjectCache;
pub use composite::{
    AmrDataIterator, CompositeDataIterator, CompositeDataSet, MultiBlockDataSet, OverlappingAmr,
    PartitionedDataSet, PartitionedDataSetCollection,
};
pub use factory::DataObjectFactory;
pub use generic::GenericDataObject;
pub use image_data::ImageData;
pub use poly_data::PolyData;

/// Type names used in `DATA_TYPE_NAME`, `INPUT_REQUIRED_DATA_TYPE` and `is_a`.
pub mod data_types {
    pub const DATA_OBJECT: &str = "DataObject";
    pub const DATA_SET: &str = "DataSet";
    pub const POINT_SET: &str = "PointSet";
    pub const POLY_DATA: &str = "PolyData";
    pub const IMAGE_DATA: &str = "ImageData";
    pub const COMPOSITE_DATA_SET: &str = "CompositeDataSet";
    pub const DATA_OBJECT_TREE: &str = "DataObjectTree";
    pub const MULTI_BLOCK_DATA_SET: &str = "MultiBlockDataSet";
    pub const PARTITIONED_DATA_SET: &str = "PartitionedDataSet";
    pub const PARTITIONED_DATA_SET_COLLECTION: &str = "PartitionedDataSetCollection";
    pub const UNIFORM_GRID_AMR: &str = "UniformGridAMR";
    pub const OVERLAPPING_AMR: &str = "OverlappingAMR";
}

#[derive(Debug, Clone)]
/// State every data object carries: its modification time and its information.
pub struct DataObjectBase {
    mtime: TimeStamp,
    information: Information,
}

impl DataObjectBase {
    pub fn new() -> Self {
        Self {
            mtime: TimeStamp::now(),
            information: Information::new(),
        }
    }
}

impl DataObjectBase {
    /// Base of a deep copy: a fresh modification time and duplicated information.
    pub fn deep_copied(&self) -> Self {
        Self {
            mtime: TimeStamp::now(),
            information: self.information.deep_copy(),
        }
    }
}

impl Default for DataObjectBase {
    fn default() -> Self {
        Self::new()
    }
}

pub trait DataObject: AsAny + DynClone + Debug + Send + Sync {
    fn class_name(&self) -> &'static str;
    /// Type names this object answers `is_a` for, most derived first.
    fn type_lineage(&self) -> &'static [&'static str];
    fn base(&self) -> &DataObjectBase;
    fn base_mut(&mut self) -> &mut DataObjectBase;
    /// An independent copy: nested data objects are copied too.
    fn deep_copy(&self) -> Box<dyn DataObject>;
    /// An empty object of the same concrete type.
    fn new_instance(&self) -> Box<dyn DataObject>;
    /// Releases the payload. The object stays usable and becomes empty.
    fn initialize(&mut self);

    fn is_a(&self, type_name: &str) -> bool {
        self.type_lineage().iter().any(|t| *t == type_name)
    }

    fn mtime(&self) -> MTime {
        self.base().mtime.get()
    }

    fn modified(&mut self) {
        self.base_mut().mtime.modified();
    }

    fn information(&self) -> &Information {
        &self.base().information
    }

    fn information_mut(&mut self) -> &mut Information {
        &mut self.base_mut().information
    }

    /// Extent of structured data, `None` for unstructured types.
    fn extent(&self) -> Option<Extent> {
        None
    }

    fn as_composite(&self) -> Option<&dyn CompositeDataSet> {
        None
    }

    fn as_composite_mut(&mut self) -> Option<&mut dyn CompositeDataSet> {
        None
    }

    /// Reports every data object this object holds a strong reference to.
    fn report_references(&self, collector: &mut GarbageCollector) {
        self.information().report(collector);
    }

    /// Drops every reference reported by [`report_references`](Self::report_references).
    fn remove_references(&mut self) {
        self.information_mut().remove_object_references();
    }
}

dyn_clone::clone_trait_object!(DataObject);

impl dyn DataObject {
    pub fn downcast_ref<T: DataObject>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: DataObject>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is_composite(&self) -> bool {
        self.as_composite().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Identity of a shared data object, stable while any handle to it is alive.
pub struct ObjectId(usize);

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Clone)]
/// Shared ownership of a data object. Clones point to the same object.
pub struct DataObjectHandle(Arc<RwLock<Box<dyn DataObject>>>);

impl DataObjectHandle {
    pub fn new<T: DataObject>(object: T) -> Self {
        Self::from_box(Box::new(object))
    }

    pub fn from_box(object: Box<dyn DataObject>) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Box<dyn DataObject>> {
        self.0.read()
    }

    /// Read access unless the object is currently locked for writing.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, Box<dyn DataObject>>> {
        self.0.try_read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Box<dyn DataObject>> {
        self.0.write()
    }

    /// Read access to the concrete type, `None` if the object is of another type.
    pub fn read_as<T: DataObject>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.0.read(), |object| (**object).downcast_ref::<T>()).ok()
    }

    pub fn write_as<T: DataObject>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.0.write(), |object| (**object).downcast_mut::<T>()).ok()
    }

    pub fn ptr_eq(&self, other: &DataObjectHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn id(&self) -> ObjectId {
        ObjectId(Arc::as_ptr(&self.0) as *const () as usize)
    }

    pub fn mtime(&self) -> MTime {
        self.read().mtime()
    }

    pub fn modified(&self) {
        self.write().modified();
    }

    pub fn class_name(&self) -> &'static str {
        self.read().class_name()
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.read().is_a(type_name)
    }

    pub fn is_composite(&self) -> bool {
        self.read().is_composite()
    }

    /// Makes this object share the contents of `source`. Handles to `self` stay valid and see
    /// the new contents; nested data objects are shared, not copied.
    pub fn shallow_copy_from(&self, source: &DataObjectHandle) {
        if self.ptr_eq(source) {
            return;
        }
        let copy = dyn_clone::clone_box(&**source.read());
        let mut object = self.write();
        *object = copy;
        object.modified();
    }

    /// A new, independent object with the same contents.
    pub fn deep_copy(&self) -> DataObjectHandle {
        let copy = self.read().deep_copy();
        Self::from_box(copy)
    }

    pub fn downgrade(&self) -> WeakDataObjectHandle {
        WeakDataObjectHandle(Arc::downgrade(&self.0))
    }

    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl Debug for DataObjectHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0.try_read() {
            Some(object) => write!(f, "DataObjectHandle({}@{})", object.class_name(), self.id()),
            None => write!(f, "DataObjectHandle(<locked>@{})", self.id()),
        }
    }
}

#[derive(Clone, Default)]
/// A non-owning reference to a data object.
pub struct WeakDataObjectHandle(Weak<RwLock<Box<dyn DataObject>>>);

impl WeakDataObjectHandle {
    pub fn upgrade(&self) -> Option<DataObjectHandle> {
        self.0.upgrade().map(DataObjectHandle)
    }

    /// Whether both point to the same allocation, alive or not.
    pub fn ptr_eq(&self, other: &WeakDataObjectHandle) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }

    pub fn points_to(&self, handle: &DataObjectHandle) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&handle.0))
    }
}

impl Debug for WeakDataObjectHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.upgrade() {
            Some(handle) => write!(f, "Weak({handle:?})"),
            None => f.write_str("Weak(<dropped>)"),
        }
    }
}
