use std::sync::Arc;

use vizpipe_types::Extent;

use super::{data_types, DataObject, DataObjectBase};

#[derive(Debug, Clone, Default)]
/// A regular grid of point scalars over an extent. Copies share the scalars until one of
/// them writes.
pub struct ImageData {
    base: DataObjectBase,
    extent: Extent,
    origin: [f64; 3],
    spacing: [f64; 3],
    scalars: Arc<Vec<f64>>,
}

impl ImageData {
    pub fn new() -> Self {
        Self {
            spacing: [1.0; 3],
            ..Default::default()
        }
    }

    /// An image over `extent` with every scalar set to `value`.
    pub fn filled(extent: Extent, value: f64) -> Self {
        let mut image = Self::new();
        image.set_extent(extent);
        image.scalars_mut().fill(value);
        image
    }

    /// Resizes the scalars to the number of points of `extent`, zero filling new ones.
    pub fn set_extent(&mut self, extent: Extent) {
        self.extent = extent;
        Arc::make_mut(&mut self.scalars).resize(extent.number_of_points(), 0.0);
        self.modified();
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    pub fn set_origin(&mut self, origin: [f64; 3]) {
        self.origin = origin;
        self.modified();
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn set_spacing(&mut self, spacing: [f64; 3]) {
        self.spacing = spacing;
        self.modified();
    }

    pub fn scalars(&self) -> &[f64] {
        &self.scalars
    }

    pub fn scalars_mut(&mut self) -> &mut [f64] {
        Arc::<Vec<f64>>::make_mut(&mut self.scalars)
    }

    /// Scalar at structured coordinates `ijk`, `None` outside the extent.
    pub fn scalar(&self, ijk: [i32; 3]) -> Option<f64> {
        self.point_index(ijk).map(|index| self.scalars[index])
    }

    pub fn set_scalar(&mut self, ijk: [i32; 3], value: f64) -> bool {
        match self.point_index(ijk) {
            Some(index) => {
                self.scalars_mut()[index] = value;
                true
            }
            None => false,
        }
    }

    fn point_index(&self, ijk: [i32; 3]) -> Option<usize> {
        let e = &self.extent.0;
        if (0..3).any(|axis| ijk[axis] < e[2 * axis] || ijk[axis] > e[2 * axis + 1]) {
            return None;
        }
        let [nx, ny, _] = self.extent.dimensions();
        let i = (ijk[0] - e[0]) as usize;
        let j = (ijk[1] - e[2]) as usize;
        let k = (ijk[2] - e[4]) as usize;
        Some(i + nx * (j + ny * k))
    }
}

impl DataObject for ImageData {
    fn class_name(&self) -> &'static str {
        data_types::IMAGE_DATA
    }

    fn type_lineage(&self) -> &'static [&'static str] {
        &[
            data_types::IMAGE_DATA,
            data_types::DATA_SET,
            data_types::DATA_OBJECT,
        ]
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
            scalars: Arc::new(self.scalars.to_vec()),
            ..self.clone()
        })
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(Self::new())
    }

    fn initialize(&mut self) {
        self.extent = Extent::EMPTY;
        self.scalars = Arc::default();
        self.base.information.clear();
        self.modified();
    }

    fn extent(&self) -> Option<Extent> {
        Some(self.extent)
    }
}
