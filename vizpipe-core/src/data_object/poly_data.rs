use std::sync::Arc;

use super::{data_types, DataObject, DataObjectBase};

#[derive(Debug, Clone, Default)]
/// Unstructured points and the cells connecting them. Copies share both arrays until one of
/// them writes.
pub struct PolyData {
    base: DataObjectBase,
    points: Arc<Vec<[f64; 3]>>,
    cells: Arc<Vec<Vec<usize>>>,
}

impl PolyData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn cells(&self) -> &[Vec<usize>] {
        &self.cells
    }

    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    pub fn number_of_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn insert_point(&mut self, point: [f64; 3]) -> usize {
        Arc::make_mut(&mut self.points).push(point);
        self.modified();
        self.points.len() - 1
    }

    pub fn insert_cell(&mut self, point_ids: Vec<usize>) -> usize {
        Arc::make_mut(&mut self.cells).push(point_ids);
        self.modified();
        self.cells.len() - 1
    }

    /// `[xmin, xmax, ymin, ymax, zmin, zmax]`, `None` without points.
    pub fn bounds(&self) -> Option<[f64; 6]> {
        let first = self.points.first()?;
        let mut bounds = [first[0], first[0], first[1], first[1], first[2], first[2]];
        for point in &self.points[1..] {
            for axis in 0..3 {
                bounds[2 * axis] = bounds[2 * axis].min(point[axis]);
                bounds[2 * axis + 1] = bounds[2 * axis + 1].max(point[axis]);
            }
        }
        Some(bounds)
    }
}

impl DataObject for PolyData {
    fn class_name(&self) -> &'static str {
        data_types::POLY_DATA
    }

    fn type_lineage(&self) -> &'static [&'static str] {
        &[
            data_types::POLY_DATA,
            data_types::POINT_SET,
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
            points: Arc::new(self.points.to_vec()),
            cells: Arc::new(self.cells.to_vec()),
        })
    }

    fn new_instance(&self) -> Box<dyn DataObject> {
        Box::new(Self::new())
    }

    fn initialize(&mut self) {
        self.points = Arc::default();
        self.cells = Arc::default();
        self.base.information.clear();
        self.modified();
    }
}
