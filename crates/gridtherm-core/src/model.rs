//! The layered grid thermal model.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::boundary::{BcType, BlockBc, BoundaryCondition, Face};
use crate::error::{Error, Result};
use crate::layer::GridThermalLayer;
use crate::power::PowerModel;
use crate::table::GridDataTable;

/// A cell position `(x, y, z)`; `z` is the layer index counted from the top.
pub type Index3D = (usize, usize, usize);

/// An explicit resistive link between two arbitrary cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpConnection {
    pub from: Index3D,
    pub to: Index3D,
    /// Multiplier applied to the conducting conductivity at `from`.
    pub strength: f64,
}

/// A full-face boundary condition given as a keyed grid table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridBc {
    pub kind: BcType,
    pub table: GridDataTable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct FaceBoundary {
    uniform: Option<BoundaryCondition>,
    grid: Option<GridBc>,
    blocks: Vec<BlockBc>,
}

/// A stack of equally gridded layers with boundary conditions on the top
/// and bottom faces.
///
/// Cells are numbered `nx * ny * z + ny * x + y`.
///
/// Deserialization replays the stored parts through the public setters, so
/// a malformed document fails with the same [`Error`] the setters return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGridThermalModel")]
pub struct GridThermalModel {
    size: (usize, usize),
    reference: (f64, f64),
    elevation: f64,
    resolution: (f64, f64),
    scale_h: f64,
    layers: Vec<GridThermalLayer>,
    jumps: Vec<JumpConnection>,
    top: FaceBoundary,
    bottom: FaceBoundary,
}

#[derive(Deserialize)]
struct RawGridThermalModel {
    size: (usize, usize),
    reference: (f64, f64),
    elevation: f64,
    resolution: (f64, f64),
    scale_h: f64,
    layers: Vec<GridThermalLayer>,
    jumps: Vec<JumpConnection>,
    top: FaceBoundary,
    bottom: FaceBoundary,
}

impl TryFrom<RawGridThermalModel> for GridThermalModel {
    type Error = Error;

    fn try_from(raw: RawGridThermalModel) -> Result<Self> {
        let mut model = Self::new(raw.size, raw.reference, raw.elevation);
        model.set_resolution(raw.resolution.0, raw.resolution.1)?;
        model.set_scale_h(raw.scale_h)?;
        for layer in raw.layers {
            model.append_layer(layer)?;
        }
        for jump in raw.jumps {
            model.append_jump_connection(jump.from, jump.to, jump.strength)?;
        }
        for (face, boundary) in [(Face::Top, raw.top), (Face::Bottom, raw.bottom)] {
            if let Some(bc) = boundary.uniform {
                model.set_uniform_bc(face, bc);
            }
            if let Some(GridBc { kind, table }) = boundary.grid {
                model.set_bc_model(face, kind, table)?;
            }
            for block in boundary.blocks {
                model.add_block_bc(face, block.ll, block.ur, block.bc)?;
            }
        }
        Ok(model)
    }
}

impl GridThermalModel {
    /// Create an empty model of `nx x ny` cells per layer with its lower left
    /// corner at `reference`.
    pub fn new(size: (usize, usize), reference: (f64, f64), elevation: f64) -> Self {
        Self {
            size,
            reference,
            elevation,
            resolution: (0.0, 0.0),
            scale_h: 1.0,
            layers: Vec::new(),
            jumps: Vec::new(),
            top: FaceBoundary::default(),
            bottom: FaceBoundary::default(),
        }
    }

    /// `(nx, ny)`.
    pub fn grid_size(&self) -> (usize, usize) {
        self.size
    }

    pub(crate) fn set_grid_size(&mut self, size: (usize, usize)) {
        self.size = size;
    }

    /// `(nx, ny, layers)`.
    pub fn model_size(&self) -> (usize, usize, usize) {
        (self.size.0, self.size.1, self.layers.len())
    }

    pub fn reference(&self) -> (f64, f64) {
        self.reference
    }

    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    pub fn scale_h(&self) -> f64 {
        self.scale_h
    }

    pub fn set_scale_h(&mut self, scale_h: f64) -> Result<()> {
        if scale_h < 0.0 {
            return Err(Error::NegativeValue {
                name: "scale_h",
                value: scale_h,
            });
        }
        self.scale_h = scale_h;
        Ok(())
    }

    /// Cell pitch `(rx, ry)` in meters, optionally multiplied by the
    /// horizontal scale factor.
    pub fn resolution(&self, scaled: bool) -> (f64, f64) {
        let s = if scaled { self.scale_h } else { 1.0 };
        (self.resolution.0 * s, self.resolution.1 * s)
    }

    pub fn set_resolution(&mut self, rx: f64, ry: f64) -> Result<()> {
        for (name, value) in [("resolution.x", rx), ("resolution.y", ry)] {
            if value < 0.0 {
                return Err(Error::NegativeValue { name, value });
            }
        }
        self.resolution = (rx, ry);
        Ok(())
    }

    /// Footprint `((x0, y0), (x1, y1))` of the model.
    pub fn region(&self, scaled: bool) -> ((f64, f64), (f64, f64)) {
        let (rx, ry) = self.resolution(scaled);
        let (x0, y0) = self.reference;
        (
            (x0, y0),
            (x0 + rx * self.size.0 as f64, y0 + ry * self.size.1 as f64),
        )
    }

    pub fn total_thickness(&self) -> f64 {
        self.layers.iter().map(GridThermalLayer::thickness).sum()
    }

    pub fn total_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn total_grids(&self) -> usize {
        self.size.0 * self.size.1 * self.layers.len()
    }

    pub fn flatten_index(&self, (x, y, z): Index3D) -> usize {
        let (nx, ny) = self.size;
        nx * ny * z + ny * x + y
    }

    /// Inverse of [`flatten_index`](Self::flatten_index); `None` past the
    /// last node, which covers every index of an empty model.
    pub fn grid_index(&self, index: usize) -> Option<Index3D> {
        if index >= self.total_grids() {
            return None;
        }
        let (nx, ny) = self.size;
        let per_layer = nx * ny;
        let z = index / per_layer;
        let r = index % per_layer;
        Some((r / ny, r % ny, z))
    }

    pub fn contains(&self, (x, y, z): Index3D) -> bool {
        x < self.size.0 && y < self.size.1 && z < self.layers.len()
    }

    /// Append a layer below the current bottom layer and return its index.
    pub fn append_layer(&mut self, mut layer: GridThermalLayer) -> Result<usize> {
        if layer.thickness() < 0.0 {
            return Err(Error::NegativeThickness(layer.thickness()));
        }
        let sizes = std::iter::once(layer.metal_fraction().size())
            .chain(layer.power_models().iter().filter_map(PowerModel::grid_size));
        for (w, h) in sizes {
            if (w, h) != self.size {
                return Err(Error::SizeMismatch {
                    expected_width: self.size.0,
                    expected_height: self.size.1,
                    width: w,
                    height: h,
                });
            }
        }
        if let Some(prev) = self.layers.last_mut() {
            prev.set_bottom(Some(layer.name().to_string()));
            layer.set_top(Some(prev.name().to_string()));
        }
        debug!(
            "append layer '{}' ({} m) at index {}",
            layer.name(),
            layer.thickness(),
            self.layers.len()
        );
        self.layers.push(layer);
        Ok(self.layers.len() - 1)
    }

    pub fn layers(&self) -> &[GridThermalLayer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&GridThermalLayer> {
        self.layers.get(index)
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [GridThermalLayer] {
        &mut self.layers
    }

    /// Attach a heat source to layer `layer`.
    pub fn add_power_model(&mut self, layer: usize, model: impl Into<PowerModel>) -> Result<()> {
        self.layers
            .get_mut(layer)
            .ok_or(Error::LayerNotFound(layer))?
            .add_power_model(model)
    }

    /// Record an explicit link between two cells of the current stack.
    pub fn append_jump_connection(&mut self, from: Index3D, to: Index3D, strength: f64) -> Result<()> {
        for (x, y, z) in [from, to] {
            if !self.contains((x, y, z)) {
                return Err(Error::IndexOutOfRange { x, y, z });
            }
        }
        self.jumps.push(JumpConnection { from, to, strength });
        Ok(())
    }

    pub fn jump_connections(&self) -> &[JumpConnection] {
        &self.jumps
    }

    pub(crate) fn jump_connections_mut(&mut self) -> &mut Vec<JumpConnection> {
        &mut self.jumps
    }

    fn face(&self, face: Face) -> &FaceBoundary {
        match face {
            Face::Top => &self.top,
            Face::Bottom => &self.bottom,
        }
    }

    fn face_mut(&mut self, face: Face) -> &mut FaceBoundary {
        match face {
            Face::Top => &mut self.top,
            Face::Bottom => &mut self.bottom,
        }
    }

    /// Set the full-face grid boundary table of `face`.
    pub fn set_bc_model(&mut self, face: Face, kind: BcType, table: GridDataTable) -> Result<()> {
        if table.size() != self.size {
            return Err(Error::SizeMismatch {
                expected_width: self.size.0,
                expected_height: self.size.1,
                width: table.width(),
                height: table.height(),
            });
        }
        self.face_mut(face).grid = Some(GridBc { kind, table });
        Ok(())
    }

    pub fn bc_model(&self, face: Face) -> Option<&GridBc> {
        self.face(face).grid.as_ref()
    }

    pub(crate) fn bc_model_mut(&mut self, face: Face) -> Option<&mut GridBc> {
        self.face_mut(face).grid.as_mut()
    }

    /// Apply `bc` to every cell of `face`.
    pub fn set_uniform_bc(&mut self, face: Face, bc: BoundaryCondition) {
        self.face_mut(face).uniform = Some(bc);
    }

    pub fn uniform_bc(&self, face: Face) -> Option<&BoundaryCondition> {
        self.face(face).uniform.as_ref().filter(|bc| bc.is_valid())
    }

    /// Apply `bc` to the inclusive cell rectangle `ll..=ur` of `face`.
    pub fn add_block_bc(
        &mut self,
        face: Face,
        ll: (usize, usize),
        ur: (usize, usize),
        bc: BoundaryCondition,
    ) -> Result<()> {
        if ll.0 > ur.0 || ll.1 > ur.1 || ur.0 >= self.size.0 || ur.1 >= self.size.1 {
            return Err(Error::InvalidRegion(ll, ur));
        }
        self.face_mut(face).blocks.push(BlockBc { ll, ur, bc });
        Ok(())
    }

    pub fn block_bcs(&self, face: Face) -> &[BlockBc] {
        &self.face(face).blocks
    }

    pub(crate) fn block_bcs_mut(&mut self, face: Face) -> &mut Vec<BlockBc> {
        &mut self.face_mut(face).blocks
    }

    /// Whether results depend on the temperature guess: true when a boundary
    /// table or a grid power table holds more than one distinct sample.
    pub fn need_iteration(&self) -> bool {
        let bc = [Face::Top, Face::Bottom]
            .into_iter()
            .filter_map(|f| self.bc_model(f))
            .any(|bc| bc.table.need_interpolation());
        bc || self
            .layers
            .iter()
            .flat_map(|l| l.power_models())
            .any(PowerModel::need_interpolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridData;
    use crate::material::MaterialId;

    fn layer(name: &str, thickness: f64, w: usize, h: usize) -> GridThermalLayer {
        GridThermalLayer::new(
            name,
            thickness,
            MaterialId(0),
            MaterialId(1),
            GridData::new(w, h, 0.5),
        )
    }

    #[test]
    fn test_append_layer_validation() {
        let mut model = GridThermalModel::new((4, 3), (0.0, 0.0), 0.0);
        assert!(matches!(
            model.append_layer(layer("t", 1e-4, 3, 4)),
            Err(Error::SizeMismatch { .. })
        ));
        assert!(matches!(
            model.append_layer(layer("n", -1.0, 4, 3)),
            Err(Error::NegativeThickness(_))
        ));
        assert_eq!(model.total_layers(), 0);
        assert_eq!(model.append_layer(layer("a", 1e-4, 4, 3)).unwrap(), 0);
        assert_eq!(model.append_layer(layer("b", 0.0, 4, 3)).unwrap(), 1);
    }

    #[test]
    fn test_layer_links() {
        let mut model = GridThermalModel::new((2, 2), (0.0, 0.0), 0.0);
        for name in ["a", "b", "c"] {
            model.append_layer(layer(name, 1.0, 2, 2)).unwrap();
        }
        let layers = model.layers();
        assert_eq!(layers[0].top(), None);
        assert_eq!(layers[0].bottom(), Some("b"));
        assert_eq!(layers[1].top(), Some("a"));
        assert_eq!(layers[1].bottom(), Some("c"));
        assert_eq!(layers[2].top(), Some("b"));
        assert_eq!(layers[2].bottom(), None);
        assert!((model.total_thickness() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_flatten_round_trip() {
        let mut model = GridThermalModel::new((4, 3), (0.0, 0.0), 0.0);
        model.append_layer(layer("a", 1.0, 4, 3)).unwrap();
        model.append_layer(layer("b", 1.0, 4, 3)).unwrap();
        assert_eq!(model.total_grids(), 24);
        assert_eq!(model.flatten_index((1, 2, 1)), 12 + 3 + 2);
        for i in 0..model.total_grids() {
            assert_eq!(model.grid_index(i).map(|g| model.flatten_index(g)), Some(i));
        }
        assert_eq!(model.grid_index(24), None);
    }

    #[test]
    fn test_grid_index_on_empty_model() {
        let model = GridThermalModel::new((0, 3), (0.0, 0.0), 0.0);
        assert_eq!(model.total_grids(), 0);
        assert_eq!(model.grid_index(0), None);
        assert_eq!(model.grid_index(5), None);
        let model = GridThermalModel::new((4, 3), (0.0, 0.0), 0.0);
        assert_eq!(model.grid_index(0), None);
    }

    #[test]
    fn test_resolution_and_scale() {
        let mut model = GridThermalModel::new((10, 5), (1.0, 2.0), 0.0);
        assert!(model.set_resolution(-1.0, 1.0).is_err());
        assert!(model.set_scale_h(-0.5).is_err());
        model.set_resolution(1e-3, 2e-3).unwrap();
        model.set_scale_h(2.0).unwrap();
        assert_eq!(model.resolution(false), (1e-3, 2e-3));
        assert_eq!(model.resolution(true), (2e-3, 4e-3));
        let (_, ur) = model.region(false);
        assert!((ur.0 - 1.01).abs() < 1e-12 && (ur.1 - 2.01).abs() < 1e-12);
    }

    #[test]
    fn test_jump_and_block_validation() {
        let mut model = GridThermalModel::new((2, 2), (0.0, 0.0), 0.0);
        model.append_layer(layer("a", 1.0, 2, 2)).unwrap();
        assert!(model.append_jump_connection((0, 0, 0), (1, 1, 0), 2.0).is_ok());
        assert!(model.append_jump_connection((0, 0, 0), (0, 0, 1), 2.0).is_err());
        let bc = BoundaryCondition::htc(10.0);
        assert!(model.add_block_bc(Face::Top, (0, 0), (1, 1), bc).is_ok());
        assert!(model.add_block_bc(Face::Top, (1, 0), (0, 1), bc).is_err());
        assert!(model.add_block_bc(Face::Bottom, (0, 0), (2, 1), bc).is_err());
        assert_eq!(model.block_bcs(Face::Top).len(), 1);
        assert!(model.block_bcs(Face::Bottom).is_empty());
    }

    #[test]
    fn test_deserialize_replays_checks() {
        let mut model = GridThermalModel::new((2, 2), (0.0, 0.0), 0.0);
        model.set_resolution(1e-3, 1e-3).unwrap();
        model.append_layer(layer("a", 1e-4, 2, 2)).unwrap();
        model.append_layer(layer("b", 1e-4, 2, 2)).unwrap();
        model.append_jump_connection((0, 0, 0), (1, 1, 1), 1.0).unwrap();
        model
            .set_bc_model(Face::Bottom, BcType::Htc, GridDataTable::from_uniform(2, 2, 1e3))
            .unwrap();
        model
            .add_block_bc(Face::Top, (0, 0), (1, 0), BoundaryCondition::heat_flow(5.0))
            .unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: GridThermalModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["size"] = serde_json::json!([3, 2]);
        let err = serde_json::from_value::<GridThermalModel>(value).unwrap_err();
        assert!(err.to_string().contains("size mismatch"), "{}", err);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["jumps"][0]["to"] = serde_json::json!([1, 1, 5]);
        assert!(serde_json::from_value::<GridThermalModel>(value).is_err());

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["top"]["blocks"][0]["ur"] = serde_json::json!([4, 0]);
        assert!(serde_json::from_value::<GridThermalModel>(value).is_err());
    }

    #[test]
    fn test_deserialize_rejects_power_grid_size() {
        let mut model = GridThermalModel::new((2, 2), (0.0, 0.0), 0.0);
        model.append_layer(layer("a", 1e-4, 2, 2)).unwrap();
        model
            .add_power_model(0, GridDataTable::from_uniform(2, 2, 1.0))
            .unwrap();
        let mut value = serde_json::to_value(&model).unwrap();
        assert!(serde_json::from_value::<GridThermalModel>(value.clone()).is_ok());

        let table = serde_json::to_value(GridDataTable::from_uniform(3, 3, 1.0)).unwrap();
        value["layers"][0]["power_models"] = serde_json::json!([{ "Grid": table }]);
        let err = serde_json::from_value::<GridThermalModel>(value).unwrap_err();
        assert!(err.to_string().contains("size mismatch"), "{}", err);
    }

    #[test]
    fn test_need_iteration_is_strict() {
        let mut model = GridThermalModel::new((2, 2), (0.0, 0.0), 0.0);
        model.append_layer(layer("a", 1.0, 2, 2)).unwrap();
        assert!(!model.need_iteration());

        let mut power = GridDataTable::new(2, 2);
        power.add_sample(25.0, GridData::new(2, 2, 1.0)).unwrap();
        power.add_sample(100.0, GridData::new(2, 2, 1.0)).unwrap();
        model.add_power_model(0, power).unwrap();
        assert!(!model.need_iteration());

        let mut htc = GridDataTable::new(2, 2);
        htc.add_sample(25.0, GridData::new(2, 2, 10.0)).unwrap();
        htc.add_sample(100.0, GridData::new(2, 2, 20.0)).unwrap();
        model.set_bc_model(Face::Bottom, BcType::Htc, htc).unwrap();
        assert!(model.need_iteration());
    }
}
