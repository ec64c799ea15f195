//! A single layer of the grid thermal stack.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::GridData;
use crate::material::MaterialId;
use crate::power::PowerModel;

/// One layer of a [`GridThermalModel`](crate::model::GridThermalModel).
///
/// Each cell mixes the conducting and dielectric materials according to
/// the metal fraction of that cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridThermalLayer {
    name: String,
    thickness: f64,
    is_metal: bool,
    conducting: MaterialId,
    dielectric: MaterialId,
    metal_fraction: GridData,
    power_models: Vec<PowerModel>,
    top: Option<String>,
    bottom: Option<String>,
}

impl GridThermalLayer {
    pub fn new(
        name: impl Into<String>,
        thickness: f64,
        conducting: MaterialId,
        dielectric: MaterialId,
        metal_fraction: GridData,
    ) -> Self {
        Self {
            name: name.into(),
            thickness,
            is_metal: false,
            conducting,
            dielectric,
            metal_fraction,
            power_models: Vec::new(),
            top: None,
            bottom: None,
        }
    }

    pub fn with_metal(mut self, is_metal: bool) -> Self {
        self.is_metal = is_metal;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Thickness (m).
    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn is_metal(&self) -> bool {
        self.is_metal
    }

    pub fn set_is_metal(&mut self, is_metal: bool) {
        self.is_metal = is_metal;
    }

    pub fn conducting_material(&self) -> MaterialId {
        self.conducting
    }

    pub fn dielectric_material(&self) -> MaterialId {
        self.dielectric
    }

    pub fn metal_fraction(&self) -> &GridData {
        &self.metal_fraction
    }

    pub(crate) fn metal_fraction_mut(&mut self) -> &mut GridData {
        &mut self.metal_fraction
    }

    /// Metal fraction of cell `(x, y)`, clamped to `[0, 1]`.
    pub fn fraction_at(&self, x: usize, y: usize) -> Option<f64> {
        self.metal_fraction.get(x, y).map(|f| f.clamp(0.0, 1.0))
    }

    /// Attach a heat source. Grid sources must match the layer size.
    pub fn add_power_model(&mut self, model: impl Into<PowerModel>) -> Result<()> {
        let model = model.into();
        if let Some((w, h)) = model.grid_size() {
            if (w, h) != self.metal_fraction.size() {
                return Err(Error::SizeMismatch {
                    expected_width: self.metal_fraction.width(),
                    expected_height: self.metal_fraction.height(),
                    width: w,
                    height: h,
                });
            }
        }
        self.power_models.push(model);
        Ok(())
    }

    pub fn power_models(&self) -> &[PowerModel] {
        &self.power_models
    }

    pub(crate) fn power_models_mut(&mut self) -> &mut Vec<PowerModel> {
        &mut self.power_models
    }

    /// Name of the layer above, set when the layer is appended to a model.
    pub fn top(&self) -> Option<&str> {
        self.top.as_deref()
    }

    /// Name of the layer below.
    pub fn bottom(&self) -> Option<&str> {
        self.bottom.as_deref()
    }

    pub(crate) fn set_top(&mut self, name: Option<String>) {
        self.top = name;
    }

    pub(crate) fn set_bottom(&mut self, name: Option<String>) {
        self.bottom = name;
    }
}
