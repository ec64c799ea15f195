//! Thermal materials and the material library layers refer into.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::interp::Pchip;

/// Handle to a material in a [`MaterialLibrary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// Bulk thermal properties of one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    /// Thermal conductivity along x, y and z (W/(m*K)) at the reference
    /// temperature.
    pub conductivity: [f64; 3],
    /// Mass density (kg/m^3).
    pub density: f64,
    /// Specific heat capacity (J/(kg*K)).
    pub specific_heat: f64,
    /// Optional conductivity multiplier as a function of temperature.
    pub conductivity_scale: Option<Pchip>,
}

impl Material {
    /// An isotropic material.
    pub fn new(name: impl Into<String>, conductivity: f64, density: f64, specific_heat: f64) -> Self {
        Self {
            name: name.into(),
            conductivity: [conductivity; 3],
            density,
            specific_heat,
            conductivity_scale: None,
        }
    }

    pub fn with_anisotropic_conductivity(mut self, kx: f64, ky: f64, kz: f64) -> Self {
        self.conductivity = [kx, ky, kz];
        self
    }

    /// Attach a temperature dependent conductivity multiplier sampled at
    /// `(temperature, factor)` points. Temperatures outside the sampled
    /// range use the nearest end factor.
    pub fn with_conductivity_curve(mut self, points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        self.conductivity_scale = Pchip::new(points);
        self
    }

    /// Conductivity along `axis` (0 = x, 1 = y, 2 = z) at temperature `t`.
    pub fn conductivity_at(&self, axis: usize, t: f64) -> f64 {
        let k = self.conductivity[axis.min(2)];
        match &self.conductivity_scale {
            Some(curve) => k * curve.eval(t),
            None => k,
        }
    }

    /// Volumetric heat capacity (J/(m^3*K)).
    pub fn volumetric_heat_capacity(&self) -> f64 {
        self.density * self.specific_heat
    }

    pub fn is_temperature_dependent(&self) -> bool {
        self.conductivity_scale.is_some()
    }

    // Placeholder properties used when no library data is supplied.

    pub fn copper() -> Self {
        Self::new("Cu", 400.0, 8850.0, 380.0)
    }

    pub fn dielectric() -> Self {
        Self::new("Dielectric", 70.0, 2400.0, 691.0)
    }

    pub fn air() -> Self {
        Self::new("Air", 0.026, 1.225, 1006.0)
    }
}

/// Name-indexed collection of materials.
///
/// A [`MaterialId`] is the insertion position, so ids stay valid as long as
/// the library only grows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMaterialLibrary")]
pub struct MaterialLibrary {
    materials: IndexMap<String, Material>,
}

#[derive(Deserialize)]
struct RawMaterialLibrary {
    materials: IndexMap<String, Material>,
}

impl TryFrom<RawMaterialLibrary> for MaterialLibrary {
    type Error = Error;

    fn try_from(raw: RawMaterialLibrary) -> Result<Self> {
        let mut lib = Self::new();
        for (key, material) in raw.materials {
            if key != material.name {
                return Err(Error::MaterialNotFound(key));
            }
            lib.add(material)?;
        }
        Ok(lib)
    }
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding the placeholder copper, dielectric and air materials.
    pub fn with_defaults() -> Self {
        let materials = [Material::copper(), Material::dielectric(), Material::air()]
            .into_iter()
            .map(|m| (m.name.clone(), m))
            .collect();
        Self { materials }
    }

    /// Add a material, rejecting duplicate names.
    pub fn add(&mut self, material: Material) -> Result<MaterialId> {
        if self.materials.contains_key(&material.name) {
            return Err(Error::DuplicateMaterial(material.name));
        }
        let (index, _) = self.materials.insert_full(material.name.clone(), material);
        Ok(MaterialId(index))
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get_index(id.0).map(|(_, m)| m)
    }

    pub fn id(&self, name: &str) -> Option<MaterialId> {
        self.materials.get_index_of(name).map(MaterialId)
    }

    pub fn by_name(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Look up `id`, mapping a dangling id to an error.
    pub fn require(&self, id: MaterialId) -> Result<&Material> {
        self.get(id)
            .ok_or_else(|| Error::MaterialNotFound(format!("#{}", id.0)))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &Material)> {
        self.materials
            .values()
            .enumerate()
            .map(|(i, m)| (MaterialId(i), m))
    }

    /// True if any material's conductivity varies with temperature.
    pub fn is_temperature_dependent(&self) -> bool {
        self.materials.values().any(Material::is_temperature_dependent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_ids() {
        let mut lib = MaterialLibrary::new();
        let cu = lib.add(Material::copper()).unwrap();
        let diel = lib.add(Material::dielectric()).unwrap();
        assert_eq!(cu, MaterialId(0));
        assert_eq!(diel, MaterialId(1));
        assert_eq!(lib.id("Dielectric"), Some(diel));
        assert_eq!(lib.get(cu).unwrap().name, "Cu");
        assert!(lib.add(Material::copper()).is_err());
        assert!(lib.require(MaterialId(7)).is_err());
    }

    #[test]
    fn test_default_library() {
        let lib = MaterialLibrary::with_defaults();
        assert_eq!(lib.len(), 3);
        assert_eq!(lib.id("Cu"), Some(MaterialId(0)));
        assert_eq!(lib.id("Dielectric"), Some(MaterialId(1)));
        assert_eq!(lib.id("Air"), Some(MaterialId(2)));
        assert!(lib.id("FR4").is_none());
    }

    #[test]
    fn test_deserialize_checks_names() {
        let lib = MaterialLibrary::with_defaults();
        let json = serde_json::to_string(&lib).unwrap();
        let restored: MaterialLibrary = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, lib);
        assert_eq!(restored.id("Air"), Some(MaterialId(2)));

        let renamed = json.replacen("\"Cu\":", "\"Copper\":", 1);
        assert!(serde_json::from_str::<MaterialLibrary>(&renamed).is_err());
    }

    #[test]
    fn test_temperature_dependent_conductivity() {
        let m = Material::new("Si", 150.0, 2330.0, 700.0)
            .with_conductivity_curve([(25.0, 1.0), (125.0, 0.5)]);
        assert!(m.is_temperature_dependent());
        assert!((m.conductivity_at(2, 25.0) - 150.0).abs() < 1e-12);
        assert!((m.conductivity_at(2, 75.0) - 112.5).abs() < 1e-9);
        assert!((m.conductivity_at(0, 500.0) - 75.0).abs() < 1e-12);
    }

    #[test]
    fn test_anisotropic() {
        let m = Material::dielectric().with_anisotropic_conductivity(0.8, 0.8, 0.3);
        assert_eq!(m.conductivity_at(0, 0.0), 0.8);
        assert_eq!(m.conductivity_at(2, 0.0), 0.3);
        assert!((m.volumetric_heat_capacity() - 2400.0 * 691.0).abs() < 1e-6);
    }
}
