// SPDX-License-Identifier: MIT OR Apache-2.0
//! Geometries, materials and textures shared between nodes.

use crate::scene::{value_bool, value_f32, value_string, EntityId, FieldError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::f32::consts::PI;

/// Box geometry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxParams {
    /// Size along X
    pub width: f32,
    /// Size along Y
    pub height: f32,
    /// Size along Z
    pub depth: f32,
    /// Segments along X
    pub width_segments: u32,
    /// Segments along Y
    pub height_segments: u32,
    /// Segments along Z
    pub depth_segments: u32,
}

impl Default for BoxParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
            width_segments: 1,
            height_segments: 1,
            depth_segments: 1,
        }
    }
}

/// Sphere geometry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SphereParams {
    /// Radius
    pub radius: f32,
    /// Horizontal segments
    pub width_segments: u32,
    /// Vertical segments
    pub height_segments: u32,
    /// Horizontal start angle
    pub phi_start: f32,
    /// Horizontal sweep
    pub phi_length: f32,
    /// Vertical start angle
    pub theta_start: f32,
    /// Vertical sweep
    pub theta_length: f32,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 8,
            height_segments: 6,
            phi_start: 0.0,
            phi_length: PI * 2.0,
            theta_start: 0.0,
            theta_length: PI,
        }
    }
}

/// Plane geometry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaneParams {
    /// Size along X
    pub width: f32,
    /// Size along Y
    pub height: f32,
    /// Segments along X
    pub width_segments: u32,
    /// Segments along Y
    pub height_segments: u32,
}

impl Default for PlaneParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
            width_segments: 1,
            height_segments: 1,
        }
    }
}

/// Cylinder geometry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CylinderParams {
    /// Top radius
    pub radius_top: f32,
    /// Bottom radius
    pub radius_bottom: f32,
    /// Height
    pub height: f32,
    /// Segments around the axis
    pub radial_segments: u32,
    /// Segments along the axis
    pub height_segments: u32,
    /// Whether the caps are left open
    pub open_ended: bool,
}

impl Default for CylinderParams {
    fn default() -> Self {
        Self {
            radius_top: 1.0,
            radius_bottom: 1.0,
            height: 1.0,
            radial_segments: 8,
            height_segments: 1,
            open_ended: false,
        }
    }
}

/// Torus geometry parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TorusParams {
    /// Ring radius
    pub radius: f32,
    /// Tube radius
    pub tube: f32,
    /// Segments around the tube
    pub radial_segments: u32,
    /// Segments around the ring
    pub tubular_segments: u32,
    /// Central angle
    pub arc: f32,
}

impl Default for TorusParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            tube: 0.4,
            radial_segments: 8,
            tubular_segments: 6,
            arc: PI * 2.0,
        }
    }
}

/// One vertex attribute of a buffer geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferAttribute {
    /// Components per vertex
    pub item_size: u32,
    /// Flat component array
    pub array: Vec<f32>,
    /// Whether integer data is normalized
    #[serde(default)]
    pub normalized: bool,
}

/// Raw vertex data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferData {
    /// Named attributes (`position`, `normal`, `uv`, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, BufferAttribute>,
    /// Triangle indices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<Vec<u32>>,
}

/// Geometry kinds
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryKind {
    /// Box
    Box(BoxParams),
    /// UV sphere
    Sphere(SphereParams),
    /// Plane
    Plane(PlaneParams),
    /// Cylinder or cone
    Cylinder(CylinderParams),
    /// Torus
    Torus(TorusParams),
    /// Arbitrary vertex data
    Buffer(BufferData),
}

impl Default for GeometryKind {
    fn default() -> Self {
        Self::Box(BoxParams::default())
    }
}

fn read_param<T: Serialize>(params: &T, name: &str) -> Option<Value> {
    match serde_json::to_value(params).ok()? {
        Value::Object(mut map) => map.remove(name),
        _ => None,
    }
}

fn write_param<T: Serialize + DeserializeOwned>(
    params: &mut T,
    tag: &str,
    name: &str,
    value: Value,
) -> Result<(), FieldError> {
    let mut map = match serde_json::to_value(&*params) {
        Ok(Value::Object(map)) => map,
        _ => return Err(FieldError::unknown(tag, name)),
    };
    if !map.contains_key(name) {
        return Err(FieldError::unknown(tag, name));
    }
    map.insert(name.to_string(), value);
    *params = serde_json::from_value(Value::Object(map))
        .map_err(|err| FieldError::invalid(name, err.to_string()))?;
    Ok(())
}

impl GeometryKind {
    /// Type tag used in documents
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Box(_) => "BoxBufferGeometry",
            Self::Sphere(_) => "SphereBufferGeometry",
            Self::Plane(_) => "PlaneBufferGeometry",
            Self::Cylinder(_) => "CylinderBufferGeometry",
            Self::Torus(_) => "TorusBufferGeometry",
            Self::Buffer(_) => "BufferGeometry",
        }
    }

    /// Read a construction parameter
    pub fn parameter(&self, name: &str) -> Option<Value> {
        match self {
            Self::Box(p) => read_param(p, name),
            Self::Sphere(p) => read_param(p, name),
            Self::Plane(p) => read_param(p, name),
            Self::Cylinder(p) => read_param(p, name),
            Self::Torus(p) => read_param(p, name),
            Self::Buffer(_) => None,
        }
    }

    pub(crate) fn set_parameter(&mut self, name: &str, value: Value) -> Result<(), FieldError> {
        let tag = self.type_tag();
        match self {
            Self::Box(p) => write_param(p, tag, name, value),
            Self::Sphere(p) => write_param(p, tag, name, value),
            Self::Plane(p) => write_param(p, tag, name, value),
            Self::Cylinder(p) => write_param(p, tag, name, value),
            Self::Torus(p) => write_param(p, tag, name, value),
            Self::Buffer(_) => Err(FieldError::unknown(tag, name)),
        }
    }
}

/// A geometry shared by any number of meshes
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Unique identifier
    pub uuid: EntityId,
    /// Display name
    pub name: String,
    /// Shape and parameters
    pub kind: GeometryKind,
    /// Application data
    pub user_data: Map<String, Value>,
}

impl Geometry {
    /// Create a geometry with a fresh identifier
    pub fn new(name: impl Into<String>, kind: GeometryKind) -> Self {
        Self {
            uuid: EntityId::new(),
            name: name.into(),
            kind,
            user_data: Map::new(),
        }
    }

    /// Read an attribute or construction parameter
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(self.name.clone())),
            _ => self.kind.parameter(name),
        }
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), FieldError> {
        match name {
            "name" => {
                self.name = value_string(name, &value)?;
                Ok(())
            }
            _ => self.kind.set_parameter(name, value),
        }
    }
}

/// Texture map slots a material can fill
pub const MAP_SLOTS: [&str; 12] = [
    "map",
    "alphaMap",
    "aoMap",
    "bumpMap",
    "normalMap",
    "displacementMap",
    "emissiveMap",
    "envMap",
    "lightMap",
    "metalnessMap",
    "roughnessMap",
    "specularMap",
];

/// Which faces are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    /// Front faces
    #[default]
    Front,
    /// Back faces
    Back,
    /// Both faces
    Double,
}

impl Side {
    /// Numeric code used in documents
    pub fn code(&self) -> u32 {
        match self {
            Self::Front => 0,
            Self::Back => 1,
            Self::Double => 2,
        }
    }

    /// Side from its numeric code
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Front),
            1 => Some(Self::Back),
            2 => Some(Self::Double),
            _ => None,
        }
    }
}

/// Lambert material data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LambertParams {
    /// Emissive colour
    pub emissive: u32,
}

/// Phong material data
#[derive(Debug, Clone, PartialEq)]
pub struct PhongParams {
    /// Emissive colour
    pub emissive: u32,
    /// Specular colour
    pub specular: u32,
    /// Specular exponent
    pub shininess: f32,
}

impl Default for PhongParams {
    fn default() -> Self {
        Self {
            emissive: 0x000000,
            specular: 0x111111,
            shininess: 30.0,
        }
    }
}

/// Physically based material data
#[derive(Debug, Clone, PartialEq)]
pub struct StandardParams {
    /// Emissive colour
    pub emissive: u32,
    /// Surface roughness
    pub roughness: f32,
    /// Metalness
    pub metalness: f32,
}

impl Default for StandardParams {
    fn default() -> Self {
        Self {
            emissive: 0x000000,
            roughness: 0.5,
            metalness: 0.5,
        }
    }
}

/// Material kinds
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Unlit
    Basic,
    /// Diffuse lighting
    Lambert(LambertParams),
    /// Specular lighting
    Phong(PhongParams),
    /// Physically based
    Standard(StandardParams),
    /// Sprite material with a screen-space rotation
    Sprite {
        /// Rotation in radians
        rotation: f32,
    },
    /// Line material
    LineBasic {
        /// Line width
        linewidth: f32,
    },
}

impl MaterialKind {
    /// Type tag used in documents
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Basic => "MeshBasicMaterial",
            Self::Lambert(_) => "MeshLambertMaterial",
            Self::Phong(_) => "MeshPhongMaterial",
            Self::Standard(_) => "MeshStandardMaterial",
            Self::Sprite { .. } => "SpriteMaterial",
            Self::LineBasic { .. } => "LineBasicMaterial",
        }
    }

    /// Whether the kind has a texture slot named `slot`
    pub fn supports_map(&self, slot: &str) -> bool {
        match self {
            Self::LineBasic { .. } => false,
            Self::Sprite { .. } => matches!(slot, "map" | "alphaMap"),
            _ => MAP_SLOTS.contains(&slot),
        }
    }

    fn emissive_mut(&mut self) -> Option<&mut u32> {
        match self {
            Self::Lambert(p) => Some(&mut p.emissive),
            Self::Phong(p) => Some(&mut p.emissive),
            Self::Standard(p) => Some(&mut p.emissive),
            _ => None,
        }
    }

    fn scalar(&self, name: &str) -> Option<f32> {
        match (self, name) {
            (Self::Phong(p), "shininess") => Some(p.shininess),
            (Self::Standard(p), "roughness") => Some(p.roughness),
            (Self::Standard(p), "metalness") => Some(p.metalness),
            (Self::Sprite { rotation }, "rotation") => Some(*rotation),
            (Self::LineBasic { linewidth }, "linewidth") => Some(*linewidth),
            _ => None,
        }
    }

    fn scalar_mut(&mut self, name: &str) -> Option<&mut f32> {
        match (self, name) {
            (Self::Phong(p), "shininess") => Some(&mut p.shininess),
            (Self::Standard(p), "roughness") => Some(&mut p.roughness),
            (Self::Standard(p), "metalness") => Some(&mut p.metalness),
            (Self::Sprite { rotation }, "rotation") => Some(rotation),
            (Self::LineBasic { linewidth }, "linewidth") => Some(linewidth),
            _ => None,
        }
    }
}

/// A material shared by any number of meshes
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Unique identifier
    pub uuid: EntityId,
    /// Display name
    pub name: String,
    /// Shading model and its data
    pub kind: MaterialKind,
    /// Base colour
    pub color: u32,
    /// Opacity in `[0, 1]`
    pub opacity: f32,
    /// Whether opacity is honoured
    pub transparent: bool,
    /// Render as wireframe
    pub wireframe: bool,
    /// Rendered faces
    pub side: Side,
    /// Depth testing
    pub depth_test: bool,
    /// Depth writing
    pub depth_write: bool,
    /// Whether the material is rendered
    pub visible: bool,
    /// Texture slots, by slot name
    pub maps: BTreeMap<String, EntityId>,
    /// Application data
    pub user_data: Map<String, Value>,
}

impl Material {
    /// Create a material with a fresh identifier
    pub fn new(name: impl Into<String>, kind: MaterialKind) -> Self {
        Self {
            uuid: EntityId::new(),
            name: name.into(),
            kind,
            color: 0xffffff,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
            side: Side::Front,
            depth_test: true,
            depth_write: true,
            visible: true,
            maps: BTreeMap::new(),
            user_data: Map::new(),
        }
    }

    /// Read an attribute by name
    pub fn attribute(&self, name: &str) -> Option<Value> {
        let value = match name {
            "name" => Value::from(self.name.clone()),
            "opacity" => Value::from(self.opacity),
            "transparent" => Value::from(self.transparent),
            "wireframe" => Value::from(self.wireframe),
            "side" => Value::from(self.side.code()),
            "depthTest" => Value::from(self.depth_test),
            "depthWrite" => Value::from(self.depth_write),
            "visible" => Value::from(self.visible),
            _ => Value::from(self.kind.scalar(name)?),
        };
        Some(value)
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), FieldError> {
        match name {
            "name" => self.name = value_string(name, value)?,
            "opacity" => self.opacity = value_f32(name, value)?,
            "transparent" => self.transparent = value_bool(name, value)?,
            "wireframe" => self.wireframe = value_bool(name, value)?,
            "side" => {
                self.side = value
                    .as_u64()
                    .and_then(Side::from_code)
                    .ok_or_else(|| FieldError::invalid(name, "expected 0, 1 or 2"))?;
            }
            "depthTest" => self.depth_test = value_bool(name, value)?,
            "depthWrite" => self.depth_write = value_bool(name, value)?,
            "visible" => self.visible = value_bool(name, value)?,
            _ => {
                let tag = self.kind.type_tag();
                let slot = self
                    .kind
                    .scalar_mut(name)
                    .ok_or_else(|| FieldError::unknown(tag, name))?;
                *slot = value_f32(name, value)?;
            }
        }
        Ok(())
    }

    /// Read a colour attribute
    pub fn color(&self, name: &str) -> Option<u32> {
        match (&self.kind, name) {
            (_, "color") => Some(self.color),
            (MaterialKind::Lambert(p), "emissive") => Some(p.emissive),
            (MaterialKind::Phong(p), "emissive") => Some(p.emissive),
            (MaterialKind::Standard(p), "emissive") => Some(p.emissive),
            (MaterialKind::Phong(p), "specular") => Some(p.specular),
            _ => None,
        }
    }

    pub(crate) fn set_color(&mut self, name: &str, hex: u32) -> Result<(), FieldError> {
        let tag = self.kind.type_tag();
        let slot = match (&mut self.kind, name) {
            (_, "color") => &mut self.color,
            (MaterialKind::Phong(p), "specular") => &mut p.specular,
            (kind, "emissive") => kind
                .emissive_mut()
                .ok_or_else(|| FieldError::unknown(tag, name))?,
            _ => return Err(FieldError::unknown(tag, name)),
        };
        *slot = hex;
        Ok(())
    }
}

fn default_wrap() -> [u32; 2] {
    [1001, 1001]
}

fn default_repeat() -> [f32; 2] {
    [1.0, 1.0]
}

fn default_true() -> bool {
    true
}

/// An image texture referenced by material map slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Texture {
    /// Unique identifier
    pub uuid: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Image location
    #[serde(default)]
    pub url: String,
    /// Wrap modes (S, T)
    #[serde(default = "default_wrap")]
    pub wrap: [u32; 2],
    /// UV repeat
    #[serde(default = "default_repeat")]
    pub repeat: [f32; 2],
    /// UV offset
    #[serde(default)]
    pub offset: [f32; 2],
    /// Flip the image vertically on upload
    #[serde(default = "default_true")]
    pub flip_y: bool,
}

impl Texture {
    /// Create a texture with a fresh identifier
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            uuid: EntityId::new(),
            name: name.into(),
            url: url.into(),
            wrap: default_wrap(),
            repeat: default_repeat(),
            offset: [0.0, 0.0],
            flip_y: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_geometry_parameter_edit() {
        let mut geometry = Geometry::new("Ball", GeometryKind::Sphere(SphereParams::default()));
        geometry.set_attribute("radius", json!(2.5)).unwrap();
        geometry.set_attribute("widthSegments", json!(32)).unwrap();
        assert_eq!(geometry.attribute("radius"), Some(json!(2.5)));
        assert_eq!(geometry.attribute("widthSegments"), Some(json!(32)));

        let err = geometry.set_attribute("depth", json!(1.0)).unwrap_err();
        assert!(matches!(err, FieldError::Unknown { .. }));
        let err = geometry.set_attribute("widthSegments", json!("many")).unwrap_err();
        assert!(matches!(err, FieldError::Invalid { .. }));
        assert_eq!(geometry.attribute("widthSegments"), Some(json!(32)));
    }

    #[test]
    fn test_buffer_geometry_has_no_parameters() {
        let mut geometry = Geometry::new("Mesh", GeometryKind::Buffer(BufferData::default()));
        assert!(geometry.attribute("radius").is_none());
        assert!(geometry.set_attribute("radius", json!(1.0)).is_err());
        geometry.set_attribute("name", json!("Imported")).unwrap();
        assert_eq!(geometry.name, "Imported");
    }

    #[test]
    fn test_material_attributes_by_kind() {
        let mut material = Material::new("Shiny", MaterialKind::Phong(PhongParams::default()));
        material.set_attribute("shininess", &json!(80.0)).unwrap();
        material.set_attribute("side", &json!(2)).unwrap();
        assert_eq!(material.attribute("shininess"), Some(json!(80.0)));
        assert_eq!(material.side, Side::Double);
        assert!(material.set_attribute("roughness", &json!(0.1)).is_err());
        assert!(material.set_attribute("side", &json!(9)).is_err());
    }

    #[test]
    fn test_material_colors() {
        let mut material = Material::new("Glow", MaterialKind::Standard(StandardParams::default()));
        material.set_color("emissive", 0xff0000).unwrap();
        material.set_color("color", 0x00ff00).unwrap();
        assert_eq!(material.color("emissive"), Some(0xff0000));
        assert_eq!(material.color("color"), Some(0x00ff00));
        assert!(material.set_color("specular", 1).is_err());

        let mut basic = Material::new("Flat", MaterialKind::Basic);
        assert!(basic.set_color("emissive", 1).is_err());
        assert_eq!(basic.color("emissive"), None);
    }

    #[test]
    fn test_map_slots_by_kind() {
        assert!(MaterialKind::Basic.supports_map("normalMap"));
        assert!(MaterialKind::Sprite { rotation: 0.0 }.supports_map("map"));
        assert!(!MaterialKind::Sprite { rotation: 0.0 }.supports_map("normalMap"));
        assert!(!MaterialKind::LineBasic { linewidth: 1.0 }.supports_map("map"));
        assert!(!MaterialKind::Basic.supports_map("colorMap"));
    }
}
