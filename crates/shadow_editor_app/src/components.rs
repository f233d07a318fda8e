// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node kinds and their kind-specific data.
//!
//! Every scene node carries exactly one [`NodeKind`]. Lights, cameras and
//! meshes keep their extra fields in a component struct; plain transforms
//! (`Object3D`, `Group`, `Bone`) carry nothing.

use crate::scene::{value_f32, EntityId, FieldError};
use serde_json::Value;
use std::f32::consts::PI;

/// Scene root data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneComponent {
    /// Background colour, if any
    pub background: Option<u32>,
}

/// Geometry and material references of a mesh or sprite
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshComponent {
    /// Referenced geometry
    pub geometry: Option<EntityId>,
    /// Referenced material
    pub material: Option<EntityId>,
}

/// Light source data shared by every light kind
#[derive(Debug, Clone, PartialEq)]
pub struct LightComponent {
    /// Light colour
    pub color: u32,
    /// Light intensity
    pub intensity: f32,
    /// Cut-off distance for point and spot lights (0 = infinite)
    pub distance: f32,
    /// Falloff exponent for point and spot lights
    pub decay: f32,
    /// Cone angle of spot lights in radians
    pub angle: f32,
    /// Cone edge softness of spot lights
    pub penumbra: f32,
    /// Ground colour of hemisphere lights
    pub ground_color: u32,
}

impl Default for LightComponent {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 1.0,
            distance: 0.0,
            decay: 1.0,
            angle: PI / 3.0,
            penumbra: 0.0,
            ground_color: 0xffffff,
        }
    }
}

/// Camera projection data
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    /// Vertical field of view in degrees
    pub fov: f32,
    /// Aspect ratio
    pub aspect: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// Zoom factor
    pub zoom: f32,
    /// Left frustum plane (orthographic)
    pub left: f32,
    /// Right frustum plane (orthographic)
    pub right: f32,
    /// Top frustum plane (orthographic)
    pub top: f32,
    /// Bottom frustum plane (orthographic)
    pub bottom: f32,
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self {
            fov: 50.0,
            aspect: 1.0,
            near: 0.1,
            far: 2000.0,
            zoom: 1.0,
            left: -1.0,
            right: 1.0,
            top: 1.0,
            bottom: -1.0,
        }
    }
}

/// All node kinds the editor can hold
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Scene root
    Scene(SceneComponent),
    /// Plain transform
    Object3D,
    /// Grouping transform
    Group,
    /// Renderable mesh
    Mesh(MeshComponent),
    /// Camera-facing sprite (material only)
    Sprite(MeshComponent),
    /// Skeleton bone
    Bone,
    /// Ambient light
    AmbientLight(LightComponent),
    /// Directional light
    DirectionalLight(LightComponent),
    /// Sky/ground hemisphere light
    HemisphereLight(LightComponent),
    /// Point light
    PointLight(LightComponent),
    /// Spot light
    SpotLight(LightComponent),
    /// Perspective camera
    PerspectiveCamera(CameraComponent),
    /// Orthographic camera
    OrthographicCamera(CameraComponent),
}

impl NodeKind {
    /// Type tag used in documents
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Scene(_) => "Scene",
            Self::Object3D => "Object3D",
            Self::Group => "Group",
            Self::Mesh(_) => "Mesh",
            Self::Sprite(_) => "Sprite",
            Self::Bone => "Bone",
            Self::AmbientLight(_) => "AmbientLight",
            Self::DirectionalLight(_) => "DirectionalLight",
            Self::HemisphereLight(_) => "HemisphereLight",
            Self::PointLight(_) => "PointLight",
            Self::SpotLight(_) => "SpotLight",
            Self::PerspectiveCamera(_) => "PerspectiveCamera",
            Self::OrthographicCamera(_) => "OrthographicCamera",
        }
    }

    /// Whether this is the scene root kind
    pub fn is_scene(&self) -> bool {
        matches!(self, Self::Scene(_))
    }

    /// Mesh or sprite references
    pub fn mesh(&self) -> Option<&MeshComponent> {
        match self {
            Self::Mesh(mesh) | Self::Sprite(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub(crate) fn mesh_mut(&mut self) -> Option<&mut MeshComponent> {
        match self {
            Self::Mesh(mesh) | Self::Sprite(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Light data
    pub fn light(&self) -> Option<&LightComponent> {
        match self {
            Self::AmbientLight(light)
            | Self::DirectionalLight(light)
            | Self::HemisphereLight(light)
            | Self::PointLight(light)
            | Self::SpotLight(light) => Some(light),
            _ => None,
        }
    }

    /// Camera data
    pub fn camera(&self) -> Option<&CameraComponent> {
        match self {
            Self::PerspectiveCamera(camera) | Self::OrthographicCamera(camera) => Some(camera),
            _ => None,
        }
    }

    fn scalar(&self, name: &str) -> Option<f32> {
        let value = match (self, name) {
            (
                Self::AmbientLight(l)
                | Self::DirectionalLight(l)
                | Self::HemisphereLight(l)
                | Self::PointLight(l)
                | Self::SpotLight(l),
                "intensity",
            ) => l.intensity,
            (Self::PointLight(l) | Self::SpotLight(l), "distance") => l.distance,
            (Self::PointLight(l) | Self::SpotLight(l), "decay") => l.decay,
            (Self::SpotLight(l), "angle") => l.angle,
            (Self::SpotLight(l), "penumbra") => l.penumbra,
            (Self::PerspectiveCamera(c), "fov") => c.fov,
            (Self::PerspectiveCamera(c), "aspect") => c.aspect,
            (Self::PerspectiveCamera(c) | Self::OrthographicCamera(c), "near") => c.near,
            (Self::PerspectiveCamera(c) | Self::OrthographicCamera(c), "far") => c.far,
            (Self::PerspectiveCamera(c) | Self::OrthographicCamera(c), "zoom") => c.zoom,
            (Self::OrthographicCamera(c), "left") => c.left,
            (Self::OrthographicCamera(c), "right") => c.right,
            (Self::OrthographicCamera(c), "top") => c.top,
            (Self::OrthographicCamera(c), "bottom") => c.bottom,
            _ => return None,
        };
        Some(value)
    }

    fn scalar_mut(&mut self, name: &str) -> Option<&mut f32> {
        let slot = match (self, name) {
            (
                Self::AmbientLight(l)
                | Self::DirectionalLight(l)
                | Self::HemisphereLight(l)
                | Self::PointLight(l)
                | Self::SpotLight(l),
                "intensity",
            ) => &mut l.intensity,
            (Self::PointLight(l) | Self::SpotLight(l), "distance") => &mut l.distance,
            (Self::PointLight(l) | Self::SpotLight(l), "decay") => &mut l.decay,
            (Self::SpotLight(l), "angle") => &mut l.angle,
            (Self::SpotLight(l), "penumbra") => &mut l.penumbra,
            (Self::PerspectiveCamera(c), "fov") => &mut c.fov,
            (Self::PerspectiveCamera(c), "aspect") => &mut c.aspect,
            (Self::PerspectiveCamera(c) | Self::OrthographicCamera(c), "near") => &mut c.near,
            (Self::PerspectiveCamera(c) | Self::OrthographicCamera(c), "far") => &mut c.far,
            (Self::PerspectiveCamera(c) | Self::OrthographicCamera(c), "zoom") => &mut c.zoom,
            (Self::OrthographicCamera(c), "left") => &mut c.left,
            (Self::OrthographicCamera(c), "right") => &mut c.right,
            (Self::OrthographicCamera(c), "top") => &mut c.top,
            (Self::OrthographicCamera(c), "bottom") => &mut c.bottom,
            _ => return None,
        };
        Some(slot)
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<Value> {
        self.scalar(name).map(Value::from)
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: &Value) -> Result<(), FieldError> {
        let tag = self.type_tag();
        let slot = self
            .scalar_mut(name)
            .ok_or_else(|| FieldError::unknown(tag, name))?;
        *slot = value_f32(name, value)?;
        Ok(())
    }

    pub(crate) fn color(&self, name: &str) -> Option<u32> {
        match (self, name) {
            (Self::Scene(scene), "background") => scene.background,
            (Self::HemisphereLight(l), "groundColor") => Some(l.ground_color),
            (_, "color") => self.light().map(|l| l.color),
            _ => None,
        }
    }

    pub(crate) fn set_color(&mut self, name: &str, hex: u32) -> Result<(), FieldError> {
        let tag = self.type_tag();
        match (self, name) {
            (Self::Scene(scene), "background") => scene.background = Some(hex),
            (Self::HemisphereLight(l), "groundColor") => l.ground_color = hex,
            (
                Self::AmbientLight(l)
                | Self::DirectionalLight(l)
                | Self::HemisphereLight(l)
                | Self::PointLight(l)
                | Self::SpotLight(l),
                "color",
            ) => l.color = hex,
            _ => return Err(FieldError::unknown(tag, name)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spot_light_attributes() {
        let mut kind = NodeKind::SpotLight(LightComponent::default());
        kind.set_attribute("penumbra", &json!(0.5)).unwrap();
        assert_eq!(kind.attribute("penumbra"), Some(json!(0.5)));
        assert_eq!(kind.attribute("intensity"), Some(json!(1.0)));
    }

    #[test]
    fn test_attribute_scoped_to_kind() {
        let mut kind = NodeKind::PointLight(LightComponent::default());
        assert!(kind.attribute("angle").is_none());
        let err = kind.set_attribute("angle", &json!(1.0)).unwrap_err();
        assert_eq!(err, FieldError::unknown("PointLight", "angle"));
    }

    #[test]
    fn test_colors() {
        let mut kind = NodeKind::HemisphereLight(LightComponent::default());
        kind.set_color("groundColor", 0x00ff00).unwrap();
        kind.set_color("color", 0x0000ff).unwrap();
        assert_eq!(kind.color("groundColor"), Some(0x00ff00));
        assert_eq!(kind.color("color"), Some(0x0000ff));

        let mut scene = NodeKind::Scene(SceneComponent::default());
        assert_eq!(scene.color("background"), None);
        scene.set_color("background", 0xaaaaaa).unwrap();
        assert_eq!(scene.color("background"), Some(0xaaaaaa));
        assert!(NodeKind::Group.clone().set_color("color", 1).is_err());
    }
}
