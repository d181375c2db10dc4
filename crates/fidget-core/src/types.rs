//! Part parameters and part handles

use std::path::PathBuf;

use fidget_cad::Solid;
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{FidgetError, FidgetResult};

/// Split pin dimensions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PinConfig {
    /// Length of the straight middle section between the two collars
    #[serde(alias = "length")]
    pub center_length: f32,
    /// Nominal diameter; the pin outline itself is fixed
    pub diameter: f32,
    /// Facets around the pin axis
    #[serde(default = "default_pin_sections")]
    pub sections: u32,
}

fn default_pin_sections() -> u32 {
    64
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            center_length: 12.0,
            diameter: 6.0,
            sections: default_pin_sections(),
        }
    }
}

/// Grid used to lay parts out on a print plate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PrintLayoutConfig {
    pub row_spacing: f32,
    pub col_spacing: f32,
    pub rows: usize,
    pub cols: usize,
}

impl PrintLayoutConfig {
    pub fn new(row_spacing: f32, col_spacing: f32, rows: usize, cols: usize) -> Self {
        Self {
            row_spacing,
            col_spacing,
            rows,
            cols,
        }
    }

    /// Number of grid cells
    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    /// Plate position of each of `count` items, filled row by row
    ///
    /// Items beyond [`capacity`](Self::capacity) continue on further rows.
    pub fn positions(&self, count: usize) -> Vec<Vec2> {
        let cols = self.cols.max(1);
        (0..count)
            .map(|i| {
                let (row, col) = (i / cols, i % cols);
                Vec2::new(col as f32 * self.col_spacing, row as f32 * self.row_spacing)
            })
            .collect()
    }
}

/// Gear outline and taper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GearConfig {
    /// SVG file holding the gear outline
    pub profile: PathBuf,
    /// Diameter of the gear's bottom face
    pub base_diameter: f32,
    pub height: f32,
    /// Flank angle in degrees; 90 gives straight sides
    pub angle: f32,
}

impl Default for GearConfig {
    fn default() -> Self {
        Self {
            profile: PathBuf::from("assets/gear.svg"),
            base_diameter: 24.0,
            height: 500.0,
            angle: 5.7,
        }
    }
}

/// Primitive used to trim the gears
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Cube,
    Sphere,
    Cylinder,
    Custom,
}

/// A length given either once for all axes or per axis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Extent {
    Uniform(f32),
    PerAxis([f32; 3]),
}

impl Extent {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Extent::Uniform(v) => Vec3::splat(v),
            Extent::PerAxis(v) => Vec3::from(v),
        }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Extent::Uniform(1.0)
    }
}

/// Trimming shape parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShapeConfig {
    pub shape_type: ShapeType,
    /// Edge lengths of a cube
    #[serde(default)]
    pub size: Extent,
    /// Radius of a sphere or cylinder
    #[serde(default = "one")]
    pub radius: f32,
    /// Height of a cylinder
    #[serde(default = "one")]
    pub height: f32,
    /// Mesh for a custom shape
    #[serde(default)]
    pub stl_path: Option<PathBuf>,
    #[serde(default)]
    pub offset: [f32; 3],
    /// Euler angles in radians, applied about the rotating x, y and z axes
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default)]
    pub scale: Extent,
    /// Sphere refinement level
    #[serde(default = "default_subdivisions")]
    pub subdivisions: u32,
}

fn one() -> f32 {
    1.0
}

fn default_subdivisions() -> u32 {
    2
}

impl ShapeConfig {
    pub fn new(shape_type: ShapeType) -> Self {
        Self {
            shape_type,
            size: Extent::default(),
            radius: 1.0,
            height: 1.0,
            stl_path: None,
            offset: [0.0; 3],
            rotation: [0.0; 3],
            scale: Extent::default(),
            subdivisions: default_subdivisions(),
        }
    }

    /// Orientation from the Euler angles (rotating frame, x then y then z)
    pub fn orientation(&self) -> Quat {
        let [x, y, z] = self.rotation;
        Quat::from_rotation_x(x) * Quat::from_rotation_y(y) * Quat::from_rotation_z(z)
    }
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            size: Extent::Uniform(40.0),
            ..Self::new(ShapeType::Cube)
        }
    }
}

/// Everything needed to build a complete fidget
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FidgetConfig {
    /// Edge length of the core cube
    pub core_diameter: f32,
    pub gear: GearConfig,
    pub pin: PinConfig,
    /// Rotation of each gear about its face normal, in degrees
    pub gear_rotations: Vec<f32>,
    /// Clearance factor for pin holes
    pub hole_scale: f32,
    pub shape: ShapeConfig,
    pub gear_layout: PrintLayoutConfig,
    pub pin_layout: PrintLayoutConfig,
    /// Chordal tolerance for exported meshes
    pub tolerance: f32,
}

impl Default for FidgetConfig {
    fn default() -> Self {
        Self {
            core_diameter: 35.0,
            gear: GearConfig::default(),
            pin: PinConfig::default(),
            gear_rotations: vec![27.0, 17.0, 7.0, -3.0, -3.0, 7.0, 17.0, 27.0],
            hole_scale: 1.05,
            shape: ShapeConfig::default(),
            gear_layout: PrintLayoutConfig::new(35.0, 35.0, 3, 3),
            pin_layout: PrintLayoutConfig::new(23.0, 10.0, 3, 3),
            tolerance: 0.05,
        }
    }
}

impl FidgetConfig {
    /// Reject parameters no part can be built from
    pub fn validate(&self) -> FidgetResult<()> {
        let [size_x, size_y, size_z] = self.shape.size.to_vec3().to_array();
        let [scale_x, scale_y, scale_z] = self.shape.scale.to_vec3().to_array();
        let positive = [
            ("core_diameter", self.core_diameter),
            ("gear.base_diameter", self.gear.base_diameter),
            ("gear.height", self.gear.height),
            ("hole_scale", self.hole_scale),
            ("tolerance", self.tolerance),
            ("shape.size.x", size_x),
            ("shape.size.y", size_y),
            ("shape.size.z", size_z),
            ("shape.radius", self.shape.radius),
            ("shape.height", self.shape.height),
            ("shape.scale.x", scale_x),
            ("shape.scale.y", scale_y),
            ("shape.scale.z", scale_z),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(FidgetError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.pin.center_length.is_finite() || self.pin.center_length < 0.0 {
            return Err(FidgetError::InvalidParameter(format!(
                "pin.center_length must not be negative, got {}",
                self.pin.center_length
            )));
        }
        if self.pin.sections < 3 {
            return Err(FidgetError::InvalidParameter(format!(
                "pin.sections must be at least 3, got {}",
                self.pin.sections
            )));
        }
        if self.shape.shape_type == ShapeType::Custom && self.shape.stl_path.is_none() {
            return Err(FidgetError::InvalidShape(
                "STL path is required for custom shape".into(),
            ));
        }
        let layouts = [("gear_layout", &self.gear_layout), ("pin_layout", &self.pin_layout)];
        for (name, layout) in layouts {
            if layout.cols == 0 {
                return Err(FidgetError::InvalidParameter(format!(
                    "{}.cols must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// A face of the core where a gear is mounted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Face {
    /// Outward unit normal
    pub normal: Vec3,
    /// Center of the face
    pub origin: Vec3,
}

impl Face {
    pub fn new(normal: Vec3, origin: Vec3) -> Self {
        Self {
            normal: normal.normalize(),
            origin,
        }
    }

    /// Rotation taking +Z onto the face normal
    pub fn alignment(&self) -> Quat {
        Quat::from_rotation_arc(Vec3::Z, self.normal)
    }
}

/// The center body and its gear faces
#[derive(Debug, Clone, PartialEq)]
pub struct Core {
    pub solid: Solid,
    pub faces: Vec<Face>,
}

/// The three pin variants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pin {
    /// Plain revolved pin, used to bore gears
    pub round: Solid,
    /// Pin with two flattened sides, used to bore the core
    pub flat: Solid,
    /// Printable split pin lying on a flat side
    pub pin: Solid,
}

pub type Gear = Solid;
pub type Shape = Solid;
