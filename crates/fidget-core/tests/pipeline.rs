//! End-to-end build of the full fidget
//!
//! Runs every boolean of the example configuration with coarser pins.

use std::path::PathBuf;

use fidget_cad::{CadKernel, TruckKernel};
use fidget_core::{FidgetConfig, build_fidget};

fn example_config() -> FidgetConfig {
    let mut config = FidgetConfig::default();
    config.gear.profile =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/gear.svg");
    config.pin.sections = 16;
    config
}

#[test]
fn test_example_fidget_is_printable() {
    let kernel = TruckKernel::new();
    let config = example_config();
    let parts = build_fidget(&kernel, &config).unwrap();

    assert_eq!(parts.gears.len(), 8);
    assert_eq!(parts.pins.len(), 8);

    for solid in parts.solids() {
        let mesh = kernel.tessellate(solid, config.tolerance).unwrap();
        assert!(mesh.is_watertight());
        assert!(mesh.volume() > 0.0);
    }

    // Gears are trimmed to the 40 mm cube
    for gear in &parts.gears {
        let mesh = kernel.tessellate(gear, config.tolerance).unwrap();
        let (min, max) = mesh.bounds();
        assert!(max.z - min.z > 0.0 && max.z - min.z < 40.0);
    }

    // Intermediate solids are released
    assert_eq!(kernel.solid_count(), parts.solids().count());
}

#[test]
fn test_invalid_config_fails_before_building() {
    let kernel = TruckKernel::new();
    let mut config = example_config();
    config.hole_scale = 0.0;
    assert!(build_fidget(&kernel, &config).is_err());
    assert_eq!(kernel.solid_count(), 0);
}
