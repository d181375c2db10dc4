use fidget_cad::{CadKernel, Solid};

use super::Scratch;
use crate::error::FidgetResult;
use crate::types::PrintLayoutConfig;

/// Spread parts over a print plate grid
///
/// Part `i` moves by `(col * col_spacing, row * row_spacing, 0)` with
/// `row = i / cols` and `col = i % cols`.
pub fn arrange_meshes(
    kernel: &dyn CadKernel,
    parts: &[Solid],
    layout: &PrintLayoutConfig,
) -> FidgetResult<Vec<Solid>> {
    if parts.len() > layout.capacity() {
        tracing::warn!(
            parts = parts.len(),
            rows = layout.rows,
            cols = layout.cols,
            "more parts than grid cells, continuing on extra rows"
        );
    }

    let mut placed = Scratch::new(kernel);
    for (part, position) in parts.iter().zip(layout.positions(parts.len())) {
        placed.hold(kernel.translate(part, position.extend(0.0))?);
    }
    Ok(placed.keep_all())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fidget_cad::TruckKernel;
    use glam::Vec3;

    #[test]
    fn test_arrange_on_grid() {
        let kernel = TruckKernel::new();
        let part = kernel.create_box(Vec3::ZERO, Vec3::ONE).unwrap();
        let parts = vec![part; 5];
        let layout = PrintLayoutConfig::new(23.0, 10.0, 3, 2);

        let arranged = arrange_meshes(&kernel, &parts, &layout).unwrap();
        assert_eq!(arranged.len(), 5);

        let centers: Vec<Vec3> = arranged
            .iter()
            .map(|s| kernel.tessellate(s, 0.1).unwrap().centroid())
            .collect();
        let expected = [
            (0.0, 0.0),
            (10.0, 0.0),
            (0.0, 23.0),
            (10.0, 23.0),
            (0.0, 46.0),
        ];
        for (c, (x, y)) in centers.iter().zip(expected) {
            assert_relative_eq!(c.x, x, epsilon = 1e-4);
            assert_relative_eq!(c.y, y, epsilon = 1e-4);
            assert_relative_eq!(c.z, 0.0, epsilon = 1e-4);
        }

        // Arranged copies are new solids
        assert!(arranged.iter().all(|s| *s != part));
    }

    #[test]
    fn test_arrange_nothing() {
        let kernel = TruckKernel::new();
        let layout = PrintLayoutConfig::new(1.0, 1.0, 1, 1);
        assert!(arrange_meshes(&kernel, &[], &layout).unwrap().is_empty());
    }
}
