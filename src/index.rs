use geo::{BoundingRect, Contains, Intersects, MultiPolygon, Point, Polygon, Rect};

/// Quadtree over the parts of a boundary. Each leaf keeps the indices of the
/// polygons touching its box, so a point query only tests a few candidates.
pub struct PartitionTree {
    children: Vec<PartitionTree>,
    selected: Vec<usize>,
    bbox: Rect,
}

impl PartitionTree {
    pub fn from_multi_polygon(geometry: &MultiPolygon, max_depth: usize) -> PartitionTree {
        let selected = (0..geometry.0.len()).collect();
        let bbox = geometry
            .bounding_rect()
            .unwrap_or_else(|| Rect::new((0.0, 0.0), (0.0, 0.0)));
        PartitionTree::from_polygons(selected, &geometry.0, bbox, max_depth, 0)
    }

    fn from_polygons(
        selected: Vec<usize>,
        polygons: &[Polygon],
        bbox: Rect,
        max_depth: usize,
        depth: usize,
    ) -> PartitionTree {
        let children = if selected.is_empty() || depth == max_depth {
            vec![]
        } else {
            let [ab, cd] = bbox.split_x();
            let [a, b] = ab.split_y();
            let [c, d] = cd.split_y();

            [a, b, c, d]
                .into_iter()
                .map(|child_bbox| {
                    let child_selected = selected
                        .iter()
                        .copied()
                        .filter(|&i| child_bbox.intersects(&polygons[i]))
                        .collect();
                    PartitionTree::from_polygons(child_selected, polygons, child_bbox, max_depth, depth + 1)
                })
                .collect()
        };

        PartitionTree {
            children,
            selected,
            bbox,
        }
    }

    pub fn candidates(&self, point: &Point) -> Vec<usize> {
        if self.children.is_empty() {
            self.selected.clone()
        } else {
            self.children
                .iter()
                .filter(|child| child.bbox.intersects(point))
                .flat_map(|child| child.candidates(point))
                .collect()
        }
    }

    pub fn contains(&self, point: &Point, polygons: &[Polygon]) -> bool {
        self.bbox.intersects(point)
            && self
                .candidates(point)
                .into_iter()
                .any(|i| polygons[i].contains(point))
    }

    #[cfg(test)]
    fn size(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(|child| child.size()).sum()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squares() -> MultiPolygon {
        MultiPolygon::new(vec![
            Rect::new((0.0, 0.0), (1.0, 1.0)).to_polygon(),
            Rect::new((5.0, 5.0), (6.0, 6.0)).to_polygon(),
        ])
    }

    #[test]
    fn agrees_with_direct_containment() {
        let geometry = squares();
        let tree = PartitionTree::from_multi_polygon(&geometry, 4);
        assert!(tree.size() > 1 && tree.size() <= 4usize.pow(4));

        for (x, y) in [(0.5, 0.5), (5.5, 5.5), (3.0, 3.0), (0.5, 5.5), (7.0, 7.0)] {
            let point = Point::new(x, y);
            assert_eq!(tree.contains(&point, &geometry.0), geometry.contains(&point), "({x}, {y})");
        }
    }

    #[test]
    fn leaves_only_hold_nearby_parts() {
        let geometry = squares();
        let tree = PartitionTree::from_multi_polygon(&geometry, 2);
        assert_eq!(tree.candidates(&Point::new(0.2, 0.2)), vec![0]);
        assert!(tree.candidates(&Point::new(3.2, 0.2)).is_empty());
    }
}
